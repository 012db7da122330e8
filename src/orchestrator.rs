//! Extraction entry points
//!
//! Single-listing pages go through the JSON-LD locator and the listing field
//! extractor. Results pages are enumerated and each discovered id is run
//! through overlay extraction and the filter, sequentially.

use crate::error::ExtractError;
use crate::extractors::{
    enumerate_listings, extract_listing as assemble_listing, extract_overlay, json_text,
    locate_overlay, locate_product,
};
use crate::filter::passes;
use crate::model::{BatchOutcome, FilterConfig, ImageSet, ListingRecord};
use crate::page::Page;

/// Extract the listing record of a single-listing page.
pub fn extract_listing(page: &Page) -> Result<ListingRecord, ExtractError> {
    let product = locate_product(page.document());
    assemble_listing(product.as_ref(), page)
}

/// Extract and filter overlay analytics for every listing on a results page.
pub fn extract_all_listings(page: &Page, config: &FilterConfig) -> BatchOutcome {
    let Some(index) = enumerate_listings(page).filter(|index| !index.is_empty()) else {
        tracing::info!("no listings found on page");
        return BatchOutcome::not_found();
    };

    let mut records = Vec::new();
    for id in index.ids() {
        let Some((overlay, stage)) = locate_overlay(page.document(), id) else {
            tracing::info!("no overlay found for listing {}", id);
            continue;
        };
        tracing::debug!("overlay for listing {} found via {:?}", id, stage);

        let Some(mut record) = extract_overlay(page, overlay, id) else {
            continue;
        };
        if !passes(&record, config) {
            tracing::info!("listing {} filtered out", id);
            continue;
        }

        record.sku = Some(id.clone());
        record.main_image = index.main_image(id).map(String::from);
        records.push(record);
    }

    tracing::info!(
        "extracted {} of {} listings",
        records.len(),
        index.len()
    );
    BatchOutcome::found(records)
}

/// Image-only extraction: product sku plus every `contentURL` image.
pub fn extract_images(page: &Page) -> Result<ImageSet, ExtractError> {
    let product = locate_product(page.document()).ok_or(ExtractError::MissingStructuredData)?;

    let image_urls = product
        .get("image")
        .and_then(|images| images.as_array())
        .map(|images| {
            images
                .iter()
                .filter_map(|img| json_text(img.get("contentURL")))
                .collect()
        })
        .unwrap_or_default();

    Ok(ImageSet {
        sku: json_text(product.get("sku")).unwrap_or_default(),
        image_urls,
    })
}
