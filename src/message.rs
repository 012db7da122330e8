//! Request/response protocol between a host and the page context
//!
//! Requests name an action, responses carry either data or an error with a
//! category the host can turn into a user-facing message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, ExtractError};
use crate::model::{BatchOutcome, FilterConfig};
use crate::orchestrator::{extract_all_listings, extract_images, extract_listing};
use crate::page::{Page, PageKind};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    ExtractProductData,
    ExtractAllProductData {
        #[serde(default)]
        settings: FilterConfig,
    },
    ExtractImages,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

impl Response {
    fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                success: true,
                data: Some(value),
                error: None,
                error_type: None,
            },
            Err(e) => {
                tracing::error!("failed to serialize response data: {}", e);
                Self::failure(ErrorKind::NoStructuredData, e.to_string())
            }
        }
    }

    fn failure(kind: ErrorKind, detail: String) -> Self {
        tracing::debug!("request failed ({:?}): {}", kind, detail);
        Self::with_error(kind, kind.user_message().to_string())
    }

    /// Extraction failures carry their own message; `errorType` stays the category.
    fn extraction_failure(err: ExtractError) -> Self {
        let kind = ErrorKind::from(&err);
        tracing::debug!("extraction failed ({:?}): {}", kind, err);
        Self::with_error(kind, err.to_string())
    }

    fn with_error(kind: ErrorKind, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            error_type: Some(kind),
        }
    }
}

/// Run one request against a page snapshot.
pub fn dispatch(page: &Page, request: &Request) -> Response {
    if page.is_blank() {
        return Response::failure(ErrorKind::PageNotReady, "document is empty".to_string());
    }

    match request {
        Request::ExtractProductData => {
            if let Some(response) = require_listing_page(page) {
                return response;
            }
            match extract_listing(page) {
                Ok(record) => Response::ok(&record),
                Err(err) => Response::extraction_failure(err),
            }
        }
        Request::ExtractAllProductData { settings } => match extract_all_listings(page, settings) {
            BatchOutcome::NotFound { .. } => {
                Response::failure(ErrorKind::NoResults, "no listing anchors".to_string())
            }
            outcome => Response::ok(&outcome),
        },
        Request::ExtractImages => {
            if let Some(response) = require_listing_page(page) {
                return response;
            }
            match extract_images(page) {
                Ok(images) => Response::ok(&images),
                Err(err) => Response::extraction_failure(err),
            }
        }
    }
}

/// Parse a JSON request and dispatch it.
pub fn handle_message(page: &Page, request_json: &str) -> Result<Response, serde_json::Error> {
    let request: Request = serde_json::from_str(request_json)?;
    tracing::debug!("handling request {:?}", request);
    Ok(dispatch(page, &request))
}

fn require_listing_page(page: &Page) -> Option<Response> {
    match page.kind() {
        Some(PageKind::Listing) | None => None,
        Some(kind) => Some(Response::failure(
            ErrorKind::UnsupportedPage,
            format!("{:?} page is not a listing page", kind),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"
    <html><head>
      <meta property="og:url" content="https://www.etsy.com/listing/111/mug">
      <script type="application/ld+json">{"@type": "Product", "sku": "111", "name": "Mug",
        "image": [{"contentURL": "https://i.etsystatic.com/a.jpg"}]}</script>
    </head><body></body></html>"#;

    #[test]
    fn test_parse_requests() {
        let req: Request = serde_json::from_str(r#"{"action": "extractProductData"}"#).unwrap();
        assert_eq!(req, Request::ExtractProductData);

        let req: Request = serde_json::from_str(
            r#"{"action": "extractAllProductData", "settings": {"minViews24h": 100}}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            Request::ExtractAllProductData {
                settings: FilterConfig {
                    min_views_24h: Some(100.0),
                    ..FilterConfig::default()
                }
            }
        );

        let req: Request = serde_json::from_str(r#"{"action": "extractAllProductData"}"#).unwrap();
        assert_eq!(
            req,
            Request::ExtractAllProductData {
                settings: FilterConfig::default()
            }
        );

        assert!(serde_json::from_str::<Request>(r#"{"action": "reboot"}"#).is_err());
    }

    #[test]
    fn test_listing_request_succeeds() {
        let page = Page::parse(LISTING_HTML, Some("https://www.etsy.com/listing/111/mug?ref=a"));
        let response = handle_message(&page, r#"{"action": "extractProductData"}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.data.unwrap()["title"], "Mug");
    }

    #[test]
    fn test_images_request_succeeds() {
        let page = Page::parse(LISTING_HTML, None);
        let response = dispatch(&page, &Request::ExtractImages);
        let data = response.data.unwrap();
        assert_eq!(data["sku"], "111");
        assert_eq!(data["imageUrls"][0], "https://i.etsystatic.com/a.jpg");
    }

    #[test]
    fn test_wrong_page_kind() {
        let page = Page::parse(LISTING_HTML, Some("https://www.etsy.com/search?q=mug"));
        let response = dispatch(&page, &Request::ExtractProductData);
        assert!(!response.success);
        assert_eq!(response.error_type, Some(ErrorKind::UnsupportedPage));
    }

    #[test]
    fn test_blank_page_is_not_ready() {
        let page = Page::parse("", Some("https://www.etsy.com/listing/111/mug"));
        let response = dispatch(&page, &Request::ExtractProductData);
        assert_eq!(response.error_type, Some(ErrorKind::PageNotReady));
    }

    #[test]
    fn test_missing_product_data() {
        let page = Page::parse("<p>No data here</p>", None);
        let response = dispatch(&page, &Request::ExtractProductData);
        assert_eq!(response.error_type, Some(ErrorKind::NoStructuredData));
        assert_eq!(
            response.error.as_deref(),
            Some("no JSON-LD product data found on the page")
        );
    }

    #[test]
    fn test_missing_canonical_url_keeps_its_message() {
        let html = r#"<html><head>
          <script type="application/ld+json">{"@type": "Product", "sku": "111", "name": "Mug"}</script>
        </head><body><p>Mug</p></body></html>"#;
        let page = Page::parse(html, Some("https://www.etsy.com/listing/111/mug"));
        let response = handle_message(&page, r#"{"action": "extractProductData"}"#).unwrap();

        assert!(!response.success);
        assert_eq!(response.error_type, Some(ErrorKind::NoStructuredData));
        assert_eq!(
            response.error.as_deref(),
            Some("canonical URL meta tag og:url not found")
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["errorType"], "noStructuredData");
    }

    #[test]
    fn test_results_request_without_listings() {
        let page = Page::parse("<p>No listings</p>", None);
        let response = dispatch(
            &page,
            &Request::ExtractAllProductData {
                settings: FilterConfig::default(),
            },
        );
        assert_eq!(response.error_type, Some(ErrorKind::NoResults));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["errorType"], "noResults");
        assert!(json.get("data").is_none());
    }
}
