//! Results-page listing discovery

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::page::Page;

const THUMBNAIL_CLASS: &str = "v2-listing-card__img";

static LISTING_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[data-listing-id]").expect("valid selector"));
static THUMBNAIL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".v2-listing-card__img").expect("valid selector"));
static IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid selector"));

/// Distinct listing ids on a results page with their card thumbnails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingIndex {
    ids: Vec<String>,
    main_images: HashMap<String, String>,
}

impl ListingIndex {
    /// Ids in first-seen order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn main_image(&self, id: &str) -> Option<&str> {
        self.main_images.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn insert(&mut self, id: &str, image: Option<String>) {
        if !self.ids.iter().any(|known| known == id) {
            self.ids.push(id.to_string());
        }
        if let Some(src) = image {
            self.main_images.entry(id.to_string()).or_insert(src);
        }
    }
}

/// Walk every listing anchor on the page.
///
/// `None` means the page has no listing anchors at all; `Some` with no ids
/// means anchors exist but none carries a usable id.
pub fn enumerate_listings(page: &Page) -> Option<ListingIndex> {
    let document: &Html = page.document();
    let mut anchors = document.select(&LISTING_ANCHOR).peekable();
    anchors.peek()?;

    let mut index = ListingIndex::default();
    for anchor in anchors {
        let Some(id) = anchor
            .value()
            .attr("data-listing-id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            continue;
        };
        let image = card_thumbnail(anchor).map(|src| page.resolve(src));
        index.insert(id, image);
    }

    tracing::debug!("found {} distinct listing ids", index.len());
    Some(index)
}

/// Thumbnail `src` for a listing anchor, searched in three places: the
/// anchor's parent, the anchor itself, then the anchor's following siblings.
///
/// Only the first thumbnail container found is read. A container whose image
/// has no `src` yet yields nothing rather than another card's image.
fn card_thumbnail<'a>(anchor: ElementRef<'a>) -> Option<&'a str> {
    // Later stages only run when no container was found at all
    let container = thumbnail_in_parent(anchor)
        .or_else(|| thumbnail_in_anchor(anchor))
        .or_else(|| thumbnail_in_siblings(anchor))?;
    image_src(container)
}

fn thumbnail_in_parent<'a>(anchor: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let parent = anchor.parent().and_then(ElementRef::wrap)?;
    parent.select(&THUMBNAIL).next()
}

fn thumbnail_in_anchor<'a>(anchor: ElementRef<'a>) -> Option<ElementRef<'a>> {
    anchor.select(&THUMBNAIL).next()
}

fn thumbnail_in_siblings<'a>(anchor: ElementRef<'a>) -> Option<ElementRef<'a>> {
    anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().classes().any(|c| c == THUMBNAIL_CLASS))
}

fn image_src<'a>(container: ElementRef<'a>) -> Option<&'a str> {
    container
        .select(&IMG)
        .next()
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> Page {
        Page::parse(
            &format!("<html><body>{}</body></html>", body),
            Some("https://www.etsy.com/c/home"),
        )
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let p = page(
            r#"
            <a data-listing-id="111" href="/listing/111/a">A</a>
            <a data-listing-id="222" href="/listing/222/b">B</a>
            <a data-listing-id="111" href="/listing/111/a">A again</a>"#,
        );
        let index = enumerate_listings(&p).unwrap();
        assert_eq!(index.ids(), ["111", "222"]);
    }

    #[test]
    fn test_no_anchors_is_distinct_from_no_ids() {
        assert!(enumerate_listings(&page("<p>nothing</p>")).is_none());

        let empty = enumerate_listings(&page(r#"<a data-listing-id="">x</a>"#)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_thumbnail_in_parent_card() {
        let p = page(
            r#"
            <div class="card">
              <a data-listing-id="111" href="/listing/111/a">A</a>
              <div class="v2-listing-card__img"><img src="https://i.etsystatic.com/111.jpg"></div>
            </div>"#,
        );
        let index = enumerate_listings(&p).unwrap();
        assert_eq!(index.main_image("111"), Some("https://i.etsystatic.com/111.jpg"));
    }

    #[test]
    fn test_thumbnail_nested_in_anchor() {
        let p = page(
            r#"
            <a data-listing-id="111" href="/listing/111/a">
              <div class="v2-listing-card__img"><img src="/img/111.jpg"></div>
            </a>"#,
        );
        let index = enumerate_listings(&p).unwrap();
        assert_eq!(index.main_image("111"), Some("https://www.etsy.com/img/111.jpg"));
    }

    #[test]
    fn test_thumbnail_in_following_sibling() {
        let document = Html::parse_fragment(
            r#"<div><a data-listing-id="111">A</a><span>meta</span><div class="wt-card v2-listing-card__img"><img src="s.jpg"></div></div>"#,
        );
        let anchor = document.select(&LISTING_ANCHOR).next().unwrap();
        assert!(thumbnail_in_anchor(anchor).is_none());
        assert!(thumbnail_in_siblings(anchor).is_some());
        assert_eq!(card_thumbnail(anchor), Some("s.jpg"));
    }

    #[test]
    fn test_siblings_before_anchor_are_ignored() {
        let document = Html::parse_fragment(
            r#"<div><div class="v2-listing-card__img"><img src="before.jpg"></div><a data-listing-id="111">A</a></div>"#,
        );
        let anchor = document.select(&LISTING_ANCHOR).next().unwrap();
        assert!(thumbnail_in_siblings(anchor).is_none());
    }

    #[test]
    fn test_missing_or_empty_image() {
        let p = page(
            r#"
            <a data-listing-id="111">A</a>
            <div class="v2-listing-card__img"><img src=""></div>
            <a data-listing-id="222">B</a>"#,
        );
        let index = enumerate_listings(&p).unwrap();
        assert_eq!(index.main_image("111"), None);
        assert_eq!(index.main_image("222"), None);
    }

    #[test]
    fn test_lazy_thumbnail_does_not_borrow_next_card_image() {
        let p = page(
            r#"
            <div class="grid">
              <a data-listing-id="111" href="/listing/111/a">A</a>
              <div class="v2-listing-card__img"><img data-src="https://i.etsystatic.com/111.jpg"></div>
              <a data-listing-id="222" href="/listing/222/b">B</a>
              <div class="v2-listing-card__img"><img src="https://i.etsystatic.com/222.jpg"></div>
            </div>"#,
        );
        let index = enumerate_listings(&p).unwrap();
        assert_eq!(index.ids(), ["111", "222"]);
        assert_eq!(index.main_image("111"), None);
    }
}
