//! Parsed page snapshot

use scraper::{ElementRef, Html};
use url::Url;

const MARKETPLACE_HOST: &str = "www.etsy.com";

/// What kind of marketplace page a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Listing,
    Results,
    Unsupported,
}

impl PageKind {
    pub fn detect(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default();
        if url.scheme() == "https" && host == MARKETPLACE_HOST && url.path().starts_with("/listing/")
        {
            PageKind::Listing
        } else if host == "etsy.com" || host.ends_with(".etsy.com") {
            PageKind::Results
        } else {
            PageKind::Unsupported
        }
    }
}

/// A rendered document together with the address it was loaded from.
pub struct Page {
    document: Html,
    url: Option<Url>,
}

impl Page {
    /// Parse `html`. An unparseable `url` is dropped with a warning.
    pub fn parse(html: &str, url: Option<&str>) -> Self {
        let url = url.and_then(|raw| match Url::parse(raw) {
            Ok(u) => Some(u),
            Err(e) => {
                tracing::warn!("ignoring invalid page URL '{}': {}", raw, e);
                None
            }
        });
        Self {
            document: Html::parse_document(html),
            url,
        }
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// `None` when the page address is unknown.
    pub fn kind(&self) -> Option<PageKind> {
        self.url.as_ref().map(PageKind::detect)
    }

    /// True when the document has no rendered content at all.
    pub fn is_blank(&self) -> bool {
        !self
            .document
            .root_element()
            .text()
            .any(|t| !t.trim().is_empty())
            && self
                .document
                .root_element()
                .descendants()
                .filter_map(ElementRef::wrap)
                .all(|el| matches!(el.value().name(), "html" | "head" | "body"))
    }

    /// Resolve an attribute value the way the browser's `.href`/`.src` would.
    pub fn resolve(&self, href: &str) -> String {
        let href = href.trim();
        match &self.url {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}

/// Trimmed text content of an element.
pub(crate) fn text_of(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Strip any query string from a URL.
pub(crate) fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_kind_detection() {
        let listing = Url::parse("https://www.etsy.com/listing/123/mug?ref=x").unwrap();
        assert_eq!(PageKind::detect(&listing), PageKind::Listing);

        let search = Url::parse("https://www.etsy.com/search?q=mug").unwrap();
        assert_eq!(PageKind::detect(&search), PageKind::Results);

        let other = Url::parse("https://example.com/listing/123").unwrap();
        assert_eq!(PageKind::detect(&other), PageKind::Unsupported);
    }

    #[test]
    fn test_resolve_relative_href() {
        let page = Page::parse("<html></html>", Some("https://www.etsy.com/listing/1/a"));
        assert_eq!(
            page.resolve("/shop/Maker?ref=1"),
            "https://www.etsy.com/shop/Maker?ref=1"
        );
        assert_eq!(
            page.resolve("https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );

        let bare = Page::parse("<html></html>", None);
        assert_eq!(bare.resolve("/shop/Maker"), "/shop/Maker");
    }

    #[test]
    fn test_blank_page() {
        assert!(Page::parse("", None).is_blank());
        assert!(!Page::parse("<p>hi</p>", None).is_blank());
        assert!(!Page::parse(r#"<a data-listing-id="1"></a>"#, None).is_blank());
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("https://a.b/c?d=e"), "https://a.b/c");
        assert_eq!(strip_query("https://a.b/c"), "https://a.b/c");
    }
}
