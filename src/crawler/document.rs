//! Structural queries over fetched documents
//!
//! The crawl loop only ever asks a page three questions: which links does it
//! carry, what text sits in a given field, and what identifier does it
//! declare. [`DocumentView`] names those questions; [`HtmlDocument`] answers
//! them with `scraper`.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Read-only structural view of a parsed document
pub trait DocumentView {
    /// Every followable link, resolved to an absolute http(s) URL
    fn find_links(&self) -> Vec<String>;

    /// Text of the first element matching `tag` + `attribute_selector`
    ///
    /// With `Some(inner_tag)` the trimmed texts of its `inner_tag`
    /// descendants are joined with single spaces; with `None` the element's
    /// own trimmed text is returned.
    fn extract_target_field(
        &self,
        tag: &str,
        attribute_selector: &str,
        inner_tag: Option<&str>,
    ) -> Option<String>;

    /// Value of `attribute` on the first element matching `selector`
    fn extract_identifier(&self, selector: &str, attribute: &str) -> Option<String>;
}

/// An HTML page parsed with `scraper`
pub struct HtmlDocument {
    html: Html,
    base_url: Url,
}

impl HtmlDocument {
    /// Parses `body`; relative links resolve against `url`
    pub fn parse(body: &str, url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            html: Html::parse_document(body),
            base_url: Url::parse(url)?,
        })
    }

    fn first_match(&self, selector: &str) -> Option<ElementRef<'_>> {
        let selector = match Selector::parse(selector) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::debug!("Unusable selector '{}': {:?}", selector, e);
                return None;
            }
        };
        self.html.select(&selector).next()
    }
}

impl DocumentView for HtmlDocument {
    fn find_links(&self) -> Vec<String> {
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        self.html
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(href, &self.base_url))
            .collect()
    }

    fn extract_target_field(
        &self,
        tag: &str,
        attribute_selector: &str,
        inner_tag: Option<&str>,
    ) -> Option<String> {
        let element = self.first_match(&format!("{}{}", tag, attribute_selector))?;

        match inner_tag {
            Some(inner) => {
                let inner = Selector::parse(inner).ok()?;
                let parts: Vec<String> = element
                    .select(&inner)
                    .map(|child| child.text().collect::<String>().trim().to_string())
                    .filter(|text| !text.is_empty())
                    .collect();
                Some(parts.join(" "))
            }
            None => Some(element.text().collect::<String>().trim().to_string()),
        }
    }

    fn extract_identifier(&self, selector: &str, attribute: &str) -> Option<String> {
        self.first_match(selector)?
            .value()
            .attr(attribute)
            .map(str::to_string)
    }
}

/// Resolves an href against the page URL
///
/// Returns None for `javascript:`, `mailto:`, `tel:` and `data:` links,
/// same-page anchors, and anything that is not http(s) after resolution.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

/// Reduces extracted text to lowercase tokens joined by single spaces
///
/// Periods, commas and parentheses are removed before splitting.
pub fn normalize_text(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '(' | ')'))
        .collect();

    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
