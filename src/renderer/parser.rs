//! HTML snapshotting for renderers that work on static markup
//!
//! Turns matched elements into `Element` snapshots:
//! - Text with whitespace collapsed
//! - `href`/`src` resolved against the page URL
//! - Enabled/displayed flags derived from the usual attributes

use crate::renderer::Element;
use crate::{HarvestError, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Finds elements matching `selector` in a full document
pub fn select_in_document(
    html: &str,
    selector: &str,
    base_url: Option<&Url>,
) -> Result<Vec<Element>> {
    let document = Html::parse_document(html);
    select(&document, selector, base_url)
}

/// Finds elements matching `selector` inside a fragment (an element's outer markup)
pub fn select_in_fragment(
    html: &str,
    selector: &str,
    base_url: Option<&Url>,
) -> Result<Vec<Element>> {
    let fragment = Html::parse_fragment(html);
    select(&fragment, selector, base_url)
}

fn select(document: &Html, selector: &str, base_url: Option<&Url>) -> Result<Vec<Element>> {
    let parsed = Selector::parse(selector)
        .map_err(|e| HarvestError::Renderer(format!("invalid selector '{}': {:?}", selector, e)))?;

    Ok(document
        .select(&parsed)
        .map(|element| snapshot(element, base_url))
        .collect())
}

fn snapshot(element: ElementRef<'_>, base_url: Option<&Url>) -> Element {
    let value = element.value();

    let attributes = value
        .attrs()
        .map(|(name, raw)| {
            let resolved = match (name, base_url) {
                ("href" | "src", Some(base)) => resolve_link(raw, base),
                _ => None,
            };
            (name.to_string(), resolved.unwrap_or_else(|| raw.to_string()))
        })
        .collect();

    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    let enabled = value.attr("disabled").is_none() && value.attr("aria-disabled") != Some("true");

    let displayed = value.attr("hidden").is_none()
        && !value
            .attr("style")
            .map(|s| s.replace(' ', "").contains("display:none"))
            .unwrap_or(false);

    Element {
        tag: value.name().to_string(),
        text,
        attributes,
        html: element.html(),
        enabled,
        displayed,
    }
}

/// Resolves a link attribute to an absolute http(s) URL
///
/// Returns None for empty values, fragment-only anchors, and special schemes
/// (`javascript:`, `mailto:`, `tel:`, `data:`), which are kept verbatim.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
