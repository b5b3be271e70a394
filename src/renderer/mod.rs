//! Page renderer boundary
//!
//! The orchestrator never touches a DOM directly. Everything it needs from a
//! rendered page goes through the `PageRenderer` trait: navigation, waiting
//! for an element, finding candidate elements by CSS selector, clicking,
//! scrolling, and reading cookies or raw markup.
//!
//! Elements cross the boundary as `Element` snapshots, so strategies can
//! inspect text and attributes without holding renderer state.

mod http;
pub mod parser;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpRenderer;

use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// Snapshot of a rendered element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Lower-case tag name
    pub tag: String,

    /// Visible text with whitespace collapsed
    pub text: String,

    /// Attributes; `href` and `src` are resolved to absolute URLs when possible
    pub attributes: BTreeMap<String, String>,

    /// Outer markup, used for lookups scoped to this element
    pub html: String,

    pub enabled: bool,
    pub displayed: bool,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A cookie visible to the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Capabilities the orchestrator needs from a page renderer
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Loads `url` as the current page
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL of the current page, if one is loaded
    fn current_url(&self) -> Option<String>;

    /// Waits up to `timeout` for an element matching `selector`
    ///
    /// Expiry is reported as `HarvestError::Timeout`.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<Element>;

    /// Returns every element matching `selector`, within `scope` if given
    async fn find_candidates(
        &mut self,
        scope: Option<&Element>,
        selector: &str,
    ) -> Result<Vec<Element>>;

    /// Activates the element (follows its link, presses the button)
    async fn click(&mut self, element: &Element) -> Result<()>;

    /// Current scroll height of the page
    async fn page_height(&self) -> Result<u64>;

    /// Scrolls to the bottom and reports the resulting page height
    async fn scroll_to_bottom(&mut self) -> Result<u64>;

    async fn scroll_to_top(&mut self) -> Result<()>;

    /// Cookies the session holds for the current page
    async fn cookies(&self) -> Result<Vec<Cookie>>;

    /// Raw markup of the current page
    async fn page_content(&self) -> Result<String>;

    /// Releases the underlying browser or client
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The single session a run owns
///
/// Threaded by `&mut` reference through pagination and the download pipeline,
/// so there is never more than one user of the renderer at a time.
pub struct Session {
    renderer: Box<dyn PageRenderer>,
}

impl Session {
    pub fn new(renderer: impl PageRenderer + 'static) -> Self {
        Self {
            renderer: Box::new(renderer),
        }
    }

    /// First enabled and displayed element across `selectors`, in priority order
    ///
    /// A selector that fails to evaluate counts as matching nothing.
    pub async fn first_actionable(
        &mut self,
        scope: Option<&Element>,
        selectors: &[String],
    ) -> Option<Element> {
        for selector in selectors {
            match self.renderer.find_candidates(scope, selector).await {
                Ok(found) => {
                    if let Some(element) = found.into_iter().find(|e| e.enabled && e.displayed) {
                        return Some(element);
                    }
                }
                Err(e) => tracing::debug!("Lookup of '{}' failed: {}", selector, e),
            }
        }
        None
    }
}

impl Deref for Session {
    type Target = dyn PageRenderer;

    fn deref(&self) -> &Self::Target {
        self.renderer.as_ref()
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.renderer.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedRenderer;
    use super::*;

    #[test]
    fn test_element_attr() {
        let mut element = Element::default();
        element
            .attributes
            .insert("href".to_string(), "https://example.org/a".to_string());

        assert_eq!(element.attr("href"), Some("https://example.org/a"));
        assert_eq!(element.attr("src"), None);
    }

    #[tokio::test]
    async fn test_first_actionable_skips_disabled_and_hidden() {
        let renderer = ScriptedRenderer::new().with_page(
            "https://example.org/",
            r#"<html><body>
                <button aria-label="Next page" disabled>next</button>
                <a class="next-page" style="display: none" href="/hidden">next</a>
                <a class="next-page" href="/2">next</a>
            </body></html>"#,
        );
        let mut session = Session::new(renderer);
        session.navigate("https://example.org/").await.unwrap();

        let selectors = vec![
            "button[aria-label='Next page']".to_string(),
            "a.next-page".to_string(),
        ];
        let found = session.first_actionable(None, &selectors).await.unwrap();

        assert_eq!(found.attr("href"), Some("https://example.org/2"));
    }

    #[tokio::test]
    async fn test_first_actionable_none_when_nothing_matches() {
        let renderer =
            ScriptedRenderer::new().with_page("https://example.org/", "<html><body></body></html>");
        let mut session = Session::new(renderer);
        session.navigate("https://example.org/").await.unwrap();

        let found = session
            .first_actionable(None, &["a.next-page".to_string()])
            .await;
        assert!(found.is_none());
    }
}
