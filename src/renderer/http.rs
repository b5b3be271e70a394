//! Static-markup page renderer over reqwest
//!
//! Loads pages with a plain HTTP client that keeps a cookie jar, and answers
//! element queries from the loaded markup. Pages that only render their
//! results through scripts need a browser-backed `PageRenderer` instead.

use crate::renderer::parser::{select_in_document, select_in_fragment};
use crate::renderer::{Cookie, Element, PageRenderer};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

struct LoadedPage {
    url: Url,
    html: String,
}

/// `PageRenderer` backed by reqwest and scraper
pub struct HttpRenderer {
    client: Client,
    jar: Arc<Jar>,
    current: Option<LoadedPage>,
}

impl HttpRenderer {
    /// Builds a renderer whose page loads are bounded by `page_load_timeout`
    pub fn new(user_agent: &str, page_load_timeout: Duration) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(page_load_timeout)
            .connect_timeout(Duration::from_secs(10))
            .cookie_provider(jar.clone())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| HarvestError::Renderer(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            jar,
            current: None,
        })
    }

    fn page(&self) -> Result<&LoadedPage> {
        self.current
            .as_ref()
            .ok_or_else(|| HarvestError::Renderer("no page loaded".to_string()))
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        tracing::debug!("Loading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Renderer(format!(
                "HTTP {} loading {}",
                status.as_u16(),
                url
            )));
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| HarvestError::from_reqwest(url, e))?;

        self.current = Some(LoadedPage {
            url: final_url,
            html,
        });
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.current.as_ref().map(|p| p.url.to_string())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<Element> {
        // Static markup never changes after load, so one look is the whole wait
        let page = self.page()?;
        select_in_document(&page.html, selector, Some(&page.url))?
            .into_iter()
            .next()
            .ok_or_else(|| HarvestError::Timeout {
                operation: format!("waiting {:?} for '{}'", timeout, selector),
            })
    }

    async fn find_candidates(
        &mut self,
        scope: Option<&Element>,
        selector: &str,
    ) -> Result<Vec<Element>> {
        let page = self.page()?;
        match scope {
            Some(element) => select_in_fragment(&element.html, selector, Some(&page.url)),
            None => select_in_document(&page.html, selector, Some(&page.url)),
        }
    }

    async fn click(&mut self, element: &Element) -> Result<()> {
        let target = element
            .attr("href")
            .filter(|href| href.starts_with("http://") || href.starts_with("https://"))
            .map(str::to_string)
            .ok_or_else(|| {
                HarvestError::Renderer(format!("<{}> has no followable link", element.tag))
            })?;
        self.navigate(&target).await
    }

    async fn page_height(&self) -> Result<u64> {
        Ok(self.page()?.html.len() as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<u64> {
        self.page_height().await
    }

    async fn scroll_to_top(&mut self) -> Result<()> {
        self.page().map(|_| ())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        let page = self.page()?;
        let header = match self.jar.cookies(&page.url) {
            Some(header) => header,
            None => return Ok(Vec::new()),
        };
        let header = header
            .to_str()
            .map_err(|e| HarvestError::Renderer(format!("unreadable cookie header: {}", e)))?;
        Ok(parse_cookie_header(header))
    }

    async fn page_content(&self) -> Result<String> {
        Ok(self.page()?.html.clone())
    }
}

/// Splits a `Cookie:` header value into name/value pairs
fn parse_cookie_header(header: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some(Cookie {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}
