//! Scripted renderer for unit tests
//!
//! Serves in-memory HTML pages through the same snapshotting parser the
//! static renderer uses, and records what the code under test asked for.

use crate::renderer::parser::{select_in_document, select_in_fragment};
use crate::renderer::{Cookie, Element, PageRenderer};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// What the renderer was asked to do
#[derive(Debug, Default)]
pub struct ScriptLog {
    pub navigations: Vec<String>,
    pub clicks: usize,
    pub scrolls: usize,
}

pub struct ScriptedRenderer {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    current: Option<(String, String)>,
    cookies: Vec<Cookie>,
    hang_on: Option<(String, CancellationToken)>,
    growing: bool,
    log: Arc<Mutex<ScriptLog>>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            redirects: HashMap::new(),
            current: None,
            cookies: Vec::new(),
            hang_on: None,
            growing: false,
            log: Arc::new(Mutex::new(ScriptLog::default())),
        }
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Navigating to `from` lands on the page registered for `to`
    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(Cookie {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Navigating to a URL containing `fragment` cancels `token` and never returns
    pub fn hang_on(mut self, fragment: &str, token: CancellationToken) -> Self {
        self.hang_on = Some((fragment.to_string(), token));
        self
    }

    /// Every scroll to the bottom makes the page taller, as endless lazy loading would
    pub fn growing(mut self) -> Self {
        self.growing = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<ScriptLog>> {
        self.log.clone()
    }

    fn page(&self) -> Result<&(String, String)> {
        self.current
            .as_ref()
            .ok_or_else(|| HarvestError::Renderer("no page loaded".to_string()))
    }

    fn base(&self) -> Option<Url> {
        self.current.as_ref().and_then(|(url, _)| Url::parse(url).ok())
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.lock().unwrap().navigations.push(url.to_string());

        if let Some((fragment, token)) = &self.hang_on {
            if url.contains(fragment.as_str()) {
                token.cancel();
                std::future::pending::<()>().await;
            }
        }

        let landed = self.redirects.get(url).map_or(url, String::as_str).to_string();
        let html = self
            .pages
            .get(&landed)
            .cloned()
            .ok_or_else(|| HarvestError::Renderer(format!("HTTP 404 loading {}", url)))?;
        self.current = Some((landed, html));
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.current.as_ref().map(|(url, _)| url.clone())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<Element> {
        let base = self.base();
        let (_, html) = self.page()?;
        select_in_document(html, selector, base.as_ref())?
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
        let base = self.base();
        let (_, html) = self.page()?;
        match scope {
            Some(element) => select_in_fragment(&element.html, selector, base.as_ref()),
            None => select_in_document(html, selector, base.as_ref()),
        }
    }

    async fn click(&mut self, element: &Element) -> Result<()> {
        self.log.lock().unwrap().clicks += 1;
        let target = element
            .attr("href")
            .map(str::to_string)
            .ok_or_else(|| HarvestError::Renderer("nothing to click".to_string()))?;
        self.navigate(&target).await
    }

    async fn page_height(&self) -> Result<u64> {
        let base = self.page()?.1.len() as u64;
        if self.growing {
            Ok(base + 100 * self.log.lock().unwrap().scrolls as u64)
        } else {
            Ok(base)
        }
    }

    async fn scroll_to_bottom(&mut self) -> Result<u64> {
        self.log.lock().unwrap().scrolls += 1;
        self.page_height().await
    }

    async fn scroll_to_top(&mut self) -> Result<()> {
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self.cookies.clone())
    }

    async fn page_content(&self) -> Result<String> {
        Ok(self.page()?.1.clone())
    }
}
