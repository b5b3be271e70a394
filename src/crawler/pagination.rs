//! Result-list pagination
//!
//! Drives one query through its paginated result list: load the query URL,
//! read the reported total, then for each page reveal lazily rendered items,
//! extract every item, and advance until a page comes back empty, no advance
//! control is available, or the page limit is reached.

use crate::config::{Config, PaginationConfig, SelectorConfig, SourceConfig};
use crate::crawler::scheduler::{DelayKind, RateScheduler};
use crate::crawler::strategy::StrategyChain;
use crate::renderer::{Element, Session};
use crate::storage::{ItemRecord, UNKNOWN_TOTAL};
use crate::{HarvestError, Result};
use url::Url;

/// Items and reported total read for a single query
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedQuery {
    /// Total as displayed by the source, or "unknown"
    pub reported_total: String,
    pub items: Vec<ItemRecord>,
    pub pages_read: u32,
}

/// Builds the search URL for `text`: the query parameter first, then the extra parameters
pub fn build_query_url(source: &SourceConfig, text: &str) -> Result<String> {
    let mut url = Url::parse(&source.base_url)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair(&source.query_param, text);
        for (key, value) in &source.extra_params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.into())
}

/// Last non-empty path segment of the item link, or `doc_<index>` if there is none
pub fn external_id(link: &str, index: usize) -> String {
    Url::parse(link)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| format!("doc_{}", index))
}

/// Field extraction chains for one result item
struct ItemFields {
    title: StrategyChain,
    link: StrategyChain,
    authors: StrategyChain,
    publication: StrategyChain,
    year: StrategyChain,
    abstract_text: StrategyChain,
}

impl ItemFields {
    fn from_selectors(selectors: &SelectorConfig) -> Self {
        Self {
            title: StrategyChain::texts("title", &selectors.title),
            link: StrategyChain::attributes("link", &selectors.link, "href"),
            authors: StrategyChain::texts("authors", &selectors.authors),
            publication: StrategyChain::texts("publication", &selectors.publication),
            year: StrategyChain::texts("year", &selectors.year),
            abstract_text: StrategyChain::texts("abstract", &selectors.abstract_text),
        }
    }

    /// Reads every field of `element`; a missing field becomes "N/A"
    async fn extract(&self, session: &mut Session, element: &Element, index: usize) -> ItemRecord {
        let scope = Some(element);
        let source_link = self.link.resolve_or_na(session, scope).await;
        let external_id = external_id(&source_link, index);

        ItemRecord {
            title: self.title.resolve_or_na(session, scope).await,
            authors: self.authors.resolve_or_na(session, scope).await,
            publication_info: self.publication.resolve_or_na(session, scope).await,
            year: self.year.resolve_or_na(session, scope).await,
            abstract_text: self.abstract_text.resolve_or_na(session, scope).await,
            source_link,
            external_id,
            asset_downloaded: false,
            asset_path: None,
        }
    }
}

/// Walks the paginated result list of a query
pub struct PaginationController {
    source: SourceConfig,
    limits: PaginationConfig,
    results_summary: String,
    results_list: String,
    result_item: String,
    next_page: Vec<String>,
    fields: ItemFields,
}

impl PaginationController {
    pub fn new(config: &Config) -> Self {
        let selectors = &config.selectors;
        Self {
            source: config.source.clone(),
            limits: config.pagination.clone(),
            results_summary: selectors.results_summary.clone(),
            results_list: selectors.results_list.clone(),
            result_item: selectors.result_item.clone(),
            next_page: selectors.next_page.clone(),
            fields: ItemFields::from_selectors(selectors),
        }
    }

    pub fn query_url(&self, text: &str) -> Result<String> {
        build_query_url(&self.source, text)
    }

    /// Reads every result page of `query_text`
    ///
    /// Only navigation to the query URL and interruption are errors; anything
    /// that goes wrong on a result page ends pagination with what was read so far.
    pub async fn extract_query(
        &self,
        session: &mut Session,
        scheduler: &mut RateScheduler,
        query_text: &str,
    ) -> Result<ExtractedQuery> {
        let url = self.query_url(query_text)?;
        tracing::debug!("Loading {}", url);
        session.navigate(&url).await?;
        scheduler.delay(DelayKind::Small).await?;

        let reported_total = self.read_reported_total(session).await;
        tracing::info!("Source reports {} results", reported_total);

        let mut items = Vec::new();
        let mut pages_read = 0;

        for page in 1..=self.limits.max_pages {
            let page_items = self.extract_page(session, scheduler, items.len()).await?;
            pages_read = page;

            if page_items.is_empty() {
                tracing::info!("Page {} has no items, stopping", page);
                break;
            }

            tracing::info!("Page {}: {} items", page, page_items.len());
            items.extend(page_items);

            if page == self.limits.max_pages {
                tracing::info!("Reached the {}-page limit", self.limits.max_pages);
                break;
            }

            if !self.advance(session).await {
                tracing::info!("No next-page control after page {}", page);
                break;
            }
            scheduler.delay(DelayKind::Small).await?;
        }

        Ok(ExtractedQuery {
            reported_total,
            items,
            pages_read,
        })
    }

    async fn read_reported_total(&self, session: &mut Session) -> String {
        match session
            .wait_for(&self.results_summary, self.source.summary_wait())
            .await
        {
            Ok(element) if !element.text.is_empty() => element.text,
            Ok(_) => UNKNOWN_TOTAL.to_string(),
            Err(e) => {
                tracing::warn!("Could not read the result total: {}", e);
                UNKNOWN_TOTAL.to_string()
            }
        }
    }

    /// Extracts the items of the current page; `offset` is the count of items read so far
    async fn extract_page(
        &self,
        session: &mut Session,
        scheduler: &mut RateScheduler,
        offset: usize,
    ) -> Result<Vec<ItemRecord>> {
        if let Err(e) = session
            .wait_for(&self.results_list, self.source.results_wait())
            .await
        {
            tracing::warn!("Results list did not appear: {}", e);
            return Ok(Vec::new());
        }

        match self.reveal_lazy_content(session, scheduler).await {
            Err(HarvestError::Interrupted) => return Err(HarvestError::Interrupted),
            Err(e) => tracing::debug!("Scrolling failed: {}", e),
            Ok(()) => {}
        }

        let elements = match session.find_candidates(None, &self.result_item).await {
            Ok(elements) => elements,
            Err(e) => {
                tracing::warn!("Could not list result items: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut items = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            items.push(self.fields.extract(session, element, offset + i + 1).await);
        }
        Ok(items)
    }

    /// Scrolls until the page height stops changing or the attempts run out, then back to the top
    async fn reveal_lazy_content(
        &self,
        session: &mut Session,
        scheduler: &mut RateScheduler,
    ) -> Result<()> {
        let mut last_height = session.page_height().await?;
        for _ in 0..self.limits.scroll_attempts {
            let height = session.scroll_to_bottom().await?;
            scheduler.settle().await?;
            if height == last_height {
                break;
            }
            last_height = height;
        }
        session.scroll_to_top().await
    }

    /// Clicks the first usable next-page control; false means there is no next page
    async fn advance(&self, session: &mut Session) -> bool {
        let Some(control) = session.first_actionable(None, &self.next_page).await else {
            return false;
        };
        match session.click(&control).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Next-page control failed: {}", e);
                false
            }
        }
    }
}
