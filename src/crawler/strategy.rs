//! Ordered extraction strategies
//!
//! Every value the harvester reads from a page (an item field, the viewer
//! link, the asset URL) comes from a `StrategyChain`: a priority list of
//! strategies tried in order until one yields a non-empty value. A strategy
//! that errors counts as a miss; it never aborts the chain.

use crate::renderer::{Element, Session};
use crate::storage::NOT_AVAILABLE;
use crate::Result;
use async_trait::async_trait;
use regex::Regex;

/// One way of reading a value from the current page or an element
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short description used in debug logs
    fn describe(&self) -> String;

    /// Returns the value, `None` for a miss, or an error if the lookup failed
    async fn extract(&self, session: &mut Session, scope: Option<&Element>)
        -> Result<Option<String>>;
}

/// Text of the first element matching a selector
pub struct TextStrategy {
    selector: String,
}

impl TextStrategy {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }
}

#[async_trait]
impl ExtractionStrategy for TextStrategy {
    fn describe(&self) -> String {
        format!("text of '{}'", self.selector)
    }

    async fn extract(
        &self,
        session: &mut Session,
        scope: Option<&Element>,
    ) -> Result<Option<String>> {
        let found = session.find_candidates(scope, &self.selector).await?;
        Ok(found.into_iter().next().map(|e| e.text))
    }
}

/// An attribute of the first matching element that has it
///
/// With `contains` set, only values containing that marker qualify.
pub struct AttributeStrategy {
    selector: String,
    attribute: String,
    contains: Option<String>,
}

impl AttributeStrategy {
    pub fn new(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attribute: attribute.into(),
            contains: None,
        }
    }

    pub fn containing(mut self, marker: impl Into<String>) -> Self {
        self.contains = Some(marker.into());
        self
    }
}

#[async_trait]
impl ExtractionStrategy for AttributeStrategy {
    fn describe(&self) -> String {
        format!("'{}' of '{}'", self.attribute, self.selector)
    }

    async fn extract(
        &self,
        session: &mut Session,
        scope: Option<&Element>,
    ) -> Result<Option<String>> {
        let found = session.find_candidates(scope, &self.selector).await?;
        Ok(found.iter().find_map(|element| {
            let value = element.attr(&self.attribute)?.trim();
            let wanted = self
                .contains
                .as_deref()
                .map_or(true, |marker| value.contains(marker));
            (!value.is_empty() && wanted).then(|| value.to_string())
        }))
    }
}

/// First regex match in the raw markup of the scope (or the whole page)
pub struct PatternStrategy {
    pattern: Regex,
}

impl PatternStrategy {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

#[async_trait]
impl ExtractionStrategy for PatternStrategy {
    fn describe(&self) -> String {
        format!("pattern /{}/", self.pattern.as_str())
    }

    async fn extract(
        &self,
        session: &mut Session,
        scope: Option<&Element>,
    ) -> Result<Option<String>> {
        let markup = match scope {
            Some(element) => element.html.clone(),
            None => session.page_content().await?,
        };
        Ok(self
            .pattern
            .find(&markup)
            .map(|m| m.as_str().replace("&amp;", "&")))
    }
}

/// A named priority list of strategies
pub struct StrategyChain {
    name: String,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl StrategyChain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
        }
    }

    /// Appends a strategy at the lowest priority
    pub fn with(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// A chain of `TextStrategy`, one per selector
    pub fn texts(name: impl Into<String>, selectors: &[String]) -> Self {
        selectors
            .iter()
            .fold(Self::new(name), |chain, s| chain.with(TextStrategy::new(s.as_str())))
    }

    /// A chain of `AttributeStrategy` reading `attribute`, one per selector
    pub fn attributes(name: impl Into<String>, selectors: &[String], attribute: &str) -> Self {
        selectors.iter().fold(Self::new(name), |chain, s| {
            chain.with(AttributeStrategy::new(s.as_str(), attribute))
        })
    }

    /// Returns the first non-empty value any strategy yields, trimmed
    pub async fn resolve(&self, session: &mut Session, scope: Option<&Element>) -> Option<String> {
        for strategy in &self.strategies {
            match strategy.extract(session, scope).await {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    return Some(value.trim().to_string());
                }
                Ok(_) => {
                    tracing::trace!("{}: no value from {}", self.name, strategy.describe());
                }
                Err(e) => {
                    tracing::debug!("{}: {} failed: {}", self.name, strategy.describe(), e);
                }
            }
        }
        None
    }

    /// Like `resolve`, falling back to the "not available" sentinel
    pub async fn resolve_or_na(&self, session: &mut Session, scope: Option<&Element>) -> String {
        self.resolve(session, scope)
            .await
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}
