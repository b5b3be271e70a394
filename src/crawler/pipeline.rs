//! Asset download pipeline
//!
//! Best-effort retrieval of the asset behind one item:
//! 1. Skip the work if a valid file for the item already exists
//! 2. Open the item page and resolve the viewer link
//! 3. Open the viewer and resolve the asset URL (embedded frame first, then a
//!    pattern scan of the raw markup)
//! 4. Fetch with the session's cookies and the viewer as referer
//! 5. Accept the bytes only if they look like a real asset, then store them
//!
//! Every failure is logged and reported as `false`; nothing here ends a query.

use crate::config::{Config, DownloadConfig};
use crate::crawler::fetcher::{AssetFetcher, AssetRequest, FetchedAsset};
use crate::crawler::strategy::{AttributeStrategy, PatternStrategy, StrategyChain};
use crate::renderer::Session;
use crate::storage::{persistence_error, safe_file_stem, write_atomic, ItemRecord};
use crate::{HarvestError, Result};
use std::path::{Path, PathBuf};

/// File name for an item's asset: `<external id>_<title prefix>.<extension>`, sanitized
///
/// Two items whose id and title prefix sanitize to the same stem share a file;
/// the second one is treated as already downloaded.
pub fn asset_filename(external_id: &str, title: &str, config: &DownloadConfig) -> String {
    let title: String = title.chars().take(config.title_chars).collect();
    let stem = safe_file_stem(&format!("{}_{}", external_id, title), config.filename_chars);
    format!("{}.{}", stem, config.extension)
}

/// True if `path` holds a file larger than the minimum asset size
fn is_valid_existing(path: &Path, min_bytes: u64) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > min_bytes)
        .unwrap_or(false)
}

pub struct DownloadPipeline {
    config: DownloadConfig,
    viewer: StrategyChain,
    asset: StrategyChain,
    fetcher: Box<dyn AssetFetcher>,
}

impl DownloadPipeline {
    pub fn new(config: &Config, fetcher: impl AssetFetcher + 'static) -> Result<Self> {
        let selectors = &config.selectors;
        let asset = StrategyChain::new("asset url")
            .with(
                AttributeStrategy::new(selectors.asset_frame.as_str(), "src")
                    .containing(selectors.asset_url_marker.as_str()),
            )
            .with(PatternStrategy::new(&selectors.asset_url_pattern)?);

        Ok(Self {
            config: config.downloads.clone(),
            viewer: StrategyChain::attributes("viewer link", &selectors.viewer_link, "href"),
            asset,
            fetcher: Box::new(fetcher),
        })
    }

    pub fn asset_path(&self, item: &ItemRecord) -> PathBuf {
        Path::new(&self.config.asset_dir).join(asset_filename(
            &item.external_id,
            &item.title,
            &self.config,
        ))
    }

    /// Retrieves the asset for `item`, marking it downloaded on success
    pub async fn fetch_asset(&self, session: &mut Session, item: &mut ItemRecord) -> bool {
        let path = self.asset_path(item);

        if is_valid_existing(&path, self.config.min_asset_bytes) {
            tracing::info!("Already have {}", path.display());
            item.mark_downloaded(&path);
            return true;
        }

        match self.download(session, item, &path).await {
            Ok(size) => {
                tracing::info!("Saved {} ({} bytes)", path.display(), size);
                item.mark_downloaded(&path);
                true
            }
            Err(e @ HarvestError::Persistence { .. }) => {
                tracing::error!("{}", e);
                false
            }
            Err(e) => {
                tracing::warn!("No asset for '{}': {}", item.title, e);
                false
            }
        }
    }

    async fn download(&self, session: &mut Session, item: &ItemRecord, path: &Path) -> Result<usize> {
        if !item.source_link.starts_with("http") {
            return Err(HarvestError::ElementNotFound {
                what: "item link".to_string(),
            });
        }

        session.navigate(&item.source_link).await?;
        let viewer_url = self
            .viewer
            .resolve(session, None)
            .await
            .ok_or_else(|| HarvestError::ElementNotFound {
                what: "viewer link".to_string(),
            })?;
        tracing::debug!("Viewer: {}", viewer_url);

        session.navigate(&viewer_url).await?;
        let asset_url = self
            .asset
            .resolve(session, None)
            .await
            .ok_or_else(|| HarvestError::ElementNotFound {
                what: "asset url".to_string(),
            })?;
        tracing::debug!("Asset: {}", asset_url);

        let request = AssetRequest {
            url: asset_url,
            referer: Some(viewer_url),
            cookies: session.cookies().await?,
        };
        let fetched = self.fetcher.fetch(&request).await?;
        self.check(&fetched)?;

        write_atomic(path, &fetched.body).map_err(|e| persistence_error(path, e))?;
        Ok(fetched.body.len())
    }

    /// Rejects responses that are not the expected asset type
    fn check(&self, fetched: &FetchedAsset) -> Result<()> {
        if !fetched.is_success() {
            return Err(HarvestError::AssetRejected {
                reason: format!("HTTP {}", fetched.status),
            });
        }

        if (fetched.body.len() as u64) <= self.config.min_asset_bytes {
            return Err(HarvestError::AssetRejected {
                reason: format!("only {} bytes", fetched.body.len()),
            });
        }

        if !fetched.body.starts_with(self.config.signature.as_bytes()) {
            return Err(HarvestError::AssetRejected {
                reason: format!(
                    "body is not a {} file, likely an access page",
                    self.config.extension
                ),
            });
        }

        Ok(())
    }
}
