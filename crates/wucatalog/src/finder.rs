use futures::stream::{self, StreamExt};

use crate::catalog::types::UpdateSummary;
use crate::catalog::{CatalogSearch, CatalogUpdate, SearchOptions};
use crate::download_center::{fetch_download_center_update, fetch_patch_links};
use crate::fetch::{FetchConfig, PageFetcher, ScraperError};
use crate::record::{UpdateRecord, filter_superseded};

/// Result of one lookup stage. `Empty` means the site answered and had
/// nothing; `Failed` means a request or a page did not go as expected.
#[derive(Debug)]
pub enum Outcome<T> {
    Found(T),
    Empty,
    Failed(ScraperError),
}

impl<T> Outcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(value) => Some(value),
            _ => None,
        }
    }

    fn log(self, stage: &str, subject: &str) -> Self {
        match &self {
            Outcome::Found(_) => {}
            Outcome::Empty => log::info!("{}: nothing found for '{}'", stage, subject),
            Outcome::Failed(e) => {
                log::warn!("{}: failed for '{}' [{}]: {}", stage, subject, e.kind(), e)
            }
        }
        self
    }
}

impl<T> Outcome<Vec<T>> {
    fn from_items(result: Result<Vec<T>, ScraperError>) -> Self {
        match result {
            Ok(items) if items.is_empty() => Outcome::Empty,
            Ok(items) => Outcome::Found(items),
            Err(e) => Outcome::Failed(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSource {
    Catalog,
    DownloadCenter,
}

#[derive(Debug)]
pub struct PatchReport {
    pub source: PatchSource,
    pub updates: Vec<UpdateRecord>,
}

#[derive(Debug, Clone)]
pub struct FinderConfig {
    pub search: SearchOptions,
    /// How many updates are resolved at once. Output order does not depend
    /// on it.
    pub concurrency: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            search: SearchOptions::default(),
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatchFinder {
    fetcher: PageFetcher,
    config: FinderConfig,
}

impl PatchFinder {
    pub fn new(fetch: FetchConfig, config: FinderConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            fetcher: PageFetcher::new(fetch)?,
            config,
        })
    }

    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    async fn resolve_record(&self, summary: UpdateSummary) -> Result<UpdateRecord, ScraperError> {
        let mut update = CatalogUpdate::new(summary);
        update.resolve(&self.fetcher).await?;

        match (update.detail(), update.download_links()) {
            (Some(detail), Some(links)) => {
                Ok(UpdateRecord::from_catalog(update.summary(), detail, links))
            }
            _ => Err(ScraperError::NotFound(format!(
                "resolved data for '{}'",
                update.summary().title
            ))),
        }
    }

    /// Walks the catalog for `search` and resolves every row. One update
    /// failing to resolve fails the whole stage.
    pub async fn find_catalog_updates(&self, search: &str) -> Outcome<Vec<UpdateRecord>> {
        let walk = CatalogSearch::new(search, self.config.search.clone());

        let summaries = match walk.collect_updates(&self.fetcher).await {
            Ok(summaries) if summaries.is_empty() => {
                return Outcome::<Vec<UpdateRecord>>::Empty.log("catalog", search);
            }
            Ok(summaries) => summaries,
            // The catalog drops the results table when a query has no hits.
            Err(ScraperError::NoResults(what)) => {
                log::debug!("Catalog has no result table for {}", what);
                return Outcome::<Vec<UpdateRecord>>::Empty.log("catalog", search);
            }
            Err(e) => return Outcome::<Vec<UpdateRecord>>::Failed(e).log("catalog", search),
        };

        let records: Result<Vec<UpdateRecord>, ScraperError> = stream::iter(summaries)
            .map(|summary| self.resolve_record(summary))
            .buffered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect();

        Outcome::from_items(records.map(filter_superseded)).log("catalog", search)
    }

    pub async fn find_patch_links(&self, kb: &str) -> Outcome<Vec<String>> {
        Outcome::from_items(fetch_patch_links(&self.fetcher, kb).await).log("support article", kb)
    }

    pub async fn find_download_center_updates(
        &self,
        url: &str,
        kb: &str,
    ) -> Outcome<Vec<UpdateRecord>> {
        let result = match fetch_download_center_update(&self.fetcher, url).await {
            Ok(Some(record)) => UpdateRecord::from_download_center(&record, kb)
                .map(|record| vec![record])
                .map_err(ScraperError::from),
            Ok(None) => Ok(Vec::new()),
            Err(e) => Err(e),
        };

        Outcome::from_items(result).log("download center", url)
    }

    /// Catalog first. The download center is consulted exactly once, and
    /// only when the catalog produced nothing. `Empty` when neither site
    /// knows the update.
    pub async fn find_patches(&self, search: &str) -> Outcome<PatchReport> {
        if let Outcome::Found(updates) = self.find_catalog_updates(search).await {
            return Outcome::Found(PatchReport {
                source: PatchSource::Catalog,
                updates,
            });
        }

        log::info!("Falling back to the download center for '{}'", search);
        let links = match self.find_patch_links(search).await {
            Outcome::Found(links) => links,
            Outcome::Empty => return Outcome::Empty,
            Outcome::Failed(e) => return Outcome::Failed(e),
        };

        let pages: Vec<Outcome<Vec<UpdateRecord>>> = stream::iter(links.iter())
            .map(|url| self.find_download_center_updates(url, search))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let updates: Vec<UpdateRecord> = pages
            .into_iter()
            .filter_map(Outcome::found)
            .flatten()
            .collect();

        log::info!(
            "Found {} update(s) across {} download center page(s)",
            updates.len(),
            links.len()
        );
        Outcome::Found(PatchReport {
            source: PatchSource::DownloadCenter,
            updates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_items() {
        assert!(matches!(Outcome::from_items(Ok(Vec::<u8>::new())), Outcome::Empty));
        assert!(Outcome::from_items(Ok(vec![1])).is_found());
        assert!(matches!(
            Outcome::<Vec<u8>>::from_items(Err(ScraperError::NotFound("x".into()))),
            Outcome::Failed(ScraperError::NotFound(_))
        ));
    }

    #[test]
    fn test_default_config_resolves_one_at_a_time() {
        let config = FinderConfig::default();
        assert_eq!(config.concurrency, 1);
        assert!(config.search.all_pages);
    }
}
