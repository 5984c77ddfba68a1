use super::parser::{parse_download_links, parse_update_detail};
use super::types::{DownloadLink, UpdateDetail, UpdateSummary};
use crate::fetch::{PageFetcher, ScraperError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Unresolved,
    DetailFetched,
    DownloadsFetched,
}

/// A search result together with whatever has been fetched about it so far.
/// Each fetch runs at most once; later calls return the cached value.
#[derive(Debug, Clone)]
pub struct CatalogUpdate {
    summary: UpdateSummary,
    detail: Option<UpdateDetail>,
    downloads: Option<Vec<DownloadLink>>,
}

impl CatalogUpdate {
    pub fn new(summary: UpdateSummary) -> Self {
        Self {
            summary,
            detail: None,
            downloads: None,
        }
    }

    pub fn summary(&self) -> &UpdateSummary {
        &self.summary
    }

    pub fn detail(&self) -> Option<&UpdateDetail> {
        self.detail.as_ref()
    }

    pub fn download_links(&self) -> Option<&[DownloadLink]> {
        self.downloads.as_deref()
    }

    pub fn state(&self) -> ResolveState {
        match (&self.detail, &self.downloads) {
            (_, Some(_)) => ResolveState::DownloadsFetched,
            (Some(_), None) => ResolveState::DetailFetched,
            (None, None) => ResolveState::Unresolved,
        }
    }

    pub async fn fetch_details(
        &mut self,
        fetcher: &PageFetcher,
    ) -> Result<&UpdateDetail, ScraperError> {
        let detail = match self.detail.take() {
            Some(detail) => detail,
            None => {
                let url = format!(
                    "{}/ScopedViewInline.aspx?updateid={}",
                    fetcher.catalog_url(),
                    self.summary.id
                );
                log::info!("Fetching details for '{}'", self.summary.title);
                let html = fetcher.get_html(&url).await?;
                parse_update_detail(&html)
                    .inspect_err(|e| log::error!("Bad detail page for {}: {e}", self.summary.id))?
            }
        };

        Ok(&*self.detail.insert(detail))
    }

    pub async fn fetch_download_links(
        &mut self,
        fetcher: &PageFetcher,
    ) -> Result<&[DownloadLink], ScraperError> {
        let links = match self.downloads.take() {
            Some(links) => links,
            None => {
                let update_ids = serde_json::json!({
                    "size": 0,
                    "updateID": self.summary.id.to_string(),
                    "uidInfo": self.summary.id.to_string(),
                });
                let form = [("updateIDs".to_string(), format!("[{}]", update_ids))];
                let url = format!("{}/DownloadDialog.aspx", fetcher.catalog_url());

                log::info!("Fetching download links for '{}'", self.summary.title);
                let body = fetcher.post_form(&url, &form).await?;
                let links = parse_download_links(body.trim());
                if links.is_empty() {
                    return Err(ScraperError::NotFound(format!(
                        "download links for '{}'",
                        self.summary.title
                    )));
                }
                links
            }
        };

        Ok(self.downloads.insert(links).as_slice())
    }

    /// Fetches the detail page and the download dialog, in that order.
    pub async fn resolve(&mut self, fetcher: &PageFetcher) -> Result<(), ScraperError> {
        self.fetch_details(fetcher).await?;
        self.fetch_download_links(fetcher).await?;
        Ok(())
    }
}
