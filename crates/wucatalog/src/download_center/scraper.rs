use super::parser::{parse_details_page, parse_support_page};
use super::types::DownloadCenterRecord;
use crate::fetch::{PageFetcher, ScraperError};
use crate::utils::normalize_kb;

/// Support article URL for a KB, with or without its `KB` prefix.
pub fn support_article_url(support_url: &str, kb: &str) -> String {
    format!("{}/help/{}", support_url, normalize_kb(kb))
}

/// Download center pages linked from the support article of `kb`. Empty when
/// the support site does not know the KB or links no downloads.
pub async fn fetch_patch_links(
    fetcher: &PageFetcher,
    kb: &str,
) -> Result<Vec<String>, ScraperError> {
    let url = support_article_url(fetcher.support_url(), kb);
    log::info!("Looking up support article {}", url);

    let html = fetcher.get_html(&url).await?;
    let Some(links) = parse_support_page(&html) else {
        log::info!("No canonical support article for '{}'", kb);
        return Ok(Vec::new());
    };

    log::info!("Found patch links using support url: {:?}", links);
    Ok(links)
}

pub async fn fetch_download_center_update(
    fetcher: &PageFetcher,
    url: &str,
) -> Result<Option<DownloadCenterRecord>, ScraperError> {
    url::Url::parse(url).map_err(|e| ScraperError::InvalidUrl(format!("{url}: {e}")))?;

    log::info!("Fetching download center page {}", url);
    let html = fetcher.get_html(url).await?;

    let record = parse_details_page(&html)
        .inspect_err(|e| log::error!("Bad download center page {}: {e}", url))?;
    if record.is_none() {
        log::info!("No download files listed on {}", url);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_article_url() {
        assert_eq!(
            support_article_url("https://support.microsoft.com", "KB5034123"),
            "https://support.microsoft.com/help/5034123"
        );
    }

    #[tokio::test]
    async fn test_relative_download_link_is_rejected() {
        let fetcher = PageFetcher::new(Default::default()).unwrap();

        let result = fetch_download_center_update(&fetcher, "/download/details.aspx?id=1").await;

        assert!(matches!(result, Err(ScraperError::InvalidUrl(_))));
    }
}
