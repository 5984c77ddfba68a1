use crate::markup::ParseError;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

pub const CATALOG_URL: &str = "https://www.catalog.update.microsoft.com";
pub const SUPPORT_URL: &str = "https://support.microsoft.com";

/// The catalog and the support site both serve reduced markup to unknown
/// agents, so every request presents itself as IE10.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; MSIE 10.0; Windows NT 6.2; WOW64; Trident/6.0)";

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No results for {0}")]
    NoResults(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ScraperError {
    /// Short machine-friendly name of the failure class, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ScraperError::Http(_) => "transport",
            ScraperError::Parse(_) => "parse",
            ScraperError::NotFound(_) => "not_found",
            ScraperError::NoResults(_) => "no_results",
            ScraperError::InvalidUrl(_) => "invalid_url",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub catalog_url: String,
    pub support_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            catalog_url: CATALOG_URL.to_string(),
            support_url: SUPPORT_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl FetchConfig {
    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_support_url(mut self, url: impl Into<String>) -> Self {
        self.support_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    config: FetchConfig,
}

impl PageFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn catalog_url(&self) -> &str {
        &self.config.catalog_url
    }

    pub fn support_url(&self) -> &str {
        &self.config.support_url
    }

    pub async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        log::debug!("GET {}", url);
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }

    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<String, ScraperError> {
        log::debug!("POST {} ({} form fields)", url, fields.len());
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();

        Ok(self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders_trim_trailing_slash() {
        let config = FetchConfig::default()
            .with_catalog_url("http://127.0.0.1:9000/")
            .with_support_url("http://127.0.0.1:9001/");

        assert_eq!(config.catalog_url, "http://127.0.0.1:9000");
        assert_eq!(config.support_url, "http://127.0.0.1:9001");
        assert_eq!(config.user_agent, USER_AGENT);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ScraperError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(ScraperError::NoResults("x".into()).kind(), "no_results");
        assert_eq!(
            ScraperError::Parse(ParseError::MissingField("x".into())).kind(),
            "parse"
        );
    }
}
