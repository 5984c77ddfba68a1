use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// One row of a catalog search result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub title: String,
    pub products: Vec<String>,
    pub classification: String,
    pub last_updated: NaiveDate,
    pub version: String,
    pub size: String,
    pub id: Uuid,
}

impl UpdateSummary {
    pub fn product(&self) -> Option<&str> {
        self.products.first().map(String::as_str)
    }
}

impl Display for UpdateSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} ({})",
            self.last_updated, self.classification, self.title, self.size
        )
    }
}

/// What the detail page says about updates this one replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Supersedes {
    List(Vec<String>),
    Text(String),
}

impl Supersedes {
    /// Marker written when the detail page has no supersedes section at all.
    pub const ABSENT: &'static str = "None";

    pub fn absent() -> Self {
        Supersedes::Text(Self::ABSENT.to_string())
    }

    /// Every title this value names, in page order.
    pub fn titles(&self) -> Vec<&str> {
        match self {
            Supersedes::List(titles) => titles.iter().map(String::as_str).collect(),
            Supersedes::Text(text) if text.is_empty() => Vec::new(),
            Supersedes::Text(text) => vec![text.as_str()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetail {
    pub architecture: Option<String>,
    pub languages: Option<String>,
    pub supersedes: Supersedes,
    pub description: Option<String>,
    pub uninstallable: bool,
    pub requires_connectivity: Option<String>,
    pub requires_user_input: Option<String>,
    pub requires_restart: Option<String>,
    pub kb_numbers: Option<Vec<u64>>,
    pub more_information: Option<String>,
    pub msrc_number: Option<String>,
    pub msrc_severity: Option<String>,
    pub support_url: Option<String>,
}

/// A single downloadable file of an update, as listed by the download dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub url: String,
    pub digest: Option<String>,
    pub architectures: Option<String>,
    pub languages: Option<String>,
    pub long_languages: Option<String>,
    pub file_name: Option<String>,
}

impl DownloadLink {
    /// Last path segment of the download URL.
    pub fn file_name_from_url(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .unwrap_or_else(|| {
                self.url
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
    }
}

impl Display for DownloadLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {}",
            self.file_name.as_deref().unwrap_or("unknown"),
            self.long_languages.as_deref().unwrap_or("unknown language")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str) -> DownloadLink {
        DownloadLink {
            url: url.to_string(),
            digest: None,
            architectures: None,
            languages: None,
            long_languages: None,
            file_name: None,
        }
    }

    #[test]
    fn test_file_name_from_url() {
        let link = link(
            "http://catalog.s.download.windowsupdate.com/d/msdownload/update/software/secu/2019/12/windows10.0-kb4530684-x64_abc.msu",
        );
        assert_eq!(link.file_name_from_url(), "windows10.0-kb4530684-x64_abc.msu");
    }

    #[test]
    fn test_download_link_display_falls_back_to_unknown() {
        let mut link = link("http://catalog.s.download.windowsupdate.com/x.cab");
        assert_eq!(link.to_string(), "unknown - unknown language");

        link.file_name = Some("x.cab".into());
        link.long_languages = Some("English".into());
        assert_eq!(link.to_string(), "x.cab - English");
    }

    #[test]
    fn test_supersedes_titles() {
        assert!(Supersedes::Text(String::new()).titles().is_empty());
        assert_eq!(Supersedes::absent().titles(), vec!["None"]);
        assert_eq!(
            Supersedes::List(vec!["a".into(), "b".into()]).titles(),
            vec!["a", "b"]
        );
    }
}
