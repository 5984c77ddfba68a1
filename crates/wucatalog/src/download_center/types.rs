use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    #[serde(rename = "cultureCode")]
    pub culture_code: String,
    pub name: String,
}

impl Locale {
    pub fn english() -> Self {
        Self {
            culture_code: "en-us".to_string(),
            name: "English".to_string(),
        }
    }
}

/// One entry of the page's `downloadFile` array. Keys the scraper does not
/// use are kept as-is so they survive into the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(
        rename = "datePublished",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub date_published: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DownloadFile {
    /// Size in bytes; the page writes it either as a number or as a string.
    pub fn size_bytes(&self) -> Option<u64> {
        match self.size.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn version_text(&self) -> Option<String> {
        self.version.as_ref().and_then(value_text)
    }

    pub fn date_published_text(&self) -> Option<String> {
        self.date_published.as_ref().and_then(value_text)
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadCenterRecord {
    pub title: String,
    pub description: String,
    pub supported_products: String,
    pub language: String,
    pub version: Option<String>,
    pub update_size: String,
    pub last_updated: Option<String>,
    pub update_url: String,
    pub kb: Option<String>,
    pub architecture: Option<String>,
    pub files: Vec<DownloadFile>,
}

impl Display for DownloadCenterRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {} file(s))", self.title, self.update_size, self.files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_file_keeps_unknown_keys() {
        let file: DownloadFile = serde_json::from_str(
            r#"{"name":"a.msu","url":"https://download.microsoft.com/a.msu","size":"1024","version":"1.0","datePublished":"1/9/2024 5:00:00 PM","isPrimary":true}"#,
        )
        .unwrap();

        assert_eq!(file.size_bytes(), Some(1024));
        assert_eq!(file.date_published_text().as_deref(), Some("1/9/2024 5:00:00 PM"));
        assert_eq!(file.version_text().as_deref(), Some("1.0"));
        assert_eq!(file.extra.get("isPrimary"), Some(&Value::Bool(true)));

        let back = serde_json::to_value(&file).unwrap();
        assert_eq!(back["isPrimary"], Value::Bool(true));
        assert_eq!(back["datePublished"], "1/9/2024 5:00:00 PM");
    }

    #[test]
    fn test_size_bytes_accepts_numbers_only() {
        let file = |size: Value| DownloadFile {
            name: String::new(),
            url: String::new(),
            size: Some(size),
            version: None,
            date_published: None,
            extra: Map::new(),
        };

        assert_eq!(file(Value::from(2048)).size_bytes(), Some(2048));
        assert_eq!(file(Value::from("12 MB")).size_bytes(), None);
        assert_eq!(file(Value::Null).size_bytes(), None);
    }
}
