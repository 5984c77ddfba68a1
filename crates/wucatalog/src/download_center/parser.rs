use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::literal::{DETAILS_MARKER, LiteralKind, clean_payload, extract_literal};
use super::types::{DownloadCenterRecord, DownloadFile, Locale};
use crate::markup::{ParseError, anchor_hrefs, canonical_link, elem_text};
use crate::utils::{architecture_from_name, convert_bytes_to_human_readable, kb_number_in};

pub(crate) const DETAILS_LINK_FRAGMENT: &str = "/download/details.aspx?";

static SCRIPT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("invalid selector: script"));

/// Download center links found on a support article. `None` when the page
/// has no canonical link, which is how the support site answers unknown KBs.
pub fn parse_support_page(html: &str) -> Option<Vec<String>> {
    let document = Html::parse_document(html);
    canonical_link(&document)?;

    Some(
        anchor_hrefs(&document)
            .into_iter()
            .filter(|href| href.contains(DETAILS_LINK_FRAGMENT))
            .collect(),
    )
}

pub fn total_size(files: &[DownloadFile]) -> String {
    files
        .iter()
        .map(DownloadFile::size_bytes)
        .sum::<Option<u64>>()
        .map(convert_bytes_to_human_readable)
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn architecture(files: &[DownloadFile]) -> Option<String> {
    files
        .iter()
        .find_map(|f| architecture_from_name(&f.name))
        .map(str::to_string)
}

/// KB from the title, else from the first file name mentioning one.
pub fn kb_number(title: &str, files: &[DownloadFile]) -> Option<String> {
    kb_number_in(title).or_else(|| {
        files
            .iter()
            .find(|f| f.name.to_lowercase().contains("kb"))
            .and_then(|f| kb_number_in(&f.name))
    })
}

fn details_payload(document: &Html) -> Option<String> {
    document.select(&SCRIPT_SEL).find_map(|script| {
        let text = elem_text(script);
        text.find(DETAILS_MARKER)
            .map(|i| text[i + DETAILS_MARKER.len()..].to_string())
    })
}

/// Parses a download center details page. `Ok(None)` when the page carries
/// no file list.
pub fn parse_details_page(html: &str) -> Result<Option<DownloadCenterRecord>, ParseError> {
    let document = Html::parse_document(html);

    let update_url = canonical_link(&document)
        .ok_or_else(|| ParseError::MissingField("canonical link".into()))?;

    let Some(raw) = details_payload(&document) else {
        return Ok(None);
    };
    if !raw.contains("downloadFile") {
        return Ok(None);
    }
    let payload = clean_payload(&raw);

    let files: Vec<DownloadFile> = extract_literal(&payload, "downloadFile", LiteralKind::Array)?;
    let title: String = extract_literal(&payload, "downloadTitle", LiteralKind::String)?;
    let description: String =
        extract_literal(&payload, "downloadDescription", LiteralKind::String)?;
    let supported_products: String =
        extract_literal(&payload, "operatingSystem", LiteralKind::String)?;

    let locale = Locale::english();

    Ok(Some(DownloadCenterRecord {
        kb: kb_number(&title, &files),
        version: files.first().and_then(DownloadFile::version_text),
        last_updated: files.first().and_then(DownloadFile::date_published_text),
        update_size: total_size(&files),
        architecture: architecture(&files),
        title,
        description,
        supported_products,
        language: locale.name,
        update_url,
        files,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use std::fs;

    fn file(name: &str, size: Option<Value>) -> DownloadFile {
        DownloadFile {
            name: name.to_string(),
            url: format!("https://download.microsoft.com/{name}"),
            size,
            version: None,
            date_published: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_parse_support_page() {
        let html = fs::read_to_string("fixtures/download_center/support_article.html")
            .expect("Failed to read fixture");

        let links = parse_support_page(&html).expect("Should have a canonical link");

        assert_eq!(
            links,
            vec![
                "https://www.microsoft.com/download/details.aspx?id=105652",
                "https://www.microsoft.com/en-us/download/details.aspx?id=105653",
            ]
        );
    }

    #[test]
    fn test_support_page_without_canonical_link() {
        let html = r#"<html><body><a href="https://www.microsoft.com/download/details.aspx?id=1">x</a></body></html>"#;
        assert!(parse_support_page(html).is_none());
    }

    #[test]
    fn test_parse_details_page() {
        let html = fs::read_to_string("fixtures/download_center/details_page.html")
            .expect("Failed to read fixture");

        let record = parse_details_page(&html)
            .expect("Failed to parse details page")
            .expect("Should have a file list");

        assert_eq!(record.title, "2024-01 Update for Windows (KB5034123)");
        assert_eq!(record.kb.as_deref(), Some("5034123"));
        assert_eq!(record.description, "Install this update to resolve issues in Windows.");
        assert_eq!(record.supported_products, "Windows 10, Windows 11");
        assert_eq!(record.language, "English");
        assert_eq!(record.version.as_deref(), Some("10.0.1"));
        assert_eq!(record.last_updated.as_deref(), Some("1/9/2024 5:00:00 PM"));
        assert_eq!(
            record.update_url,
            "https://www.microsoft.com/en-us/download/details.aspx?id=105652"
        );
        assert_eq!(record.architecture.as_deref(), Some("x64"));
        assert_eq!(record.update_size, "1.50 GB");
        assert_eq!(record.files.len(), 2);
        assert_eq!(record.files[0].name, "windows10.0-kb5034123-x64.msu");
    }

    #[test]
    fn test_details_page_without_file_list() {
        let html = r#"<html><head><link rel="canonical" href="https://www.microsoft.com/en-us/download/details.aspx?id=1"></head>
<body><script>window.__DLCDetails__={"dlcDetailsView":{"downloadTitle":"Nothing","x":1}}</script></body></html>"#;
        assert!(parse_details_page(html).unwrap().is_none());
    }

    #[test]
    fn test_details_page_without_canonical_link() {
        let html = "<html><body><script>window.__DLCDetails__={}</script></body></html>";
        assert!(matches!(
            parse_details_page(html),
            Err(ParseError::MissingField(_))
        ));
    }

    #[test]
    fn test_total_size() {
        let files = [
            file("a.exe", Some(Value::from("1048576"))),
            file("b.exe", Some(Value::from(1048576))),
        ];
        assert_eq!(total_size(&files), "2.00 MB");

        let broken = [file("a.exe", Some(Value::from("1048576"))), file("b.exe", None)];
        assert_eq!(total_size(&broken), "N/A");
    }

    #[test]
    fn test_architecture_scans_past_unknown_names() {
        let files = [file("readme.txt", None), file("setup-x86.exe", None)];
        assert_eq!(architecture(&files).as_deref(), Some("x86"));
        assert_eq!(architecture(&[file("readme.txt", None)]), None);
    }

    #[test]
    fn test_kb_number_falls_back_to_file_names() {
        let files = [file("readme.txt", None), file("Windows-KB890830-x64-V5.120.exe", None)];

        assert_eq!(
            kb_number("2024-01 Update for Windows (KB5034123)", &files).as_deref(),
            Some("5034123")
        );
        assert_eq!(
            kb_number("Malicious Software Removal Tool", &files).as_deref(),
            Some("890830")
        );
        assert_eq!(kb_number("Malicious Software Removal Tool", &[]), None);
    }
}
