//! The flat record written for every update, whichever site it came from.

use std::collections::HashSet;

use serde::Serialize;

use crate::catalog::types::{DownloadLink, Supersedes, UpdateDetail, UpdateSummary};
use crate::download_center::types::{DownloadCenterRecord, DownloadFile};
use crate::fetch::SUPPORT_URL;
use crate::markup::ParseError;

/// Written in place of any value the source page does not provide.
pub const NONE: &str = "None";

fn or_none(value: Option<&str>) -> String {
    value.unwrap_or(NONE).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KbValue {
    Numbers(Vec<u64>),
    Text(String),
}

/// Keys that only one of the two sources writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecordOrigin {
    Catalog {
        update_id: String,
        kb_number: Vec<u64>,
    },
    DownloadCenter {
        kb_numbers: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Uninstallable {
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogDownload {
    pub file_name: String,
    pub download_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DownloadUrls {
    /// Catalog downloads, as a JSON list.
    Links(Vec<CatalogDownload>),
    /// Download center files, JSON-encoded into a single string.
    Encoded(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateRecord {
    pub kb: KbValue,
    pub title: String,
    #[serde(flatten)]
    pub origin: RecordOrigin,
    pub version: String,
    pub last_updated: String,
    pub classification: String,
    pub languages: String,
    pub superseeds: Supersedes,
    pub msrc_number: String,
    pub msrc_severity: String,
    pub products_applicable: String,
    pub architecture: String,
    pub uninstallable: Uninstallable,
    pub requires_connectivity: String,
    pub requires_user_input: String,
    pub requires_restart: String,
    pub update_size: String,
    pub more_info: String,
    pub description: String,
    pub support_url: String,
    pub download_urls: DownloadUrls,
}

impl UpdateRecord {
    pub fn from_catalog(
        summary: &UpdateSummary,
        detail: &UpdateDetail,
        links: &[DownloadLink],
    ) -> Self {
        let kb_numbers = detail.kb_numbers.clone().unwrap_or_default();

        UpdateRecord {
            kb: KbValue::Numbers(kb_numbers.clone()),
            title: summary.title.clone(),
            origin: RecordOrigin::Catalog {
                update_id: summary.id.to_string(),
                kb_number: kb_numbers,
            },
            version: summary.version.clone(),
            last_updated: summary.last_updated.and_time(chrono::NaiveTime::MIN).to_string(),
            classification: summary.classification.clone(),
            languages: or_none(detail.languages.as_deref()),
            superseeds: detail.supersedes.clone(),
            msrc_number: or_none(detail.msrc_number.as_deref()),
            msrc_severity: or_none(detail.msrc_severity.as_deref()),
            products_applicable: summary.product().map(str::to_lowercase).unwrap_or_default(),
            architecture: or_none(detail.architecture.as_deref()),
            uninstallable: Uninstallable::Flag(detail.uninstallable),
            requires_connectivity: or_none(detail.requires_connectivity.as_deref()),
            requires_user_input: or_none(detail.requires_user_input.as_deref()),
            requires_restart: or_none(detail.requires_restart.as_deref()),
            update_size: summary.size.clone(),
            more_info: or_none(detail.more_information.as_deref()),
            description: or_none(detail.description.as_deref()),
            support_url: or_none(detail.support_url.as_deref()),
            download_urls: DownloadUrls::Links(
                links
                    .iter()
                    .map(|link| CatalogDownload {
                        file_name: link.file_name_from_url(),
                        download_link: link.url.clone(),
                    })
                    .collect(),
            ),
        }
    }

    /// `search_kb` stands in when neither the title nor a file name carries
    /// a KB number.
    pub fn from_download_center(
        record: &DownloadCenterRecord,
        search_kb: &str,
    ) -> Result<Self, ParseError> {
        let kb = record.kb.clone().unwrap_or_else(|| search_kb.to_string());

        Ok(UpdateRecord {
            kb: KbValue::Text(kb.clone()),
            title: record.title.clone(),
            origin: RecordOrigin::DownloadCenter {
                kb_numbers: kb.clone(),
            },
            version: or_none(record.version.as_deref()),
            last_updated: or_none(record.last_updated.as_deref()),
            classification: "Product Update".to_string(),
            languages: record.language.clone(),
            superseeds: Supersedes::absent(),
            msrc_number: NONE.to_string(),
            msrc_severity: NONE.to_string(),
            products_applicable: record.supported_products.clone(),
            architecture: or_none(record.architecture.as_deref()),
            uninstallable: Uninstallable::Text("Yes".to_string()),
            requires_connectivity: "No".to_string(),
            requires_user_input: "No".to_string(),
            requires_restart: "Yes".to_string(),
            update_size: record.update_size.clone(),
            more_info: record.update_url.clone(),
            description: record.description.clone(),
            support_url: format!("{}/help/{}", SUPPORT_URL, kb),
            download_urls: DownloadUrls::Encoded(encode_download_files(&record.files)?),
        })
    }
}

#[derive(Serialize)]
struct DownloadFileEntry<'a> {
    #[serde(flatten)]
    file: &'a DownloadFile,
    download_link: &'a str,
    file_name: &'a str,
}

fn encode_download_files(files: &[DownloadFile]) -> Result<String, ParseError> {
    let entries: Vec<DownloadFileEntry> = files
        .iter()
        .map(|file| DownloadFileEntry {
            file,
            download_link: &file.url,
            file_name: &file.name,
        })
        .collect();

    Ok(serde_json::to_string(&entries)?)
}

/// Drops every record whose title is listed as superseded by any record in
/// the same result set. Titles are compared verbatim and across the whole
/// set, so a record that names itself is dropped too.
pub fn filter_superseded(records: Vec<UpdateRecord>) -> Vec<UpdateRecord> {
    let superseded: HashSet<String> = records
        .iter()
        .flat_map(|r| r.superseeds.titles())
        .map(str::to_string)
        .collect();

    let before = records.len();
    let kept: Vec<UpdateRecord> = records
        .into_iter()
        .filter(|r| !superseded.contains(&r.title))
        .collect();

    if kept.len() < before {
        log::info!("Dropped {} superseded update(s)", before - kept.len());
    }
    kept
}
