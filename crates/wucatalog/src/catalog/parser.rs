use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use uuid::Uuid;

use super::types::{DownloadLink, Supersedes, UpdateDetail, UpdateSummary};
use crate::markup::{
    ParseError, elem_text, find_by_id, next_element_sibling, next_sibling_tagged,
    next_sibling_text, sibling_texts, text_by_id,
};

pub(crate) const RESULTS_ID: &str = "ctl00_catalogBody_updateMatches";
pub(crate) const LAST_PAGE_ID: &str = "ctl00_catalogBody_nextPage";
pub(crate) const NEXT_PAGE_TARGET: &str = "ctl00$catalogBody$nextPageLinkText";

const FORM_STATE_IDS: [&str; 4] = [
    "__EVENTARGUMENT",
    "__EVENTVALIDATION",
    "__VIEWSTATE",
    "__VIEWSTATEGENERATOR",
];

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("invalid selector: row"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("invalid selector: cell"));
static SPAN_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("invalid selector: span"));
static INPUT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input").expect("invalid selector: input"));
static HEADER_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("invalid selector: header link"));

static RE_DOWNLOAD_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\[(\d*)\]\.url = ["'](https?://catalog\.s\.download\.windowsupdate\.com/[^'"]*)"#,
    )
    .expect("invalid regex: download url")
});

/// One parsed page of catalog search results plus what is needed to ask the
/// catalog for the next one.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub updates: Vec<UpdateSummary>,
    /// Header text to postback target of each sortable column.
    pub sort_targets: HashMap<String, String>,
    pub form_state: Vec<(String, String)>,
    pub has_more: bool,
}

impl SearchPage {
    /// Form body that replays the page state with `target` as the event.
    pub fn action_form(&self, target: &str) -> Vec<(String, String)> {
        let mut form = vec![("__EVENTTARGET".to_string(), target.to_string())];
        form.extend(self.form_state.iter().cloned());
        form
    }
}

fn cell_text(cells: &[ElementRef], index: usize, field: &str) -> Result<String, ParseError> {
    cells
        .get(index)
        .map(|c| elem_text(*c).trim().to_string())
        .ok_or_else(|| ParseError::MissingField(format!("{} (cell {})", field, index)))
}

/// Splits a product cell on commas that are not followed by whitespace, so a
/// name like "Windows 10, version 1903 and later" stays in one piece.
pub fn split_products(text: &str) -> Vec<String> {
    let mut products = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ',' && chars.peek().is_some_and(|next| !next.is_whitespace()) {
            products.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    products.push(current);

    products.retain(|p| !p.is_empty());
    products
}

fn parse_update_row(row: ElementRef) -> Result<UpdateSummary, ParseError> {
    let cells: Vec<ElementRef> = row.select(&CELL_SEL).collect();

    let title = cell_text(&cells, 1, "title")?;
    let products = split_products(&cell_text(&cells, 2, "products")?);
    let classification = cell_text(&cells, 3, "classification")?;

    let raw_date = cell_text(&cells, 4, "last updated")?;
    let last_updated = NaiveDate::parse_from_str(&raw_date, "%m/%d/%Y")
        .map_err(|_| ParseError::InvalidDate(raw_date.clone()))?;

    let version = cell_text(&cells, 5, "version")?;

    let size = cells
        .get(6)
        .and_then(|c| c.select(&SPAN_SEL).next())
        .map(|s| elem_text(s).trim().to_string())
        .ok_or_else(|| ParseError::MissingField("size".into()))?;

    let raw_id = cells
        .get(7)
        .and_then(|c| c.select(&INPUT_SEL).next())
        .and_then(|input| input.value().attr("id"))
        .ok_or_else(|| ParseError::MissingField("update id".into()))?;
    let id = Uuid::parse_str(raw_id).map_err(|_| ParseError::InvalidId(raw_id.to_string()))?;

    Ok(UpdateSummary {
        title,
        products,
        classification,
        last_updated,
        version,
        size,
        id,
    })
}

/// Returns `Ok(None)` when the page has no result table at all.
pub fn parse_search_page(html: &str) -> Result<Option<SearchPage>, ParseError> {
    let document = Html::parse_document(html);

    let Some(table) = find_by_id(&document, RESULTS_ID) else {
        return Ok(None);
    };

    let mut rows = table.select(&ROW_SEL);

    let sort_targets = rows
        .next()
        .map(|header| {
            header
                .select(&HEADER_LINK_SEL)
                .filter_map(|link| {
                    let label = link.select(&SPAN_SEL).next().map(elem_text)?;
                    let id = link.value().attr("id")?;
                    Some((label.trim().to_string(), id.replace('_', "$")))
                })
                .collect()
        })
        .unwrap_or_default();

    let updates = rows.map(parse_update_row).collect::<Result<Vec<_>, _>>()?;

    let form_state = FORM_STATE_IDS
        .iter()
        .filter_map(|id| {
            let value = find_by_id(&document, id)?.value().attr("value")?;
            Some((id.to_string(), value.to_string()))
        })
        .collect();

    let has_more = find_by_id(&document, LAST_PAGE_ID).is_none();

    Ok(Some(SearchPage {
        updates,
        sort_targets,
        form_state,
        has_more,
    }))
}

fn marker_sibling_text(document: &Html, id: &str) -> Option<String> {
    find_by_id(document, id)
        .and_then(next_sibling_text)
        .map(|t| t.trim().to_string())
}

fn marker_element_text(document: &Html, id: &str) -> Option<String> {
    find_by_id(document, id)
        .and_then(next_element_sibling)
        .map(|e| elem_text(e).trim().to_string())
}

fn parse_supersedes(document: &Html) -> Supersedes {
    let Some(info) = find_by_id(document, "supersedesInfo") else {
        return Supersedes::absent();
    };

    let text = elem_text(info).trim().to_string();
    let titles: Vec<String> = text
        .replace("\n\r\n", " ")
        .split('\n')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.replace('\r', ""))
        .collect();

    if titles.is_empty() {
        Supersedes::Text(text)
    } else {
        Supersedes::List(titles)
    }
}

fn parse_kb_numbers(document: &Html) -> Result<Option<Vec<u64>>, ParseError> {
    let Some(marker) = find_by_id(document, "ScopedViewHandler_labelKBArticle_Separator") else {
        return Ok(None);
    };

    let siblings: Vec<String> = sibling_texts(marker)
        .map(|t| t.trim().to_string())
        .collect();

    if siblings.first().is_none_or(|first| first.is_empty()) {
        return Ok(None);
    }

    siblings
        .iter()
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("n/a"))
        .map(|t| {
            t.parse::<u64>()
                .map_err(|_| ParseError::InvalidKbNumber(t.clone()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn parse_msrc_number(document: &Html) -> Option<String> {
    let marker = find_by_id(document, "ScopedViewHandler_labelSecurityBulliten_Separator")?;
    let siblings: Vec<String> = sibling_texts(marker).collect();

    let first = siblings.first()?;
    if first.contains("n/a") || first.chars().count() <= 1 {
        return None;
    }

    siblings
        .last()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn parse_update_detail(html: &str) -> Result<UpdateDetail, ParseError> {
    let document = Html::parse_document(html);

    let uninstallable = find_by_id(&document, "ScopedViewHandler_labelUninstallNotes_Separator")
        .and_then(|marker| next_sibling_tagged(marker, "div"))
        .is_some_and(|notes| elem_text(notes).contains("can be removed"));

    Ok(UpdateDetail {
        architecture: marker_sibling_text(
            &document,
            "ScopedViewHandler_labelArchitecture_Separator",
        ),
        languages: marker_sibling_text(
            &document,
            "ScopedViewHandler_labelSupportedLanguages_Separator",
        ),
        supersedes: parse_supersedes(&document),
        description: text_by_id(&document, "ScopedViewHandler_desc")
            .map(|t| t.trim().to_string()),
        uninstallable,
        requires_connectivity: text_by_id(&document, "ScopedViewHandler_connectivity"),
        requires_user_input: text_by_id(&document, "ScopedViewHandler_userInput"),
        requires_restart: text_by_id(&document, "ScopedViewHandler_rebootBehavior"),
        kb_numbers: parse_kb_numbers(&document)?,
        more_information: marker_element_text(
            &document,
            "ScopedViewHandler_labelMoreInfo_Separator",
        ),
        msrc_number: parse_msrc_number(&document),
        msrc_severity: text_by_id(&document, "ScopedViewHandler_msrcSeverity")
            .map(|t| t.trim().to_string()),
        support_url: marker_element_text(&document, "ScopedViewHandler_labelSupportUrl_Separator"),
    })
}

fn slot_field(body: &str, slot: &str, field: &str) -> Option<String> {
    let pattern = format!(
        r#"\[{}\]\.{} = ['"]([\w\-.=+/() ]*)['"];"#,
        regex::escape(slot),
        regex::escape(field)
    );
    let re = Regex::new(&pattern)
        .inspect_err(|e| log::error!("Bad download field pattern {pattern}: {e}"))
        .ok()?;
    re.captures(body).map(|caps| caps[1].to_string())
}

/// Every download link in a `DownloadDialog.aspx` response. Empty when the
/// body lists none.
pub fn parse_download_links(body: &str) -> Vec<DownloadLink> {
    RE_DOWNLOAD_URL
        .captures_iter(body)
        .map(|caps| {
            let slot = &caps[1];
            DownloadLink {
                url: caps[2].to_string(),
                digest: slot_field(body, slot, "digest"),
                architectures: slot_field(body, slot, "architectures"),
                languages: slot_field(body, slot, "languages"),
                long_languages: slot_field(body, slot, "longLanguages"),
                file_name: slot_field(body, slot, "fileName"),
            }
        })
        .collect()
}
