use std::collections::VecDeque;

use super::parser::{NEXT_PAGE_TARGET, SearchPage, parse_search_page};
use super::types::UpdateSummary;
use crate::fetch::{PageFetcher, ScraperError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Keep following the catalog's "next" link instead of stopping after
    /// the first page of 25 results.
    pub all_pages: bool,
    /// Column header, as shown in the catalog, to sort by.
    pub sort: Option<String>,
    /// Click the sort header a second time to get descending order.
    pub sort_reverse: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            all_pages: true,
            sort: None,
            sort_reverse: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WalkStep {
    Load,
    Sort(String),
    NextPage,
}

/// A walk over the catalog's result pages for one query.
///
/// The catalog is an ASP.NET WebForms page: sorting and paging are postbacks
/// that replay the previous page's view state, so every step depends on the
/// page fetched before it. The walk is a queue of such steps; a page's rows
/// are only handed out once no sort step is left in front of it.
#[derive(Debug)]
pub struct CatalogSearch {
    query: String,
    all_pages: bool,
    steps: VecDeque<WalkStep>,
    current: Option<SearchPage>,
    pages_walked: usize,
}

impl CatalogSearch {
    pub fn new(query: impl Into<String>, options: SearchOptions) -> Self {
        let mut steps = VecDeque::from([WalkStep::Load]);
        if let Some(column) = options.sort {
            steps.push_back(WalkStep::Sort(column.clone()));
            if options.sort_reverse {
                steps.push_back(WalkStep::Sort(column));
            }
        }

        Self {
            query: query.into(),
            all_pages: options.all_pages,
            steps,
            current: None,
            pages_walked: 0,
        }
    }

    pub fn pages_walked(&self) -> usize {
        self.pages_walked
    }

    fn search_url(&self, catalog_url: &str) -> String {
        format!(
            "{}/Search.aspx?q={}",
            catalog_url,
            urlencoding::encode(&self.query)
        )
    }

    fn form_for(&self, target: &str) -> Result<Vec<(String, String)>, ScraperError> {
        self.current
            .as_ref()
            .map(|page| page.action_form(target))
            .ok_or_else(|| ScraperError::NotFound(format!("page state for '{}'", self.query)))
    }

    async fn perform(
        &self,
        step: &WalkStep,
        fetcher: &PageFetcher,
    ) -> Result<SearchPage, ScraperError> {
        let url = self.search_url(fetcher.catalog_url());

        let html = match step {
            WalkStep::Load => {
                log::info!("Searching the update catalog for '{}'...", self.query);
                fetcher.get_html(&url).await?
            }
            WalkStep::Sort(column) => {
                let target = self
                    .current
                    .as_ref()
                    .and_then(|page| page.sort_targets.get(column))
                    .ok_or_else(|| ScraperError::NotFound(format!("sort column '{}'", column)))?;
                log::info!("Sorting catalog results by '{}'...", column);
                fetcher.post_form(&url, &self.form_for(target)?).await?
            }
            WalkStep::NextPage => {
                log::info!("Fetching catalog results page {}...", self.pages_walked + 1);
                fetcher.post_form(&url, &self.form_for(NEXT_PAGE_TARGET)?).await?
            }
        };

        // Only the first load may come back without a result table; an
        // action on a page that had one is expected to keep it.
        parse_search_page(&html)?.ok_or_else(|| match step {
            WalkStep::Load => ScraperError::NoResults(format!("'{}'", self.query)),
            _ => ScraperError::NotFound(format!("update results for '{}'", self.query)),
        })
    }

    /// Fetches until the next page of rows is available. `Ok(None)` once the
    /// walk is over.
    pub async fn next_page(
        &mut self,
        fetcher: &PageFetcher,
    ) -> Result<Option<Vec<UpdateSummary>>, ScraperError> {
        while let Some(step) = self.steps.pop_front() {
            let page = match self.perform(&step, fetcher).await {
                Ok(page) => page,
                Err(e) => {
                    self.steps.clear();
                    return Err(e);
                }
            };

            let sorting_pending = matches!(self.steps.front(), Some(WalkStep::Sort(_)));
            let updates = if sorting_pending {
                None
            } else {
                Some(page.updates.clone())
            };

            if !sorting_pending && page.has_more && self.all_pages {
                self.steps.push_back(WalkStep::NextPage);
            }
            self.current = Some(page);

            if let Some(updates) = updates {
                self.pages_walked += 1;
                return Ok(Some(updates));
            }
        }

        Ok(None)
    }

    /// Drains the walk. A failure on the first page is returned; a failure
    /// further in ends the walk with the rows gathered so far.
    pub async fn collect_updates(
        mut self,
        fetcher: &PageFetcher,
    ) -> Result<Vec<UpdateSummary>, ScraperError> {
        let mut updates = Vec::new();

        loop {
            match self.next_page(fetcher).await {
                Ok(Some(page)) => updates.extend(page),
                Ok(None) => break,
                Err(e) if self.pages_walked == 0 => return Err(e),
                Err(e) => {
                    log::warn!(
                        "Catalog walk for '{}' stopped after {} page(s) [{}]: {}",
                        self.query,
                        self.pages_walked,
                        e.kind(),
                        e
                    );
                    break;
                }
            }
        }

        log::info!(
            "Found {} update(s) in {} catalog page(s)",
            updates.len(),
            self.pages_walked
        );
        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_without_sort() {
        let search = CatalogSearch::new("KB4530684", SearchOptions::default());
        assert_eq!(search.steps, VecDeque::from([WalkStep::Load]));
    }

    #[test]
    fn test_steps_with_reverse_sort() {
        let search = CatalogSearch::new(
            "KB4530684",
            SearchOptions {
                all_pages: false,
                sort: Some("Last Updated".into()),
                sort_reverse: true,
            },
        );
        assert_eq!(
            search.steps,
            VecDeque::from([
                WalkStep::Load,
                WalkStep::Sort("Last Updated".into()),
                WalkStep::Sort("Last Updated".into()),
            ])
        );
    }

    #[test]
    fn test_search_url_encodes_query() {
        let search = CatalogSearch::new("windows 10 KB4530684", SearchOptions::default());
        assert_eq!(
            search.search_url("https://www.catalog.update.microsoft.com"),
            "https://www.catalog.update.microsoft.com/Search.aspx?q=windows%2010%20KB4530684"
        );
    }
}
