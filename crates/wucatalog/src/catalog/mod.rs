mod parser;
pub mod resolver;
pub mod search;
pub mod types;

pub use parser::{SearchPage, parse_download_links, parse_search_page, parse_update_detail};
pub use resolver::{CatalogUpdate, ResolveState};
pub use search::{CatalogSearch, SearchOptions};
