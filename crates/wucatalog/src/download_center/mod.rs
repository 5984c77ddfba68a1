pub mod literal;
mod parser;
pub mod scraper;
pub mod types;

pub use literal::{LiteralKind, extract_literal};
pub use parser::{parse_details_page, parse_support_page};
pub use scraper::{fetch_download_center_update, fetch_patch_links, support_article_url};
