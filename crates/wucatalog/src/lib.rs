pub mod catalog;
pub mod download_center;
pub mod fetch;
pub mod finder;
pub mod markup;
pub mod output;
pub mod record;
pub mod utils;

pub use fetch::{FetchConfig, PageFetcher, ScraperError};
pub use finder::{FinderConfig, Outcome, PatchFinder, PatchReport, PatchSource};
pub use output::{remove_existing, write_updates};
pub use record::UpdateRecord;
