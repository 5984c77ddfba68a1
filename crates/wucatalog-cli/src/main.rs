use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use wucatalog::catalog::SearchOptions;
use wucatalog::{
    FetchConfig, FinderConfig, Outcome, PatchFinder, remove_existing, write_updates,
};

#[derive(Parser)]
#[command(name = "wucatalog")]
#[command(
    about = "Looks up Microsoft updates in the Update Catalog and the Download Center",
    long_about = None
)]
struct Cli {
    #[arg(help = "Catalog search string, usually a KB number such as KB4530684")]
    search: String,

    #[arg(help = "JSON file to write the updates to; replaced if it exists")]
    output: PathBuf,

    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(long, help = "Only read the first page of catalog results")]
    first_page_only: bool,

    #[arg(
        long,
        value_name = "COLUMN",
        help = "Sort catalog results by a column header, e.g. \"Last Updated\""
    )]
    sort: Option<String>,

    #[arg(long, requires = "sort", help = "Reverse the --sort order")]
    sort_reverse: bool,

    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Number of catalog updates resolved at once"
    )]
    concurrency: u16,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn parse_args() -> Cli {
    Cli::try_parse().unwrap_or_else(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
        _ => {
            e.print().ok();
            process::exit(1);
        }
    })
}

#[tokio::main]
async fn main() {
    let cli = parse_args();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let search = cli.search.trim();
    if search.is_empty() {
        log::error!("The search string must not be empty");
        process::exit(1);
    }

    remove_existing(&cli.output).unwrap_or_else(|e| {
        log::error!("Error removing {}: {}", cli.output.display(), e);
        process::exit(1);
    });

    let config = FinderConfig {
        search: SearchOptions {
            all_pages: !cli.first_page_only,
            sort: cli.sort,
            sort_reverse: cli.sort_reverse,
        },
        concurrency: cli.concurrency.into(),
    };

    let finder = PatchFinder::new(FetchConfig::default(), config).unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    let report = match finder.find_patches(search).await {
        Outcome::Found(report) => report,
        Outcome::Empty => {
            log::error!("No updates found for '{}'", search);
            process::exit(1);
        }
        Outcome::Failed(e) => {
            log::error!("Lookup for '{}' failed [{}]: {}", search, e.kind(), e);
            process::exit(1);
        }
    };

    log::info!(
        "Found {} update(s) for '{}' via {:?}",
        report.updates.len(),
        search,
        report.source
    );
    for update in &report.updates {
        log::info!("  {}", update.title);
    }

    write_updates(&cli.output, &report.updates).unwrap_or_else(|e| {
        log::error!("Error writing {}: {}", cli.output.display(), e);
        process::exit(1);
    });
}
