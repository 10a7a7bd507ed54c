use anyhow::Result;
use clap::Parser;
use olxfinder::liveness::DEFAULT_WORKERS;
use olxfinder::reconcile::PricePolicy;
use olxfinder::report_store::ReportFormat;
use olxfinder::runner::{run_with_options, RunOptions, DEFAULT_MAX_PAGES};
use olxfinder::utils;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "olxfinder - tracks OLX listings for a vehicle model")]
struct Args {
    /// Model to search for, e.g. "Yamaha MT-07" (prompted for when omitted)
    search_term: Option<String>,

    /// Maximum number of result pages to scrape
    #[clap(short, long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    /// Report file format
    #[clap(short, long, value_enum, default_value_t = ReportFormat::Xlsx)]
    format: ReportFormat,

    /// Directory holding the report and the seen-URL file
    #[clap(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Number of parallel liveness checks for known listings
    #[clap(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Also record price changes of listings that are already in the report
    #[clap(short, long)]
    track_price_changes: bool,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let search_term = match args.search_term {
        Some(term) if !term.trim().is_empty() => term.trim().to_string(),
        _ => utils::prompt_search_term()?,
    };

    let options = RunOptions {
        search_term,
        output_dir: args.output_dir,
        max_pages: args.max_pages,
        format: args.format,
        workers: args.workers,
        policy: if args.track_price_changes {
            PricePolicy::TrackExisting
        } else {
            PricePolicy::Verbatim
        },
        debug: args.debug,
    };

    run_with_options(&options)?;
    Ok(())
}
