use crate::liveness::{HttpLivenessChecker, LivenessChecker, DEFAULT_WORKERS};
use crate::olx_scraper::OlxScraper;
use crate::reconcile::{reconcile, PricePolicy, PriorState, ReconcileOptions, Reconciliation};
use crate::report_store::{open_report_store, ReportFormat, ReportStore};
use crate::seen_store::SeenStore;
use crate::source::{collect_listings, ListingSource, ListingStream};
use crate::tui::RunTUI;
use crate::utils::{self, RunPaths};
use crate::debug;
use crate::debug_println;
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

pub const DEFAULT_MAX_PAGES: usize = 5;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub search_term: String,
    pub output_dir: PathBuf,
    pub max_pages: usize,
    pub format: ReportFormat,
    pub workers: usize,
    pub policy: PricePolicy,
    pub debug: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            output_dir: PathBuf::from("."),
            max_pages: DEFAULT_MAX_PAGES,
            format: ReportFormat::Xlsx,
            workers: DEFAULT_WORKERS,
            policy: PricePolicy::Verbatim,
            debug: false,
        }
    }
}

impl RunOptions {
    pub fn paths(&self) -> RunPaths {
        RunPaths::new(&self.output_dir, &self.search_term, self.format)
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub reconciliation: Reconciliation,
    pub scraped: usize,
    pub skipped: usize,
    /// Whether the report and seen files were rewritten.
    pub saved: bool,
}

/// Keeps the first terminal error raised from the page callback, which has no
/// way to return one, until the stream is drained.
#[derive(Clone, Default)]
struct FirstError(Rc<RefCell<Option<io::Error>>>);

impl FirstError {
    fn record(&self, result: io::Result<()>) {
        if let Err(e) = result {
            self.0.borrow_mut().get_or_insert(e);
        }
    }

    fn take(&self) -> io::Result<()> {
        match self.0.borrow_mut().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// One complete run against OLX with the HTTP liveness checker.
pub fn run_with_options(options: &RunOptions) -> Result<RunSummary> {
    debug::set_debug(options.debug);

    let source = OlxScraper::new(&utils::search_slug(&options.search_term))
        .context("Failed to set up OLX scraper")?;
    let checker = HttpLivenessChecker::new().context("Failed to set up liveness checker")?;

    run_search(options, source, &checker, RunTUI::new())
}

/// Load prior state, scrape, reconcile and persist.
///
/// The source is consumed: it is released before the liveness pass starts and
/// on every early return.
pub fn run_search<S, C>(options: &RunOptions, source: S, checker: &C, tui: RunTUI) -> Result<RunSummary>
where
    S: ListingSource,
    C: LivenessChecker + ?Sized,
{
    let paths = options.paths();
    let seen_store = SeenStore::new(&paths.seen_file);
    let report_store = open_report_store(options.format, &paths.report_file);

    tui.show_header(&options.search_term, source.name())?;

    let seen = seen_store
        .load()
        .with_context(|| format!("Failed to load {}", paths.seen_file.display()))?;
    let table = report_store
        .load()
        .with_context(|| format!("Failed to load {}", paths.report_file.display()))?;
    tui.show_loaded(table.len(), seen.len())?;

    let page_output = FirstError::default();
    let sink = page_output.clone();
    let stream = ListingStream::new(source, options.max_pages).on_page(move |report| sink.record(tui.show_page(report)));
    let (scraped, skipped) = collect_listings(stream).context("Scraping failed")?;
    page_output.take().context("Failed to show page progress")?;
    tui.finish_scraping(scraped.len(), skipped)?;

    let bar = tui.liveness_bar(table.len());
    let reconcile_options = ReconcileOptions {
        workers: options.workers,
        policy: options.policy,
        progress: Some(&bar),
    };
    let scraped_count = scraped.len();
    let result = reconcile(checker, PriorState { table, seen }, scraped, &reconcile_options);
    bar.finish_and_clear();

    tui.show_pruning(&result)?;
    tui.show_new_listings(&result.new_listings)?;
    tui.show_price_updates(&result.price_updates)?;

    let saved = result.has_changes();
    if saved {
        report_store
            .save(&result.table)
            .with_context(|| format!("Failed to save {}", paths.report_file.display()))?;
        seen_store
            .save(result.seen_in_order())
            .with_context(|| format!("Failed to save {}", paths.seen_file.display()))?;
        tui.show_saved(
            result.table.len(),
            &paths.report_file.display().to_string(),
            &paths.seen_file.display().to_string(),
        )?;
    } else {
        debug_println!("Nothing new, leaving {} untouched", paths.report_file.display());
    }

    Ok(RunSummary {
        reconciliation: result,
        scraped: scraped_count,
        skipped,
        saved,
    })
}
