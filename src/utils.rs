use crate::report_store::ReportFormat;
use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

pub const SEARCH_PROMPT: &str = "Enter the bike model to search (e.g. Yamaha MT-07): ";

/// "Yamaha MT-07" -> "yamaha-mt-07"
pub fn search_slug(search_term: &str) -> String {
    search_term.trim().to_lowercase().replace(' ', "-")
}

/// File locations for one search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub seen_file: PathBuf,
    pub report_file: PathBuf,
}

impl RunPaths {
    pub fn new(output_dir: &Path, search_term: &str, format: ReportFormat) -> Self {
        let slug = search_slug(search_term);
        RunPaths {
            seen_file: output_dir.join(format!("seen_{}.txt", slug)),
            report_file: output_dir.join(format!("{}_ads.{}", slug, format.extension())),
        }
    }
}

/// Ask for the search term on stdin.
pub fn prompt_search_term() -> Result<String> {
    let stdin = io::stdin();
    read_search_term(&mut stdin.lock(), &mut io::stdout())
}

pub fn read_search_term<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String> {
    write!(output, "{}", SEARCH_PROMPT)?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read search term")?;

    let term = line.trim().to_string();
    if term.is_empty() {
        bail!("Search term must not be empty");
    }
    Ok(term)
}
