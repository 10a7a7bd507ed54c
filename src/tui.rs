use crate::models::Listing;
use crate::reconcile::Reconciliation;
use crate::source::PageReport;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;

/// Coloured status lines for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunTUI {
    quiet: bool,
}

impl RunTUI {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Swallows all output; used by tests and non-interactive callers.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    fn line(&self, color: Color, text: String) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        execute!(
            io::stdout(),
            SetForegroundColor(color),
            Print(text),
            Print("\n"),
            ResetColor
        )
    }

    pub fn show_header(&self, search_term: &str, source: &str) -> io::Result<()> {
        let title = format!("olxfinder - {} on {}", search_term, source);
        self.line(Color::White, title.clone())?;
        self.line(Color::White, "=".repeat(title.chars().count()))
    }

    /// Grey summary of what the previous run left behind.
    pub fn show_loaded(&self, listings: usize, seen: usize) -> io::Result<()> {
        self.line(
            Color::DarkGrey,
            format!("📁 Loaded {} existing listings, {} seen URLs", listings, seen),
        )
    }

    pub fn show_page(&self, report: PageReport) -> io::Result<()> {
        let color = if report.items == 0 { Color::DarkGrey } else { Color::White };
        self.line(
            color,
            format!("  page {}/{}: {} listings", report.page, report.max_pages, report.items),
        )
    }

    pub fn finish_scraping(&self, found: usize, skipped: usize) -> io::Result<()> {
        self.line(Color::DarkGrey, format!("✓ Scraped {} listings", found))?;
        if skipped > 0 {
            self.line(Color::Yellow, format!("⚠ Skipped {} unreadable listing cards", skipped))?;
        }
        Ok(())
    }

    /// Progress bar for the liveness pass over `total` prior listings.
    pub fn liveness_bar(&self, total: usize) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("🔍 Checking listings {bar:30} {pos}/{len} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█░");
        bar.set_style(style);
        bar
    }

    pub fn show_pruning(&self, result: &Reconciliation) -> io::Result<()> {
        if !result.pruned {
            return Ok(());
        }
        if result.removed.is_empty() {
            return self.line(Color::DarkGrey, "✓ All previous listings are still online".to_string());
        }
        self.line(
            Color::Red,
            format!("✗ {} listings are gone and were removed", result.removed.len()),
        )?;
        for listing in &result.removed {
            self.line(Color::DarkGrey, format!("  {}", listing.url))?;
        }
        Ok(())
    }

    pub fn show_new_listings(&self, listings: &[Listing]) -> io::Result<()> {
        if listings.is_empty() {
            return self.line(Color::White, "No new ads found.".to_string());
        }

        self.line(Color::Green, format!("Found {} new ads:", listings.len()))?;
        for listing in listings {
            let color = if listing.price_changed() { Color::Green } else { Color::White };
            let mut summary = format!("{} - {} - {}", listing.title, listing.price, listing.location);
            if let Some(previous) = &listing.previous_price {
                summary.push_str(&format!(" (was {})", previous));
            }
            self.line(color, summary)?;
            self.line(Color::DarkGrey, format!("{}\n", listing.url))?;
        }
        Ok(())
    }

    pub fn show_price_updates(&self, listings: &[Listing]) -> io::Result<()> {
        if listings.is_empty() {
            return Ok(());
        }
        self.line(Color::Green, format!("💰 {} known listings changed price:", listings.len()))?;
        for listing in listings {
            self.line(
                Color::Green,
                format!(
                    "  {} - {} (was {})",
                    listing.title,
                    listing.price,
                    listing.previous_price.as_deref().unwrap_or("?")
                ),
            )?;
        }
        Ok(())
    }

    pub fn show_saved(&self, total: usize, report: &str, seen: &str) -> io::Result<()> {
        self.line(Color::White, "─".repeat(60))?;
        self.line(
            Color::Green,
            format!("✅ Saved {} listings to {} (seen URLs in {})", total, report, seen),
        )
    }
}

impl Default for RunTUI {
    fn default() -> Self {
        Self::new()
    }
}
