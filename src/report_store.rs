use crate::errors::StoreError;
use crate::models::{Listing, REPORT_COLUMNS};
use crate::debug_println;
use calamine::{open_workbook, Data, Reader, Xlsx};
use clap::ValueEnum;
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const SHEET_NAME: &str = "Ads";

/// Fill used for rows whose price changed since the last run.
pub const PRICE_CHANGE_FILL: u32 = 0xC6EFCE;

const COLUMN_WIDTHS: [f64; 5] = [48.0, 70.0, 16.0, 24.0, 16.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Xlsx => "xlsx",
            ReportFormat::Csv => "csv",
        }
    }
}

/// Persistence of the result table between runs.
pub trait ReportStore {
    fn path(&self) -> &Path;

    /// Load the previous table. A missing file is an empty table.
    fn load(&self) -> Result<Vec<Listing>, StoreError>;

    /// Overwrite the report with `listings`, marking rows with a previous price.
    fn save(&self, listings: &[Listing]) -> Result<(), StoreError>;
}

pub fn open_report_store(format: ReportFormat, path: impl Into<PathBuf>) -> Box<dyn ReportStore> {
    let path = path.into();
    match format {
        ReportFormat::Xlsx => Box::new(XlsxReportStore { path }),
        ReportFormat::Csv => Box::new(CsvReportStore { path }),
    }
}

/// Drop rows without a URL and later duplicates of a URL.
fn unique_rows(path: &Path, rows: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    let mut listings = Vec::with_capacity(rows.len());

    for row in rows {
        if row.url.is_empty() {
            debug_println!("Skipping row without URL in {}", path.display());
            continue;
        }
        if !seen.insert(row.url.clone()) {
            debug_println!("Skipping duplicate row {} in {}", row.url, path.display());
            continue;
        }
        listings.push(row);
    }

    listings
}

pub struct XlsxReportStore {
    path: PathBuf,
}

impl XlsxReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        XlsxReportStore { path: path.into() }
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    fn write_error(&self, source: rust_xlsxwriter::XlsxError) -> StoreError {
        StoreError::XlsxWrite {
            path: self.path_str(),
            source,
        }
    }

    fn column_index(&self, header: &[String], column: &'static str) -> Result<usize, StoreError> {
        header
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| StoreError::MissingColumn {
                path: self.path_str(),
                column,
            })
    }
}

fn cell_text(row: &[Data], index: usize) -> String {
    row.get(index)
        .map(|cell| cell.to_string().trim().to_string())
        .unwrap_or_default()
}

impl ReportStore for XlsxReportStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Listing>, StoreError> {
        if !self.path.exists() {
            debug_println!("Report does not exist: {}", self.path.display());
            return Ok(Vec::new());
        }

        let read_error = |reason: String| StoreError::XlsxRead {
            path: self.path_str(),
            reason,
        };

        let mut workbook: Xlsx<_> = open_workbook(&self.path).map_err(|e| read_error(format!("{}", e)))?;
        let range = match workbook.worksheet_range(SHEET_NAME) {
            Ok(range) => range,
            Err(_) => match workbook.worksheet_range_at(0) {
                Some(range) => range.map_err(|e| read_error(format!("{}", e)))?,
                None => return Ok(Vec::new()),
            },
        };

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(Vec::new());
        };
        let header: Vec<String> = header_row.iter().map(|c| c.to_string().trim().to_string()).collect();

        let title = self.column_index(&header, "Title")?;
        let url = self.column_index(&header, "URL")?;
        let price = self.column_index(&header, "Price")?;
        let location = self.column_index(&header, "Location")?;
        // Reports written before price tracking existed have no such column.
        let previous_price = header.iter().position(|h| h == "Previous Price");

        let parsed = rows
            .map(|row| Listing {
                title: cell_text(row, title),
                url: cell_text(row, url),
                price: cell_text(row, price),
                location: cell_text(row, location),
                previous_price: previous_price
                    .map(|index| cell_text(row, index))
                    .filter(|p| !p.is_empty()),
            })
            .collect();

        let listings = unique_rows(&self.path, parsed);
        debug_println!("Loaded {} listings from {}", listings.len(), self.path.display());
        Ok(listings)
    }

    fn save(&self, listings: &[Listing]) -> Result<(), StoreError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME).map_err(|e| self.write_error(e))?;

        let header_format = Format::new().set_bold();
        let highlight = Format::new()
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(PRICE_CHANGE_FILL));

        for (col, (name, width)) in REPORT_COLUMNS.iter().zip(COLUMN_WIDTHS).enumerate() {
            let col = col as u16;
            worksheet
                .write_string_with_format(0, col, *name, &header_format)
                .map_err(|e| self.write_error(e))?;
            worksheet.set_column_width(col, width).map_err(|e| self.write_error(e))?;
        }

        for (i, listing) in listings.iter().enumerate() {
            let row = (i + 1) as u32;
            let record = listing.to_record();

            for (col, value) in record.iter().enumerate() {
                let col = col as u16;
                if listing.price_changed() {
                    worksheet
                        .write_string_with_format(row, col, *value, &highlight)
                        .map_err(|e| self.write_error(e))?;
                } else if !value.is_empty() {
                    worksheet
                        .write_string(row, col, *value)
                        .map_err(|e| self.write_error(e))?;
                }
            }
        }

        workbook.save(&self.path).map_err(|e| self.write_error(e))?;
        debug_println!("Saved {} listings to {}", listings.len(), self.path.display());
        Ok(())
    }
}

/// CSV variant of the report. CSV carries no styling, so a price change is
/// visible through the Previous Price column alone.
pub struct CsvReportStore {
    path: PathBuf,
}

impl CsvReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvReportStore { path: path.into() }
    }

    fn csv_error(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ReportStore for CsvReportStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Listing>, StoreError> {
        if !self.path.exists() {
            debug_println!("Report does not exist: {}", self.path.display());
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.csv_error(e))?;
        let mut rows = Vec::new();
        for result in reader.deserialize() {
            let listing: Listing = result.map_err(|e| self.csv_error(e))?;
            rows.push(listing);
        }

        Ok(unique_rows(&self.path, rows))
    }

    fn save(&self, listings: &[Listing]) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_path(&self.path).map_err(|e| self.csv_error(e))?;

        writer.write_record(REPORT_COLUMNS).map_err(|e| self.csv_error(e))?;
        for listing in listings {
            writer
                .write_record(listing.to_record())
                .map_err(|e| self.csv_error(e))?;
        }

        writer.flush().map_err(|e| StoreError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;
        debug_println!("Saved {} listings to {}", listings.len(), self.path.display());
        Ok(())
    }
}
