use thiserror::Error;

/// One listing card could not be turned into a `Listing`. The card is skipped.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("listing card has no link")]
    MissingLink,
    #[error("listing {url} has no price")]
    MissingPrice { url: String },
    #[error("listing {url} has no location")]
    MissingLocation { url: String },
}

/// A liveness check failed. Always folded into "inactive".
#[derive(Debug, Error)]
pub enum LivenessError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

/// The listing source itself broke down. Aborts the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to fetch result page {page} ({url}): {source}")]
    Fetch {
        page: usize,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("result page {page} ({url}) answered with HTTP {status}")]
    Status { page: usize, url: String, status: u16 },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid selector {selector}: {reason}")]
    Selector { selector: String, reason: String },
}

/// Reading or writing a persisted file failed for a reason other than the
/// file being absent.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read workbook {path}: {reason}")]
    XlsxRead { path: String, reason: String },
    #[error("failed to write workbook {path}: {source}")]
    XlsxWrite {
        path: String,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("report {path} is missing the {column} column")]
    MissingColumn { path: String, column: &'static str },
}
