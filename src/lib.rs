pub mod debug;
pub mod errors;
pub mod liveness;
pub mod models;
pub mod olx_scraper;
pub mod reconcile;
pub mod report_store;
pub mod runner;
pub mod seen_store;
pub mod source;
pub mod tui;
pub mod utils;
