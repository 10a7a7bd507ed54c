use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

pub const DEFAULT_TITLE: &str = "No title";

/// Column headers of the report, in the order they are written.
pub const REPORT_COLUMNS: [&str; 5] = ["Title", "URL", "Price", "Location", "Previous Price"];

/// One marketplace ad, either freshly scraped or loaded from the report.
///
/// `url` is the identity of a listing across runs. `price` is kept exactly as
/// the marketplace renders it and only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Listing {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Previous Price", default, deserialize_with = "empty_as_none")]
    pub previous_price: Option<String>,
}

impl Listing {
    /// Build a listing from raw scraped text, applying the title fallback and
    /// the location truncation.
    pub fn from_scraped(title: Option<&str>, url: &str, price: &str, location: &str) -> Self {
        let title = title
            .map(clean_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Listing {
            title,
            url: url.trim().to_string(),
            price: clean_text(price),
            location: short_location(location),
            previous_price: None,
        }
    }

    pub fn price_changed(&self) -> bool {
        self.previous_price.is_some()
    }

    pub fn to_record(&self) -> [&str; 5] {
        [
            &self.title,
            &self.url,
            &self.price,
            &self.location,
            self.previous_price.as_deref().unwrap_or(""),
        ]
    }
}

/// Collapse runs of whitespace and trim.
pub fn clean_text(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(text.trim(), " ").into_owned()
}

/// OLX renders "City - Date"; only the part before the first separator is kept.
pub fn short_location(text: &str) -> String {
    let cleaned = clean_text(text);
    match cleaned.split_once(" - ") {
        Some((place, _)) => place.trim().to_string(),
        None => cleaned,
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
