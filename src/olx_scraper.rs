use crate::errors::{ExtractError, SourceError};
use crate::models::Listing;
use crate::source::ListingSource;
use crate::debug_println;
use rand::Rng;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::thread;
use std::time::Duration;

pub const BASE_URL: &str = "https://www.olx.ro";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const CARD_SELECTOR: &str = r#"div[data-testid="listing-grid"] > div"#;
const LINK_SELECTOR: &str = "a.css-1tqlkj0";
const ANY_LINK_SELECTOR: &str = "a[href]";
const PRICE_SELECTOR: &str = r#"[data-testid="ad-price"]"#;
const LOCATION_SELECTOR: &str = r#"[data-testid="location-date"]"#;

const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
const MIN_PAGE_DELAY_MS: u64 = 2000;
const MAX_PAGE_DELAY_MS: u64 = 4000;

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Selector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

/// Compiled selectors for the OLX result grid.
pub struct ListingSelectors {
    card: Selector,
    link: Selector,
    any_link: Selector,
    price: Selector,
    location: Selector,
}

impl ListingSelectors {
    pub fn new() -> Result<Self, SourceError> {
        Ok(ListingSelectors {
            card: selector(CARD_SELECTOR)?,
            link: selector(LINK_SELECTOR)?,
            any_link: selector(ANY_LINK_SELECTOR)?,
            price: selector(PRICE_SELECTOR)?,
            location: selector(LOCATION_SELECTOR)?,
        })
    }
}

/// Scrapes OLX search results for one search slug.
pub struct OlxScraper {
    client: Client,
    selectors: ListingSelectors,
    search_slug: String,
}

impl OlxScraper {
    pub fn new(search_slug: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(PAGE_TIMEOUT)
            .cookie_store(true)
            .build()
            .map_err(SourceError::Client)?;

        Ok(OlxScraper {
            client,
            selectors: ListingSelectors::new()?,
            search_slug: search_slug.to_string(),
        })
    }

    pub fn page_url(&self, page: usize) -> String {
        search_page_url(&self.search_slug, page)
    }

    fn pause_between_pages(&self) {
        let millis = rand::thread_rng().gen_range(MIN_PAGE_DELAY_MS..=MAX_PAGE_DELAY_MS);
        debug_println!("Waiting {} ms before next page", millis);
        thread::sleep(Duration::from_millis(millis));
    }
}

impl ListingSource for OlxScraper {
    fn name(&self) -> &str {
        "olx.ro"
    }

    fn fetch_page(&mut self, page: usize) -> Result<Vec<Result<Listing, ExtractError>>, SourceError> {
        if page > 1 {
            self.pause_between_pages();
        }

        let url = self.page_url(page);
        debug_println!("Scraping page {}: {}", page, url);

        let fetch_error = |source| SourceError::Fetch {
            page,
            url: url.clone(),
            source,
        };

        let response = self.client.get(&url).send().map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                page,
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(fetch_error)?;
        Ok(parse_listing_page(&body, &self.selectors))
    }
}

pub fn search_page_url(search_slug: &str, page: usize) -> String {
    format!(
        "{}/d/oferte/q-{}/?page={}",
        BASE_URL,
        urlencoding::encode(search_slug),
        page
    )
}

/// Parse every card of one result page. Cards that cannot be read come back
/// as errors in place, so the caller decides what to skip.
pub fn parse_listing_page(html: &str, selectors: &ListingSelectors) -> Vec<Result<Listing, ExtractError>> {
    let document = Html::parse_document(html);

    document
        .select(&selectors.card)
        .map(|card| parse_card(card, selectors))
        .collect()
}

fn parse_card(card: ElementRef<'_>, selectors: &ListingSelectors) -> Result<Listing, ExtractError> {
    let link = card
        .select(&selectors.link)
        .next()
        .or_else(|| card.select(&selectors.any_link).next())
        .ok_or(ExtractError::MissingLink)?;

    let href = link
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(ExtractError::MissingLink)?;
    let url = absolute_url(href);

    let link_text = element_text(link);
    let title = link
        .value()
        .attr("title")
        .filter(|t| !t.trim().is_empty())
        .or(Some(link_text.as_str()));

    let price = card
        .select(&selectors.price)
        .next()
        .map(element_text)
        .ok_or_else(|| ExtractError::MissingPrice { url: url.clone() })?;

    let location = card
        .select(&selectors.location)
        .next()
        .map(element_text)
        .ok_or_else(|| ExtractError::MissingLocation { url: url.clone() })?;

    Ok(Listing::from_scraped(title, &url, &price, &location))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", BASE_URL, href)
    } else {
        format!("{}/{}", BASE_URL, href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <div data-testid="listing-grid">
            <div>
                <a class="css-1tqlkj0" href="/d/oferta/yamaha-mt-07-IDabc.html" title="Yamaha MT-07 2019">
                    <h6>Yamaha MT-07 2019</h6>
                </a>
                <p data-testid="ad-price">5 500 €</p>
                <p data-testid="location-date">Cluj-Napoca - Azi la 10:15</p>
            </div>
            <div>
                <a class="css-1tqlkj0" href="https://www.olx.ro/d/oferta/mt07-abs-IDdef.html">
                    MT 07   ABS
                </a>
                <p data-testid="ad-price">6 000 € Negociabil</p>
                <p data-testid="location-date">Bucuresti, Sector 3 - 12 mai 2024</p>
            </div>
            <div>
                <p>Promoted banner without a link</p>
            </div>
            <div>
                <a class="css-1tqlkj0" href="/d/oferta/no-price-IDghi.html" title="No price here"></a>
                <p data-testid="location-date">Iasi - Ieri</p>
            </div>
            <div>
                <a class="other" href="/d/oferta/fallback-IDjkl.html"></a>
                <p data-testid="ad-price">4 200 €</p>
                <p data-testid="location-date">Brasov</p>
            </div>
        </div>
        </body></html>
    "#;

    #[test]
    fn parses_cards_and_reports_broken_ones() {
        let selectors = ListingSelectors::new().unwrap();
        let items = parse_listing_page(PAGE, &selectors);
        assert_eq!(items.len(), 5);

        let first = items[0].as_ref().unwrap();
        assert_eq!(first.title, "Yamaha MT-07 2019");
        assert_eq!(first.url, "https://www.olx.ro/d/oferta/yamaha-mt-07-IDabc.html");
        assert_eq!(first.price, "5 500 €");
        assert_eq!(first.location, "Cluj-Napoca");
        assert_eq!(first.previous_price, None);

        let second = items[1].as_ref().unwrap();
        assert_eq!(second.title, "MT 07 ABS");
        assert_eq!(second.url, "https://www.olx.ro/d/oferta/mt07-abs-IDdef.html");
        assert_eq!(second.location, "Bucuresti, Sector 3");

        assert!(matches!(items[2], Err(ExtractError::MissingLink)));
        assert!(matches!(items[3], Err(ExtractError::MissingPrice { .. })));

        let fallback = items[4].as_ref().unwrap();
        assert_eq!(fallback.title, "No title");
        assert_eq!(fallback.url, "https://www.olx.ro/d/oferta/fallback-IDjkl.html");
        assert_eq!(fallback.location, "Brasov");
    }

    #[test]
    fn page_without_grid_is_empty() {
        let selectors = ListingSelectors::new().unwrap();
        let items = parse_listing_page("<html><body><p>Nu am gasit anunturi</p></body></html>", &selectors);
        assert!(items.is_empty());
    }

    #[test]
    fn builds_search_urls() {
        assert_eq!(
            search_page_url("yamaha-mt-07", 2),
            "https://www.olx.ro/d/oferte/q-yamaha-mt-07/?page=2"
        );
        assert_eq!(
            search_page_url("ducati-monster-821/s", 1),
            "https://www.olx.ro/d/oferte/q-ducati-monster-821%2Fs/?page=1"
        );
    }
}
