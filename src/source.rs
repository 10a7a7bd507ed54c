use crate::errors::{ExtractError, SourceError};
use crate::models::Listing;
use crate::{debug_eprintln, debug_println};
use std::collections::VecDeque;

/// Something that can produce result pages of listings for one search.
///
/// A page is a list of per-card outcomes so that one malformed card never
/// costs the rest of the page.
pub trait ListingSource {
    fn name(&self) -> &str;
    fn fetch_page(&mut self, page: usize) -> Result<Vec<Result<Listing, ExtractError>>, SourceError>;
}

/// Outcome of one scraped card.
#[derive(Debug)]
pub enum Scraped {
    Listing(Listing),
    Skipped(ExtractError),
}

/// Per-page progress reported while the stream advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageReport {
    pub page: usize,
    pub max_pages: usize,
    pub items: usize,
}

/// Lazily walks the result pages of a source.
///
/// Stops after `max_pages` or at the first page without any items. The stream
/// owns the source, so whatever session the source holds is released when the
/// stream is dropped, whether it ran to completion or not.
pub struct ListingStream<S: ListingSource> {
    source: S,
    max_pages: usize,
    next_page: usize,
    buffered: VecDeque<Result<Listing, ExtractError>>,
    finished: bool,
    on_page: Option<Box<dyn FnMut(PageReport)>>,
}

impl<S: ListingSource> ListingStream<S> {
    pub fn new(source: S, max_pages: usize) -> Self {
        ListingStream {
            source,
            max_pages,
            next_page: 1,
            buffered: VecDeque::new(),
            finished: max_pages == 0,
            on_page: None,
        }
    }

    pub fn on_page(mut self, callback: impl FnMut(PageReport) + 'static) -> Self {
        self.on_page = Some(Box::new(callback));
        self
    }

    fn fetch_next_page(&mut self) -> Result<(), SourceError> {
        let page = self.next_page;
        self.next_page += 1;

        debug_println!("{}: fetching page {}/{}", self.source.name(), page, self.max_pages);
        let items = self.source.fetch_page(page)?;

        if let Some(callback) = self.on_page.as_mut() {
            callback(PageReport {
                page,
                max_pages: self.max_pages,
                items: items.len(),
            });
        }

        if items.is_empty() {
            debug_println!("No listings on page {}, stopping", page);
            self.finished = true;
        } else if page >= self.max_pages {
            self.finished = true;
        }

        self.buffered.extend(items);
        Ok(())
    }
}

impl<S: ListingSource> Iterator for ListingStream<S> {
    type Item = Result<Scraped, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Some(Ok(match item {
                    Ok(listing) => Scraped::Listing(listing),
                    Err(e) => Scraped::Skipped(e),
                }));
            }
            if self.finished {
                return None;
            }
            if let Err(e) = self.fetch_next_page() {
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}

/// Drain a stream, dropping skipped cards. Returns the listings and the number
/// of skipped cards. A source error aborts the whole collection.
pub fn collect_listings<S: ListingSource>(stream: ListingStream<S>) -> Result<(Vec<Listing>, usize), SourceError> {
    let mut listings = Vec::new();
    let mut skipped = 0;

    for item in stream {
        match item? {
            Scraped::Listing(listing) => listings.push(listing),
            Scraped::Skipped(e) => {
                debug_eprintln!("Skipping listing card: {}", e);
                skipped += 1;
            }
        }
    }

    Ok((listings, skipped))
}
