use crate::debug_eprintln;
use crate::errors::{LivenessError, SourceError};
use indicatif::ProgressBar;
use reqwest::blocking::Client;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Text OLX serves in place of a listing that was taken down.
pub const REMOVED_MARKER: &str = "Anuntul pe care il cauti nu mai exista";

pub const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Active,
    Removed,
}

/// Decides whether a previously recorded listing is still online.
///
/// Implementations hold no mutable state so that `check_all` can call them
/// from several threads at once.
pub trait LivenessChecker: Sync {
    fn is_active(&self, url: &str) -> bool;
}

pub struct HttpLivenessChecker {
    client: Client,
}

impl HttpLivenessChecker {
    pub fn new() -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(crate::olx_scraper::USER_AGENT)
            .timeout(CHECK_TIMEOUT)
            .build()
            .map_err(SourceError::Client)?;

        Ok(HttpLivenessChecker { client })
    }

    /// Fetch the listing page once. No retries.
    pub fn fetch_liveness(&self, url: &str) -> Result<Liveness, LivenessError> {
        let request_error = |source| LivenessError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LivenessError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(request_error)?;
        Ok(classify_body(&body))
    }
}

impl LivenessChecker for HttpLivenessChecker {
    fn is_active(&self, url: &str) -> bool {
        match self.fetch_liveness(url) {
            Ok(Liveness::Active) => true,
            Ok(Liveness::Removed) => {
                debug_eprintln!("Listing removed: {}", url);
                false
            }
            Err(e) => {
                debug_eprintln!("Liveness check failed, treating as inactive: {}", e);
                false
            }
        }
    }
}

pub fn classify_body(body: &str) -> Liveness {
    if body.contains(REMOVED_MARKER) {
        Liveness::Removed
    } else {
        Liveness::Active
    }
}

/// Check every URL with at most `workers` threads.
///
/// Results come back in the order of `urls`. The call returns only once every
/// check has finished.
pub fn check_all<C>(checker: &C, urls: &[&str], workers: usize, progress: Option<&ProgressBar>) -> Vec<bool>
where
    C: LivenessChecker + ?Sized,
{
    if urls.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, urls.len());
    let next = AtomicUsize::new(0);
    let results: Vec<AtomicBool> = urls.iter().map(|_| AtomicBool::new(false)).collect();

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(url) = urls.get(index) else {
                    break;
                };
                results[index].store(checker.is_active(url), Ordering::Relaxed);
                if let Some(bar) = progress {
                    bar.inc(1);
                }
            });
        }
    });

    results.into_iter().map(AtomicBool::into_inner).collect()
}
