//! Merge of the previous run's table, the liveness of its listings and a fresh
//! scrape into the next table and seen-set.
//!
//! The merge is a pure function of its inputs plus the liveness answers; it
//! never touches the stores.

use crate::liveness::{check_all, LivenessChecker};
use crate::models::Listing;
use indicatif::ProgressBar;
use std::collections::{HashMap, HashSet};

/// What happens to listings that are already in the table and show up again
/// in the scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricePolicy {
    /// Re-scraped listings from the loaded seen-set are dropped, even when
    /// their price moved. Only listings missing from the seen-set can get a
    /// previous price.
    #[default]
    Verbatim,
    /// Additionally update known listings whose price moved: the row keeps its
    /// place, takes the new price and records the old one.
    TrackExisting,
}

/// State loaded from the previous run.
#[derive(Debug, Clone, Default)]
pub struct PriorState {
    pub table: Vec<Listing>,
    pub seen: HashSet<String>,
}

#[derive(Clone, Copy)]
pub struct ReconcileOptions<'a> {
    pub workers: usize,
    pub policy: PricePolicy,
    pub progress: Option<&'a ProgressBar>,
}

impl Default for ReconcileOptions<'_> {
    fn default() -> Self {
        Self {
            workers: crate::liveness::DEFAULT_WORKERS,
            policy: PricePolicy::Verbatim,
            progress: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Surviving prior rows followed by new listings in scrape order.
    pub table: Vec<Listing>,
    /// Exactly the URL column of `table`.
    pub seen: HashSet<String>,
    /// New listings appended this run, as they appear in `table`.
    pub new_listings: Vec<Listing>,
    /// Prior rows dropped because their listing is gone.
    pub removed: Vec<Listing>,
    /// Prior rows whose price was updated in place (`TrackExisting` only).
    pub price_updates: Vec<Listing>,
    /// Whether the liveness pass ran at all.
    pub pruned: bool,
}

impl Reconciliation {
    /// A run only rewrites the files when it produced something new.
    pub fn has_changes(&self) -> bool {
        !self.new_listings.is_empty() || !self.price_updates.is_empty()
    }

    /// URLs in table order, for the seen-set file.
    pub fn seen_in_order(&self) -> impl Iterator<Item = &str> {
        self.table.iter().map(|l| l.url.as_str())
    }
}

/// Prior listings the checker still reports as live, plus the ones it dropped.
///
/// All checks finish before this returns.
pub fn prune<C>(checker: &C, table: Vec<Listing>, options: &ReconcileOptions<'_>) -> (Vec<Listing>, Vec<Listing>)
where
    C: LivenessChecker + ?Sized,
{
    let urls: Vec<&str> = table.iter().map(|l| l.url.as_str()).collect();
    let alive = check_all(checker, &urls, options.workers, options.progress);

    let mut kept = Vec::with_capacity(table.len());
    let mut removed = Vec::new();
    for (listing, active) in table.into_iter().zip(alive) {
        if active {
            kept.push(listing);
        } else {
            removed.push(listing);
        }
    }

    (kept, removed)
}

pub fn reconcile<C>(
    checker: &C,
    prior: PriorState,
    scraped: Vec<Listing>,
    options: &ReconcileOptions<'_>,
) -> Reconciliation
where
    C: LivenessChecker + ?Sized,
{
    let PriorState {
        table: prior_table,
        seen: prior_seen,
    } = prior;

    // Prices come from the table as loaded, before anything is pruned.
    let prior_prices: HashMap<String, String> = prior_table
        .iter()
        .map(|l| (l.url.clone(), l.price.clone()))
        .collect();

    // An empty table says nothing about what was seen, so the loaded
    // seen-set is kept as is in that case.
    let pruned = !prior_table.is_empty();
    let (mut table, removed, seen_after_prune) = if pruned {
        let (kept, removed) = prune(checker, prior_table, options);
        let seen: HashSet<String> = kept.iter().map(|l| l.url.clone()).collect();
        (kept, removed, seen)
    } else {
        (Vec::new(), Vec::new(), prior_seen.clone())
    };

    let mut price_updates = Vec::new();
    let mut new_listings = Vec::new();
    let mut scraped_urls = HashSet::new();

    for mut listing in scraped {
        if !scraped_urls.insert(listing.url.clone()) {
            continue;
        }

        if seen_after_prune.contains(&listing.url) {
            if options.policy == PricePolicy::TrackExisting {
                if let Some(row) = table.iter_mut().find(|row| row.url == listing.url) {
                    if row.price != listing.price {
                        row.previous_price = Some(std::mem::replace(&mut row.price, listing.price));
                        price_updates.push(row.clone());
                    }
                }
            }
            continue;
        }

        // Seen on an earlier run but pruned since: it stays out.
        if prior_seen.contains(&listing.url) {
            continue;
        }

        listing.previous_price = prior_prices
            .get(&listing.url)
            .filter(|old| !old.is_empty() && **old != listing.price)
            .cloned();

        new_listings.push(listing);
    }

    table.extend(new_listings.iter().cloned());
    let seen = table.iter().map(|l| l.url.clone()).collect();

    Reconciliation {
        table,
        seen,
        new_listings,
        removed,
        price_updates,
        pruned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Checker {
        active: HashSet<String>,
        calls: Mutex<usize>,
    }

    impl Checker {
        fn alive(urls: &[&str]) -> Self {
            Checker {
                active: urls.iter().map(|u| u.to_string()).collect(),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl LivenessChecker for Checker {
        fn is_active(&self, url: &str) -> bool {
            *self.calls.lock().unwrap() += 1;
            self.active.contains(url)
        }
    }

    fn ad(url: &str, price: &str) -> Listing {
        Listing {
            title: format!("ad {}", url),
            url: url.to_string(),
            price: price.to_string(),
            location: "Cluj".to_string(),
            previous_price: None,
        }
    }

    fn ad_was(url: &str, price: &str, previous: &str) -> Listing {
        Listing {
            previous_price: Some(previous.to_string()),
            ..ad(url, price)
        }
    }

    fn seen(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    fn urls(table: &[Listing]) -> Vec<&str> {
        table.iter().map(|l| l.url.as_str()).collect()
    }

    fn run(checker: &Checker, table: Vec<Listing>, seen_urls: &[&str], scraped: Vec<Listing>) -> Reconciliation {
        let prior = PriorState {
            table,
            seen: seen(seen_urls),
        };
        reconcile(checker, prior, scraped, &ReconcileOptions::default())
    }

    #[test]
    fn known_listing_with_new_price_is_filtered() {
        let checker = Checker::alive(&["a"]);

        let result = run(&checker, vec![ad("a", "100")], &["a"], vec![ad("a", "150"), ad("b", "200")]);

        assert_eq!(result.table, vec![ad("a", "100"), ad("b", "200")]);
        assert_eq!(result.new_listings, vec![ad("b", "200")]);
        assert_eq!(result.seen, seen(&["a", "b"]));
        assert!(result.price_updates.is_empty());
    }

    #[test]
    fn empty_table_keeps_loaded_seen_set() {
        let checker = Checker::alive(&[]);

        let result = run(&checker, vec![], &["x"], vec![ad("x", "50")]);

        assert!(!result.pruned);
        assert_eq!(checker.calls(), 0);
        assert!(result.table.is_empty());
        assert!(result.seen.is_empty());
        assert!(!result.has_changes());
    }

    #[test]
    fn dead_listings_are_pruned() {
        let checker = Checker::alive(&["a", "c"]);
        let prior = vec![ad("a", "1"), ad("b", "2"), ad("c", "3"), ad("d", "4")];

        let result = run(&checker, prior.clone(), &["a", "b", "c", "d"], vec![]);

        assert!(result.pruned);
        assert_eq!(checker.calls(), 4);
        assert!(result.table.len() <= prior.len());
        assert_eq!(urls(&result.table), vec!["a", "c"]);
        assert_eq!(urls(&result.removed), vec!["b", "d"]);
        assert!(result.table.iter().all(|l| checker.active.contains(&l.url)));
    }

    #[test]
    fn seen_set_matches_table_urls() {
        let checker = Checker::alive(&["a"]);

        let result = run(
            &checker,
            vec![ad("a", "1"), ad("b", "2")],
            &["a", "b", "z"],
            vec![ad("c", "3"), ad("a", "1"), ad("d", "4")],
        );

        let column: HashSet<String> = result.table.iter().map(|l| l.url.clone()).collect();
        assert_eq!(result.seen, column);
        assert_eq!(result.seen.len(), result.table.len());
        assert_eq!(result.seen_in_order().collect::<Vec<_>>(), vec!["a", "c", "d"]);
    }

    #[test]
    fn unseen_listing_with_recorded_price_gets_previous_price() {
        // "b" is in the table but missing from the seen file, e.g. after the
        // seen file was deleted by hand; it is dead so it gets re-added.
        let checker = Checker::alive(&["a"]);

        let result = run(
            &checker,
            vec![ad("a", "100"), ad("b", "200"), ad("c", "300")],
            &["a"],
            vec![ad("b", "180"), ad("c", "300")],
        );

        assert_eq!(
            result.table,
            vec![ad("a", "100"), ad_was("b", "180", "200"), ad("c", "300")]
        );
    }

    #[test]
    fn seen_listing_pruned_then_rescraped_stays_out() {
        // "b" was seen before, failed the liveness check and shows up again.
        let checker = Checker::alive(&["a"]);

        let result = run(&checker, vec![ad("a", "1"), ad("b", "2")], &["a", "b"], vec![ad("b", "3")]);

        assert_eq!(result.table, vec![ad("a", "1")]);
        assert_eq!(result.seen, seen(&["a"]));
        assert!(!result.has_changes());
    }

    #[test]
    fn seen_listing_pruned_then_rescraped_stays_out_when_tracking() {
        let checker = Checker::alive(&["a"]);
        let options = ReconcileOptions {
            policy: PricePolicy::TrackExisting,
            ..ReconcileOptions::default()
        };
        let prior = PriorState {
            table: vec![ad("a", "1"), ad("b", "2")],
            seen: seen(&["a", "b"]),
        };

        let result = reconcile(&checker, prior, vec![ad("b", "3")], &options);

        assert_eq!(result.table, vec![ad("a", "1")]);
        assert!(result.price_updates.is_empty());
    }

    #[test]
    fn empty_recorded_price_is_not_a_price_change() {
        // "b" sits in the table with an empty price cell but not in the seen file.
        let checker = Checker::alive(&["a"]);

        let result = run(&checker, vec![ad("a", "1"), ad("b", "")], &["a"], vec![ad("b", "250")]);

        assert_eq!(result.table, vec![ad("a", "1"), ad("b", "250")]);
        assert!(!result.table[1].price_changed());
    }

    #[test]
    fn reconciling_twice_without_scrape_is_stable() {
        let checker = Checker::alive(&["a", "b"]);
        let prior = vec![ad("a", "1"), ad_was("b", "2", "3")];

        let first = run(&checker, prior.clone(), &["a", "b"], vec![]);
        let second = reconcile(
            &checker,
            PriorState {
                table: first.table.clone(),
                seen: first.seen.clone(),
            },
            vec![],
            &ReconcileOptions::default(),
        );

        assert_eq!(first.table, prior);
        assert_eq!(second.table, prior);
        assert_eq!(first.seen, second.seen);
        assert!(!second.has_changes());
    }

    #[test]
    fn duplicates_within_one_scrape_keep_first() {
        let checker = Checker::alive(&[]);

        let result = run(&checker, vec![], &[], vec![ad("a", "1"), ad("b", "2"), ad("a", "9")]);

        assert_eq!(result.table, vec![ad("a", "1"), ad("b", "2")]);
    }

    #[test]
    fn new_listings_keep_scrape_order_after_prior_rows() {
        let checker = Checker::alive(&["p", "q"]);

        let result = run(
            &checker,
            vec![ad("q", "1"), ad("p", "2")],
            &["p", "q"],
            vec![ad("z", "1"), ad("p", "2"), ad("m", "3")],
        );

        assert_eq!(urls(&result.table), vec!["q", "p", "z", "m"]);
    }

    #[test]
    fn stale_previous_price_of_rescraped_listing_is_cleared() {
        let checker = Checker::alive(&[]);

        let mut scraped = ad("n", "5");
        scraped.previous_price = Some("bogus".to_string());
        let result = run(&checker, vec![], &[], vec![scraped]);

        assert_eq!(result.table, vec![ad("n", "5")]);
    }

    #[test]
    fn tracking_policy_updates_known_price_in_place() {
        let checker = Checker::alive(&["a", "b"]);
        let prior = PriorState {
            table: vec![ad("a", "100"), ad("b", "7")],
            seen: seen(&["a", "b"]),
        };
        let options = ReconcileOptions {
            policy: PricePolicy::TrackExisting,
            ..ReconcileOptions::default()
        };

        let result = reconcile(
            &checker,
            prior,
            vec![ad("a", "150"), ad("b", "7"), ad("c", "200")],
            &options,
        );

        assert_eq!(
            result.table,
            vec![ad_was("a", "150", "100"), ad("b", "7"), ad("c", "200")]
        );
        assert_eq!(result.price_updates, vec![ad_was("a", "150", "100")]);
        assert_eq!(result.seen, seen(&["a", "b", "c"]));
    }

    #[test]
    fn tracking_policy_without_new_listings_still_reports_changes() {
        let checker = Checker::alive(&["a"]);
        let options = ReconcileOptions {
            policy: PricePolicy::TrackExisting,
            workers: 1,
            progress: None,
        };

        let result = reconcile(
            &checker,
            PriorState {
                table: vec![ad("a", "100")],
                seen: seen(&["a"]),
            },
            vec![ad("a", "90")],
            &options,
        );

        assert!(result.new_listings.is_empty());
        assert!(result.has_changes());
    }
}
