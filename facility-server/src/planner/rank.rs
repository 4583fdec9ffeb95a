//! Result ordering and incremental reveal.
//!
//! A [`ResultView`] sits over one cached [`SearchOutcome`]. Re-sorting
//! permutes the view, never the outcome, so no travel times are queried
//! again.

use std::sync::Arc;

use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;
use serde::{Deserialize, Serialize};
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use super::result::ReachabilityResult;
use super::search::SearchOutcome;

/// Sort order for displayed results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Primary travel duration.
    #[default]
    #[serde(alias = "duration")]
    Time,
    /// Route distance.
    Distance,
    /// Facility name.
    Name,
}

/// Indices of `results` in display order. Stable: ties keep input order.
pub fn sort_order(results: &[ReachabilityResult], key: SortKey) -> Vec<usize> {
    let mut order: Vec<usize> = (0..results.len()).collect();

    match key {
        SortKey::Time => {
            order.sort_by(|&a, &b| results[a].sort_key().total_cmp(&results[b].sort_key()));
        }
        SortKey::Distance => {
            order.sort_by(|&a, &b| {
                results[a]
                    .route_distance_meters()
                    .total_cmp(&results[b].route_distance_meters())
            });
        }
        SortKey::Name => {
            let keys: Vec<String> = results
                .iter()
                .map(|r| collation_key(&r.facility.name))
                .collect();
            let collator = japanese_collator();
            order.sort_by(|&a, &b| {
                let primary = match &collator {
                    Some(collator) => collator.compare(&keys[a], &keys[b]),
                    None => keys[a].cmp(&keys[b]),
                };
                primary.then_with(|| results[a].facility.name.cmp(&results[b].facility.name))
            });
        }
    }

    order
}

/// Width- and case-folded form of a name.
///
/// NFKC folds full-width Latin and digits and half-width kana onto their
/// common forms, so "ＡＢＣ病院" and "abc病院" sort together.
pub fn collation_key(name: &str) -> String {
    name.nfkc().flat_map(char::to_lowercase).collect()
}

/// Japanese collation: kana in gojūon order, hiragana and katakana
/// together. `None` falls back to code point order of the folded keys.
fn japanese_collator() -> Option<Collator> {
    match Collator::try_new(&locale!("ja").into(), CollatorOptions::new()) {
        Ok(collator) => Some(collator),
        Err(e) => {
            warn!(error = %e, "Japanese collation unavailable, sorting names by code point");
            None
        }
    }
}

/// One reveal step over the current view.
#[derive(Debug, Clone)]
pub struct Page {
    pub outcome: Arc<SearchOutcome>,
    pub sort: SortKey,
    /// Newly revealed results, in display order.
    pub items: Vec<ReachabilityResult>,
    /// Display position of the first item.
    pub start: usize,
    /// Total revealed so far, including `items`.
    pub revealed: usize,
    pub total: usize,
}

impl Page {
    pub fn has_more(&self) -> bool {
        self.revealed < self.total
    }
}

/// Sorted, incrementally revealed view over one outcome.
#[derive(Debug, Clone)]
pub struct ResultView {
    outcome: Arc<SearchOutcome>,
    order: Vec<usize>,
    sort: SortKey,
    revealed: usize,
    page_size: usize,
}

impl ResultView {
    /// A view in duration order with nothing revealed.
    pub fn new(outcome: Arc<SearchOutcome>, page_size: usize) -> Self {
        let order = sort_order(&outcome.results, SortKey::Time);
        Self {
            outcome,
            order,
            sort: SortKey::Time,
            revealed: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn outcome(&self) -> &Arc<SearchOutcome> {
        &self.outcome
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn total(&self) -> usize {
        self.order.len()
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed
    }

    pub fn remaining(&self) -> usize {
        self.total() - self.revealed
    }

    /// Everything revealed so far, in display order.
    pub fn revealed(&self) -> impl Iterator<Item = &ReachabilityResult> {
        self.order[..self.revealed]
            .iter()
            .map(|&i| &self.outcome.results[i])
    }

    /// Reveal up to one more page. Past the end this reveals nothing.
    pub fn reveal_next(&mut self) -> Page {
        let start = self.revealed;
        let end = (start + self.page_size).min(self.total());
        self.revealed = end;

        let items = self.order[start..end]
            .iter()
            .map(|&i| self.outcome.results[i].clone())
            .collect();

        Page {
            outcome: self.outcome.clone(),
            sort: self.sort,
            items,
            start,
            revealed: end,
            total: self.total(),
        }
    }

    /// Re-sort the same results and start revealing from zero.
    pub fn resort(&mut self, sort: SortKey) {
        self.order = sort_order(&self.outcome.results, sort);
        self.sort = sort;
        self.revealed = 0;
    }
}
