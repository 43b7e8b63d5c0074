//! `src/model/paged_state.rs`
//! ============================================================================
//! # Paged accumulation state machine
//!
//! Synchronous core of the loader: owns the accumulated list of one epoch,
//! the last probed total, the single-flight loading flag and the delivery
//! version. Nothing here spawns or awaits; the controller feeds completions in
//! and reads decisions out.

use std::sync::Arc;

use tracing::debug;

use super::page::{Epoch, Total};

/// Positions this close to the end of the held list trigger the next fetch.
pub const PREFETCH_WINDOW: usize = 3;

/// Outcome of evaluating `start()` against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// Nothing held yet and the source did not confirm an empty result.
    FetchInitial,

    /// A bound position asked for more and the total says more exists.
    FetchRequested,

    /// Everything currently needed is already held.
    Deliver,
}

impl StartDecision {
    #[must_use]
    pub const fn needs_fetch(self) -> bool {
        !matches!(self, Self::Deliver)
    }
}

/// What the listener receives after a load cycle.
#[derive(Debug, Clone)]
pub struct Delivery<T> {
    pub epoch: Epoch,
    /// Bumped on every list replacement within the epoch.
    pub version: u64,
    /// `false` only when the same version was already delivered.
    pub changed: bool,
    pub total: Total,
    pub items: Arc<Vec<T>>,
}

impl<T> Delivery<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
pub struct PagedState<T> {
    items: Arc<Vec<T>>,
    total: Total,
    loading: bool,
    outstanding: Option<usize>,
    content_changed: bool,
    version: u64,
    delivered_version: Option<u64>,
}

impl<T> Default for PagedState<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            total: Total::Unknown,
            loading: false,
            outstanding: None,
            content_changed: false,
            version: 0,
            delivered_version: None,
        }
    }
}

impl<T: Clone> PagedState<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn items(&self) -> &Arc<Vec<T>> {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn total(&self) -> Total {
        self.total
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Offset of the fetch currently in flight, if any.
    #[must_use]
    pub const fn outstanding(&self) -> Option<usize> {
        self.outstanding
    }

    #[must_use]
    pub const fn content_changed(&self) -> bool {
        self.content_changed
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    pub fn set_total(&mut self, total: Total) {
        self.total = total;
    }

    /// Applies a start probe issued while the list was at `issued_version`.
    /// A page that landed since carried a newer total, which wins; returns
    /// `false` when the probe answer was dropped for that reason.
    pub fn apply_probed_total(&mut self, total: Total, issued_version: u64) -> bool {
        if self.version != issued_version {
            debug!(
                probed = %total,
                kept = %self.total,
                "Start-time total overtaken by a page"
            );
            return false;
        }

        self.total = total;
        true
    }

    /// Evaluates the start rules in order and consumes the pending
    /// bound-triggered intent.
    pub fn decide_start(&mut self) -> StartDecision {
        let requested = std::mem::take(&mut self.content_changed);

        let decision = if self.items.is_empty() && !self.total.is_zero() {
            StartDecision::FetchInitial
        } else if requested && self.total.known_to_exceed(self.items.len()) {
            StartDecision::FetchRequested
        } else {
            StartDecision::Deliver
        };

        // A flag raised ahead of a fetch that will not happen must not
        // block later prefetches.
        if decision == StartDecision::Deliver && self.outstanding.is_none() {
            self.loading = false;
        }

        decision
    }

    /// Pure prefetch predicate for a bound position.
    #[must_use]
    pub fn should_prefetch(&self, position: usize) -> bool {
        let size = self.items.len();

        position.saturating_add(PREFETCH_WINDOW) > size
            && !self.loading
            && self.total.may_exceed(size)
    }

    /// Records a bound position. Returns `true` when it raised the loading
    /// flag and the caller has to fetch.
    pub fn on_item_bound(&mut self, position: usize) -> bool {
        if !self.should_prefetch(position) {
            return false;
        }

        self.content_changed = true;
        self.loading = true;
        true
    }

    /// Claims the single fetch slot. `None` when a fetch is already in
    /// flight.
    pub fn claim_fetch(&mut self) -> Option<usize> {
        if self.outstanding.is_some() {
            return None;
        }

        let offset = self.items.len();
        self.loading = true;
        self.outstanding = Some(offset);
        self.content_changed = false;
        Some(offset)
    }

    /// Appends a completed page by building a fresh list. Every call bumps
    /// the version, empty pages included.
    pub fn apply_page(&mut self, page: Vec<T>, total: Total) {
        debug_assert_eq!(self.outstanding, Some(self.items.len()));

        let mut next: Vec<T> = Vec::with_capacity(self.items.len() + page.len());
        next.extend(self.items.iter().cloned());
        next.extend(page);

        if let Total::Known(n) = total {
            if n < next.len() {
                debug!(
                    held = next.len(),
                    total = n,
                    "Source reported fewer items than it delivered"
                );
            }
        }

        self.items = Arc::new(next);
        self.total = total;
        self.version += 1;
        self.loading = false;
        self.outstanding = None;
    }

    /// Releases the fetch slot after a failed load; held data is kept.
    pub fn fail_fetch(&mut self) {
        self.loading = false;
        self.outstanding = None;
    }

    /// Drops a pending bound intent when the start rules could not run.
    pub fn abandon_start(&mut self) {
        self.content_changed = false;
        if self.outstanding.is_none() {
            self.loading = false;
        }
    }

    /// Snapshot for the listener, flagging whether this version is new.
    pub fn delivery(&mut self, epoch: Epoch) -> Delivery<T> {
        let changed = self.delivered_version != Some(self.version);
        self.delivered_version = Some(self.version);

        Delivery {
            epoch,
            version: self.version,
            changed,
            total: self.total,
            items: Arc::clone(&self.items),
        }
    }
}
