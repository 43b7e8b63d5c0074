//! In-memory [`ItemSource`] over a fixed vector.
//!
//! Filtering is a caller-supplied predicate; the picker itself never
//! interprets filter text.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::trace;

use super::item_source::ItemSource;
use crate::{
    error::CoreResult,
    model::page::{Filter, Total},
};

type Matcher<T> = Arc<dyn Fn(&T, &str) -> bool + Send + Sync>;

pub struct MemorySource<T> {
    items: Arc<Vec<T>>,
    matcher: Matcher<T>,
    page_size: usize,
    latency: Duration,
    report_total: bool,
}

impl<T> fmt::Debug for MemorySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("items", &self.items.len())
            .field("page_size", &self.page_size)
            .field("latency", &self.latency)
            .field("report_total", &self.report_total)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> MemorySource<T> {
    pub const DEFAULT_PAGE_SIZE: usize = 20;

    /// `matcher(item, text)` decides whether `item` matches filter `text`.
    /// An absent filter matches everything.
    pub fn new(items: Vec<T>, matcher: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            items: Arc::new(items),
            matcher: Arc::new(matcher),
            page_size: Self::DEFAULT_PAGE_SIZE,
            latency: Duration::ZERO,
            report_total: true,
        }
    }

    /// Page size is clamped to at least one item.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes `total` answer [`Total::Unknown`], like a source for which
    /// counting is too expensive.
    #[must_use]
    pub const fn with_unknown_total(mut self) -> Self {
        self.report_total = false;
        self
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    fn matching<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a T> + 'a {
        self.items
            .iter()
            .filter(move |item| filter.as_str().is_none_or(|text| (self.matcher)(item, text)))
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl MemorySource<String> {
    /// Case-insensitive substring matching over plain strings.
    pub fn substring(items: Vec<String>) -> Self {
        Self::new(items, |item, text| {
            item.to_lowercase().contains(&text.to_lowercase())
        })
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> ItemSource for MemorySource<T> {
    type Item = T;

    async fn total(&self, filter: &Filter) -> CoreResult<Total> {
        self.simulate_latency().await;

        if !self.report_total {
            return Ok(Total::Unknown);
        }

        Ok(Total::Known(self.matching(filter).count()))
    }

    async fn load(&self, filter: &Filter, offset: usize) -> CoreResult<Vec<T>> {
        self.simulate_latency().await;

        let page: Vec<T> = self
            .matching(filter)
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();

        trace!(%filter, offset, returned = page.len(), "Served page from memory");
        Ok(page)
    }
}
