//! `src/source/cached.rs`
//! ============================================================================
//! # Total-count cache
//!
//! The loader probes `total` at every start and after every page, so an
//! expensive count belongs behind a cache. Pages are never cached: the
//! loader already holds everything it fetched for the active filter.

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, trace};

use super::item_source::ItemSource;
use crate::{
    config::CacheConfig,
    error::CoreResult,
    model::page::{Filter, Total},
};

pub struct CachedTotalSource<S> {
    inner: S,
    totals: Cache<Filter, Total>,
}

impl<S: ItemSource> CachedTotalSource<S> {
    #[must_use]
    pub fn new(inner: S, config: &CacheConfig) -> Self {
        let totals = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();

        Self { inner, totals }
    }

    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Drops every cached total, e.g. after the backing data changed.
    pub fn invalidate_all(&self) {
        self.totals.invalidate_all();
    }

    pub async fn invalidate(&self, filter: &Filter) {
        self.totals.invalidate(filter).await;
    }
}

#[async_trait]
impl<S: ItemSource> ItemSource for CachedTotalSource<S> {
    type Item = S::Item;

    async fn total(&self, filter: &Filter) -> CoreResult<Total> {
        if let Some(total) = self.totals.get(filter).await {
            trace!(%filter, %total, "Total cache hit");
            return Ok(total);
        }

        // failures fall through uncached so the next probe asks again
        let total = self.inner.total(filter).await?;
        debug!(%filter, %total, "Caching probed total");
        self.totals.insert(filter.clone(), total).await;

        Ok(total)
    }

    async fn load(&self, filter: &Filter, offset: usize) -> CoreResult<Vec<Self::Item>> {
        self.inner.load(filter, offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedSource;

    #[tokio::test]
    async fn repeated_probes_hit_the_cache() {
        let cached = CachedTotalSource::new(ScriptedSource::new(10, 4), &CacheConfig::default());
        let filter = Filter::new("a");

        assert_eq!(cached.total(&filter).await, Ok(Total::Known(10)));
        assert_eq!(cached.total(&filter).await, Ok(Total::Known(10)));
        assert_eq!(cached.inner().total_calls(), 1);

        cached.total(&Filter::none()).await.unwrap();
        assert_eq!(cached.inner().total_calls(), 2);
    }

    #[tokio::test]
    async fn failed_probes_are_not_cached() {
        let cached = CachedTotalSource::new(ScriptedSource::new(10, 4), &CacheConfig::default());
        cached.inner().fail_totals(true);

        assert!(cached.total(&Filter::none()).await.is_err());

        cached.inner().fail_totals(false);
        assert_eq!(cached.total(&Filter::none()).await, Ok(Total::Known(10)));
        assert_eq!(cached.inner().total_calls(), 2);
    }

    #[tokio::test]
    async fn invalidation_forces_a_fresh_probe() {
        let cached = CachedTotalSource::new(ScriptedSource::new(10, 4), &CacheConfig::default());
        cached.total(&Filter::none()).await.unwrap();

        cached.inner().set_total(Total::Known(3));
        cached.invalidate(&Filter::none()).await;

        assert_eq!(cached.total(&Filter::none()).await, Ok(Total::Known(3)));
    }

    #[tokio::test]
    async fn loads_pass_straight_through() {
        let cached = CachedTotalSource::new(ScriptedSource::new(10, 4), &CacheConfig::default());
        let page = cached.load(&Filter::none(), 8).await.unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(cached.inner().load_calls(), 1);
    }
}
