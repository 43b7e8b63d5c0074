//! `src/source/item_source.rs`
//! ============================================================================
//! # ItemSource: the only data boundary of the picker
//!
//! The host application implements this trait; the loader calls it from
//! background tasks only. Both calls may be slow or I/O bound.

use async_trait::async_trait;

use crate::{
    error::CoreResult,
    model::page::{Filter, Total},
};

/// Supplier of total counts and item pages for a filter.
///
/// Nothing about the answers is assumed to be stable: `total` may grow,
/// shrink or disagree with what `load` eventually returns, and the loader
/// copes with all of it.
#[async_trait]
pub trait ItemSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    /// Best-known count of items matching `filter`. Called often, so keep it
    /// cheap or cached (see [`CachedTotalSource`](super::cached::CachedTotalSource)).
    async fn total(&self, filter: &Filter) -> CoreResult<Total>;

    /// Next batch starting at `offset`, the number of items already held
    /// for `filter`. An empty batch means nothing more is available right
    /// now. Batch size is up to the source.
    async fn load(&self, filter: &Filter, offset: usize) -> CoreResult<Vec<Self::Item>>;
}
