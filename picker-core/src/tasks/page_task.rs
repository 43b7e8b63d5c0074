//! Background page task: one tokio task per total probe or page fetch
//!
//! Tasks never touch loader state. They call the item source and report the
//! outcome, tagged with the epoch that issued them, over the loader channel.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{Instrument, Span, debug, field::Empty as EmptyTraceField, instrument};

use crate::{
    error::CoreResult,
    model::page::{Epoch, Filter, PageRequest, Total},
    source::item_source::ItemSource,
};

/// A fetched page plus the total probed right after it.
#[derive(Debug)]
pub struct LoadedPage<T> {
    pub items: Vec<T>,
    pub total: CoreResult<Total>,
}

/// Completion messages sent back to the controlling task.
#[derive(Debug)]
pub enum LoaderEvent<T> {
    TotalProbed {
        epoch: Epoch,
        result: CoreResult<Total>,
    },

    PageLoaded {
        request: PageRequest,
        result: CoreResult<LoadedPage<T>>,
        elapsed: Duration,
    },
}

impl<T> LoaderEvent<T> {
    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        match self {
            Self::TotalProbed { epoch, .. } => *epoch,
            Self::PageLoaded { request, .. } => request.epoch,
        }
    }
}

pub struct PageTask;

impl PageTask {
    #[instrument(
        skip_all,
        fields(
            operation_type = "total_probe",
            epoch = %epoch,
            filter = %filter,
        )
    )]
    pub fn probe_total<S: ItemSource>(
        epoch: Epoch,
        filter: Filter,
        source: Arc<S>,
        task_tx: UnboundedSender<LoaderEvent<S::Item>>,
    ) -> JoinHandle<()> {
        tokio::spawn(
            async move {
                let result = source.total(&filter).await;
                debug!(ok = result.is_ok(), "Total probe finished");

                // the receiver is gone once the picker closed
                let _ = task_tx.send(LoaderEvent::TotalProbed { epoch, result });
            }
            .in_current_span(),
        )
    }

    #[instrument(
        skip_all,
        fields(
            operation_type = "page_fetch",
            epoch = %request.epoch,
            filter = %request.filter,
            offset = request.offset,
            returned = EmptyTraceField,
            elapsed_ms = EmptyTraceField,
        )
    )]
    pub fn fetch_page<S: ItemSource>(
        request: PageRequest,
        source: Arc<S>,
        task_tx: UnboundedSender<LoaderEvent<S::Item>>,
    ) -> JoinHandle<()> {
        tokio::spawn(
            async move {
                let started = Instant::now();
                let result = Self::load_then_probe(&request, source.as_ref()).await;
                let elapsed = started.elapsed();

                let span = Span::current();
                span.record("elapsed_ms", elapsed.as_millis() as u64);
                if let Ok(page) = &result {
                    span.record("returned", page.items.len() as u64);
                }
                debug!(ok = result.is_ok(), "Page fetch finished");

                let _ = task_tx.send(LoaderEvent::PageLoaded {
                    request,
                    result,
                    elapsed,
                });
            }
            .in_current_span(),
        )
    }

    async fn load_then_probe<S: ItemSource>(
        request: &PageRequest,
        source: &S,
    ) -> CoreResult<LoadedPage<S::Item>> {
        let items = source.load(&request.filter, request.offset).await?;
        let total = source.total(&request.filter).await;

        Ok(LoadedPage { items, total })
    }
}
