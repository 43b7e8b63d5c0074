//! `src/controller/filter_controller.rs`
//! ============================================================================
//! # FilterController
//!
//! Owns the loader and the receiving end of its completion channel. Filter
//! text changes become epoch bumps; completions are pumped back into the
//! loader on the task that owns this controller.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, error::TryRecvError};
use tracing::trace;

use super::{
    listener::PickerListener,
    paged_loader::{Dispatch, PagedLoader},
};
use crate::{
    model::page::{Epoch, Filter},
    source::item_source::ItemSource,
    tasks::page_task::LoaderEvent,
};

pub struct FilterController<S: ItemSource> {
    loader: PagedLoader<S>,
    task_rx: UnboundedReceiver<LoaderEvent<S::Item>>,
}

impl<S: ItemSource> FilterController<S> {
    /// The picker starts without any filter text.
    pub fn new(source: Arc<S>, listener: Arc<dyn PickerListener<S::Item>>) -> Self {
        let (task_tx, task_rx) = mpsc::unbounded_channel();

        Self {
            loader: PagedLoader::new(source, listener, task_tx, Filter::none()),
            task_rx,
        }
    }

    #[must_use]
    pub const fn loader(&self) -> &PagedLoader<S> {
        &self.loader
    }

    #[must_use]
    pub const fn filter(&self) -> &Filter {
        self.loader.filter()
    }

    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.loader.epoch()
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.loader.is_busy()
    }

    /// View became visible.
    pub fn start(&mut self) {
        self.loader.start();
    }

    /// Filter text changed. Returns `false` when `filter` equals the active
    /// one and nothing happened.
    pub fn set_filter(&mut self, filter: impl Into<Filter>) -> bool {
        let filter = filter.into();
        if &filter == self.loader.filter() {
            trace!(%filter, "Filter unchanged");
            return false;
        }

        self.loader.restart(filter);
        true
    }

    pub fn on_item_bound(&mut self, position: usize) -> bool {
        self.loader.on_item_bound(position)
    }

    pub fn dispose(&mut self) {
        self.loader.dispose();
    }

    /// Waits for the next completion without applying it.
    pub async fn next_event(&mut self) -> Option<LoaderEvent<S::Item>> {
        self.task_rx.recv().await
    }

    pub fn dispatch(&mut self, event: LoaderEvent<S::Item>) -> Dispatch {
        self.loader.handle_event(event)
    }

    /// Waits for one completion and applies it.
    pub async fn pump(&mut self) -> Option<Dispatch> {
        let event = self.task_rx.recv().await?;
        Some(self.loader.handle_event(event))
    }

    /// Applies one completion if it is already queued.
    pub fn try_pump(&mut self) -> Option<Dispatch> {
        match self.task_rx.try_recv() {
            Ok(event) => Some(self.loader.handle_event(event)),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Pumps until nothing of the current epoch is outstanding. A source
    /// call that never completes keeps this waiting.
    pub async fn run_until_idle(&mut self) {
        while self.loader.is_busy() {
            if self.pump().await.is_none() {
                break;
            }
        }
    }
}
