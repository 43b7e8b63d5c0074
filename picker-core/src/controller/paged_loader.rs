//! `src/controller/paged_loader.rs`
//! ============================================================================
//! # PagedLoader
//!
//! Drives a [`PagedState`] for one epoch at a time. All methods run on the
//! controlling task and never await: source calls are spawned through
//! [`PageTask`] and come back as [`LoaderEvent`]s, which are applied by
//! [`PagedLoader::handle_event`] only when their epoch is still current.

use std::sync::Arc;

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, info, instrument, trace};

use super::listener::PickerListener;
use crate::{
    error::CoreError,
    model::{
        page::{Epoch, Filter, PageRequest, Total},
        paged_state::PagedState,
    },
    source::item_source::ItemSource,
    tasks::page_task::{LoadedPage, LoaderEvent, PageTask},
};

/// Lifecycle of the loader as seen by its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderPhase {
    /// Constructed, `start()` not called yet.
    Created,
    Started,
    Disposed,
}

/// What happened to an event handed to [`PagedLoader::handle_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    /// Issued by a superseded epoch (or after dispose) and dropped.
    Stale,
}

pub struct PagedLoader<S: ItemSource> {
    source: Arc<S>,
    listener: Arc<dyn PickerListener<S::Item>>,
    task_tx: UnboundedSender<LoaderEvent<S::Item>>,
    filter: Filter,
    epoch: Epoch,
    state: PagedState<S::Item>,
    phase: LoaderPhase,
    /// List version at the time the pending start probe was issued.
    probing: Option<u64>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: ItemSource> PagedLoader<S> {
    pub fn new(
        source: Arc<S>,
        listener: Arc<dyn PickerListener<S::Item>>,
        task_tx: UnboundedSender<LoaderEvent<S::Item>>,
        filter: Filter,
    ) -> Self {
        Self {
            source,
            listener,
            task_tx,
            filter,
            epoch: Epoch::first(),
            state: PagedState::new(),
            phase: LoaderPhase::Created,
            probing: None,
            tasks: Vec::new(),
        }
    }

    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    #[must_use]
    pub const fn state(&self) -> &PagedState<S::Item> {
        &self.state
    }

    #[must_use]
    pub const fn phase(&self) -> LoaderPhase {
        self.phase
    }

    /// `true` while a probe or fetch of the current epoch is outstanding.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.probing.is_some() || self.state.outstanding().is_some()
    }

    #[must_use]
    pub fn item(&self, position: usize) -> Option<S::Item> {
        self.state.items().get(position).cloned()
    }

    /// Activates the loader for the current epoch. The start rules are
    /// evaluated once the total probe comes back.
    #[instrument(skip(self), fields(operation_type = "loader_start", epoch = %self.epoch))]
    pub fn start(&mut self) {
        if self.phase == LoaderPhase::Disposed {
            trace!("Start ignored on disposed loader");
            return;
        }

        self.phase = LoaderPhase::Started;

        if self.probing.is_some() {
            trace!("Total probe already pending");
            return;
        }

        self.probing = Some(self.state.version());
        let handle = PageTask::probe_total(
            self.epoch,
            self.filter.clone(),
            Arc::clone(&self.source),
            self.task_tx.clone(),
        );
        self.track(handle);
    }

    /// Replaces the per-epoch state wholesale and starts over for
    /// `filter`. Results still in flight for the old epoch are dropped when
    /// they arrive.
    #[instrument(skip(self), fields(operation_type = "loader_restart", from = %self.filter, to = %filter))]
    pub fn restart(&mut self, filter: Filter) {
        if self.phase == LoaderPhase::Disposed {
            return;
        }

        self.epoch = self.epoch.next();
        self.filter = filter;
        self.state = PagedState::new();
        self.probing = None;
        self.tasks.clear();

        info!(epoch = %self.epoch, "Filter changed, loader reset");

        self.listener.on_load_started();
        self.start();
    }

    /// Called by the rendering layer for every item that becomes visible.
    /// Returns `true` when this call triggered the next fetch.
    pub fn on_item_bound(&mut self, position: usize) -> bool {
        if self.phase == LoaderPhase::Disposed || !self.state.on_item_bound(position) {
            return false;
        }

        debug!(
            position,
            held = self.state.len(),
            total = %self.state.total(),
            "Prefetch window reached"
        );

        self.listener.on_load_started();

        // before start() the intent waits for the start rules
        if self.phase == LoaderPhase::Started {
            self.fetch();
        }

        true
    }

    /// Stops the loader for good; late completions become stale.
    pub fn dispose(&mut self) {
        if self.phase == LoaderPhase::Disposed {
            return;
        }

        for handle in self.tasks.drain(..) {
            handle.abort();
        }

        self.phase = LoaderPhase::Disposed;
        self.epoch = self.epoch.next();
        self.state = PagedState::new();
        self.probing = None;

        debug!(epoch = %self.epoch, "Loader disposed");
    }

    /// Applies a completion on the controlling task.
    pub fn handle_event(&mut self, event: LoaderEvent<S::Item>) -> Dispatch {
        if self.phase == LoaderPhase::Disposed || event.epoch() != self.epoch {
            debug!(
                event_epoch = %event.epoch(),
                current_epoch = %self.epoch,
                "Dropping stale loader event"
            );
            return Dispatch::Stale;
        }

        match event {
            LoaderEvent::TotalProbed { result, .. } => self.on_total_probed(result),

            LoaderEvent::PageLoaded {
                request,
                result,
                elapsed,
            } => {
                debug!(
                    offset = request.offset,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Page completion received"
                );
                self.on_page_loaded(result);
            }
        }

        Dispatch::Applied
    }

    fn on_total_probed(&mut self, result: Result<Total, CoreError>) {
        let issued_version = self.probing.take().unwrap_or_else(|| self.state.version());

        let total = match result {
            Ok(total) => total,
            Err(err) => {
                self.state.abandon_start();
                self.listener.on_source_unavailable(&err.trace());
                return;
            }
        };

        self.state.apply_probed_total(total, issued_version);
        let decision = self.state.decide_start();
        debug!(?decision, total = %self.state.total(), held = self.state.len(), "Start rules evaluated");

        if decision.needs_fetch() {
            self.fetch();
        } else {
            self.deliver();
        }
    }

    fn on_page_loaded(&mut self, result: Result<LoadedPage<S::Item>, CoreError>) {
        match result {
            Ok(LoadedPage { items, total }) => {
                let (total, probe_error) = match total {
                    Ok(total) => (total, None),
                    Err(err) => (self.state.total(), Some(err)),
                };

                self.state.apply_page(items, total);
                self.deliver();

                if let Some(err) = probe_error {
                    self.listener.on_source_unavailable(&err.trace());
                }
            }

            Err(err) => {
                self.state.fail_fetch();
                self.listener.on_source_unavailable(&err.trace());
            }
        }
    }

    fn fetch(&mut self) {
        let Some(offset) = self.state.claim_fetch() else {
            trace!("Fetch already in flight");
            return;
        };

        let request = PageRequest {
            epoch: self.epoch,
            filter: self.filter.clone(),
            offset,
        };

        let handle = PageTask::fetch_page(request, Arc::clone(&self.source), self.task_tx.clone());
        self.track(handle);
    }

    fn deliver(&mut self) {
        let delivery = self.state.delivery(self.epoch);

        debug!(
            epoch = %delivery.epoch,
            version = delivery.version,
            changed = delivery.changed,
            held = delivery.len(),
            total = %delivery.total,
            "Delivering items"
        );

        self.listener.on_load_finished(delivery);
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingListener, ScriptedSource, Signal};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    type Rx = UnboundedReceiver<LoaderEvent<String>>;

    fn loader(
        source: ScriptedSource,
    ) -> (
        PagedLoader<ScriptedSource>,
        Rx,
        Arc<ScriptedSource>,
        Arc<RecordingListener<String>>,
    ) {
        let source = Arc::new(source);
        let listener = RecordingListener::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = PagedLoader::new(
            Arc::clone(&source),
            listener.clone(),
            tx,
            Filter::none(),
        );
        (loader, rx, source, listener)
    }

    async fn settle(loader: &mut PagedLoader<ScriptedSource>, rx: &mut Rx) {
        while loader.is_busy() {
            let event = rx.recv().await.unwrap();
            loader.handle_event(event);
        }
    }

    #[tokio::test]
    async fn bound_before_start_waits_for_the_start_rules() {
        let (mut loader, mut rx, source, listener) = loader(ScriptedSource::new(10, 4));

        assert!(loader.on_item_bound(0));
        assert!(!loader.on_item_bound(1));
        assert!(!loader.is_busy());
        assert_eq!(listener.started_count(), 1);

        loader.start();
        settle(&mut loader, &mut rx).await;

        assert_eq!(source.load_calls(), 1);
        assert_eq!(loader.state().len(), 4);
        assert!(!loader.state().is_loading());
    }

    #[tokio::test]
    async fn probe_failure_reports_and_keeps_state() {
        let (mut loader, mut rx, source, listener) = loader(ScriptedSource::new(10, 4));
        source.fail_totals(true);

        loader.start();
        settle(&mut loader, &mut rx).await;

        assert_eq!(source.load_calls(), 0);
        assert!(listener.deliveries().is_empty());
        assert!(matches!(
            listener.failures().as_slice(),
            [CoreError::SourceUnavailable { .. }]
        ));
        assert_eq!(loader.state().total(), Total::Unknown);
        assert!(!loader.state().is_loading());
    }

    #[tokio::test]
    async fn probe_failure_after_a_page_keeps_items_and_old_total() {
        let (mut loader, mut rx, source, listener) = loader(ScriptedSource::new(10, 4));
        loader.start();

        // first event is the start probe; let it succeed
        let probe = rx.recv().await.unwrap();
        loader.handle_event(probe);
        source.fail_totals(true);
        settle(&mut loader, &mut rx).await;

        assert_eq!(loader.state().len(), 4);
        assert_eq!(loader.state().total(), Total::Known(10));
        assert_eq!(listener.deliveries().len(), 1);
        assert_eq!(listener.failures().len(), 1);
    }

    #[tokio::test]
    async fn late_start_total_does_not_override_a_newer_page_total() {
        let (mut loader, mut rx, _source, _listener) = loader(ScriptedSource::new(10, 4));
        loader.start();
        assert!(loader.on_item_bound(0));

        // the start-time total arrives only after the bound-triggered page
        let mut held = None;
        while held.is_none() || loader.state().outstanding().is_some() {
            match rx.recv().await.unwrap() {
                LoaderEvent::TotalProbed { epoch, .. } => {
                    held = Some(LoaderEvent::TotalProbed {
                        epoch,
                        result: Ok(Total::Known(0)),
                    });
                }
                page => {
                    loader.handle_event(page);
                }
            }
        }
        assert_eq!(loader.state().len(), 4);
        assert_eq!(loader.state().total(), Total::Known(10));

        assert_eq!(loader.handle_event(held.unwrap()), Dispatch::Applied);
        assert_eq!(loader.state().total(), Total::Known(10));
        assert!(!loader.is_busy());

        assert!(loader.on_item_bound(3));
        settle(&mut loader, &mut rx).await;
        assert_eq!(loader.state().len(), 8);
    }

    #[tokio::test]
    async fn disposed_loader_ignores_everything() {
        let (mut loader, mut rx, source, listener) = loader(ScriptedSource::new(10, 4));
        loader.start();
        let pending = rx.recv().await.unwrap();

        loader.dispose();

        assert_eq!(loader.handle_event(pending), Dispatch::Stale);
        assert!(!loader.on_item_bound(0));
        loader.start();
        loader.restart(Filter::new("x"));

        assert_eq!(loader.phase(), LoaderPhase::Disposed);
        assert!(!loader.is_busy());
        assert_eq!(source.total_calls(), 1);
        assert!(
            listener
                .signals()
                .iter()
                .all(|signal| !matches!(signal, Signal::Finished(_)))
        );
    }

    #[tokio::test]
    async fn repeated_start_reuses_the_pending_probe() {
        let (mut loader, mut rx, source, _listener) = loader(ScriptedSource::new(10, 4));
        loader.start();
        loader.start();
        settle(&mut loader, &mut rx).await;

        // one probe for start, one after the page
        assert_eq!(source.total_calls(), 2);
        assert_eq!(source.load_calls(), 1);
    }

    #[tokio::test]
    async fn restart_on_a_view_that_has_everything_just_redelivers() {
        let (mut loader, mut rx, source, listener) = loader(ScriptedSource::new(3, 4));
        loader.start();
        settle(&mut loader, &mut rx).await;

        loader.start();
        settle(&mut loader, &mut rx).await;

        assert_eq!(source.load_calls(), 1);
        let deliveries = listener.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert!(deliveries[0].changed);
        assert!(!deliveries[1].changed);
        assert_eq!(deliveries[0].version, deliveries[1].version);
    }
}
