//! Shared fixtures for unit tests: a scripted item source and a listener that
//! records every signal it receives.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::{
    controller::listener::PickerListener,
    error::{CoreError, CoreResult},
    model::{
        page::{Filter, Total},
        paged_state::Delivery,
    },
    source::item_source::ItemSource,
};

/// Source whose items are `"<filter>#<index>"`, so tests can tell which
/// filter produced every delivered item.
pub struct ScriptedSource {
    available: usize,
    batch: usize,
    lengths: Mutex<HashMap<Filter, usize>>,
    reported: Mutex<Option<Total>>,
    fail_totals: AtomicBool,
    fail_loads: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    total_calls: AtomicUsize,
    load_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    offsets: Mutex<Vec<(Filter, usize)>>,
}

impl ScriptedSource {
    pub fn new(available: usize, batch: usize) -> Self {
        Self {
            available,
            batch,
            lengths: Mutex::new(HashMap::new()),
            reported: Mutex::new(None),
            fail_totals: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
            gate: None,
            total_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            offsets: Mutex::new(Vec::new()),
        }
    }

    /// Loads block until [`release_loads`](Self::release_loads) hands out
    /// permits.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release_loads(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    pub fn with_len_for(self, filter: impl Into<Filter>, len: usize) -> Self {
        self.lengths.lock().insert(filter.into(), len);
        self
    }

    /// Overrides what `total` answers, independent of the real length.
    pub fn set_total(&self, total: Total) {
        *self.reported.lock() = Some(total);
    }

    pub fn fail_totals(&self, fail: bool) {
        self.fail_totals.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// `(filter, offset)` of every load, in call order.
    pub fn load_offsets(&self) -> Vec<(Filter, usize)> {
        self.offsets.lock().clone()
    }

    fn len_for(&self, filter: &Filter) -> usize {
        self.lengths
            .lock()
            .get(filter)
            .copied()
            .unwrap_or(self.available)
    }

    pub fn item(filter: &Filter, index: usize) -> String {
        format!("{}#{index}", filter.as_str().unwrap_or("-"))
    }
}

#[async_trait]
impl ItemSource for ScriptedSource {
    type Item = String;

    async fn total(&self, filter: &Filter) -> CoreResult<Total> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_totals.load(Ordering::SeqCst) {
            return Err(CoreError::source_unavailable("total", "scripted failure"));
        }

        let reported = *self.reported.lock();
        Ok(reported.unwrap_or(Total::Known(self.len_for(filter))))
    }

    async fn load(&self, filter: &Filter, offset: usize) -> CoreResult<Vec<String>> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.offsets.lock().push((filter.clone(), offset));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(CoreError::source_unavailable("load", "scripted failure"));
        }

        let end = self.len_for(filter).min(offset + self.batch);
        Ok((offset..end).map(|i| Self::item(filter, i)).collect())
    }
}

#[derive(Debug, Clone)]
pub enum Signal<T> {
    Started,
    Finished(Delivery<T>),
    Selected(T),
    Failed(CoreError),
}

#[derive(Debug)]
pub struct RecordingListener<T> {
    signals: Mutex<Vec<Signal<T>>>,
}

impl<T: Clone> RecordingListener<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            signals: Mutex::new(Vec::new()),
        })
    }

    pub fn signals(&self) -> Vec<Signal<T>> {
        self.signals.lock().clone()
    }

    pub fn deliveries(&self) -> Vec<Delivery<T>> {
        self.signals
            .lock()
            .iter()
            .filter_map(|signal| match signal {
                Signal::Finished(delivery) => Some(delivery.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_delivery(&self) -> Option<Delivery<T>> {
        self.deliveries().pop()
    }

    pub fn started_count(&self) -> usize {
        self.signals
            .lock()
            .iter()
            .filter(|signal| matches!(signal, Signal::Started))
            .count()
    }

    pub fn failures(&self) -> Vec<CoreError> {
        self.signals
            .lock()
            .iter()
            .filter_map(|signal| match signal {
                Signal::Failed(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn selected(&self) -> Vec<T> {
        self.signals
            .lock()
            .iter()
            .filter_map(|signal| match signal {
                Signal::Selected(item) => Some(item.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<T: Clone + Send + Sync + 'static> PickerListener<T> for RecordingListener<T> {
    fn on_load_started(&self) {
        self.signals.lock().push(Signal::Started);
    }

    fn on_load_finished(&self, delivery: Delivery<T>) {
        self.signals.lock().push(Signal::Finished(delivery));
    }

    fn on_item_selected(&self, item: T) {
        self.signals.lock().push(Signal::Selected(item));
    }

    fn on_source_unavailable(&self, error: &CoreError) {
        self.signals.lock().push(Signal::Failed(error.clone()));
    }
}
