//! `src/controller/picker.rs`
//! ============================================================================
//! # Picker
//!
//! Top-level owner of one picker session. [`PickerBuilder`] checks the
//! required arguments up front; the built [`Picker`] forwards view events to
//! its [`FilterController`] until an item is selected or the session is
//! cancelled.

use std::sync::Arc;

use compact_str::CompactString;
use tracing::{info, instrument, warn};

use super::{filter_controller::FilterController, listener::PickerListener, paged_loader::Dispatch};
use crate::{
    error::{CoreError, CoreResult},
    model::page::{Epoch, Filter},
    source::item_source::ItemSource,
};

pub struct PickerBuilder<S: ItemSource> {
    title: Option<CompactString>,
    source: Option<Arc<S>>,
    listener: Option<Arc<dyn PickerListener<S::Item>>>,
    window_animations: i32,
}

impl<S: ItemSource> Default for PickerBuilder<S> {
    fn default() -> Self {
        Self {
            title: None,
            source: None,
            listener: None,
            window_animations: 0,
        }
    }
}

impl<S: ItemSource> PickerBuilder<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<CompactString>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn source(mut self, source: Arc<S>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn PickerListener<S::Item>>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Cosmetic window animation style. Values `<= 0` leave the host default.
    #[must_use]
    pub const fn window_animations(mut self, style: i32) -> Self {
        self.window_animations = style;
        self
    }

    pub fn build(self) -> CoreResult<Picker<S>> {
        let title = self
            .title
            .ok_or_else(|| CoreError::missing_argument("title"))?;

        if title.trim().is_empty() {
            return Err(CoreError::invalid_input("title", "must not be blank"));
        }

        let source = self
            .source
            .ok_or_else(|| CoreError::missing_argument("item source"))?;
        let listener = self
            .listener
            .ok_or_else(|| CoreError::missing_argument("listener"))?;

        let window_animations = u32::try_from(self.window_animations)
            .ok()
            .filter(|style| *style > 0);

        info!(%title, ?window_animations, "Picker created");

        Ok(Picker {
            title,
            window_animations,
            controller: FilterController::new(source, Arc::clone(&listener)),
            listener,
            closed: false,
        })
    }
}

pub struct Picker<S: ItemSource> {
    title: CompactString,
    window_animations: Option<u32>,
    controller: FilterController<S>,
    listener: Arc<dyn PickerListener<S::Item>>,
    closed: bool,
}

impl<S: ItemSource> Picker<S> {
    #[must_use]
    pub fn builder() -> PickerBuilder<S> {
        PickerBuilder::new()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Animation style to apply, if any.
    #[must_use]
    pub const fn window_animations(&self) -> Option<u32> {
        self.window_animations
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub const fn controller(&self) -> &FilterController<S> {
        &self.controller
    }

    #[must_use]
    pub const fn filter(&self) -> &Filter {
        self.controller.filter()
    }

    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.controller.epoch()
    }

    /// Number of items currently held for the active filter.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controller.loader().state().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn start(&mut self) {
        if !self.closed {
            self.controller.start();
        }
    }

    pub fn set_filter(&mut self, filter: impl Into<Filter>) -> bool {
        !self.closed && self.controller.set_filter(filter)
    }

    pub fn on_item_bound(&mut self, position: usize) -> bool {
        !self.closed && self.controller.on_item_bound(position)
    }

    pub async fn pump(&mut self) -> Option<Dispatch> {
        self.controller.pump().await
    }

    pub async fn run_until_idle(&mut self) {
        self.controller.run_until_idle().await;
    }

    /// Hands the item at `position` to the listener and closes the picker.
    #[instrument(skip(self), fields(operation_type = "picker_select", title = %self.title))]
    pub fn select(&mut self, position: usize) -> CoreResult<()> {
        if self.closed {
            return Err(CoreError::invalid_state("picker is closed"));
        }

        let Some(item) = self.controller.loader().item(position) else {
            warn!(position, held = self.len(), "Selection out of range");
            return Err(CoreError::invalid_state("selected position is not loaded"));
        };

        self.listener.on_item_selected(item);
        self.close();
        Ok(())
    }

    /// Closes the picker without a selection.
    pub fn cancel(&mut self) {
        if !self.closed {
            info!(title = %self.title, "Picker cancelled");
            self.close();
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.controller.dispose();
    }
}

impl<S: ItemSource> Drop for Picker<S> {
    fn drop(&mut self) {
        self.controller.dispose();
    }
}
