//! Delivery boundary between the loader and the host UI.
//!
//! The core only ever calls outward through [`PickerListener`]; it never
//! reaches into rendering code.

use crate::error::CoreError;

pub use crate::model::paged_state::Delivery;

/// Signals a picker session sends to its host.
pub trait PickerListener<T>: Send + Sync {
    /// A load cycle began; hosts typically show a progress indicator.
    fn on_load_started(&self);

    /// A load cycle ended with the accumulated items of the current epoch.
    fn on_load_finished(&self, delivery: Delivery<T>);

    /// The user picked `item`; the picker closes right after.
    fn on_item_selected(&self, item: T);

    /// The item source failed. Held items stay as they were and nothing is
    /// retried automatically.
    fn on_source_unavailable(&self, error: &CoreError);
}
