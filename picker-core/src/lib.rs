pub mod error;

pub mod config;

pub mod logging;

pub mod model {
    pub mod page;
    pub use page::{Epoch, Filter, PageRequest, Total};

    pub mod paged_state;
    pub use paged_state::{Delivery, PREFETCH_WINDOW, PagedState, StartDecision};
}

pub mod source {
    pub mod item_source;
    pub use item_source::ItemSource;

    pub mod memory;
    pub use memory::MemorySource;

    pub mod cached;
    pub use cached::CachedTotalSource;
}

pub mod tasks {
    pub mod page_task;
    pub use page_task::{LoadedPage, LoaderEvent, PageTask};
}

pub mod controller {
    pub mod listener;
    pub use listener::PickerListener;

    pub mod paged_loader;
    pub use paged_loader::{Dispatch, LoaderPhase, PagedLoader};

    pub mod filter_controller;
    pub use filter_controller::FilterController;

    pub mod picker;
    pub use picker::{Picker, PickerBuilder};
}

pub mod util {
    pub mod debounce;
}

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use controller::{FilterController, Picker, PickerBuilder, PickerListener};
pub use error::{CoreError, CoreResult};
pub use logging::LoggerBuilder;
pub use model::{Delivery, Filter, Total};
pub use source::ItemSource;
