pub mod layout_store;
pub mod settings;

pub use layout_store::{
    FileLayoutStore, LayoutStore, LayoutSummary, MemoryLayoutStore, SavedLayout, StoreError,
};
pub use settings::Settings;
