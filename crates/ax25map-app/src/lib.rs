//! Application layer: keeps the live topology current and drives layout
//! runs, anchor recomputation and layout persistence on top of it.

pub mod layout_session;
pub mod source;
pub mod topology_service;

pub use layout_session::{LayoutOutcome, LayoutReport, LayoutSession};
pub use source::{FileLogSource, LogSource, StaticLogSource};
pub use topology_service::TopologyService;
