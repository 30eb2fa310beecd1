//! Log ingestion: monitor-line parsing, topology building and text exports.

pub mod builder;
pub mod export;
pub mod line_parser;
pub mod log_reader;

pub use builder::{BuilderOptions, TopologyBuilder, build_topology};
pub use export::{ExportFormat, ExportOptions, export};
pub use line_parser::{LineKind, LineParser};
pub use log_reader::{LogReader, PAYLOAD_SAMPLE_CHARS};
