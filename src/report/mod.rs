//! Run report aggregation and rendering.

pub mod aggregator;
pub mod generator;

pub use aggregator::{aggregate, format_failure, slowest_probes};
pub use generator::{generate_json_report, generate_markdown_report};
