//! Report rendering.

pub mod generator;

pub use generator::{generate_csv_report, generate_json_report, generate_markdown_report};
