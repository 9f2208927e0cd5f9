//! Report generation modules.
//!
//! CSV tables for downstream plotting and Markdown/JSON run reports.

pub mod generator;
pub mod writer;

pub use generator::*;
pub use writer::*;
