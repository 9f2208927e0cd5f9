//! Analysis modules.
//!
//! Combination of structure metrics, per-subject aggregation, and
//! cross-subject statistics.

pub mod aggregator;
pub mod combiner;
pub mod summary;

pub use aggregator::*;
pub use combiner::*;
pub use summary::*;
