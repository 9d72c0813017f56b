//! Hierarchy rollup and belt statistics.
//!
//! The aggregator is a pure function over already-loaded records;
//! everything here is synchronous and free of I/O.

pub mod aggregator;
pub mod summary;
pub mod zone;

pub use aggregator::{HierarchyAggregator, LinkageRule, RollupOptions};
pub use summary::*;
