//! Analysis modules.
//!
//! Pure functions over borrowed record slices: selection by country,
//! aggregation, and chart-ready series.

pub mod aggregator;
pub mod filter;
pub mod series;

pub use aggregator::*;
pub use filter::*;
pub use series::*;
