//! Shared data structures for mineral investment scoring
//!
//! - `features`: the 11 site attributes and their fixed model order
//! - `dataset`: labelled training records and tables
//! - `report`: training metrics and feature importances

mod dataset;
mod features;
mod report;

pub use dataset::*;
pub use features::*;
pub use report::*;
