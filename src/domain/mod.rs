//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - request shapes sent upstream (`QueryParams`, `Frequency`, `SortDirection`)
//! - forecast vintages (`Vintage`)
//! - fetched and normalized observations (`RawObservation`, `ObservationRow`, `VintageTable`)

pub mod types;

pub use types::*;
