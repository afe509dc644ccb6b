//! Upstream data acquisition.
//!
//! - API key loading (`credentials`)
//! - request parameter construction (`params`)
//! - the EIA STEO client (`eia`) and its request pacing (`limiter`)
//! - multi-series aggregation into one vintage table (`aggregate`)

pub mod aggregate;
pub mod credentials;
pub mod eia;
pub mod limiter;
pub mod params;

pub use aggregate::{AggregateRequest, aggregate_series};
pub use credentials::load_api_key;
pub use eia::{EiaClient, ObservationSource};
pub use params::{build_params, validate_start_period};
