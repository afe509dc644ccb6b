//! `steo-forecasts` library crate.
//!
//! Archives monthly vintages of the EIA Short-Term Energy Outlook: fetch
//! series into one table per vintage, consolidate vintages into a master
//! table, and query/preview tables from the terminal.
//!
//! The binary (`steo`) is a thin wrapper around this library so that the
//! pipeline is testable without spawning processes or touching the network.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod view;
