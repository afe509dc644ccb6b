//! Input/output helpers.
//!
//! - typed observation tables + atomic writes (`table`)
//! - untyped column-union frames (`frame`)
//! - master-table consolidation (`consolidate`)

pub mod consolidate;
pub mod frame;
pub mod table;

pub use consolidate::*;
pub use frame::Frame;
pub use table::*;
