//! wg-core library: weekly cleaning rotation, pairwise debt ledger, and the
//! SQLite house store behind them.

pub mod config;
pub mod db;
pub mod dialog;
pub mod error;
pub mod expenses;
pub mod ledger;
pub mod model;
pub mod notify;
pub mod people;
pub mod schedule;

/// # Conventions
///
/// - **Errors**: closed failure sets use `thiserror` enums mapped to
///   [`error::ErrorCode`]; glue code returns `anyhow::Result`.
/// - **Logging**: use `tracing` macros. Never log amounts or descriptions.
/// - **Dates**: scheduler math is on `NaiveDate`; "today" comes from
///   [`config::Settings::today`].
pub use schedule::{Rotation, target_sunday};
