//! Hospital Records Server
//!
//! HTTP record service over the patient table, plus the scheduled job that
//! snapshots the same table to CSV. The two share only the database file.
//!
//! # Modules
//!
//! - [`api`]: Axum router and patient endpoints
//! - [`scheduler`]: Extraction job, retry policy and daily schedule
//! - [`config`]: TOML configuration
//! - [`logging`]: tracing-subscriber setup
//! - [`cli`]: Command-line entry point

pub mod api;
pub mod cli;
pub mod config;
pub mod logging;
pub mod scheduler;

pub use api::{router, AppState};
pub use config::AppConfig;
pub use scheduler::{ExportSchedule, ExtractionJob, RetryPolicy};
