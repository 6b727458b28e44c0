//! Hospital Records Core Library
//!
//! Patient record storage backing the HTTP record service, and the full-table
//! CSV snapshot produced by the scheduled extraction job.
//!
//! # Architecture
//!
//! ```text
//!  HTTP payload ──► NewPatient / PatientUpdate ──► PatientRecords ──► Database
//!                    (allow-listed, typed)          (shared handle)   (SQLite)
//!                                                                        │
//!                                                  patient table ◄───────┘
//!                                                        │
//!                                  Snapshot::read ──► SnapshotTransform ──► CSV file
//! ```
//!
//! The two consumers share only the `patient` table.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Patient, payload parsing and validation)
//! - [`records`]: Record operations (list/get/create/update/delete)
//! - [`export`]: CSV snapshot export

pub mod db;
pub mod export;
pub mod models;
pub mod records;

// Re-export commonly used types
pub use db::{Database, DbError};
pub use export::{ExportError, ExportReport, Snapshot, SnapshotExporter, SnapshotTransform};
pub use models::{NewPatient, Patient, PatientField, PatientUpdate, ValidationError};
pub use records::{PatientRecords, RecordError, RecordResult};
