//! Domain models for the hospital records system.

mod patient;

pub use patient::*;
