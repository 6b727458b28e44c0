//! CSV snapshot export of the patient table.

mod snapshot;

pub use snapshot::*;
