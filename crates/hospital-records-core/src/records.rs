//! Record operations behind the patient HTTP surface.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{NewPatient, Patient, PatientUpdate, ValidationError};

/// Record operation errors.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Patient not found")]
    NotFound(i64),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Integrity error, possibly duplicate entry")]
    Constraint(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DbError> for RecordError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Constraint(detail) => RecordError::Constraint(detail),
            other => RecordError::Database(other.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for RecordError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        RecordError::Database(format!("Lock poisoned: {}", e))
    }
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Shareable handle to the patient store.
///
/// Cloning shares the same connection. Every mutating call commits before it
/// returns.
#[derive(Clone)]
pub struct PatientRecords {
    db: Arc<Mutex<Database>>,
}

impl PatientRecords {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open or create the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> RecordResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> RecordResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn lock(&self) -> RecordResult<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }

    /// Every stored patient.
    pub fn list(&self) -> RecordResult<Vec<Patient>> {
        Ok(self.lock()?.list_patients()?)
    }

    /// A single patient by id.
    pub fn get(&self, id: i64) -> RecordResult<Patient> {
        self.lock()?
            .get_patient(id)?
            .ok_or(RecordError::NotFound(id))
    }

    /// Validate a create payload and store it.
    pub fn create(&self, payload: &Map<String, Value>) -> RecordResult<Patient> {
        let patient = NewPatient::from_payload(payload)?;
        let stored = self.lock()?.insert_patient(&patient)?;
        tracing::debug!(id = stored.id, "patient created");
        Ok(stored)
    }

    /// Apply a partial update to an existing patient.
    ///
    /// The record must exist; the payload is validated in full before
    /// anything is written.
    pub fn update(&self, id: i64, payload: &Map<String, Value>) -> RecordResult<Patient> {
        let db = self.lock()?;
        let current = db.get_patient(id)?.ok_or(RecordError::NotFound(id))?;

        let update = PatientUpdate::from_payload(payload)?;
        if update.is_empty() {
            return Ok(current);
        }

        let merged = update.apply(&current)?;
        if !db.update_patient(&merged)? {
            return Err(RecordError::NotFound(id));
        }
        tracing::debug!(id, "patient updated");
        Ok(merged)
    }

    /// Permanently remove a patient.
    pub fn delete(&self, id: i64) -> RecordResult<()> {
        if !self.lock()?.delete_patient(id)? {
            return Err(RecordError::NotFound(id));
        }
        tracing::debug!(id, "patient deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Map<String, Value> {
        json!({
            "name": "Jane Doe",
            "age": 34,
            "gender": "F",
            "blood_type": "O+",
            "medical_condition": "Flu",
            "date_of_admission": "2024-01-10",
            "doctor": "Dr. Lee",
            "hospital": "Mercy",
            "insurance_provider": "Acme",
            "billing_amount": 1200.50,
            "room_number": 204,
            "admission_type": "Emergency",
            "medication": "Ibuprofen",
            "test_results": "Normal"
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_create_then_get() {
        let records = PatientRecords::open_in_memory().unwrap();

        let created = records.create(&payload()).unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(records.get(created.id).unwrap(), created);
    }

    #[test]
    fn test_get_missing() {
        let records = PatientRecords::open_in_memory().unwrap();
        assert!(matches!(records.get(42), Err(RecordError::NotFound(42))));
    }

    #[test]
    fn test_create_duplicate_id() {
        let records = PatientRecords::open_in_memory().unwrap();

        let mut body = payload();
        body.insert("id".into(), json!(5));
        records.create(&body).unwrap();

        let err = records.create(&body).unwrap_err();
        assert!(matches!(err, RecordError::Constraint(_)));
        assert_eq!(err.to_string(), "Integrity error, possibly duplicate entry");
        assert_eq!(records.list().unwrap().len(), 1);
    }

    #[test]
    fn test_update_missing_is_not_found_before_validation() {
        let records = PatientRecords::open_in_memory().unwrap();

        let body = json!({"bogus": true});
        let err = records.update(3, body.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, RecordError::NotFound(3)));
    }

    #[test]
    fn test_rejected_update_changes_nothing() {
        let records = PatientRecords::open_in_memory().unwrap();
        let created = records.create(&payload()).unwrap();

        let body = json!({"age": 40, "date_of_admission": "not-a-date"});
        let err = records.update(created.id, body.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)));
        assert_eq!(records.get(created.id).unwrap(), created);
    }

    #[test]
    fn test_empty_update_returns_current() {
        let records = PatientRecords::open_in_memory().unwrap();
        let created = records.create(&payload()).unwrap();

        let updated = records.update(created.id, &Map::new()).unwrap();
        assert_eq!(updated, created);
    }

    #[test]
    fn test_delete_twice() {
        let records = PatientRecords::open_in_memory().unwrap();
        let created = records.create(&payload()).unwrap();

        records.delete(created.id).unwrap();
        assert!(matches!(records.delete(created.id), Err(RecordError::NotFound(_))));
        assert!(matches!(records.get(created.id), Err(RecordError::NotFound(_))));
    }
}
