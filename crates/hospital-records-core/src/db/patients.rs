//! Patient database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{NewPatient, Patient};

const SELECT_PATIENT: &str = r#"
    SELECT id, name, age, gender, blood_type, medical_condition,
           date_of_admission, doctor, hospital, insurance_provider,
           billing_amount, room_number, admission_type, discharge_date,
           medication, test_results
    FROM patient
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        blood_type: row.get(4)?,
        medical_condition: row.get(5)?,
        date_of_admission: row.get(6)?,
        doctor: row.get(7)?,
        hospital: row.get(8)?,
        insurance_provider: row.get(9)?,
        billing_amount: row.get(10)?,
        room_number: row.get(11)?,
        admission_type: row.get(12)?,
        discharge_date: row.get(13)?,
        medication: row.get(14)?,
        test_results: row.get(15)?,
    })
}

fn fetch_patient(conn: &Connection, id: i64) -> DbResult<Option<Patient>> {
    conn.query_row(
        &format!("{SELECT_PATIENT} WHERE id = ?"),
        [id],
        patient_from_row,
    )
    .optional()
    .map_err(Into::into)
}

impl Database {
    /// Insert a new patient and return the stored record.
    ///
    /// Runs in its own transaction; a rejected insert is rolled back and
    /// reported as [`DbError::Constraint`].
    pub fn insert_patient(&self, patient: &NewPatient) -> DbResult<Patient> {
        let tx = self.conn.unchecked_transaction()?;

        let inserted = tx.execute(
            r#"
            INSERT INTO patient (
                id, name, age, gender, blood_type, medical_condition,
                date_of_admission, doctor, hospital, insurance_provider,
                billing_amount, room_number, admission_type, discharge_date,
                medication, test_results
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                patient.id,
                patient.name,
                patient.age,
                patient.gender,
                patient.blood_type,
                patient.medical_condition,
                patient.date_of_admission,
                patient.doctor,
                patient.hospital,
                patient.insurance_provider,
                patient.billing_amount,
                patient.room_number,
                patient.admission_type,
                patient.discharge_date,
                patient.medication,
                patient.test_results,
            ],
        );

        if let Err(e) = inserted {
            tx.rollback()?;
            return Err(DbError::from_write(e));
        }

        let id = tx.last_insert_rowid();
        let stored = fetch_patient(&tx, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(stored)
    }

    /// Overwrite every mutable column of an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE patient SET
                    name = ?2,
                    age = ?3,
                    gender = ?4,
                    blood_type = ?5,
                    medical_condition = ?6,
                    date_of_admission = ?7,
                    doctor = ?8,
                    hospital = ?9,
                    insurance_provider = ?10,
                    billing_amount = ?11,
                    room_number = ?12,
                    admission_type = ?13,
                    discharge_date = ?14,
                    medication = ?15,
                    test_results = ?16
                WHERE id = ?1
                "#,
                params![
                    patient.id,
                    patient.name,
                    patient.age,
                    patient.gender,
                    patient.blood_type,
                    patient.medical_condition,
                    patient.date_of_admission,
                    patient.doctor,
                    patient.hospital,
                    patient.insurance_provider,
                    patient.billing_amount,
                    patient.room_number,
                    patient.admission_type,
                    patient.discharge_date,
                    patient.medication,
                    patient.test_results,
                ],
            )
            .map_err(DbError::from_write)?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        fetch_patient(&self.conn, id)
    }

    /// List all patients.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_PATIENT} ORDER BY id"))?;

        let rows = stmt.query_map([], patient_from_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count stored patients.
    pub fn count_patients(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patient", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete a patient.
    pub fn delete_patient(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM patient WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
