//! SQLite schema definition.

/// Name of the single patient table.
pub const PATIENT_TABLE: &str = "patient";

/// Complete database schema for hospital records.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients
-- ============================================================================

-- AUTOINCREMENT keeps ids monotonic: a deleted id is never handed out again.
CREATE TABLE IF NOT EXISTS patient (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    gender TEXT NOT NULL,
    blood_type TEXT NOT NULL,
    medical_condition TEXT NOT NULL,
    date_of_admission TEXT NOT NULL,              -- YYYY-MM-DD
    doctor TEXT NOT NULL,
    hospital TEXT NOT NULL,
    insurance_provider TEXT NOT NULL,
    billing_amount REAL NOT NULL,
    room_number INTEGER NOT NULL,
    admission_type TEXT NOT NULL,
    discharge_date TEXT,                          -- YYYY-MM-DD, null while admitted
    medication TEXT NOT NULL,
    test_results TEXT NOT NULL
);
"#;
