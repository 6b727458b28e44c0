//! Patient models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Calendar date format used on the wire and in storage.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Payload validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing key: '{0}'")]
    MissingField(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Invalid data format: unknown field '{0}'")]
    UnknownField(String),

    #[error("Invalid data format: field '{0}' cannot be modified")]
    ImmutableField(String),

    #[error("Invalid data format: discharge_date precedes date_of_admission")]
    DischargeBeforeAdmission,
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// A stored patient record.
///
/// Field order matches the `patient` table, which is also the column order of
/// the CSV snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Storage-assigned identifier, immutable once assigned
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub blood_type: String,
    pub medical_condition: String,
    pub date_of_admission: NaiveDate,
    pub doctor: String,
    pub hospital: String,
    pub insurance_provider: String,
    pub billing_amount: f64,
    pub room_number: i64,
    /// Category label (e.g. "Emergency", "Elective", "Urgent")
    pub admission_type: String,
    /// Null while the patient is still admitted
    pub discharge_date: Option<NaiveDate>,
    pub medication: String,
    /// Categorical result (e.g. "Normal", "Abnormal", "Inconclusive")
    pub test_results: String,
}

impl Patient {
    /// Check that the discharge date, when present, is not before admission.
    pub fn check_dates(&self) -> ValidationResult<()> {
        check_discharge(self.date_of_admission, self.discharge_date)
    }

    /// Whether the patient is still admitted.
    pub fn is_admitted(&self) -> bool {
        self.discharge_date.is_none()
    }
}

/// The allow-list of patient attributes accepted in payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatientField {
    Id,
    Name,
    Age,
    Gender,
    BloodType,
    MedicalCondition,
    DateOfAdmission,
    Doctor,
    Hospital,
    InsuranceProvider,
    BillingAmount,
    RoomNumber,
    AdmissionType,
    DischargeDate,
    Medication,
    TestResults,
}

impl PatientField {
    /// All fields in table column order.
    pub const ALL: [PatientField; 16] = [
        PatientField::Id,
        PatientField::Name,
        PatientField::Age,
        PatientField::Gender,
        PatientField::BloodType,
        PatientField::MedicalCondition,
        PatientField::DateOfAdmission,
        PatientField::Doctor,
        PatientField::Hospital,
        PatientField::InsuranceProvider,
        PatientField::BillingAmount,
        PatientField::RoomNumber,
        PatientField::AdmissionType,
        PatientField::DischargeDate,
        PatientField::Medication,
        PatientField::TestResults,
    ];

    /// Wire and column name.
    pub fn name(self) -> &'static str {
        match self {
            PatientField::Id => "id",
            PatientField::Name => "name",
            PatientField::Age => "age",
            PatientField::Gender => "gender",
            PatientField::BloodType => "blood_type",
            PatientField::MedicalCondition => "medical_condition",
            PatientField::DateOfAdmission => "date_of_admission",
            PatientField::Doctor => "doctor",
            PatientField::Hospital => "hospital",
            PatientField::InsuranceProvider => "insurance_provider",
            PatientField::BillingAmount => "billing_amount",
            PatientField::RoomNumber => "room_number",
            PatientField::AdmissionType => "admission_type",
            PatientField::DischargeDate => "discharge_date",
            PatientField::Medication => "medication",
            PatientField::TestResults => "test_results",
        }
    }

    /// Look up a field by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Whether the field must be present and non-null on create.
    pub fn is_required(self) -> bool {
        !matches!(self, PatientField::Id | PatientField::DischargeDate)
    }
}

/// A patient that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    /// Explicitly requested id; storage assigns one when absent
    pub id: Option<i64>,
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub blood_type: String,
    pub medical_condition: String,
    pub date_of_admission: NaiveDate,
    pub doctor: String,
    pub hospital: String,
    pub insurance_provider: String,
    pub billing_amount: f64,
    pub room_number: i64,
    pub admission_type: String,
    pub discharge_date: Option<NaiveDate>,
    pub medication: String,
    pub test_results: String,
}

impl NewPatient {
    /// Parse a create payload.
    ///
    /// Every mandatory field must be present and non-null. Dates are parsed
    /// from `YYYY-MM-DD`; an empty discharge date is treated as absent.
    pub fn from_payload(payload: &Map<String, Value>) -> ValidationResult<Self> {
        if let Some(key) = payload.keys().find(|k| PatientField::from_name(k).is_none()) {
            return Err(ValidationError::UnknownField(key.clone()));
        }

        // Report the first missing key in column order.
        for field in PatientField::ALL.into_iter().filter(|f| f.is_required()) {
            if payload.get(field.name()).map_or(true, Value::is_null) {
                return Err(ValidationError::MissingField(field.name().to_string()));
            }
        }

        let field = move |f: PatientField| &payload[f.name()];

        let id = match payload.get(PatientField::Id.name()) {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_integer(PatientField::Id, value)?),
        };

        let patient = Self {
            id,
            name: parse_text(PatientField::Name, field(PatientField::Name))?,
            age: parse_integer(PatientField::Age, field(PatientField::Age))?,
            gender: parse_text(PatientField::Gender, field(PatientField::Gender))?,
            blood_type: parse_text(PatientField::BloodType, field(PatientField::BloodType))?,
            medical_condition: parse_text(
                PatientField::MedicalCondition,
                field(PatientField::MedicalCondition),
            )?,
            date_of_admission: parse_date(
                PatientField::DateOfAdmission,
                field(PatientField::DateOfAdmission),
            )?,
            doctor: parse_text(PatientField::Doctor, field(PatientField::Doctor))?,
            hospital: parse_text(PatientField::Hospital, field(PatientField::Hospital))?,
            insurance_provider: parse_text(
                PatientField::InsuranceProvider,
                field(PatientField::InsuranceProvider),
            )?,
            billing_amount: parse_amount(
                PatientField::BillingAmount,
                field(PatientField::BillingAmount),
            )?,
            room_number: parse_integer(PatientField::RoomNumber, field(PatientField::RoomNumber))?,
            admission_type: parse_text(
                PatientField::AdmissionType,
                field(PatientField::AdmissionType),
            )?,
            discharge_date: parse_optional_date(
                PatientField::DischargeDate,
                payload.get(PatientField::DischargeDate.name()).unwrap_or(&Value::Null),
            )?,
            medication: parse_text(PatientField::Medication, field(PatientField::Medication))?,
            test_results: parse_text(PatientField::TestResults, field(PatientField::TestResults))?,
        };

        check_discharge(patient.date_of_admission, patient.discharge_date)?;
        Ok(patient)
    }

    /// Attach the storage-assigned id.
    pub fn into_patient(self, id: i64) -> Patient {
        Patient {
            id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            blood_type: self.blood_type,
            medical_condition: self.medical_condition,
            date_of_admission: self.date_of_admission,
            doctor: self.doctor,
            hospital: self.hospital,
            insurance_provider: self.insurance_provider,
            billing_amount: self.billing_amount,
            room_number: self.room_number,
            admission_type: self.admission_type,
            discharge_date: self.discharge_date,
            medication: self.medication,
            test_results: self.test_results,
        }
    }
}

/// A typed partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientUpdate {
    /// Only accepted when it matches the target record
    pub id: Option<i64>,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub medical_condition: Option<String>,
    pub date_of_admission: Option<NaiveDate>,
    pub doctor: Option<String>,
    pub hospital: Option<String>,
    pub insurance_provider: Option<String>,
    pub billing_amount: Option<f64>,
    pub room_number: Option<i64>,
    pub admission_type: Option<String>,
    /// `Some(None)` clears the discharge date
    pub discharge_date: Option<Option<NaiveDate>>,
    pub medication: Option<String>,
    pub test_results: Option<String>,
}

impl PatientUpdate {
    /// Parse an update payload. Unknown keys and malformed values are rejected
    /// before anything is applied.
    pub fn from_payload(payload: &Map<String, Value>) -> ValidationResult<Self> {
        let mut update = Self::default();

        for (key, value) in payload {
            let field = PatientField::from_name(key)
                .ok_or_else(|| ValidationError::UnknownField(key.clone()))?;

            match field {
                PatientField::DischargeDate => {
                    update.discharge_date = Some(parse_optional_date(field, value)?)
                }
                _ if value.is_null() => {
                    return Err(ValidationError::InvalidFormat(format!(
                        "{} cannot be null",
                        field.name()
                    )));
                }
                PatientField::Id => update.id = Some(parse_integer(field, value)?),
                PatientField::Name => update.name = Some(parse_text(field, value)?),
                PatientField::Age => update.age = Some(parse_integer(field, value)?),
                PatientField::Gender => update.gender = Some(parse_text(field, value)?),
                PatientField::BloodType => update.blood_type = Some(parse_text(field, value)?),
                PatientField::MedicalCondition => {
                    update.medical_condition = Some(parse_text(field, value)?)
                }
                PatientField::DateOfAdmission => {
                    update.date_of_admission = Some(parse_date(field, value)?)
                }
                PatientField::Doctor => update.doctor = Some(parse_text(field, value)?),
                PatientField::Hospital => update.hospital = Some(parse_text(field, value)?),
                PatientField::InsuranceProvider => {
                    update.insurance_provider = Some(parse_text(field, value)?)
                }
                PatientField::BillingAmount => {
                    update.billing_amount = Some(parse_amount(field, value)?)
                }
                PatientField::RoomNumber => update.room_number = Some(parse_integer(field, value)?),
                PatientField::AdmissionType => {
                    update.admission_type = Some(parse_text(field, value)?)
                }
                PatientField::Medication => update.medication = Some(parse_text(field, value)?),
                PatientField::TestResults => update.test_results = Some(parse_text(field, value)?),
            }
        }

        Ok(update)
    }

    /// Check if the update changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge onto an existing patient, returning the updated record.
    pub fn apply(&self, patient: &Patient) -> ValidationResult<Patient> {
        if let Some(id) = self.id {
            if id != patient.id {
                return Err(ValidationError::ImmutableField(
                    PatientField::Id.name().to_string(),
                ));
            }
        }

        let mut merged = patient.clone();
        if let Some(name) = &self.name {
            merged.name = name.clone();
        }
        if let Some(age) = self.age {
            merged.age = age;
        }
        if let Some(gender) = &self.gender {
            merged.gender = gender.clone();
        }
        if let Some(blood_type) = &self.blood_type {
            merged.blood_type = blood_type.clone();
        }
        if let Some(condition) = &self.medical_condition {
            merged.medical_condition = condition.clone();
        }
        if let Some(date) = self.date_of_admission {
            merged.date_of_admission = date;
        }
        if let Some(doctor) = &self.doctor {
            merged.doctor = doctor.clone();
        }
        if let Some(hospital) = &self.hospital {
            merged.hospital = hospital.clone();
        }
        if let Some(provider) = &self.insurance_provider {
            merged.insurance_provider = provider.clone();
        }
        if let Some(amount) = self.billing_amount {
            merged.billing_amount = amount;
        }
        if let Some(room) = self.room_number {
            merged.room_number = room;
        }
        if let Some(admission_type) = &self.admission_type {
            merged.admission_type = admission_type.clone();
        }
        if let Some(discharge) = self.discharge_date {
            merged.discharge_date = discharge;
        }
        if let Some(medication) = &self.medication {
            merged.medication = medication.clone();
        }
        if let Some(results) = &self.test_results {
            merged.test_results = results.clone();
        }

        merged.check_dates()?;
        Ok(merged)
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

fn check_discharge(admission: NaiveDate, discharge: Option<NaiveDate>) -> ValidationResult<()> {
    match discharge {
        Some(discharge) if discharge < admission => Err(ValidationError::DischargeBeforeAdmission),
        _ => Ok(()),
    }
}

fn wrong_type(field: PatientField, expected: &str, value: &Value) -> ValidationError {
    ValidationError::InvalidFormat(format!(
        "{} must be {}, got {}",
        field.name(),
        expected,
        value
    ))
}

fn parse_text(field: PatientField, value: &Value) -> ValidationResult<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| wrong_type(field, "a string", value))
}

fn parse_integer(field: PatientField, value: &Value) -> ValidationResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| wrong_type(field, "an integer", value))
}

fn parse_amount(field: PatientField, value: &Value) -> ValidationResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| wrong_type(field, "a number", value))
}

fn parse_date(field: PatientField, value: &Value) -> ValidationResult<NaiveDate> {
    let raw = value
        .as_str()
        .ok_or_else(|| wrong_type(field, "a YYYY-MM-DD string", value))?;
    parse_iso_date(raw).ok_or_else(|| {
        ValidationError::InvalidFormat(format!(
            "{} '{}' does not match format YYYY-MM-DD",
            field.name(),
            raw
        ))
    })
}

fn parse_optional_date(field: PatientField, value: &Value) -> ValidationResult<Option<NaiveDate>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        other => parse_date(field, other).map(Some),
    }
}
