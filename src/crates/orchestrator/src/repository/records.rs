//! Domain record types.
//!
//! Event times are naive wall-clock datetimes: users report "I took it at
//! 14:30" in their own local time and the original data is stored the same
//! way.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Common accessors every domain record exposes to the generic store.
pub trait HealthRecord: Clone + Send + Sync + 'static {
    /// Record id.
    fn id(&self) -> Uuid;

    /// Owning user.
    fn user_id(&self) -> &str;

    /// When the recorded event happened.
    fn occurred_at(&self) -> NaiveDateTime;

    /// When the row was created.
    fn created_at(&self) -> NaiveDateTime;
}

macro_rules! impl_health_record {
    ($ty:ty, $occurred:ident) => {
        impl HealthRecord for $ty {
            fn id(&self) -> Uuid {
                self.id
            }
            fn user_id(&self) -> &str {
                &self.user_id
            }
            fn occurred_at(&self) -> NaiveDateTime {
                self.$occurred
            }
            fn created_at(&self) -> NaiveDateTime {
                self.created_at
            }
        }
    };
}

/// One blood-pressure measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodPressureRecord {
    pub id: Uuid,
    pub user_id: String,
    /// Systolic pressure in mmHg.
    pub systolic: i64,
    /// Diastolic pressure in mmHg.
    pub diastolic: i64,
    /// Heart rate in beats per minute.
    pub heart_rate: Option<i64>,
    pub notes: Option<String>,
    pub record_time: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl_health_record!(BloodPressureRecord, record_time);

/// One medication intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub id: Uuid,
    pub user_id: String,
    pub medication_name: String,
    /// Dose amount, in `dosage_unit`s.
    pub dosage: i64,
    pub dosage_unit: String,
    pub medication_time: NaiveDateTime,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl_health_record!(MedicationRecord, medication_time);

/// Recovery state of a reported symptom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    /// First report of this symptom.
    New,
    /// Previously reported and still present.
    Ongoing,
    /// Resolved.
    Recovered,
}

impl RecoveryStatus {
    /// Parse the wire form used by tool arguments.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "ongoing" => Some(Self::Ongoing),
            "recovered" => Some(Self::Recovered),
            _ => None,
        }
    }

    /// The wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Ongoing => "ongoing",
            Self::Recovered => "recovered",
        }
    }
}

/// One symptom report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomRecord {
    pub id: Uuid,
    pub user_id: String,
    pub symptom_name: String,
    pub recovery_status: RecoveryStatus,
    pub record_time: NaiveDateTime,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl_health_record!(SymptomRecord, record_time);

/// One health-event check-in (e.g. exercise, low-salt meal, good sleep).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEventRecord {
    pub id: Uuid,
    pub user_id: String,
    pub event_type: String,
    pub check_in_time: NaiveDateTime,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl_health_record!(HealthEventRecord, check_in_time);

/// A persisted user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    /// Free-form profile map injected into prompts.
    pub user_info: Option<Value>,
}
