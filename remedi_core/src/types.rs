//! Core domain types for the Remedi medication reminder system.
//!
//! The central type is [`Medication`]: an immutable value describing one
//! course of treatment (start time, dosing interval, duration). Everything
//! else in the system — dose occurrences, reminders, statistics — is derived
//! from the medication collection.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A medication with its dosing schedule.
///
/// Medications use replace-on-update semantics: edits produce a new value
/// with the same `id` rather than mutating fields in place. The persisted
/// JSON shape is camelCase with `startTime` as an RFC 3339 string; a blob
/// written before the `isActive` flag existed reads back as active.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// Stable identity, assigned at creation and never reused
    pub id: Uuid,
    pub name: String,
    /// Free-form dosage description, e.g. "500mg"
    pub dosage: String,
    /// Timestamp of the first dose
    pub start_time: DateTime<Utc>,
    /// Hours between consecutive doses, at least 1
    pub interval_hours: u32,
    /// Treatment duration in calendar days from `start_time`, at least 1
    pub total_days: u32,
    /// Inactive medications produce no doses and hold no reminders
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_is_active() -> bool {
    true
}

impl Medication {
    /// Create a new medication with a fresh id, active by default.
    ///
    /// Rejects invalid schedule parameters before the value exists, so a
    /// `Medication` obtained from this constructor always satisfies
    /// [`Medication::validate`].
    pub fn new(
        name: impl Into<String>,
        dosage: impl Into<String>,
        start_time: DateTime<Utc>,
        interval_hours: u32,
        total_days: u32,
        notes: Option<String>,
    ) -> Result<Self> {
        let medication = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            dosage: dosage.into(),
            start_time,
            interval_hours,
            total_days,
            is_active: true,
            notes,
        };
        medication.validate()?;
        Ok(medication)
    }

    /// Check the schedule invariants: non-empty name, interval and duration
    /// both at least 1.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("medication name must not be empty".into()));
        }
        if self.interval_hours == 0 {
            return Err(Error::Validation(format!(
                "interval_hours must be at least 1, got {}",
                self.interval_hours
            )));
        }
        if self.total_days == 0 {
            return Err(Error::Validation(format!(
                "total_days must be at least 1, got {}",
                self.total_days
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_new_assigns_id_and_defaults_active() {
        let med = Medication::new("Amoxicillin", "500mg", start(), 8, 7, None).unwrap();
        assert!(med.is_active);
        assert!(!med.id.is_nil());
    }

    #[test]
    fn test_new_rejects_zero_interval() {
        let result = Medication::new("Amoxicillin", "500mg", start(), 0, 7, None);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_new_rejects_zero_days() {
        let result = Medication::new("Amoxicillin", "500mg", start(), 8, 0, None);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_new_rejects_blank_name() {
        let result = Medication::new("   ", "500mg", start(), 8, 7, None);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_serde_roundtrip_is_exact() {
        let med = Medication::new(
            "Ibuprofen",
            "200mg",
            start(),
            6,
            3,
            Some("with food".into()),
        )
        .unwrap();

        let blob = serde_json::to_string(&med).unwrap();
        let back: Medication = serde_json::from_str(&blob).unwrap();
        assert_eq!(med, back);
    }

    #[test]
    fn test_persisted_shape_is_camel_case() {
        let med = Medication::new("Ibuprofen", "200mg", start(), 6, 3, None).unwrap();
        let value: serde_json::Value = serde_json::to_value(&med).unwrap();

        assert!(value.get("startTime").is_some());
        assert!(value.get("intervalHours").is_some());
        assert!(value.get("totalDays").is_some());
        assert!(value.get("isActive").is_some());
    }

    #[test]
    fn test_missing_is_active_defaults_to_true() {
        let blob = r#"{
            "id": "6f1c1f3a-2b4d-4e5f-8a9b-0c1d2e3f4a5b",
            "name": "Ibuprofen",
            "dosage": "200mg",
            "startTime": "2024-01-01T08:00:00Z",
            "intervalHours": 6,
            "totalDays": 3
        }"#;

        let med: Medication = serde_json::from_str(blob).unwrap();
        assert!(med.is_active);
        assert_eq!(med.notes, None);
    }
}
