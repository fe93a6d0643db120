//! Records Module - Patient and clinical event model
//!
//! Typed shapes for the documents the registry keeps: the patient record and
//! the six clinical event kinds tied to it. Field names serialize as
//! camelCase to stay compatible with documents already in the store.

pub mod events;
pub mod patient;

pub use events::{
    Allergy, ClinicalEvent, CodeableText, Condition, Encounter, EventKind, MedicationOrder,
    Observation, Period, Procedure, Quantity, RecordBundle,
};
pub use patient::{
    calculate_age_at, clean_name, format_name, Address, ContactPoint, EmergencyContact, HumanName,
    Insurance, Patient, ReportedSymptom, SymptomAssessment,
};
