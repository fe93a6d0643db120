//! The six clinical event kinds and the tagged enum over them.
//!
//! Each kind lives in its own store collection and is foreign-keyed to a
//! patient by `patientId`. Date fields stay strings here; resolution into
//! comparable timestamps happens in the timeline layer.

use serde::{Deserialize, Serialize};

/// Start/end pair used by encounters and medication orders.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Numeric observation value with a unit.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Quantity {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Free-text stand-in for a coded concept.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodeableText {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Encounter {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patient_id: String,
    /// Visit class shown as the event title (`Ambulatory`, `Emergency`, ...).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinical_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abatement_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicationOrder {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medication_codeable_concept: Option<CodeableText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authored_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescriber: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MedicationOrder {
    /// Display label; older records only carry the codeable-concept text.
    pub fn label(&self) -> Option<&str> {
        self.display.as_deref().or_else(|| {
            self.medication_codeable_concept
                .as_ref()
                .and_then(|c| c.text.as_deref())
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Observation {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Observation {
    /// Rendered result: `"120 mmHg"`, the free-text value, or `None`.
    pub fn rendered_value(&self) -> Option<String> {
        if let Some(q) = &self.value_quantity {
            let unit = q.unit.as_deref().unwrap_or("");
            return Some(format!("{} {}", q.value, unit).trim().to_string());
        }
        self.value_string.clone()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Procedure {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Allergy {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinical_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criticality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The six clinical event categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Encounter,
    Condition,
    Medication,
    Allergy,
    Observation,
    Procedure,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Encounter,
        EventKind::Condition,
        EventKind::Medication,
        EventKind::Allergy,
        EventKind::Observation,
        EventKind::Procedure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Encounter => "encounter",
            EventKind::Condition => "condition",
            EventKind::Medication => "medication",
            EventKind::Allergy => "allergy",
            EventKind::Observation => "observation",
            EventKind::Procedure => "procedure",
        }
    }

    /// Store collection holding this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            EventKind::Encounter => "encounters",
            EventKind::Condition => "conditions",
            EventKind::Medication => "medications",
            EventKind::Allergy => "allergies",
            EventKind::Observation => "observations",
            EventKind::Procedure => "procedures",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "encounter" => Ok(EventKind::Encounter),
            "condition" => Ok(EventKind::Condition),
            "medication" => Ok(EventKind::Medication),
            "allergy" => Ok(EventKind::Allergy),
            "observation" => Ok(EventKind::Observation),
            "procedure" => Ok(EventKind::Procedure),
            other => Err(format!("unknown event kind: {}", other)),
        }
    }
}

/// One clinical event of any kind.
#[derive(Clone, Debug)]
pub enum ClinicalEvent {
    Encounter(Encounter),
    Condition(Condition),
    Medication(MedicationOrder),
    Allergy(Allergy),
    Observation(Observation),
    Procedure(Procedure),
}

impl ClinicalEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ClinicalEvent::Encounter(_) => EventKind::Encounter,
            ClinicalEvent::Condition(_) => EventKind::Condition,
            ClinicalEvent::Medication(_) => EventKind::Medication,
            ClinicalEvent::Allergy(_) => EventKind::Allergy,
            ClinicalEvent::Observation(_) => EventKind::Observation,
            ClinicalEvent::Procedure(_) => EventKind::Procedure,
        }
    }

    pub fn created_at(&self) -> Option<&str> {
        match self {
            ClinicalEvent::Encounter(e) => e.created_at.as_deref(),
            ClinicalEvent::Condition(c) => c.created_at.as_deref(),
            ClinicalEvent::Medication(m) => m.created_at.as_deref(),
            ClinicalEvent::Allergy(a) => a.created_at.as_deref(),
            ClinicalEvent::Observation(o) => o.created_at.as_deref(),
            ClinicalEvent::Procedure(p) => p.created_at.as_deref(),
        }
    }
}

impl From<Encounter> for ClinicalEvent {
    fn from(e: Encounter) -> Self {
        ClinicalEvent::Encounter(e)
    }
}

impl From<Condition> for ClinicalEvent {
    fn from(c: Condition) -> Self {
        ClinicalEvent::Condition(c)
    }
}

impl From<MedicationOrder> for ClinicalEvent {
    fn from(m: MedicationOrder) -> Self {
        ClinicalEvent::Medication(m)
    }
}

impl From<Allergy> for ClinicalEvent {
    fn from(a: Allergy) -> Self {
        ClinicalEvent::Allergy(a)
    }
}

impl From<Observation> for ClinicalEvent {
    fn from(o: Observation) -> Self {
        ClinicalEvent::Observation(o)
    }
}

impl From<Procedure> for ClinicalEvent {
    fn from(p: Procedure) -> Self {
        ClinicalEvent::Procedure(p)
    }
}

/// All of one patient's event collections, as fetched for the detail view.
/// Any category may be empty, including all of them.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBundle {
    pub encounters: Vec<Encounter>,
    pub conditions: Vec<Condition>,
    pub medications: Vec<MedicationOrder>,
    pub allergies: Vec<Allergy>,
    pub observations: Vec<Observation>,
    pub procedures: Vec<Procedure>,
}

impl RecordBundle {
    pub fn is_empty(&self) -> bool {
        self.encounters.is_empty()
            && self.conditions.is_empty()
            && self.medications.is_empty()
            && self.allergies.is_empty()
            && self.observations.is_empty()
            && self.procedures.is_empty()
    }

    /// Events of one category, in stored order.
    pub fn events_of(&self, kind: EventKind) -> Vec<ClinicalEvent> {
        match kind {
            EventKind::Encounter => self.encounters.iter().cloned().map(Into::into).collect(),
            EventKind::Condition => self.conditions.iter().cloned().map(Into::into).collect(),
            EventKind::Medication => self.medications.iter().cloned().map(Into::into).collect(),
            EventKind::Allergy => self.allergies.iter().cloned().map(Into::into).collect(),
            EventKind::Observation => self.observations.iter().cloned().map(Into::into).collect(),
            EventKind::Procedure => self.procedures.iter().cloned().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_parse_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("visit".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_medication_label_falls_back_to_codeable_text() {
        let med: MedicationOrder = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "patientId": "p1",
            "medicationCodeableConcept": {"text": "Lisinopril"},
            "status": "active"
        }))
        .unwrap();
        assert_eq!(med.label(), Some("Lisinopril"));
    }

    #[test]
    fn test_observation_rendered_value() {
        let obs = Observation {
            value_quantity: Some(Quantity {
                value: 120.0,
                unit: Some("mmHg".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(obs.rendered_value().unwrap(), "120 mmHg");

        let text_only = Observation {
            value_string: Some("positive".to_string()),
            ..Default::default()
        };
        assert_eq!(text_only.rendered_value().unwrap(), "positive");

        assert!(Observation::default().rendered_value().is_none());
    }

    #[test]
    fn test_encounter_keeps_camel_case_document_fields() {
        let enc = Encounter {
            id: "e1".to_string(),
            patient_id: "p1".to_string(),
            reason_code: Some("Checkup".to_string()),
            ..Default::default()
        };
        let doc = serde_json::to_value(&enc).unwrap();
        assert_eq!(doc.get("patientId").unwrap(), "p1");
        assert_eq!(doc.get("reasonCode").unwrap(), "Checkup");
    }
}
