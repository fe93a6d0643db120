//! Repository Module - Patient repository facade
//!
//! The only component that talks to the document store. Patient-level reads
//! and all writes propagate their errors; the six per-category event reads
//! degrade to an empty list with a logged warning, so the detail view can
//! render whatever did load.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Months, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::records::{
    Allergy, Condition, Encounter, EventKind, MedicationOrder, Observation, Patient, Procedure,
    RecordBundle, SymptomAssessment,
};
use crate::store::{DocumentStore, Query, StoreError};
use crate::timeline;

const PATIENTS: &str = "patients";

/// Cap applied to observation fetches; the registry keeps full history but
/// the detail view never needs more than this.
const OBSERVATION_FETCH_LIMIT: usize = 50;

/// Candidate cap for name search.
const SEARCH_CANDIDATE_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("patient not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("store read failed: {0}")]
    Read(#[source] StoreError),
    #[error("store write failed: {0}")]
    Write(#[source] StoreError),
}

fn read_err(e: StoreError) -> RepositoryError {
    match e {
        StoreError::NotFound => RepositoryError::NotFound,
        other => RepositoryError::Read(other),
    }
}

fn write_err(e: StoreError) -> RepositoryError {
    match e {
        StoreError::NotFound => RepositoryError::NotFound,
        other => RepositoryError::Write(other),
    }
}

fn decode<T: DeserializeOwned>(doc: serde_json::Value) -> Result<T, RepositoryError> {
    serde_json::from_value(doc)
        .map_err(|e| RepositoryError::Read(StoreError::Backend(format!("bad document: {}", e))))
}

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::Write(StoreError::Backend(e.to_string())))
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339()
}

/// Dashboard aggregates over the active registry.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStats {
    pub total: usize,
    pub by_gender: GenderCounts,
    pub by_age_group: BTreeMap<String, usize>,
    pub new_this_month: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct GenderCounts {
    pub male: usize,
    pub female: usize,
    pub other: usize,
}

/// Typed accessors over the document store for patients and their event
/// collections. Constructed once and shared by reference.
pub struct PatientRepository {
    store: Arc<dyn DocumentStore>,
}

impl PatientRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Runs a query, retrying without ordering when the backend cannot
    /// serve it (a missing composite index). Returns whether the store
    /// order was applied, so callers know to sort client-side.
    async fn query_with_order_fallback(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<(Vec<serde_json::Value>, bool), StoreError> {
        match self.store.query(collection, query.clone()).await {
            Ok(docs) => Ok((docs, query.order_by.is_some())),
            Err(StoreError::IndexUnavailable) => {
                warn!(
                    collection,
                    "ordered query unavailable, falling back to unordered fetch"
                );
                let docs = self.store.query(collection, query.unordered()).await?;
                Ok((docs, false))
            }
            Err(e) => Err(e),
        }
    }

    // ---- Patients ----

    /// Validates and persists a new patient. Caller-supplied id, timestamps
    /// and active flag are ignored; the embedded symptom assessment is
    /// stored exactly as supplied.
    pub async fn create_patient(&self, mut patient: Patient) -> Result<Patient, RepositoryError> {
        validate_patient(&patient)?;

        let now = now_stamp();
        patient.id = String::new();
        patient.created_at = Some(now.clone());
        patient.updated_at = Some(now);
        patient.deleted_at = None;
        patient.active = true;

        let doc = encode(&patient)?;
        let id = self
            .store
            .insert(PATIENTS, doc)
            .await
            .map_err(write_err)?;

        patient.id = id;
        Ok(patient)
    }

    /// Whole-record merge update. Refreshes `updatedAt`; the timestamp is
    /// owned here, never by the caller.
    pub async fn update_patient(
        &self,
        id: &str,
        mut patch: Patient,
    ) -> Result<Patient, RepositoryError> {
        patch.id = String::new();
        patch.updated_at = Some(now_stamp());

        let doc = encode(&patch)?;
        let updated = self
            .store
            .update(PATIENTS, id, doc)
            .await
            .map_err(write_err)?;
        decode(updated)
    }

    /// Soft delete: the document stays, flagged inactive.
    pub async fn delete_patient(&self, id: &str) -> Result<(), RepositoryError> {
        let patch = serde_json::json!({
            "active": false,
            "deletedAt": now_stamp(),
        });
        self.store
            .update(PATIENTS, id, patch)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    pub async fn get_patient(&self, id: &str) -> Result<Patient, RepositoryError> {
        let doc = self.store.get(PATIENTS, id).await.map_err(read_err)?;
        decode(doc)
    }

    /// Every active patient, newest registration first.
    pub async fn all_patients(&self) -> Result<Vec<Patient>, RepositoryError> {
        let query = Query::new().order_by_desc("createdAt");
        let (docs, ordered) = self
            .query_with_order_fallback(PATIENTS, query)
            .await
            .map_err(read_err)?;

        let mut patients = decode_active(docs)?;
        if !ordered {
            sort_by_created_desc(&mut patients);
        }
        Ok(patients)
    }

    /// Case-insensitive substring match on the formatted full name,
    /// evaluated here rather than pushed to the store.
    pub async fn search_patients(&self, term: &str) -> Result<Vec<Patient>, RepositoryError> {
        let query = Query::new()
            .order_by_desc("createdAt")
            .limit(SEARCH_CANDIDATE_LIMIT);
        let (docs, ordered) = self
            .query_with_order_fallback(PATIENTS, query)
            .await
            .map_err(read_err)?;

        let mut patients = decode_active(docs)?;
        if !ordered {
            sort_by_created_desc(&mut patients);
        }

        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(patients);
        }
        Ok(patients
            .into_iter()
            .filter(|p| p.full_name().to_lowercase().contains(&term))
            .collect())
    }

    /// Registry aggregates for the dashboard header. A failed read degrades
    /// to zeroed stats; the dashboard is never the reason a page dies.
    pub async fn patient_stats(&self) -> PatientStats {
        let docs = match self.store.query(PATIENTS, Query::new()).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "patient stats unavailable");
                return PatientStats::default();
            }
        };
        let patients = match decode_active(docs) {
            Ok(patients) => patients,
            Err(e) => {
                warn!(error = %e, "patient stats unavailable");
                return PatientStats::default();
            }
        };

        let mut stats = PatientStats {
            total: patients.len(),
            ..Default::default()
        };
        for label in ["0-18", "19-35", "36-50", "51-65", "65+"] {
            stats.by_age_group.insert(label.to_string(), 0);
        }

        let month_ago = Utc::now().checked_sub_months(Months::new(1));
        for patient in &patients {
            match patient.gender.as_deref() {
                Some("male") => stats.by_gender.male += 1,
                Some("female") => stats.by_gender.female += 1,
                Some("other") => stats.by_gender.other += 1,
                _ => {}
            }

            if let Some(age) = patient.age() {
                let label = match age {
                    i32::MIN..=18 => "0-18",
                    19..=35 => "19-35",
                    36..=50 => "36-50",
                    51..=65 => "51-65",
                    _ => "65+",
                };
                *stats.by_age_group.entry(label.to_string()).or_default() += 1;
            }

            let created = patient.created_at.as_deref().and_then(timeline::parse_when);
            if let (Some(created), Some(cutoff)) = (created, month_ago) {
                if created > cutoff {
                    stats.new_this_month += 1;
                }
            }
        }
        stats
    }

    /// Stores an AI symptom assessment on the patient record.
    pub async fn save_symptom_assessment(
        &self,
        id: &str,
        assessment: &SymptomAssessment,
    ) -> Result<Patient, RepositoryError> {
        let patch = serde_json::json!({
            "symptomAssessment": encode(assessment)?,
            "updatedAt": now_stamp(),
        });
        let updated = self
            .store
            .update(PATIENTS, id, patch)
            .await
            .map_err(write_err)?;
        decode(updated)
    }

    // ---- Clinical events ----

    async fn events_for<T: DeserializeOwned>(
        &self,
        kind: EventKind,
        query: Query,
    ) -> Result<(Vec<T>, bool), RepositoryError> {
        let (docs, ordered) = self
            .query_with_order_fallback(kind.collection(), query)
            .await
            .map_err(read_err)?;
        let events = docs
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<T>, _>>()?;
        Ok((events, ordered))
    }

    fn patient_query(patient_id: &str) -> Query {
        Query::new().filter("patientId", patient_id)
    }

    pub async fn try_patient_encounters(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Encounter>, RepositoryError> {
        let (mut encounters, _) = self
            .events_for::<Encounter>(EventKind::Encounter, Self::patient_query(patient_id))
            .await?;
        sort_desc_by(&mut encounters, timeline::encounter_date);
        Ok(encounters)
    }

    /// Unresolved conditions only; resolved ones stay out of the active
    /// problem list.
    pub async fn try_patient_conditions(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Condition>, RepositoryError> {
        let (conditions, _) = self
            .events_for::<Condition>(EventKind::Condition, Self::patient_query(patient_id))
            .await?;
        Ok(conditions
            .into_iter()
            .filter(|c| c.clinical_status.as_deref() != Some("resolved"))
            .collect())
    }

    pub async fn try_patient_medications(
        &self,
        patient_id: &str,
    ) -> Result<Vec<MedicationOrder>, RepositoryError> {
        let (mut medications, _) = self
            .events_for::<MedicationOrder>(EventKind::Medication, Self::patient_query(patient_id))
            .await?;
        sort_desc_by(&mut medications, timeline::medication_date);
        Ok(medications)
    }

    pub async fn try_patient_procedures(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Procedure>, RepositoryError> {
        let query = Self::patient_query(patient_id).order_by_desc("performedDateTime");
        let (mut procedures, ordered) = self
            .events_for::<Procedure>(EventKind::Procedure, query)
            .await?;
        if !ordered {
            sort_desc_by(&mut procedures, timeline::procedure_date);
        }
        Ok(procedures)
    }

    pub async fn try_patient_observations(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Observation>, RepositoryError> {
        let query = Self::patient_query(patient_id)
            .order_by_desc("effectiveDateTime")
            .limit(OBSERVATION_FETCH_LIMIT);
        let (mut observations, ordered) = self
            .events_for::<Observation>(EventKind::Observation, query)
            .await?;
        if !ordered {
            sort_desc_by(&mut observations, timeline::observation_date);
        }
        Ok(observations)
    }

    pub async fn try_patient_allergies(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Allergy>, RepositoryError> {
        let (allergies, _) = self
            .events_for::<Allergy>(EventKind::Allergy, Self::patient_query(patient_id))
            .await?;
        Ok(allergies)
    }

    pub async fn patient_encounters(&self, patient_id: &str) -> Vec<Encounter> {
        collapse(
            self.try_patient_encounters(patient_id).await,
            EventKind::Encounter,
            patient_id,
        )
    }

    pub async fn patient_conditions(&self, patient_id: &str) -> Vec<Condition> {
        collapse(
            self.try_patient_conditions(patient_id).await,
            EventKind::Condition,
            patient_id,
        )
    }

    pub async fn patient_medications(&self, patient_id: &str) -> Vec<MedicationOrder> {
        collapse(
            self.try_patient_medications(patient_id).await,
            EventKind::Medication,
            patient_id,
        )
    }

    pub async fn patient_procedures(&self, patient_id: &str) -> Vec<Procedure> {
        collapse(
            self.try_patient_procedures(patient_id).await,
            EventKind::Procedure,
            patient_id,
        )
    }

    pub async fn patient_observations(&self, patient_id: &str) -> Vec<Observation> {
        collapse(
            self.try_patient_observations(patient_id).await,
            EventKind::Observation,
            patient_id,
        )
    }

    pub async fn patient_allergies(&self, patient_id: &str) -> Vec<Allergy> {
        collapse(
            self.try_patient_allergies(patient_id).await,
            EventKind::Allergy,
            patient_id,
        )
    }

    /// All six categories for the detail view. Each fetch fails
    /// independently; a category that errors renders empty.
    pub async fn record_bundle(&self, patient_id: &str) -> RecordBundle {
        let (encounters, conditions, medications, allergies, observations, procedures) = tokio::join!(
            self.patient_encounters(patient_id),
            self.patient_conditions(patient_id),
            self.patient_medications(patient_id),
            self.patient_allergies(patient_id),
            self.patient_observations(patient_id),
            self.patient_procedures(patient_id),
        );
        RecordBundle {
            encounters,
            conditions,
            medications,
            allergies,
            observations,
            procedures,
        }
    }

    pub async fn add_encounter(
        &self,
        patient_id: &str,
        mut encounter: Encounter,
    ) -> Result<Encounter, RepositoryError> {
        let now = now_stamp();
        encounter.id = String::new();
        encounter.patient_id = patient_id.to_string();
        encounter.created_at = Some(now.clone());
        encounter.updated_at = Some(now);

        let doc = encode(&encounter)?;
        encounter.id = self
            .store
            .insert(EventKind::Encounter.collection(), doc)
            .await
            .map_err(write_err)?;
        Ok(encounter)
    }

    pub async fn add_condition(
        &self,
        patient_id: &str,
        mut condition: Condition,
    ) -> Result<Condition, RepositoryError> {
        let now = now_stamp();
        condition.id = String::new();
        condition.patient_id = patient_id.to_string();
        condition.created_at = Some(now.clone());
        condition.updated_at = Some(now);

        let doc = encode(&condition)?;
        condition.id = self
            .store
            .insert(EventKind::Condition.collection(), doc)
            .await
            .map_err(write_err)?;
        Ok(condition)
    }

    pub async fn add_medication(
        &self,
        patient_id: &str,
        mut medication: MedicationOrder,
    ) -> Result<MedicationOrder, RepositoryError> {
        let now = now_stamp();
        medication.id = String::new();
        medication.patient_id = patient_id.to_string();
        medication.created_at = Some(now.clone());
        medication.updated_at = Some(now);

        let doc = encode(&medication)?;
        medication.id = self
            .store
            .insert(EventKind::Medication.collection(), doc)
            .await
            .map_err(write_err)?;
        Ok(medication)
    }
}

fn collapse<T>(result: Result<Vec<T>, RepositoryError>, kind: EventKind, patient_id: &str) -> Vec<T> {
    match result {
        Ok(events) => events,
        Err(e) => {
            warn!(
                patient = patient_id,
                category = kind.as_str(),
                error = %e,
                "category fetch failed, rendering empty"
            );
            Vec::new()
        }
    }
}

fn decode_active(docs: Vec<serde_json::Value>) -> Result<Vec<Patient>, RepositoryError> {
    let patients = docs
        .into_iter()
        .map(decode::<Patient>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(patients.into_iter().filter(|p| p.active).collect())
}

fn sort_by_created_desc(patients: &mut [Patient]) {
    patients.sort_by_key(|p| {
        std::cmp::Reverse(p.created_at.as_deref().and_then(timeline::parse_when))
    });
}

fn sort_desc_by<T>(
    events: &mut [T],
    date_of: impl Fn(&T) -> Option<chrono::DateTime<Utc>>,
) {
    events.sort_by_key(|e| std::cmp::Reverse(date_of(e)));
}

/// Registration requirements: first/last name, gender, birth date, phone.
/// Failures surface as one joined message.
fn validate_patient(patient: &Patient) -> Result<(), RepositoryError> {
    let mut errors: Vec<&str> = Vec::new();

    let name_ok = patient.name.first().is_some_and(|n| {
        n.given.first().is_some_and(|g| !g.trim().is_empty())
            && n.family.as_deref().is_some_and(|f| !f.trim().is_empty())
    });
    if !name_ok {
        errors.push("First and last name required");
    }
    if patient.gender.as_deref().unwrap_or("").trim().is_empty() {
        errors.push("Gender required");
    }
    if patient.birth_date.as_deref().unwrap_or("").trim().is_empty() {
        errors.push("Birth date required");
    }
    if patient.contact("phone").unwrap_or("").trim().is_empty() {
        errors.push("Phone number required");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RepositoryError::Validation(errors.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ContactPoint, HumanName, ReportedSymptom};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    fn valid_patient(first: &str, last: &str) -> Patient {
        Patient {
            name: vec![HumanName::official(&[first], last)],
            birth_date: Some("1990-05-01".to_string()),
            gender: Some("female".to_string()),
            telecom: vec![ContactPoint {
                system: Some("phone".to_string()),
                value: Some("555-0100".to_string()),
                use_: None,
            }],
            ..Default::default()
        }
    }

    fn repo() -> PatientRepository {
        PatientRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_patient_round_trip() {
        let repo = repo();
        let mut input = valid_patient("Jane", "Doe");
        input.symptom_assessment = Some(SymptomAssessment {
            symptoms: vec![ReportedSymptom {
                symptom: "headache".to_string(),
                duration: None,
                severity: Some("mild".to_string()),
            }],
            additional_info: Some("recurring".to_string()),
            ai_analysis: None,
            assessed_at: None,
        });

        let created = repo.create_patient(input).await.unwrap();
        assert!(!created.id.is_empty());
        assert!(created.active);
        assert!(created.created_at.is_some());

        let fetched = repo.get_patient(&created.id).await.unwrap();
        assert_eq!(fetched.full_name(), "Jane Doe");
        assert_eq!(fetched.birth_date.as_deref(), Some("1990-05-01"));
        assert_eq!(fetched.gender.as_deref(), Some("female"));

        // The embedded assessment survives unreshaped.
        let assessment = fetched.symptom_assessment.unwrap();
        assert_eq!(assessment.symptoms[0].symptom, "headache");
        assert_eq!(assessment.additional_info.as_deref(), Some("recurring"));
    }

    #[tokio::test]
    async fn test_create_patient_joins_validation_errors() {
        let err = repo().create_patient(Patient::default()).await.unwrap_err();
        let RepositoryError::Validation(message) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            message,
            "First and last name required, Gender required, Birth date required, Phone number required"
        );
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_listing_but_not_from_get() {
        let repo = repo();
        let created = repo.create_patient(valid_patient("Jane", "Doe")).await.unwrap();

        repo.delete_patient(&created.id).await.unwrap();

        let listed = repo.all_patients().await.unwrap();
        assert!(listed.iter().all(|p| p.id != created.id));

        let still_there = repo.get_patient(&created.id).await.unwrap();
        assert!(!still_there.active);
        assert!(still_there.deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_get_and_update_missing_patient_is_not_found() {
        let repo = repo();
        assert!(matches!(
            repo.get_patient("missing").await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repo.update_patient("missing", valid_patient("J", "D")).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp_and_merges() {
        let repo = repo();
        let created = repo.create_patient(valid_patient("Jane", "Doe")).await.unwrap();

        let mut patch = created.clone();
        patch.race = Some("Asian".to_string());
        patch.updated_at = Some("1999-01-01T00:00:00Z".to_string());

        let updated = repo.update_patient(&created.id, patch).await.unwrap();
        assert_eq!(updated.race.as_deref(), Some("Asian"));
        assert_eq!(updated.id, created.id);
        assert_ne!(
            updated.updated_at.as_deref(),
            Some("1999-01-01T00:00:00Z"),
            "updatedAt is stamped by the facade, not the caller"
        );
    }

    #[tokio::test]
    async fn test_all_patients_newest_first_with_unordered_fallback() {
        let store = Arc::new(MemoryStore::without_ordering());
        for (name, created) in [("Old", "2023-01-01T00:00:00Z"), ("New", "2024-01-01T00:00:00Z")] {
            store
                .insert(
                    PATIENTS,
                    json!({
                        "name": [{"use": "official", "given": [name], "family": "Person"}],
                        "createdAt": created,
                        "active": true
                    }),
                )
                .await
                .unwrap();
        }
        let repo = PatientRepository::new(store);

        let patients = repo.all_patients().await.unwrap();
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[0].full_name(), "New Person");
        assert_eq!(patients[1].full_name(), "Old Person");
    }

    #[tokio::test]
    async fn test_search_matches_full_name_case_insensitively() {
        let repo = repo();
        repo.create_patient(valid_patient("Jane", "Doe")).await.unwrap();
        repo.create_patient(valid_patient("John", "Smith")).await.unwrap();

        let hits = repo.search_patients("jane d").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].full_name(), "Jane Doe");

        let all = repo.search_patients("").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_conditions_exclude_resolved() {
        let store = Arc::new(MemoryStore::new());
        for (display, status) in [("Hypertension", "active"), ("Flu", "resolved")] {
            store
                .insert(
                    "conditions",
                    json!({"patientId": "p1", "display": display, "clinicalStatus": status}),
                )
                .await
                .unwrap();
        }
        let repo = PatientRepository::new(store);

        let conditions = repo.patient_conditions("p1").await;
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].display.as_deref(), Some("Hypertension"));
    }

    #[tokio::test]
    async fn test_observations_are_capped() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..60 {
            store
                .insert(
                    "observations",
                    json!({
                        "patientId": "p1",
                        "display": format!("obs-{}", i),
                        "effectiveDateTime": format!("2024-01-{:02}T00:00:00Z", (i % 28) + 1)
                    }),
                )
                .await
                .unwrap();
        }
        let repo = PatientRepository::new(store);

        let observations = repo.patient_observations("p1").await;
        assert_eq!(observations.len(), OBSERVATION_FETCH_LIMIT);
    }

    #[tokio::test]
    async fn test_add_medication_stamps_and_links() {
        let repo = repo();
        let med = MedicationOrder {
            display: Some("Lisinopril".to_string()),
            dosage: Some("10mg".to_string()),
            ..Default::default()
        };

        let stored = repo.add_medication("p1", med).await.unwrap();
        assert!(!stored.id.is_empty());
        assert_eq!(stored.patient_id, "p1");
        assert!(stored.created_at.is_some());

        let listed = repo.patient_medications("p1").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].label(), Some("Lisinopril"));
    }

    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn insert(&self, _: &str, _: serde_json::Value) -> Result<String, StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
        async fn get(&self, _: &str, _: &str) -> Result<serde_json::Value, StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
        async fn update(
            &self,
            _: &str,
            _: &str,
            _: serde_json::Value,
        ) -> Result<serde_json::Value, StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
        async fn query(&self, _: &str, _: Query) -> Result<Vec<serde_json::Value>, StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_category_reads_degrade_to_empty_but_patient_reads_propagate() {
        let repo = PatientRepository::new(Arc::new(FailingStore));

        // Per-category: the explicit Result surfaces the failure...
        assert!(repo.try_patient_encounters("p1").await.is_err());
        // ...and the aggregation-boundary view collapses it to empty.
        assert!(repo.patient_encounters("p1").await.is_empty());
        let bundle = repo.record_bundle("p1").await;
        assert!(bundle.is_empty());

        // Patient-level reads and writes propagate.
        assert!(matches!(
            repo.all_patients().await,
            Err(RepositoryError::Read(_))
        ));
        assert!(matches!(
            repo.create_patient(valid_patient("Jane", "Doe")).await,
            Err(RepositoryError::Write(_))
        ));

        // Stats degrade to zeroes rather than failing.
        let stats = repo.patient_stats().await;
        assert_eq!(stats.total, 0);
    }

    #[tokio::test]
    async fn test_patient_stats_aggregates() {
        let repo = repo();
        repo.create_patient(valid_patient("Jane", "Doe")).await.unwrap();
        let mut male = valid_patient("John", "Smith");
        male.gender = Some("male".to_string());
        male.birth_date = Some("1950-01-01".to_string());
        repo.create_patient(male).await.unwrap();

        let stats = repo.patient_stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_gender.female, 1);
        assert_eq!(stats.by_gender.male, 1);
        assert_eq!(stats.new_this_month, 2);
        assert_eq!(stats.by_age_group.get("65+"), Some(&1));
    }
}
