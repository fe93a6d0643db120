//! REST API - Patient registry endpoints
//!
//! Error mapping: `NotFound` -> 404, validation -> 422, store failures ->
//! 502, AI failures -> 502. Per-category event reads never error; they
//! render whatever loaded.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::ai::{AiError, AiService, ChatMessage};
use crate::records::{
    Allergy, Condition, Encounter, MedicationOrder, Observation, Patient, Procedure,
    ReportedSymptom,
};
use crate::repository::{PatientRepository, PatientStats, RepositoryError};
use crate::timeline::{self, TimelineEvent, TimelineFilter};

pub fn routes() -> Router {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/search", get(search_patients))
        .route("/patients/stats", get(patient_stats))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route(
            "/patients/:id/encounters",
            get(get_encounters).post(add_encounter),
        )
        .route(
            "/patients/:id/conditions",
            get(get_conditions).post(add_condition),
        )
        .route(
            "/patients/:id/medications",
            get(get_medications).post(add_medication),
        )
        .route("/patients/:id/observations", get(get_observations))
        .route("/patients/:id/procedures", get(get_procedures))
        .route("/patients/:id/allergies", get(get_allergies))
        .route("/patients/:id/timeline", get(get_timeline))
        .route("/patients/:id/summary", post(generate_summary))
        .route(
            "/patients/:id/chat",
            get(chat_history).post(send_chat).delete(clear_chat),
        )
        .route("/patients/:id/symptom-assessment", post(assess_symptoms))
}

type ApiError = (StatusCode, String);

fn repo_err(e: RepositoryError) -> ApiError {
    let status = match e {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RepositoryError::Read(_) | RepositoryError::Write(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

fn ai_err(e: AiError) -> ApiError {
    (StatusCode::BAD_GATEWAY, e.to_string())
}

// ---- Patients ----

async fn list_patients(
    Extension(repo): Extension<Arc<PatientRepository>>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    repo.all_patients().await.map(Json).map_err(repo_err)
}

async fn create_patient(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Json(patient): Json<Patient>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let created = repo.create_patient(patient).await.map_err(repo_err)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn search_patients(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    repo.search_patients(params.q.as_deref().unwrap_or(""))
        .await
        .map(Json)
        .map_err(repo_err)
}

async fn patient_stats(
    Extension(repo): Extension<Arc<PatientRepository>>,
) -> Json<PatientStats> {
    Json(repo.patient_stats().await)
}

async fn get_patient(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    repo.get_patient(&id).await.map(Json).map_err(repo_err)
}

async fn update_patient(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
    Json(patient): Json<Patient>,
) -> Result<Json<Patient>, ApiError> {
    repo.update_patient(&id, patient)
        .await
        .map(Json)
        .map_err(repo_err)
}

async fn delete_patient(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    repo.delete_patient(&id).await.map_err(repo_err)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Clinical events ----

async fn get_encounters(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
) -> Json<Vec<Encounter>> {
    Json(repo.patient_encounters(&id).await)
}

async fn get_conditions(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
) -> Json<Vec<Condition>> {
    Json(repo.patient_conditions(&id).await)
}

async fn get_medications(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
) -> Json<Vec<MedicationOrder>> {
    Json(repo.patient_medications(&id).await)
}

async fn get_observations(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
) -> Json<Vec<Observation>> {
    Json(repo.patient_observations(&id).await)
}

async fn get_procedures(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
) -> Json<Vec<Procedure>> {
    Json(repo.patient_procedures(&id).await)
}

async fn get_allergies(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
) -> Json<Vec<Allergy>> {
    Json(repo.patient_allergies(&id).await)
}

async fn add_encounter(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
    Json(encounter): Json<Encounter>,
) -> Result<(StatusCode, Json<Encounter>), ApiError> {
    let stored = repo.add_encounter(&id, encounter).await.map_err(repo_err)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn add_condition(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
    Json(condition): Json<Condition>,
) -> Result<(StatusCode, Json<Condition>), ApiError> {
    let stored = repo.add_condition(&id, condition).await.map_err(repo_err)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn add_medication(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
    Json(medication): Json<MedicationOrder>,
) -> Result<(StatusCode, Json<MedicationOrder>), ApiError> {
    let stored = repo.add_medication(&id, medication).await.map_err(repo_err)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

// ---- Timeline ----

#[derive(Deserialize)]
struct TimelineParams {
    filter: Option<String>,
}

async fn get_timeline(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Path(id): Path<String>,
    Query(params): Query<TimelineParams>,
) -> Result<Json<Vec<TimelineEvent>>, ApiError> {
    let filter = params
        .filter
        .as_deref()
        .unwrap_or("all")
        .parse::<TimelineFilter>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    // Existence check first: an unknown patient is a 404, not an empty
    // timeline.
    repo.get_patient(&id).await.map_err(repo_err)?;

    let bundle = repo.record_bundle(&id).await;
    Ok(Json(timeline::build_timeline(&bundle, filter)))
}

// ---- AI ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRequest {
    record_limit: Option<usize>,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

async fn generate_summary(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Extension(ai): Extension<Arc<AiService>>,
    Path(id): Path<String>,
    body: Option<Json<SummaryRequest>>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let patient = repo.get_patient(&id).await.map_err(repo_err)?;
    let bundle = repo.record_bundle(&id).await;

    let limit = body.and_then(|Json(req)| req.record_limit);
    let summary = ai
        .summarize(&patient, &bundle, limit)
        .await
        .map_err(ai_err)?;
    Ok(Json(SummaryResponse { summary }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    message: String,
    record_limit: Option<usize>,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
}

async fn send_chat(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Extension(ai): Extension<Arc<AiService>>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message must not be empty".to_string()));
    }

    let patient = repo.get_patient(&id).await.map_err(repo_err)?;
    let bundle = repo.record_bundle(&id).await;

    let reply = ai
        .chat(&patient, &bundle, req.message.trim(), req.record_limit)
        .await
        .map_err(ai_err)?;
    Ok(Json(ChatResponse { reply }))
}

async fn chat_history(
    Extension(ai): Extension<Arc<AiService>>,
    Path(id): Path<String>,
) -> Json<Vec<ChatMessage>> {
    Json(ai.chat_history(&id))
}

async fn clear_chat(
    Extension(ai): Extension<Arc<AiService>>,
    Path(id): Path<String>,
) -> StatusCode {
    ai.clear_chat(&id);
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymptomAssessmentRequest {
    symptoms: Vec<ReportedSymptom>,
    additional_info: Option<String>,
    /// Write the assessment back onto the patient record.
    #[serde(default)]
    persist: bool,
}

#[derive(Serialize)]
struct SymptomAssessmentResponse {
    analysis: String,
}

async fn assess_symptoms(
    Extension(repo): Extension<Arc<PatientRepository>>,
    Extension(ai): Extension<Arc<AiService>>,
    Path(id): Path<String>,
    Json(req): Json<SymptomAssessmentRequest>,
) -> Result<Json<SymptomAssessmentResponse>, ApiError> {
    if req.symptoms.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "at least one symptom is required".to_string(),
        ));
    }

    let patient = repo.get_patient(&id).await.map_err(repo_err)?;
    let assessment = ai
        .assess_symptoms(&patient, &req.symptoms, req.additional_info.as_deref())
        .await
        .map_err(ai_err)?;

    if req.persist {
        repo.save_symptom_assessment(&id, &assessment)
            .await
            .map_err(repo_err)?;
    }

    Ok(Json(SymptomAssessmentResponse {
        analysis: assessment.ai_analysis.unwrap_or_default(),
    }))
}
