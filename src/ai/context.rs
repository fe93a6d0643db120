//! Bounded prompt construction from a patient's record.
//!
//! Every AI call sees at most the top N most-recent records per category,
//! rendered one line each, so the prompt stays a fixed size no matter how
//! long the history grows.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::records::{Patient, RecordBundle, ReportedSymptom};
use crate::timeline;

/// Default per-category record cap for summary and chat context.
pub const DEFAULT_RECORD_LIMIT: usize = 5;

/// Limits the chat UI offers for widening the context window.
pub const CHAT_RECORD_LIMITS: [usize; 5] = [5, 10, 15, 20, 50];

/// References to the `limit` most recently dated items, newest first.
/// Undated items sort as oldest.
pub fn top_recent<'a, T>(
    items: &'a [T],
    date_of: impl Fn(&T) -> Option<DateTime<Utc>>,
    limit: usize,
) -> Vec<&'a T> {
    let mut keyed: Vec<(&T, Option<DateTime<Utc>>)> =
        items.iter().map(|item| (item, date_of(item))).collect();
    keyed.sort_by(|a, b| b.1.cmp(&a.1));
    keyed.into_iter().take(limit).map(|(item, _)| item).collect()
}

fn line_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => "Unknown date".to_string(),
    }
}

/// Renders the bounded patient context: demographics header plus one line
/// per selected record in each of the five summary categories.
pub fn patient_context(patient: &Patient, bundle: &RecordBundle, limit: usize) -> String {
    let mut out = String::new();

    writeln!(out, "PATIENT INFORMATION:").unwrap();
    writeln!(out, "Name: {}", patient.full_name()).unwrap();
    writeln!(out, "Age: {}", patient.age_display()).unwrap();
    writeln!(
        out,
        "Gender: {}",
        patient.gender.as_deref().unwrap_or("Unknown")
    )
    .unwrap();
    writeln!(
        out,
        "Race: {}",
        patient.race.as_deref().unwrap_or("Not specified")
    )
    .unwrap();
    writeln!(
        out,
        "Ethnicity: {}",
        patient.ethnicity.as_deref().unwrap_or("Not specified")
    )
    .unwrap();

    writeln!(out, "\nRECENT ENCOUNTERS (Last {}):", limit).unwrap();
    for (i, e) in top_recent(&bundle.encounters, timeline::encounter_date, limit)
        .into_iter()
        .enumerate()
    {
        writeln!(
            out,
            "{}. {} on {} - {} (Status: {})",
            i + 1,
            e.type_.as_deref().unwrap_or("Medical Encounter"),
            line_date(timeline::encounter_date(e)),
            e.reason_code.as_deref().unwrap_or("General care"),
            e.status.as_deref().unwrap_or("unknown"),
        )
        .unwrap();
    }

    writeln!(out, "\nMEDICAL CONDITIONS (Last {}):", limit).unwrap();
    for (i, c) in top_recent(&bundle.conditions, timeline::condition_date, limit)
        .into_iter()
        .enumerate()
    {
        writeln!(
            out,
            "{}. {} - Status: {} (Since: {})",
            i + 1,
            c.display.as_deref().unwrap_or("Medical Condition"),
            c.clinical_status.as_deref().unwrap_or("unknown"),
            line_date(timeline::condition_date(c)),
        )
        .unwrap();
    }

    writeln!(out, "\nMEDICATIONS (Last {}):", limit).unwrap();
    for (i, m) in top_recent(&bundle.medications, timeline::medication_date, limit)
        .into_iter()
        .enumerate()
    {
        writeln!(
            out,
            "{}. {} - {} (Status: {}) - Reason: {}",
            i + 1,
            m.label().unwrap_or("Medication"),
            m.dosage.as_deref().unwrap_or("As prescribed"),
            m.status.as_deref().unwrap_or("unknown"),
            m.reason_code.as_deref().unwrap_or("Not specified"),
        )
        .unwrap();
    }

    writeln!(out, "\nLAB RESULTS/OBSERVATIONS (Last {}):", limit).unwrap();
    for (i, o) in top_recent(&bundle.observations, timeline::observation_date, limit)
        .into_iter()
        .enumerate()
    {
        writeln!(
            out,
            "{}. {}: {} on {}",
            i + 1,
            o.display.as_deref().unwrap_or("Observation"),
            o.rendered_value()
                .unwrap_or_else(|| "Result pending".to_string()),
            line_date(timeline::observation_date(o)),
        )
        .unwrap();
    }

    writeln!(out, "\nPROCEDURES (Last {}):", limit).unwrap();
    for (i, p) in top_recent(&bundle.procedures, timeline::procedure_date, limit)
        .into_iter()
        .enumerate()
    {
        writeln!(
            out,
            "{}. {} on {} - Status: {}",
            i + 1,
            p.display.as_deref().unwrap_or("Procedure"),
            line_date(timeline::procedure_date(p)),
            p.status.as_deref().unwrap_or("unknown"),
        )
        .unwrap();
    }

    out
}

/// The fixed clinical-summary instruction wrapped around the context.
pub fn summary_prompt(patient: &Patient, bundle: &RecordBundle, limit: usize) -> String {
    format!(
        "As a medical AI assistant, please provide a comprehensive yet concise medical summary \
         for this patient. Focus on identifying patterns, potential concerns, and key insights \
         from their medical history.\n\n\
         {}\n\
         Please provide:\n\
         1. A brief patient overview\n\
         2. Key medical concerns or patterns identified\n\
         3. Current treatment status\n\
         4. Any recommendations for healthcare providers\n\
         5. Notable trends in the patient's health data\n\n\
         Keep the summary professional, concise (300-500 words), and focused on clinically \
         relevant insights.",
        patient_context(patient, bundle, limit)
    )
}

/// Chat-mode prompt: guideline preamble, bounded context, then the
/// provider's free-form question.
pub fn chat_prompt(patient: &Patient, bundle: &RecordBundle, limit: usize, question: &str) -> String {
    format!(
        "You are a medical AI assistant helping healthcare providers understand patient data. \
         You have access to the following patient information (limited to the last {} records \
         from each category):\n\n\
         {}\n\
         IMPORTANT GUIDELINES:\n\
         - Only answer questions related to this specific patient's medical data\n\
         - Provide accurate, clinical information based on the provided data\n\
         - If asked about information not in the provided data, clearly state that\n\
         - Do not provide medical diagnoses or treatment recommendations\n\
         - Focus on explaining patterns, timelines, and relationships in the data\n\
         - Be professional and concise in your responses\n\n\
         USER QUESTION: {}\n\n\
         Please provide a helpful response based on the patient's medical data above.",
        limit,
        patient_context(patient, bundle, limit),
        question
    )
}

/// Preliminary symptom-assessment prompt used during registration.
pub fn symptom_prompt(
    patient_name: &str,
    age: &str,
    gender: &str,
    symptoms: &[ReportedSymptom],
    additional_info: Option<&str>,
) -> String {
    let symptom_lines: String = symptoms
        .iter()
        .map(|s| {
            format!(
                "- {} (Severity: {}, Duration: {})\n",
                s.symptom,
                s.severity.as_deref().unwrap_or("moderate"),
                s.duration.as_deref().unwrap_or("Unknown duration"),
            )
        })
        .collect();

    format!(
        "You are a medical AI assistant helping with preliminary symptom assessment during \
         patient registration. Analyze the following symptoms and provide a professional \
         medical assessment.\n\n\
         PATIENT INFORMATION:\n\
         - Name: {}\n\
         - Age: {}\n\
         - Gender: {}\n\n\
         REPORTED SYMPTOMS:\n{}\n\
         ADDITIONAL INFORMATION:\n{}\n\n\
         Please provide a structured assessment with the following sections:\n\
         1. SYMPTOM SUMMARY: Brief overview of the reported symptoms\n\
         2. POSSIBLE CONDITIONS: The 3-5 most likely conditions that could explain these \
         symptoms, in order of likelihood, each with a short rationale\n\
         3. URGENCY LEVEL: Routine, Moderate, Urgent, or Emergency, with reasoning\n\
         4. RECOMMENDED ACTIONS: What the patient should do next and whether they need to \
         see a doctor immediately, within a few days, or can monitor at home\n\
         5. WARNING SIGNS: Symptoms that would require immediate medical attention\n\
         6. SPECIALIST RECOMMENDATION: Which type of doctor would be most appropriate\n\n\
         IMPORTANT: This is a preliminary assessment only, not a diagnosis. Be clear that \
         professional medical evaluation is needed, and err on the side of recommending \
         medical consultation.",
        patient_name,
        age,
        gender,
        symptom_lines,
        additional_info.unwrap_or("None provided"),
    )
}
