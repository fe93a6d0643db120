//! Timeline Module - Normalizing clinical events into one chronology
//!
//! Projects the six heterogeneous event kinds into a common display shape
//! and merges them, most recent first, for the patient detail view. The
//! projection is recomputed on every request and never persisted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::records::{ClinicalEvent, EventKind, RecordBundle};

/// Lenient timestamp parsing for dates held as strings in documents:
/// RFC 3339 first, then a naive datetime, then a bare date. Anything else
/// counts as absent.
pub fn parse_when(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// First entry in the chain that is present and parseable.
fn first_parseable(chain: &[Option<&str>]) -> Option<DateTime<Utc>> {
    chain.iter().flatten().copied().find_map(parse_when)
}

pub fn encounter_date(e: &crate::records::Encounter) -> Option<DateTime<Utc>> {
    first_parseable(&[
        e.period.as_ref().and_then(|p| p.start.as_deref()),
        e.created_at.as_deref(),
    ])
}

pub fn condition_date(c: &crate::records::Condition) -> Option<DateTime<Utc>> {
    first_parseable(&[c.onset_date_time.as_deref(), c.created_at.as_deref()])
}

pub fn medication_date(m: &crate::records::MedicationOrder) -> Option<DateTime<Utc>> {
    first_parseable(&[
        m.effective_period.as_ref().and_then(|p| p.start.as_deref()),
        m.authored_on.as_deref(),
        m.created_at.as_deref(),
    ])
}

pub fn allergy_date(a: &crate::records::Allergy) -> Option<DateTime<Utc>> {
    first_parseable(&[
        a.onset_date_time.as_deref(),
        a.recorded_date.as_deref(),
        a.created_at.as_deref(),
    ])
}

pub fn observation_date(o: &crate::records::Observation) -> Option<DateTime<Utc>> {
    first_parseable(&[o.effective_date_time.as_deref(), o.created_at.as_deref()])
}

pub fn procedure_date(p: &crate::records::Procedure) -> Option<DateTime<Utc>> {
    first_parseable(&[p.performed_date_time.as_deref(), p.created_at.as_deref()])
}

/// Resolves an event's primary date through its kind-specific fallback
/// chain, ending at the record-creation time. The same chains drive the
/// timeline sort and the AI top-N selection.
pub fn resolved_date(event: &ClinicalEvent) -> Option<DateTime<Utc>> {
    match event {
        ClinicalEvent::Encounter(e) => encounter_date(e),
        ClinicalEvent::Condition(c) => condition_date(c),
        ClinicalEvent::Medication(m) => medication_date(m),
        ClinicalEvent::Allergy(a) => allergy_date(a),
        ClinicalEvent::Observation(o) => observation_date(o),
        ClinicalEvent::Procedure(p) => procedure_date(p),
    }
}

/// Display-ready projection of one clinical event. `icon` and `color` are
/// presentation tags for the UI; `record` passes the original fields
/// through for detail rendering.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub date: Option<DateTime<Utc>>,
    pub title: String,
    pub description: String,
    pub icon: &'static str,
    pub color: &'static str,
    pub record: serde_json::Value,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Maps one event into its timeline shape. Missing fields degrade to the
/// generic labels; this never fails.
pub fn normalize(event: &ClinicalEvent) -> TimelineEvent {
    let date = resolved_date(event);
    match event {
        ClinicalEvent::Encounter(e) => TimelineEvent {
            kind: EventKind::Encounter,
            date,
            title: non_empty(e.type_.as_deref())
                .unwrap_or("Medical Encounter")
                .to_string(),
            description: non_empty(e.reason_code.as_deref())
                .unwrap_or("Medical encounter")
                .to_string(),
            icon: "\u{1f3e5}",
            color: "#f59e0b",
            record: serde_json::to_value(e).unwrap_or_default(),
        },
        ClinicalEvent::Condition(c) => TimelineEvent {
            kind: EventKind::Condition,
            date,
            title: non_empty(c.display.as_deref())
                .unwrap_or("Medical Condition")
                .to_string(),
            description: format!(
                "Status: {}",
                non_empty(c.clinical_status.as_deref()).unwrap_or("Active")
            ),
            icon: "\u{1fa7a}",
            color: "#ef4444",
            record: serde_json::to_value(c).unwrap_or_default(),
        },
        ClinicalEvent::Medication(m) => TimelineEvent {
            kind: EventKind::Medication,
            date,
            title: non_empty(m.label()).unwrap_or("Medication").to_string(),
            description: [m.dosage.as_deref(), m.reason_code.as_deref()]
                .iter()
                .flatten()
                .filter(|part| !part.trim().is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(" - "),
            icon: "\u{1f48a}",
            color: "#10b981",
            record: serde_json::to_value(m).unwrap_or_default(),
        },
        ClinicalEvent::Allergy(a) => TimelineEvent {
            kind: EventKind::Allergy,
            date,
            title: non_empty(a.display.as_deref()).unwrap_or("Allergy").to_string(),
            description: format!(
                "{} - {} criticality",
                non_empty(a.type_.as_deref()).unwrap_or("allergy"),
                non_empty(a.criticality.as_deref()).unwrap_or("unknown")
            ),
            icon: "\u{1f6a8}",
            color: "#f97316",
            record: serde_json::to_value(a).unwrap_or_default(),
        },
        ClinicalEvent::Observation(o) => TimelineEvent {
            kind: EventKind::Observation,
            date,
            title: non_empty(o.display.as_deref())
                .unwrap_or("Observation")
                .to_string(),
            description: o
                .rendered_value()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "Test result".to_string()),
            icon: "\u{1f4ca}",
            color: "#06b6d4",
            record: serde_json::to_value(o).unwrap_or_default(),
        },
        ClinicalEvent::Procedure(p) => TimelineEvent {
            kind: EventKind::Procedure,
            date,
            title: non_empty(p.display.as_deref())
                .unwrap_or("Procedure")
                .to_string(),
            description: non_empty(p.reason_code.as_deref())
                .unwrap_or("Medical procedure")
                .to_string(),
            icon: "\u{2695}\u{fe0f}",
            color: "#8b5cf6",
            record: serde_json::to_value(p).unwrap_or_default(),
        },
    }
}

/// Category selector for the timeline view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimelineFilter {
    All,
    Only(EventKind),
}

impl std::str::FromStr for TimelineFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(TimelineFilter::All)
        } else {
            s.parse::<EventKind>().map(TimelineFilter::Only)
        }
    }
}

/// Merges the selected categories into one sequence, most recent first.
/// Only the selected categories are normalized. The sort is stable, so
/// equal dates keep their per-category insertion order; events without a
/// resolvable date sort as oldest. An empty result is a valid state.
pub fn build_timeline(bundle: &RecordBundle, filter: TimelineFilter) -> Vec<TimelineEvent> {
    let kinds: &[EventKind] = match filter {
        TimelineFilter::All => &EventKind::ALL,
        TimelineFilter::Only(ref kind) => std::slice::from_ref(kind),
    };

    let mut events: Vec<TimelineEvent> = kinds
        .iter()
        .flat_map(|kind| bundle.events_of(*kind))
        .map(|event| normalize(&event))
        .collect();

    // `None < Some(_)`, so comparing b to a puts undated events last.
    events.sort_by(|a, b| b.date.cmp(&a.date));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        Allergy, Condition, Encounter, MedicationOrder, Observation, Period, Procedure,
    };

    fn encounter(start: Option<&str>, created: Option<&str>) -> Encounter {
        Encounter {
            id: "e".to_string(),
            patient_id: "p".to_string(),
            period: start.map(|s| Period {
                start: Some(s.to_string()),
                end: None,
            }),
            created_at: created.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_encounter_date_prefers_period_start() {
        let with_both = encounter(Some("2024-03-01"), Some("2024-01-01"));
        let event = normalize(&with_both.into());
        assert_eq!(event.date, parse_when("2024-03-01"));

        let created_only = encounter(None, Some("2024-01-01"));
        let event = normalize(&created_only.into());
        assert_eq!(event.date, parse_when("2024-01-01"));
    }

    #[test]
    fn test_medication_and_allergy_fallback_chains() {
        let med = MedicationOrder {
            authored_on: Some("2024-02-01".to_string()),
            created_at: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolved_date(&med.into()),
            parse_when("2024-02-01"),
            "authoredOn wins over createdAt when no effective period exists"
        );

        let allergy = Allergy {
            recorded_date: Some("2024-02-15".to_string()),
            created_at: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert_eq!(resolved_date(&allergy.into()), parse_when("2024-02-15"));
    }

    #[test]
    fn test_unparseable_date_falls_through_the_chain() {
        let enc = encounter(Some("soon"), Some("2024-01-01"));
        assert_eq!(resolved_date(&enc.into()), parse_when("2024-01-01"));
    }

    #[test]
    fn test_titles_never_empty() {
        let event = normalize(&Encounter::default().into());
        assert_eq!(event.title, "Medical Encounter");

        let event = normalize(&Condition::default().into());
        assert_eq!(event.title, "Medical Condition");
        assert_eq!(event.description, "Status: Active");

        let event = normalize(&Observation::default().into());
        assert_eq!(event.description, "Test result");
    }

    fn sample_bundle() -> RecordBundle {
        RecordBundle {
            encounters: vec![
                encounter(Some("2024-03-01"), None),
                encounter(Some("2024-01-10"), None),
            ],
            conditions: vec![Condition {
                display: Some("Hypertension".to_string()),
                onset_date_time: Some("2024-02-01".to_string()),
                ..Default::default()
            }],
            medications: vec![MedicationOrder {
                display: Some("Lisinopril".to_string()),
                authored_on: Some("2024-04-01".to_string()),
                ..Default::default()
            }],
            observations: vec![Observation {
                display: Some("Blood Pressure".to_string()),
                // No usable date at all.
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_sorts_descending_with_undated_last() {
        let timeline = build_timeline(&sample_bundle(), TimelineFilter::All);
        let dates: Vec<_> = timeline.iter().map(|e| e.date).collect();

        let mut sorted = dates.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(dates, sorted);

        assert_eq!(timeline.first().unwrap().title, "Lisinopril");
        assert_eq!(timeline.last().unwrap().title, "Blood Pressure");
        assert!(timeline.last().unwrap().date.is_none());
    }

    #[test]
    fn test_filter_commutes_with_merge() {
        let bundle = sample_bundle();
        let all = build_timeline(&bundle, TimelineFilter::All);

        for kind in EventKind::ALL {
            let direct = build_timeline(&bundle, TimelineFilter::Only(kind));
            let filtered: Vec<_> = all.iter().filter(|e| e.kind == kind).collect();

            assert_eq!(direct.len(), filtered.len());
            for (d, f) in direct.iter().zip(filtered) {
                assert_eq!(d.date, f.date);
                assert_eq!(d.title, f.title);
            }
        }
    }

    #[test]
    fn test_empty_bundle_yields_empty_timeline() {
        let timeline = build_timeline(&RecordBundle::default(), TimelineFilter::All);
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_equal_dates_keep_category_order() {
        let bundle = RecordBundle {
            procedures: vec![
                Procedure {
                    display: Some("First".to_string()),
                    performed_date_time: Some("2024-05-01".to_string()),
                    ..Default::default()
                },
                Procedure {
                    display: Some("Second".to_string()),
                    performed_date_time: Some("2024-05-01".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let timeline = build_timeline(&bundle, TimelineFilter::All);
        assert_eq!(timeline[0].title, "First");
        assert_eq!(timeline[1].title, "Second");
    }

    #[test]
    fn test_filter_parses_from_query_values() {
        assert_eq!("all".parse::<TimelineFilter>().unwrap(), TimelineFilter::All);
        assert_eq!(
            "medication".parse::<TimelineFilter>().unwrap(),
            TimelineFilter::Only(EventKind::Medication)
        );
        assert!("everything".parse::<TimelineFilter>().is_err());
    }
}
