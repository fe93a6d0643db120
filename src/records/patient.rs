//! Patient record and the name/age helpers the registry displays.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a structured patient name. Records may carry several,
/// tagged by use (`official`, `nickname`, ...).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

impl HumanName {
    pub fn official(given: &[&str], family: &str) -> Self {
        Self {
            use_: Some("official".to_string()),
            given: given.iter().map(|g| g.to_string()).collect(),
            family: Some(family.to_string()),
        }
    }
}

/// Phone/email entry, tagged by system.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContactPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmergencyContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Insurance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
}

/// A symptom the patient reported during registration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportedSymptom {
    pub symptom: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

/// Symptom-assessment payload embedded in the patient record. The facade
/// stores this exactly as supplied; only the AI client ever fills
/// `ai_analysis`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SymptomAssessment {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<ReportedSymptom>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessed_at: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Patient record. Soft-deleted patients keep their document with
/// `active = false` and a `deletedAt` stamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patient {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<Insurance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptom_assessment: Option<SymptomAssessment>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    /// Fields this model does not type (e.g. `resourceType`) ride along
    /// untouched through reads and writes.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Patient {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: Vec::new(),
            birth_date: None,
            gender: None,
            telecom: Vec::new(),
            address: Vec::new(),
            race: None,
            ethnicity: None,
            marital_status: None,
            emergency_contact: None,
            insurance: None,
            symptom_assessment: None,
            active: true,
            created_at: None,
            updated_at: None,
            deleted_at: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl Patient {
    /// Formatted full name, never empty.
    pub fn full_name(&self) -> String {
        format_name(&self.name)
    }

    /// Full name with stray digits stripped. Upstream data sometimes embeds
    /// numerals in name fields.
    pub fn clean_name(&self) -> String {
        clean_name(&self.full_name())
    }

    /// Completed years of age, or `None` when the birth date is absent or
    /// unparseable.
    pub fn age(&self) -> Option<i32> {
        calculate_age_at(self.birth_date.as_deref()?, Utc::now().date_naive())
    }

    /// Age for display: the number of completed years, or `"Unknown"`.
    pub fn age_display(&self) -> String {
        match self.age() {
            Some(age) => age.to_string(),
            None => "Unknown".to_string(),
        }
    }

    /// First contact point value for the given system (`phone`, `email`).
    pub fn contact(&self, system: &str) -> Option<&str> {
        self.telecom
            .iter()
            .find(|t| t.system.as_deref() == Some(system))
            .and_then(|t| t.value.as_deref())
    }
}

/// Formats a structured name list. Picks the entry tagged `official` when
/// present, else the first entry; joins given parts with single spaces and
/// appends the family name. Returns `"Unknown Patient"` when no usable name
/// parts exist.
pub fn format_name(names: &[HumanName]) -> String {
    let chosen = names
        .iter()
        .find(|n| n.use_.as_deref() == Some("official"))
        .or_else(|| names.first());

    let Some(name) = chosen else {
        return "Unknown Patient".to_string();
    };

    let given = name.given.join(" ");
    let family = name.family.as_deref().unwrap_or("");
    let full = format!("{} {}", given, family);
    let full = full.trim();
    if full.is_empty() {
        "Unknown Patient".to_string()
    } else {
        full.to_string()
    }
}

/// Strips digit characters and collapses runs of whitespace.
pub fn clean_name(name: &str) -> String {
    let without_digits: String = name.chars().filter(|c| !c.is_ascii_digit()).collect();
    without_digits.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole years between `birth_date` (`YYYY-MM-DD`, optionally with a time
/// suffix) and `today`, decremented by one when the birthday has not yet
/// occurred this year.
pub fn calculate_age_at(birth_date: &str, today: NaiveDate) -> Option<i32> {
    let date_part = birth_date.get(..10).unwrap_or(birth_date);
    let birth = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;

    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    Some(age)
}
