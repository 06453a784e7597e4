//! CV document model as posted by the wizard.
//!
//! Every list and free-text field defaults to empty, whether the key is missing
//! or explicitly `null`. `personalInfo` stays optional so the export file name
//! can tell "no personal info" apart from "empty names".

use serde::{Deserialize, Deserializer, Serialize};

/// Deserializes `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvDocument {
    pub personal_info: Option<PersonalInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(deserialize_with = "null_as_default")]
    pub experience: Vec<ExperienceEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub education: Vec<EducationEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub projects: String,
    #[serde(deserialize_with = "null_as_default")]
    pub certifications: String,
    #[serde(deserialize_with = "null_as_default")]
    pub languages: String,
    #[serde(deserialize_with = "null_as_default")]
    pub activities: String,
    #[serde(deserialize_with = "null_as_default")]
    pub additional_info: String,
    #[serde(deserialize_with = "null_as_default")]
    pub custom_fields: Vec<CustomField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_name: String,
    /// Headline shown under the name, e.g. "Backend Engineer".
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
    /// Profile URLs (LinkedIn, GitHub, portfolio) in display order.
    #[serde(deserialize_with = "null_as_default")]
    pub links: Vec<String>,
}

impl PersonalInfo {
    /// "First Last" with blank parts dropped.
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Non-empty contact fields in display order.
    pub fn contact_parts(&self) -> Vec<&str> {
        [self.email.trim(), self.phone.trim(), self.location.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_date: String,
    pub is_present: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
}

impl ExperienceEntry {
    pub fn heading(&self) -> String {
        join_non_empty(&[&self.title, &self.company], ", ")
    }

    pub fn dates(&self) -> Option<String> {
        format_date_range(&self.start_date, &self.end_date, self.is_present)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub degree: String,
    #[serde(deserialize_with = "null_as_default")]
    pub institution: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_date: String,
    pub is_present: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
}

impl EducationEntry {
    pub fn heading(&self) -> String {
        join_non_empty(&[&self.degree, &self.institution], ", ")
    }

    pub fn dates(&self) -> Option<String> {
        format_date_range(&self.start_date, &self.end_date, self.is_present)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomField {
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Formats a tenure for display.
///
/// `is_present` wins over any end date: the range always ends in "Present".
/// Returns `None` when there is nothing to show.
pub fn format_date_range(start: &str, end: &str, is_present: bool) -> Option<String> {
    let start = start.trim();
    let end = if is_present { "Present" } else { end.trim() };

    match (start.is_empty(), end.is_empty()) {
        (true, true) => None,
        (false, true) => Some(start.to_string()),
        (true, false) => Some(end.to_string()),
        (false, false) => Some(format!("{start} - {end}")),
    }
}

fn join_non_empty(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let doc: CvDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.personal_info.is_none());
        assert!(doc.experience.is_empty());
        assert!(doc.education.is_empty());
        assert!(doc.skills.is_empty());
        assert!(doc.custom_fields.is_empty());
        assert!(doc.summary.is_empty());
    }

    #[test]
    fn test_null_lists_default_to_empty() {
        let doc: CvDocument =
            serde_json::from_str(r#"{"experience": null, "skills": null, "summary": null}"#)
                .unwrap();
        assert!(doc.experience.is_empty());
        assert!(doc.skills.is_empty());
        assert!(doc.summary.is_empty());
    }

    #[test]
    fn test_camel_case_wire_format() {
        let json = r#"{
            "personalInfo": {"firstName": "Ada", "lastName": "Lovelace"},
            "experience": [{"title": "Analyst", "company": "Babbage & Co",
                            "startDate": "1842", "endDate": "1843", "isPresent": false}],
            "customFields": [{"label": "Clearance", "value": "None"}],
            "additionalInfo": "Enjoys poetry"
        }"#;
        let doc: CvDocument = serde_json::from_str(json).unwrap();
        let info = doc.personal_info.unwrap();
        assert_eq!(info.full_name(), "Ada Lovelace");
        assert_eq!(doc.experience[0].heading(), "Analyst, Babbage & Co");
        assert_eq!(doc.custom_fields[0].label, "Clearance");
        assert_eq!(doc.additional_info, "Enjoys poetry");
    }

    #[test]
    fn test_present_hides_end_date() {
        let range = format_date_range("2021", "2023", true);
        assert_eq!(range.as_deref(), Some("2021 - Present"));
    }

    #[test]
    fn test_date_range_variants() {
        assert_eq!(format_date_range("", "", false), None);
        assert_eq!(format_date_range("2019", "", false).as_deref(), Some("2019"));
        assert_eq!(format_date_range("", "2020", false).as_deref(), Some("2020"));
        assert_eq!(format_date_range("", "2020", true).as_deref(), Some("Present"));
        assert_eq!(
            format_date_range(" 2019 ", "2020", false).as_deref(),
            Some("2019 - 2020")
        );
    }

    #[test]
    fn test_contact_parts_skip_blanks() {
        let info = PersonalInfo {
            email: "ada@example.com".to_string(),
            phone: "  ".to_string(),
            location: "London".to_string(),
            ..Default::default()
        };
        assert_eq!(info.contact_parts(), vec!["ada@example.com", "London"]);
    }
}
