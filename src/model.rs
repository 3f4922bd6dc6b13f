use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum InterestLevel {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl InterestLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestLevel::Low => "Low",
            InterestLevel::Medium => "Medium",
            InterestLevel::High => "High",
            InterestLevel::VeryHigh => "VeryHigh",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(InterestLevel::Low),
            "medium" => Some(InterestLevel::Medium),
            "high" => Some(InterestLevel::High),
            "veryhigh" | "very-high" | "very high" => Some(InterestLevel::VeryHigh),
            _ => None,
        }
    }
}

/// Best-effort contact extracted from a badge payload or typed in manually.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    /// Original decoded text, retained when structured extraction fails.
    pub raw_payload: Option<String>,
    /// Full key/value payload when the decoded text parsed as a JSON object.
    /// Kept for alias resolution at submission time.
    pub structured: Option<Map<String, Value>>,
}

impl ContactRecord {
    pub fn from_structured(map: Map<String, Value>) -> Self {
        let field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_owned);
        ContactRecord {
            name: field("name"),
            email: field("email"),
            phone: field("phone"),
            company: field("company"),
            raw_payload: None,
            structured: Some(map),
        }
    }

    pub fn has_fields(&self) -> bool {
        self.name.is_some() || self.email.is_some() || self.phone.is_some() || self.company.is_some()
    }

    /// A record with no semantic fields and no usable payload carries no
    /// information at all and is treated as an extraction failure.
    pub fn is_empty(&self) -> bool {
        !self.has_fields()
            && self.raw_payload.as_deref().map_or(true, |r| r.trim().is_empty())
            && self.structured.as_ref().map_or(true, |m| m.is_empty())
    }

    /// Alternate key lookup against the retained structured payload.
    pub fn alias(&self, key: &str) -> Option<String> {
        self.structured
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}

/// Operator-supplied metadata attached to a contact before submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub interest_level: InterestLevel,
    pub notes: String,
}

impl Annotation {
    pub fn append_note(&mut self, text: &str) {
        if self.notes.is_empty() {
            self.notes = text.to_string();
        } else {
            self.notes.push('\n');
            self.notes.push_str(text);
        }
    }
}

/// Immutable wire snapshot sent to the spreadsheet endpoint. Always carries
/// strings, never absent keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub timestamp: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub interest_level: InterestLevel,
    pub notes: String,
    pub raw_data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Operator-visible status banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_record_requires_no_fields_and_no_payload() {
        let mut record = ContactRecord::default();
        assert!(record.is_empty());

        record.raw_payload = Some("   ".into());
        assert!(record.is_empty());

        record.raw_payload = Some("some payload".into());
        assert!(!record.is_empty());

        let record = ContactRecord {
            phone: Some("555".into()),
            ..ContactRecord::default()
        };
        assert!(!record.is_empty());
    }

    #[test]
    fn alias_reads_structured_payload() {
        let map = json!({ "fullName": "Jo", "phoneNumber": 5 });
        let record = match map {
            serde_json::Value::Object(map) => ContactRecord::from_structured(map),
            _ => unreachable!(),
        };
        assert_eq!(record.alias("fullName").as_deref(), Some("Jo"));
        // Non-string values are ignored.
        assert_eq!(record.alias("phoneNumber"), None);
    }

    #[test]
    fn notes_append_with_newline_separator() {
        let mut annotation = Annotation::default();
        annotation.append_note("Liste des prix");
        annotation.append_note("Besoin de devis");
        assert_eq!(annotation.notes, "Liste des prix\nBesoin de devis");
    }

    #[test]
    fn submission_record_uses_camel_case_keys() {
        let record = SubmissionRecord {
            timestamp: "2026-01-01T00:00:00+00:00".into(),
            name: "Jo".into(),
            email: String::new(),
            phone: String::new(),
            company: String::new(),
            interest_level: InterestLevel::VeryHigh,
            notes: String::new(),
            raw_data: "{}".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["interestLevel"], "VeryHigh");
        assert_eq!(value["rawData"], "{}");
        assert!(value.get("interest_level").is_none());
    }
}
