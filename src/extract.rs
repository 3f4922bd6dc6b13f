//! Heuristic extraction of contact fields from decoded badge payloads.
//!
//! Badge QR formats are not standardized across vendors: payloads arrive as
//! JSON, vCard-like labeled lines, comma-separated `key:value` pairs, or
//! freeform text. Extraction tries the most specific format first and
//! degrades through weaker heuristics, finally preserving the raw payload so
//! nothing is lost.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::model::ContactRecord;

static NAME_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("valid name pattern"));
static EMAIL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});
static PHONE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\d\s+()\-]{8,}").expect("valid phone pattern"));

const NAME_LABELS: &[&str] = &["fn:", "name:", "fullname:", "contact:"];
const EMAIL_LABELS: &[&str] = &["email:", "mail:"];
const PHONE_LABELS: &[&str] = &["tel:", "phone:", "mobile:", "contact:"];
const COMPANY_LABELS: &[&str] = &["org:", "company:", "organization:", "firm:"];

/// Extract a best-effort contact record from decoded QR text. Never fails;
/// when nothing is recognized the raw payload is retained instead.
pub fn extract(raw: &str) -> ContactRecord {
    // Full structured payloads win outright; keys pass through as given.
    if let Ok(Value::Object(map)) = serde_json::from_str(raw) {
        return ContactRecord::from_structured(map);
    }

    // A single-line comma-separated key:value payload would otherwise trip
    // the label scan on the whole line and swallow the remaining pairs.
    if !raw.contains('\n') && raw.contains(',') && raw.contains(':') {
        let record = from_comma_separated(raw);
        if record.has_fields() {
            return record;
        }
    }

    let lines: Vec<&str> = raw.lines().collect();
    let mut record = ContactRecord {
        name: labeled_value(&lines, NAME_LABELS).or_else(|| {
            pattern_value(&lines, |line| {
                NAME_LINE.is_match(line) && !line.trim().is_empty()
            })
        }),
        email: labeled_value(&lines, EMAIL_LABELS)
            .or_else(|| pattern_value(&lines, |line| EMAIL_LINE.is_match(line))),
        phone: labeled_value(&lines, PHONE_LABELS)
            .or_else(|| pattern_value(&lines, |line| PHONE_LINE.is_match(line))),
        company: labeled_value(&lines, COMPANY_LABELS),
        ..ContactRecord::default()
    };

    if !record.has_fields() {
        let fallback = from_comma_separated(raw);
        if fallback.has_fields() {
            record = fallback;
        }
    }

    // Legacy rule: any leading text is better than no name at all.
    if record.name.is_none() {
        if let Some(first) = lines.first().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            record.name = Some(first.to_string());
        }
    }

    if record.is_empty() {
        record.raw_payload = Some(raw.to_string());
    }
    record
}

/// First line carrying one of the case-insensitive labels, stripped past the
/// label separator.
fn labeled_value(lines: &[&str], labels: &[&str]) -> Option<String> {
    lines
        .iter()
        .find_map(|line| {
            let lower = line.to_lowercase();
            labels
                .iter()
                .any(|label| lower.contains(label))
                .then(|| strip_label(line))
        })
        .filter(|value| !value.is_empty())
}

fn strip_label(line: &str) -> String {
    let cut = line
        .find(|c| c == ':' || c == '=')
        .map(|i| i + 1)
        .unwrap_or(0);
    line[cut..].trim().to_string()
}

fn pattern_value(lines: &[&str], matches: impl Fn(&str) -> bool) -> Option<String> {
    lines
        .iter()
        .find(|line| matches(line))
        .map(|line| line.trim().to_string())
}

fn from_comma_separated(raw: &str) -> ContactRecord {
    let mut record = ContactRecord::default();
    for item in raw.split(',') {
        let Some((key, value)) = item.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if key.contains("name") && record.name.is_none() {
            record.name = Some(value.to_string());
        } else if key.contains("email") && record.email.is_none() {
            record.email = Some(value.to_string());
        } else if key.contains("phone") && record.phone.is_none() {
            record.phone = Some(value.to_string());
        } else if key.contains("company") && record.company.is_none() {
            record.company = Some(value.to_string());
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_passes_through_unchanged() {
        let record = extract(r#"{"name":"Jo","email":"jo@x.com"}"#);
        assert_eq!(record.name.as_deref(), Some("Jo"));
        assert_eq!(record.email.as_deref(), Some("jo@x.com"));
        assert_eq!(record.phone, None);
        assert_eq!(record.company, None);
        assert!(record.structured.is_some());
    }

    #[test]
    fn json_keys_kept_as_given() {
        // Alternate keys are not renamed at extraction time; they stay in the
        // structured payload for submission-time alias resolution.
        let record = extract(r#"{"fullName":"Jo Smith","organization":"Acme"}"#);
        assert_eq!(record.name, None);
        assert_eq!(record.alias("fullName").as_deref(), Some("Jo Smith"));
        assert_eq!(record.alias("organization").as_deref(), Some("Acme"));
    }

    #[test]
    fn json_non_object_falls_through_to_heuristics() {
        let record = extract("12345678");
        assert_eq!(record.phone.as_deref(), Some("12345678"));
    }

    #[test]
    fn vcard_like_lines_extract_labeled_fields() {
        let record = extract("FN:Jane Doe\nEMAIL:jane@acme.com\nORG:Acme");
        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.email.as_deref(), Some("jane@acme.com"));
        assert_eq!(record.company.as_deref(), Some("Acme"));
        assert_eq!(record.phone, None);
    }

    #[test]
    fn labeled_email_wins_regardless_of_surrounding_noise() {
        let record = extract("### badge ###\nemail: x@y.com\n!!!");
        assert_eq!(record.email.as_deref(), Some("x@y.com"));
    }

    #[test]
    fn label_strip_cuts_at_first_separator() {
        // '=' ahead of the ':' is also a label separator.
        let record = extract("badge=email: ada@analytical.uk");
        assert_eq!(record.email.as_deref(), Some("email: ada@analytical.uk"));
    }

    #[test]
    fn first_matching_line_wins_per_field() {
        let record = extract("first@one.com\nsecond@two.com");
        assert_eq!(record.email.as_deref(), Some("first@one.com"));
    }

    #[test]
    fn comma_separated_pairs_parse_when_single_line() {
        let record = extract("name:Bob,phone:555-1234");
        assert_eq!(record.name.as_deref(), Some("Bob"));
        assert_eq!(record.phone.as_deref(), Some("555-1234"));
        assert_eq!(record.email, None);
    }

    #[test]
    fn freeform_text_becomes_name() {
        let record = extract("Just some random text");
        assert_eq!(record.name.as_deref(), Some("Just some random text"));
        assert_eq!(record.raw_payload, None);
    }

    #[test]
    fn empty_input_preserves_raw_payload() {
        let record = extract("");
        assert_eq!(record.raw_payload.as_deref(), Some(""));
        assert!(!record.has_fields());
        assert!(record.is_empty());
    }

    #[test]
    fn whitespace_only_input_is_an_extraction_failure() {
        let record = extract("   \n  ");
        assert!(record.is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let payload = "FN:Jane Doe\nTEL:+33 1 23 45 67 89";
        assert_eq!(extract(payload), extract(payload));
    }

    #[test]
    fn phone_pattern_needs_eight_plausible_characters() {
        let record = extract("ID 1234\n+33 (0)1 23 45");
        assert_eq!(record.phone.as_deref(), Some("+33 (0)1 23 45"));
    }
}
