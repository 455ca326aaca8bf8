use chrono::Local;
use serde_json::Value;

use crate::models::Record;

/// Every attachment alias the backend has been seen using. Field mapping
/// keeps all populated aliases, not just the first match, because file
/// resolution re-checks them independently.
pub const ATTACHMENT_ALIASES: &[&str] = &[
    "file",
    "file_path",
    "document",
    "attachment",
    "attachment_path",
    "image",
    "resume_file",
];

/// Keys that mark a value as response envelope rather than record content.
const ENVELOPE_KEYS: &[&str] = &["status", "message", "success", "error", "code"];

/// Where the record array was found in the payload. Candidates are tried in
/// exactly this order and the first structural match wins, even when the
/// matched array is empty.
#[derive(Debug, Clone, PartialEq)]
pub enum ListShape {
    BareArray(Vec<Value>),
    DataWrapped(Vec<Value>),
    KeyedWrapped(Vec<Value>),
    FirstArrayValue(Vec<Value>),
    SingleObject(Value),
    Unrecognized,
}

pub fn locate_records(payload: &Value, keyed_names: &[&str]) -> ListShape {
    if let Some(items) = payload.as_array() {
        return ListShape::BareArray(items.clone());
    }

    let Some(object) = payload.as_object() else {
        return ListShape::Unrecognized;
    };

    if let Some(items) = object.get("data").and_then(Value::as_array) {
        return ListShape::DataWrapped(items.clone());
    }

    for name in keyed_names {
        if let Some(items) = object.get(*name).and_then(Value::as_array) {
            return ListShape::KeyedWrapped(items.clone());
        }
    }

    for value in object.values() {
        if let Some(items) = value.as_array() {
            return ListShape::FirstArrayValue(items.clone());
        }
    }

    // A bare object with at least one non-envelope key is taken as a single
    // record; a pure envelope like {"status": 404} is not.
    if object.keys().any(|k| !ENVELOPE_KEYS.contains(&k.as_str())) {
        return ListShape::SingleObject(payload.clone());
    }

    ListShape::Unrecognized
}

/// Outcome of normalization. `NoRecords` is the recognized empty state for a
/// payload with no plausible record location, surfaced as a "no records
/// found" notice rather than an error.
#[derive(Debug)]
pub enum Normalized<R> {
    Records(Vec<R>),
    NoRecords,
}

impl<R> Normalized<R> {
    pub fn into_records(self) -> Vec<R> {
        match self {
            Normalized::Records(records) => records,
            Normalized::NoRecords => Vec::new(),
        }
    }
}

pub fn normalize<R: Record>(payload: &Value) -> Normalized<R> {
    let raw_records = match locate_records(payload, R::LIST_KEYS) {
        ListShape::BareArray(items)
        | ListShape::DataWrapped(items)
        | ListShape::KeyedWrapped(items)
        | ListShape::FirstArrayValue(items) => items,
        ListShape::SingleObject(item) => vec![item],
        ListShape::Unrecognized => return Normalized::NoRecords,
    };

    let records = raw_records
        .iter()
        .enumerate()
        .map(|(index, raw)| R::from_raw(index, raw))
        .collect();
    Normalized::Records(records)
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-null, non-empty fallback value, stringified; empty string when
/// every fallback is exhausted.
pub fn pick_str(raw: &Value, fallbacks: &[&str]) -> String {
    fallbacks
        .iter()
        .filter_map(|key| raw.get(key).and_then(value_as_text))
        .next()
        .unwrap_or_default()
}

/// Like `pick_str` but dates default to today in ISO calendar form.
pub fn pick_date(raw: &Value, fallbacks: &[&str]) -> String {
    let picked = pick_str(raw, fallbacks);
    if picked.is_empty() {
        Local::now().format("%Y-%m-%d").to_string()
    } else {
        picked
    }
}

/// Numeric id with a synthetic flag. A backend that omits the id gets a
/// positional `index + 1` stand-in valid for this render pass only.
pub fn pick_id(raw: &Value, fallbacks: &[&str], index: usize) -> (i64, bool) {
    for key in fallbacks {
        match raw.get(key) {
            Some(Value::Number(n)) => {
                if let Some(id) = n.as_i64() {
                    return (id, false);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(id) = s.trim().parse::<i64>() {
                    return (id, false);
                }
            }
            _ => {}
        }
    }
    (index as i64 + 1, true)
}

/// Every populated attachment alias value, in alias priority order.
pub fn pick_attachments(raw: &Value) -> Vec<String> {
    ATTACHMENT_ALIASES
        .iter()
        .filter_map(|key| raw.get(key).and_then(value_as_text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Circular, Grievance};
    use serde_json::json;

    #[test]
    fn test_locate_bare_array() {
        let payload = json!([{"id": 1}]);
        assert!(matches!(
            locate_records(&payload, &["circulars"]),
            ListShape::BareArray(items) if items.len() == 1
        ));
    }

    #[test]
    fn test_locate_data_wrapped() {
        let payload = json!({"status": "success", "data": [{"id": 1}, {"id": 2}]});
        assert!(matches!(
            locate_records(&payload, &["circulars"]),
            ListShape::DataWrapped(items) if items.len() == 2
        ));
    }

    #[test]
    fn test_locate_keyed_wrapped() {
        let payload = json!({"status": 200, "grievances": [{"id": 1}]});
        assert!(matches!(
            locate_records(&payload, &["grievances"]),
            ListShape::KeyedWrapped(items) if items.len() == 1
        ));
    }

    #[test]
    fn test_empty_data_array_wins_over_later_candidates() {
        // First structural match is accepted even when empty.
        let payload = json!({"data": [], "grievances": [{"id": 1}]});
        assert_eq!(
            locate_records(&payload, &["grievances"]),
            ListShape::DataWrapped(vec![])
        );
    }

    #[test]
    fn test_locate_first_array_value() {
        let payload = json!({"status": 200, "rows": [{"id": 7}]});
        assert!(matches!(
            locate_records(&payload, &["circulars"]),
            ListShape::FirstArrayValue(items) if items.len() == 1
        ));
    }

    #[test]
    fn test_single_object_becomes_one_record() {
        let payload = json!({"id": 3, "subject": "Audit"});
        let records: Vec<Circular> = normalize(&payload).into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subject, "Audit");
    }

    #[test]
    fn test_pure_envelope_is_no_records_not_error() {
        let payload = json!({"status": 404, "message": "not found"});
        assert!(matches!(
            normalize::<Circular>(&payload),
            Normalized::NoRecords
        ));
        let payload = json!("unexpected");
        assert!(matches!(
            normalize::<Circular>(&payload),
            Normalized::NoRecords
        ));
    }

    #[test]
    fn test_subject_fallback_priority() {
        let raw = json!({"id": 1, "circular_subject": "Annual meet"});
        let circular = Circular::from_raw(0, &raw);
        assert_eq!(circular.subject, "Annual meet");

        // An earlier fallback wins over a later one.
        let raw = json!({"id": 1, "title": "From title", "circular_subject": "From alias"});
        let circular = Circular::from_raw(0, &raw);
        assert_eq!(circular.subject, "From title");
    }

    #[test]
    fn test_numeric_fields_are_stringified() {
        let raw = json!({"id": 1, "circular_number": 42});
        let circular = Circular::from_raw(0, &raw);
        assert_eq!(circular.circular_no, "42");
    }

    #[test]
    fn test_missing_id_is_synthesized_from_position() {
        let raw = json!({"subject": "No id here"});
        let circular = Circular::from_raw(4, &raw);
        assert_eq!(circular.id, 5);
        assert!(circular.synthetic_id);

        let raw = json!({"id": "17", "subject": "String id"});
        let circular = Circular::from_raw(4, &raw);
        assert_eq!(circular.id, 17);
        assert!(!circular.synthetic_id);
    }

    #[test]
    fn test_missing_date_defaults_to_today() {
        let raw = json!({"id": 1});
        let circular = Circular::from_raw(0, &raw);
        let today = Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(circular.date, today);
    }

    #[test]
    fn test_all_attachment_aliases_are_kept() {
        let raw = json!({
            "id": 1,
            "file": "a.pdf",
            "document": "b.pdf",
            "attachment": "",
            "file_path": "c.pdf"
        });
        let circular = Circular::from_raw(0, &raw);
        assert_eq!(circular.attachments, vec!["a.pdf", "c.pdf", "b.pdf"]);
    }

    #[test]
    fn test_grievance_list_end_to_end() {
        let payload = json!({
            "status": 200,
            "grievances": [
                {"id": 1, "subject": "Water leak", "status": "Pending",
                 "posted_by": "J. Doe", "created_at": "2024-03-01"}
            ]
        });
        let records: Vec<Grievance> = normalize(&payload).into_records();
        assert_eq!(records.len(), 1);
        let g = &records[0];
        assert_eq!(g.title, "Water leak");
        assert_eq!(g.status, "Pending");
        assert_eq!(g.submitted_by, "J. Doe");
        assert_eq!(g.submitted_date, "2024-03-01");
    }

    #[test]
    fn test_null_skills_tolerated() {
        let raw = json!({"id": 1, "name": "A", "skills": null});
        let resume = crate::models::Resume::from_raw(0, &raw);
        assert_eq!(resume.skills, "");
    }
}
