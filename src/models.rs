use serde_json::Value;

use crate::normalize::{pick_attachments, pick_date, pick_id, pick_str};

/// Sortable projection of a record field. Numeric ids must order numerically,
/// everything else orders as plain text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Int(i64),
    Text(String),
}

/// Entity descriptor shared by the normalizer, the query pipeline and the
/// export adapter. One impl per record type replaces the five near-identical
/// per-page implementations in the original dashboard.
pub trait Record: Clone {
    /// Plural label used for table titles, sheet names and notices.
    const LABEL: &'static str;
    /// Candidate payload keys holding the record array, tried in order.
    const LIST_KEYS: &'static [&'static str];
    /// Export column headers, including the leading serial number.
    const HEADERS: &'static [&'static str];
    /// PDF column widths in millimeters, one per header.
    const COLUMN_WIDTHS: &'static [f32];
    /// Column keys accepted by `--sort`.
    const SORT_KEYS: &'static [&'static str];
    /// Sort applied when the user picks no column. Contacts are always
    /// name-ordered; the other entities keep the backend's order.
    const DEFAULT_SORT: Option<&'static str> = None;

    fn from_raw(index: usize, raw: &Value) -> Self;
    fn id(&self) -> i64;
    /// True when the id was synthesized from the record's position because
    /// the backend omitted one. Synthetic ids are display-only and must never
    /// reach a mutation endpoint.
    fn synthetic_id(&self) -> bool;
    /// Field values searched by the free-text filter, already stringified.
    fn search_fields(&self) -> Vec<String>;
    fn sort_value(&self, key: &str) -> Option<SortValue>;
    /// Export cells in column order, without the serial number.
    fn export_row(&self) -> Vec<String>;
    /// Every populated attachment alias value, in alias priority order.
    fn attachments(&self) -> &[String] {
        &[]
    }
    /// Trailing summary block for PDF export.
    fn summary_lines(records: &[Self]) -> Vec<String> {
        vec![format!("Total {}: {}", Self::LABEL.to_lowercase(), records.len())]
    }
}

// --- Circulars ---

#[derive(Debug, Clone)]
pub struct Circular {
    pub id: i64,
    pub synthetic_id: bool,
    pub circular_no: String,
    pub subject: String,
    pub description: String,
    pub date: String,
    pub attachments: Vec<String>,
}

impl Record for Circular {
    const LABEL: &'static str = "Circulars";
    const LIST_KEYS: &'static [&'static str] = &["circulars", "circular_list"];
    const HEADERS: &'static [&'static str] = &["Sr No", "Circular No", "Subject", "Date"];
    const COLUMN_WIDTHS: &'static [f32] = &[15.0, 35.0, 90.0, 30.0];
    const SORT_KEYS: &'static [&'static str] = &["id", "circular_no", "subject", "date"];

    fn from_raw(index: usize, raw: &Value) -> Self {
        let (id, synthetic_id) = pick_id(raw, &["id", "circular_id"], index);
        Self {
            id,
            synthetic_id,
            circular_no: pick_str(raw, &["circular_number", "circular_no", "number"]),
            subject: pick_str(raw, &["subject", "title", "name", "circular_subject", "subject_title"]),
            description: pick_str(raw, &["description", "body", "details", "circular_description"]),
            date: pick_date(raw, &["date", "circular_date", "created_at", "created_on"]),
            attachments: pick_attachments(raw),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn synthetic_id(&self) -> bool {
        self.synthetic_id
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.circular_no.clone(),
            self.subject.clone(),
            self.description.clone(),
            self.date.clone(),
        ]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "id" => Some(SortValue::Int(self.id)),
            "circular_no" => Some(SortValue::Text(self.circular_no.clone())),
            "subject" => Some(SortValue::Text(self.subject.clone())),
            "date" => Some(SortValue::Text(self.date.clone())),
            _ => None,
        }
    }

    fn export_row(&self) -> Vec<String> {
        vec![self.circular_no.clone(), self.subject.clone(), self.date.clone()]
    }

    fn attachments(&self) -> &[String] {
        &self.attachments
    }
}

// --- Grievances ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrievanceStatus {
    Active,
    Pending,
    Closed,
}

impl GrievanceStatus {
    /// Parse a status the client is allowed to write. The legacy "Resolved"
    /// value is display-only and is deliberately rejected here.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Pending => "Pending",
            Self::Closed => "Closed",
        }
    }

    pub const ALL: &'static [GrievanceStatus] = &[Self::Active, Self::Pending, Self::Closed];
}

/// Display classification for a raw status string. "Resolved" is a legacy
/// synonym shown like Active but never written back.
pub fn status_badge(raw: &str) -> &'static str {
    match raw.to_lowercase().as_str() {
        "active" | "resolved" => "green",
        "pending" => "amber",
        "closed" => "red",
        _ => "none",
    }
}

#[derive(Debug, Clone)]
pub struct Grievance {
    pub id: i64,
    pub synthetic_id: bool,
    pub title: String,
    pub description: String,
    pub status: String,
    pub submitted_by: String,
    pub submitted_date: String,
    pub last_updated: String,
    pub attachments: Vec<String>,
}

impl Record for Grievance {
    const LABEL: &'static str = "Grievances";
    const LIST_KEYS: &'static [&'static str] = &["grievances", "grievance_list"];
    const HEADERS: &'static [&'static str] =
        &["Sr No", "Title", "Status", "Submitted By", "Submitted Date"];
    const COLUMN_WIDTHS: &'static [f32] = &[15.0, 60.0, 25.0, 40.0, 30.0];
    const SORT_KEYS: &'static [&'static str] =
        &["id", "title", "status", "submitted_by", "submitted_date"];

    fn from_raw(index: usize, raw: &Value) -> Self {
        let (id, synthetic_id) = pick_id(raw, &["id", "grievance_id"], index);
        Self {
            id,
            synthetic_id,
            title: pick_str(raw, &["subject", "title", "grievance_subject", "name"]),
            description: pick_str(raw, &["description", "details", "grievance_description", "body"]),
            status: pick_str(raw, &["status", "grievance_status"]),
            submitted_by: pick_str(raw, &["posted_by", "submitted_by", "member_name", "user_name", "name"]),
            submitted_date: pick_date(raw, &["submitted_date", "created_at", "date", "created_on"]),
            last_updated: pick_date(raw, &["last_updated", "updated_at", "modified_at"]),
            attachments: pick_attachments(raw),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn synthetic_id(&self) -> bool {
        self.synthetic_id
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.description.clone(),
            self.status.clone(),
            self.submitted_by.clone(),
            self.submitted_date.clone(),
        ]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "id" => Some(SortValue::Int(self.id)),
            "title" => Some(SortValue::Text(self.title.clone())),
            "status" => Some(SortValue::Text(self.status.clone())),
            "submitted_by" => Some(SortValue::Text(self.submitted_by.clone())),
            "submitted_date" => Some(SortValue::Text(self.submitted_date.clone())),
            _ => None,
        }
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.status.clone(),
            self.submitted_by.clone(),
            self.submitted_date.clone(),
        ]
    }

    fn attachments(&self) -> &[String] {
        &self.attachments
    }

    fn summary_lines(records: &[Self]) -> Vec<String> {
        let mut lines = vec![format!("Total grievances: {}", records.len())];
        for status in GrievanceStatus::ALL {
            let count = records
                .iter()
                .filter(|g| {
                    GrievanceStatus::parse(&g.status) == Some(*status)
                        || (*status == GrievanceStatus::Active
                            && g.status.eq_ignore_ascii_case("resolved"))
                })
                .count();
            lines.push(format!("{}: {}", status.as_str(), count));
        }
        lines
    }
}

// --- Important contacts ---

#[derive(Debug, Clone)]
pub struct Contact {
    pub id: i64,
    pub synthetic_id: bool,
    pub department: String,
    pub name: String,
    pub contact: String,
    pub email: String,
    pub address: String,
}

impl Record for Contact {
    const LABEL: &'static str = "Contacts";
    const LIST_KEYS: &'static [&'static str] = &["contacts", "important_contacts", "contact_list"];
    const HEADERS: &'static [&'static str] =
        &["Sr No", "Department", "Name", "Contact", "Email", "Address"];
    const COLUMN_WIDTHS: &'static [f32] = &[12.0, 32.0, 35.0, 28.0, 43.0, 30.0];
    // Contacts only expose a name-direction toggle, not arbitrary column sort.
    const SORT_KEYS: &'static [&'static str] = &["name"];
    const DEFAULT_SORT: Option<&'static str> = Some("name");

    fn from_raw(index: usize, raw: &Value) -> Self {
        let (id, synthetic_id) = pick_id(raw, &["id", "contact_id"], index);
        Self {
            id,
            synthetic_id,
            department: pick_str(raw, &["department", "dept", "department_name"]),
            name: pick_str(raw, &["name", "person_name", "contact_person"]),
            contact: pick_str(raw, &["contact", "phone", "mobile", "contact_no"]),
            email: pick_str(raw, &["email", "email_id"]),
            address: pick_str(raw, &["address", "location"]),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn synthetic_id(&self) -> bool {
        self.synthetic_id
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.department.clone(),
            self.name.clone(),
            self.contact.clone(),
            self.email.clone(),
            self.address.clone(),
        ]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            // Case-insensitive name ordering, the deterministic stand-in for
            // the dashboard's locale-aware compare.
            "name" => Some(SortValue::Text(self.name.to_lowercase())),
            _ => None,
        }
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.department.clone(),
            self.name.clone(),
            self.contact.clone(),
            self.email.clone(),
            self.address.clone(),
        ]
    }
}

// --- Resumes ---

#[derive(Debug, Clone)]
pub struct Resume {
    pub id: i64,
    pub synthetic_id: bool,
    pub name: String,
    pub contact_no: String,
    pub email: String,
    pub qualification: String,
    pub skills: String,
    pub experience: String,
    pub uploaded_on: String,
    pub attachments: Vec<String>,
}

impl Record for Resume {
    const LABEL: &'static str = "Resumes";
    const LIST_KEYS: &'static [&'static str] = &["resumes", "resume_list"];
    const HEADERS: &'static [&'static str] = &[
        "Sr No",
        "Name",
        "Contact No",
        "Email",
        "Qualification",
        "Skills",
        "Uploaded On",
    ];
    const COLUMN_WIDTHS: &'static [f32] = &[12.0, 30.0, 26.0, 40.0, 28.0, 28.0, 26.0];
    const SORT_KEYS: &'static [&'static str] = &["id", "name", "uploaded_on"];

    fn from_raw(index: usize, raw: &Value) -> Self {
        let (id, synthetic_id) = pick_id(raw, &["id", "resume_id"], index);
        Self {
            id,
            synthetic_id,
            name: pick_str(raw, &["name", "applicant_name", "candidate_name"]),
            contact_no: pick_str(raw, &["contact_no", "contact", "phone", "mobile"]),
            email: pick_str(raw, &["email_id", "email"]),
            qualification: pick_str(raw, &["qualification", "education"]),
            // Skills may come back as an explicit null.
            skills: pick_str(raw, &["skills", "skill_set"]),
            experience: pick_str(raw, &["experience", "work_experience"]),
            uploaded_on: pick_date(raw, &["uploaded_on", "created_at", "upload_date", "date"]),
            attachments: pick_attachments(raw),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn synthetic_id(&self) -> bool {
        self.synthetic_id
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.contact_no.clone(),
            self.email.clone(),
            self.qualification.clone(),
            self.skills.clone(),
            self.experience.clone(),
        ]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "id" => Some(SortValue::Int(self.id)),
            "name" => Some(SortValue::Text(self.name.clone())),
            "uploaded_on" => Some(SortValue::Text(self.uploaded_on.clone())),
            _ => None,
        }
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.contact_no.clone(),
            self.email.clone(),
            self.qualification.clone(),
            self.skills.clone(),
            self.uploaded_on.clone(),
        ]
    }

    fn attachments(&self) -> &[String] {
        &self.attachments
    }
}

// --- User roles ---

#[derive(Debug, Clone)]
pub struct Role {
    pub id: i64,
    pub synthetic_id: bool,
    pub name: String,
}

impl Record for Role {
    const LABEL: &'static str = "Roles";
    const LIST_KEYS: &'static [&'static str] = &["roles", "user_roles", "role_list"];
    const HEADERS: &'static [&'static str] = &["Sr No", "Role"];
    const COLUMN_WIDTHS: &'static [f32] = &[20.0, 80.0];
    const SORT_KEYS: &'static [&'static str] = &["id", "name"];

    fn from_raw(index: usize, raw: &Value) -> Self {
        let (id, synthetic_id) = pick_id(raw, &["id", "role_id"], index);
        Self {
            id,
            synthetic_id,
            name: pick_str(raw, &["name", "role_name", "role"]),
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn synthetic_id(&self) -> bool {
        self.synthetic_id
    }

    fn search_fields(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        match key {
            "id" => Some(SortValue::Int(self.id)),
            "name" => Some(SortValue::Text(self.name.clone())),
            _ => None,
        }
    }

    fn export_row(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_accepts_enumerated_values() {
        assert_eq!(GrievanceStatus::parse("Active"), Some(GrievanceStatus::Active));
        assert_eq!(GrievanceStatus::parse("pending"), Some(GrievanceStatus::Pending));
        assert_eq!(GrievanceStatus::parse("CLOSED"), Some(GrievanceStatus::Closed));
    }

    #[test]
    fn test_status_parse_rejects_resolved() {
        // "Resolved" is display-only; it must never be written back.
        assert_eq!(GrievanceStatus::parse("Resolved"), None);
        assert_eq!(GrievanceStatus::parse("garbage"), None);
    }

    #[test]
    fn test_status_badge_treats_resolved_as_active() {
        assert_eq!(status_badge("Active"), "green");
        assert_eq!(status_badge("resolved"), "green");
        assert_eq!(status_badge("Pending"), "amber");
        assert_eq!(status_badge("Closed"), "red");
        assert_eq!(status_badge(""), "none");
    }

    #[test]
    fn test_grievance_summary_counts_per_status() {
        let raw = serde_json::json!({"id": 1, "subject": "x", "status": "Resolved"});
        let a = Grievance::from_raw(0, &raw);
        let mut b = a.clone();
        b.status = "Pending".to_string();
        let mut c = a.clone();
        c.status = "Closed".to_string();
        let lines = Grievance::summary_lines(&[a, b, c]);
        assert_eq!(
            lines,
            vec![
                "Total grievances: 3".to_string(),
                "Active: 1".to_string(),
                "Pending: 1".to_string(),
                "Closed: 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_headers_and_widths_line_up() {
        assert_eq!(Circular::HEADERS.len(), Circular::COLUMN_WIDTHS.len());
        assert_eq!(Grievance::HEADERS.len(), Grievance::COLUMN_WIDTHS.len());
        assert_eq!(Contact::HEADERS.len(), Contact::COLUMN_WIDTHS.len());
        assert_eq!(Resume::HEADERS.len(), Resume::COLUMN_WIDTHS.len());
        assert_eq!(Role::HEADERS.len(), Role::COLUMN_WIDTHS.len());
    }
}
