use serde_json::{Value, json};
use std::fmt;
use tracing::{debug, warn};

use crate::config::{Config, MAX_UPLOAD_BYTES, MAX_UPLOAD_MB, RESUME_EXTENSIONS};
use crate::models::{Circular, Contact, Record, Resume, Role};
use crate::normalize::{Normalized, normalize};
use crate::session::Session;

// Endpoint paths, one set per entity.
pub const CIRCULARS_LIST: &str = "circular/list";
pub const CIRCULARS_ADD: &str = "circular/add";
pub const CIRCULARS_UPDATE: &str = "circular/update";
pub const CIRCULARS_DELETE: &str = "circular/delete";
pub const GRIEVANCES_LIST: &str = "grievance/list";
pub const GRIEVANCES_STATUS: &str = "grievance/update_status";
pub const CONTACTS_LIST: &str = "contact/list";
pub const CONTACTS_ADD: &str = "contact/add";
pub const CONTACTS_UPDATE: &str = "contact/update";
pub const CONTACTS_DELETE: &str = "contact/delete";
pub const RESUMES_LIST: &str = "resume/list";
pub const RESUMES_ADD: &str = "resume/add";
pub const RESUMES_DELETE: &str = "resume/delete";
pub const ROLES_LIST: &str = "role/list";
pub const ROLES_ADD: &str = "role/add";
pub const ROLES_UPDATE: &str = "role/update";
pub const ROLES_DELETE: &str = "role/delete";

/// Normalized failure surfaced to the CLI. The façade never leaks a raw
/// transport error; everything a user can see is one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFailure {
    /// No stored credentials; detected locally, nothing was sent.
    NotLoggedIn,
    /// The backend answered 401; the session must be re-established.
    SessionExpired,
    /// 404-class answer, which for this backend means a misconfigured
    /// endpoint or a record that no longer exists.
    NotFound(String),
    /// 413-class answer or a local size check.
    FileTooLarge { limit_mb: u64 },
    /// Caught before any network call.
    Validation(String),
    /// 5xx, transport failure, or an unclassifiable error body.
    Server(String),
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFailure::NotLoggedIn => {
                write!(f, "Not logged in. Run 'etribe login' first.")
            }
            ApiFailure::SessionExpired => {
                write!(f, "Session expired or invalid. Run 'etribe login' again.")
            }
            ApiFailure::NotFound(what) => {
                write!(f, "Endpoint or record not found: {}", what)
            }
            ApiFailure::FileTooLarge { limit_mb } => {
                write!(f, "File exceeds the {} MB upload limit", limit_mb)
            }
            ApiFailure::Validation(msg) => write!(f, "{}", msg),
            ApiFailure::Server(msg) => write!(f, "Request failed: {}", msg),
        }
    }
}

impl std::error::Error for ApiFailure {}

/// Mutations distinguish a clean acknowledgement from a 2xx body that carried
/// no recognizable success marker. The list is refetched either way; only the
/// notice differs.
#[derive(Debug, PartialEq)]
pub enum MutationOutcome {
    Completed,
    CompletedWithWarning(String),
}

// --- Transport seam ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    File { filename: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct MultipartField {
    pub name: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Vec<MultipartField>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Seam between the façade and the HTTP stack so tests can substitute a
/// scripted transport.
pub trait Transport {
    fn execute(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(fields) => {
                let mut form = reqwest::blocking::multipart::Form::new();
                for field in fields {
                    form = match &field.value {
                        FieldValue::Text(text) => form.text(field.name.clone(), text.clone()),
                        FieldValue::File { filename, bytes } => form.part(
                            field.name.clone(),
                            reqwest::blocking::multipart::Part::bytes(bytes.clone())
                                .file_name(filename.clone()),
                        ),
                    };
                }
                builder.multipart(form)
            }
        };

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        debug!(url = %request.url, status, bytes = body.len(), "request completed");
        Ok(ApiResponse { status, body })
    }
}

// --- File uploads ---

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Reads and size-checks an upload before any network call.
    pub fn read(path: &std::path::Path) -> Result<Self, ApiFailure> {
        let bytes = std::fs::read(path)
            .map_err(|e| ApiFailure::Validation(format!("Cannot read {}: {}", path.display(), e)))?;
        if bytes.len() as u64 > MAX_UPLOAD_BYTES {
            return Err(ApiFailure::FileTooLarge { limit_mb: MAX_UPLOAD_MB });
        }
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { filename, bytes })
    }

    pub fn extension(&self) -> String {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default()
    }
}

// --- Façade ---

pub struct ApiClient<'a> {
    config: Config,
    session: &'a dyn Session,
    transport: &'a dyn Transport,
}

impl<'a> ApiClient<'a> {
    pub fn new(config: Config, session: &'a dyn Session, transport: &'a dyn Transport) -> Self {
        Self { config, session, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Both credential halves are required before anything touches the
    /// network; absence is a local failure, not a 401.
    fn credentials(&self) -> Result<(String, String), ApiFailure> {
        let token = self.session.token().ok_or(ApiFailure::NotLoggedIn)?;
        let user_id = self.session.user_id().ok_or(ApiFailure::NotLoggedIn)?;
        Ok((token, user_id))
    }

    fn headers(&self) -> Result<Vec<(String, String)>, ApiFailure> {
        let (token, user_id) = self.credentials()?;
        Ok(vec![
            ("Client-Service".to_string(), self.config.client_service.clone()),
            ("Auth-Key".to_string(), self.config.auth_key.clone()),
            ("rurl".to_string(), self.config.rurl.clone()),
            ("uid".to_string(), user_id),
            ("token".to_string(), token),
        ])
    }

    fn send(&self, method: Method, path: &str, body: RequestBody) -> Result<ApiResponse, ApiFailure> {
        let request = ApiRequest {
            method,
            url: self.config.endpoint(path),
            headers: self.headers()?,
            body,
        };
        debug!(url = %request.url, ?method, "sending request");
        let response = self
            .transport
            .execute(&request)
            .map_err(|e| ApiFailure::Server(e.to_string()))?;
        classify(&response)?;
        Ok(response)
    }

    /// Fetch and normalize one entity list. List endpoints take an empty
    /// body; the envelope shape is decoded by the normalizer.
    pub fn list<R: Record>(&self, path: &str) -> Result<Normalized<R>, ApiFailure> {
        let response = self.send(Method::Post, path, RequestBody::Json(json!({})))?;
        let payload = response.json().unwrap_or(Value::Null);
        Ok(normalize(&payload))
    }

    /// Run a mutation and translate the acknowledgement. A 2xx body with no
    /// recognizable success marker completes with a warning instead of
    /// failing, because this backend signals success inconsistently.
    pub fn mutate(&self, method: Method, path: &str, body: RequestBody) -> Result<MutationOutcome, ApiFailure> {
        let response = self.send(method, path, body)?;
        let payload = response.json();
        match payload {
            Some(ref value) if success_marker(value) => Ok(MutationOutcome::Completed),
            _ => {
                warn!(path, "mutation returned an ambiguous success shape");
                Ok(MutationOutcome::CompletedWithWarning(
                    "completed, but the server response was not recognized".to_string(),
                ))
            }
        }
    }

    /// Authenticated byte fetch for attachments.
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ApiFailure> {
        let request = ApiRequest {
            method: Method::Get,
            url: url.to_string(),
            headers: self.headers()?,
            body: RequestBody::Empty,
        };
        let response = self
            .transport
            .execute(&request)
            .map_err(|e| ApiFailure::Server(e.to_string()))?;
        classify(&response)?;
        Ok(response.body)
    }

    // --- Circulars ---

    pub fn list_circulars(&self) -> Result<Normalized<Circular>, ApiFailure> {
        self.list(CIRCULARS_LIST)
    }

    pub fn add_circular(
        &self,
        circular_no: &str,
        subject: &str,
        description: &str,
        date: &str,
        file: Option<FileUpload>,
    ) -> Result<MutationOutcome, ApiFailure> {
        require_fields(&[
            ("circular number", circular_no),
            ("subject", subject),
            ("date", date),
        ])?;
        let mut fields = vec![
            text_field("circular_number", circular_no),
            text_field("subject", subject),
            text_field("description", description),
            text_field("date", date),
        ];
        if let Some(upload) = file {
            fields.push(file_field("file", upload));
        }
        self.mutate(Method::Post, CIRCULARS_ADD, RequestBody::Multipart(fields))
    }

    /// A missing file means "keep the existing attachment"; the old reference
    /// is never re-sent.
    pub fn update_circular(
        &self,
        id: i64,
        circular_no: &str,
        subject: &str,
        description: &str,
        date: &str,
        file: Option<FileUpload>,
    ) -> Result<MutationOutcome, ApiFailure> {
        require_fields(&[
            ("circular number", circular_no),
            ("subject", subject),
            ("date", date),
        ])?;
        let mut fields = vec![
            text_field("id", &id.to_string()),
            text_field("circular_number", circular_no),
            text_field("subject", subject),
            text_field("description", description),
            text_field("date", date),
        ];
        if let Some(upload) = file {
            fields.push(file_field("file", upload));
        }
        self.mutate(Method::Post, CIRCULARS_UPDATE, RequestBody::Multipart(fields))
    }

    pub fn delete_circular(&self, id: i64) -> Result<MutationOutcome, ApiFailure> {
        self.mutate(Method::Delete, CIRCULARS_DELETE, RequestBody::Json(json!({ "id": id.to_string() })))
    }

    // --- Grievances ---

    pub fn list_grievances(&self) -> Result<Normalized<crate::models::Grievance>, ApiFailure> {
        self.list(GRIEVANCES_LIST)
    }

    pub fn update_grievance_status(&self, id: i64, status: &str) -> Result<MutationOutcome, ApiFailure> {
        self.mutate(
            Method::Post,
            GRIEVANCES_STATUS,
            RequestBody::Json(json!({ "id": id.to_string(), "status": status })),
        )
    }

    // --- Contacts ---

    pub fn list_contacts(&self) -> Result<Normalized<Contact>, ApiFailure> {
        self.list(CONTACTS_LIST)
    }

    pub fn add_contact(
        &self,
        department: &str,
        name: &str,
        contact: &str,
        email: &str,
        address: &str,
    ) -> Result<MutationOutcome, ApiFailure> {
        require_fields(&[
            ("department", department),
            ("name", name),
            ("contact", contact),
            ("email", email),
        ])?;
        self.mutate(
            Method::Post,
            CONTACTS_ADD,
            RequestBody::Json(json!({
                "department": department,
                "name": name,
                "contact": contact,
                "email": email,
                "address": address,
            })),
        )
    }

    pub fn update_contact(
        &self,
        id: i64,
        department: &str,
        name: &str,
        contact: &str,
        email: &str,
        address: &str,
    ) -> Result<MutationOutcome, ApiFailure> {
        require_fields(&[
            ("department", department),
            ("name", name),
            ("contact", contact),
            ("email", email),
        ])?;
        self.mutate(
            Method::Post,
            CONTACTS_UPDATE,
            RequestBody::Json(json!({
                "id": id.to_string(),
                "department": department,
                "name": name,
                "contact": contact,
                "email": email,
                "address": address,
            })),
        )
    }

    pub fn delete_contact(&self, id: i64) -> Result<MutationOutcome, ApiFailure> {
        self.mutate(Method::Delete, CONTACTS_DELETE, RequestBody::Json(json!({ "id": id.to_string() })))
    }

    // --- Resumes ---

    pub fn list_resumes(&self) -> Result<Normalized<Resume>, ApiFailure> {
        self.list(RESUMES_LIST)
    }

    pub fn upload_resume(
        &self,
        name: &str,
        contact_no: &str,
        email: &str,
        qualification: &str,
        skills: &str,
        experience: &str,
        file: FileUpload,
    ) -> Result<MutationOutcome, ApiFailure> {
        require_fields(&[
            ("name", name),
            ("contact number", contact_no),
            ("email", email),
            ("qualification", qualification),
            ("experience", experience),
        ])?;
        let extension = file.extension();
        if !RESUME_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApiFailure::Validation(format!(
                "Unsupported resume type '.{}' (allowed: pdf, doc, docx)",
                extension
            )));
        }
        let fields = vec![
            text_field("name", name),
            text_field("contact_no", contact_no),
            text_field("email_id", email),
            text_field("qualification", qualification),
            text_field("skills", skills),
            text_field("experience", experience),
            file_field("resume_file", file),
        ];
        self.mutate(Method::Post, RESUMES_ADD, RequestBody::Multipart(fields))
    }

    pub fn delete_resume(&self, id: i64) -> Result<MutationOutcome, ApiFailure> {
        self.mutate(Method::Delete, RESUMES_DELETE, RequestBody::Json(json!({ "id": id.to_string() })))
    }

    // --- Roles ---

    pub fn list_roles(&self) -> Result<Normalized<Role>, ApiFailure> {
        self.list(ROLES_LIST)
    }

    pub fn add_role(&self, name: &str) -> Result<MutationOutcome, ApiFailure> {
        require_fields(&[("role name", name)])?;
        self.mutate(Method::Post, ROLES_ADD, RequestBody::Json(json!({ "name": name })))
    }

    pub fn rename_role(&self, id: i64, name: &str) -> Result<MutationOutcome, ApiFailure> {
        require_fields(&[("role name", name)])?;
        self.mutate(
            Method::Post,
            ROLES_UPDATE,
            RequestBody::Json(json!({ "id": id.to_string(), "name": name })),
        )
    }

    pub fn delete_role(&self, id: i64) -> Result<MutationOutcome, ApiFailure> {
        self.mutate(Method::Delete, ROLES_DELETE, RequestBody::Json(json!({ "id": id.to_string() })))
    }
}

/// Map a response status to the failure taxonomy. 401 always means
/// re-authenticate and is never retried; 404 is a configuration notice; 413
/// or any message mentioning a size limit is the file-too-large notice.
fn classify(response: &ApiResponse) -> Result<(), ApiFailure> {
    let status = response.status;
    if (200..300).contains(&status) {
        return Ok(());
    }
    let message = response
        .json()
        .and_then(|v| {
            v.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default();

    match status {
        401 => Err(ApiFailure::SessionExpired),
        404 => Err(ApiFailure::NotFound(if message.is_empty() {
            "check the configured API base URL".to_string()
        } else {
            message
        })),
        413 => Err(ApiFailure::FileTooLarge { limit_mb: MAX_UPLOAD_MB }),
        _ if mentions_size_limit(&message) => Err(ApiFailure::FileTooLarge { limit_mb: MAX_UPLOAD_MB }),
        _ => Err(ApiFailure::Server(if message.is_empty() {
            format!("server returned status {}", status)
        } else {
            message
        })),
    }
}

fn mentions_size_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("too large") || (lower.contains("size") && lower.contains("limit"))
}

/// Any of the backend's three success shapes counts: an explicit
/// `status: "success"`, a `message`, or a `data` payload.
fn success_marker(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) == Some("success")
        || body.get("message").is_some()
        || body.get("data").is_some()
}

fn require_fields(fields: &[(&str, &str)]) -> Result<(), ApiFailure> {
    for (label, value) in fields {
        if value.trim().is_empty() {
            return Err(ApiFailure::Validation(format!("Missing required field: {}", label)));
        }
    }
    Ok(())
}

fn text_field(name: &str, value: &str) -> MultipartField {
    MultipartField {
        name: name.to_string(),
        value: FieldValue::Text(value.to_string()),
    }
}

fn file_field(name: &str, upload: FileUpload) -> MultipartField {
    MultipartField {
        name: name.to_string(),
        value: FieldValue::File {
            filename: upload.filename,
            bytes: upload.bytes,
        },
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Scripted transport: answers from a queue and records every request.
    pub struct MockTransport {
        pub requests: RefCell<Vec<ApiRequest>>,
        pub responses: RefCell<Vec<ApiResponse>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                requests: RefCell::new(Vec::new()),
                responses: RefCell::new(Vec::new()),
            }
        }

        pub fn respond_with(self, status: u16, body: &str) -> Self {
            self.responses.borrow_mut().push(ApiResponse {
                status,
                body: body.as_bytes().to_vec(),
            });
            self
        }

        pub fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }

        pub fn requests_to(&self, path_fragment: &str) -> usize {
            self.requests
                .borrow()
                .iter()
                .filter(|r| r.url.contains(path_fragment))
                .count()
        }
    }

    impl Transport for MockTransport {
        fn execute(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse> {
            self.requests.borrow_mut().push(request.clone());
            if self.responses.borrow().is_empty() {
                anyhow::bail!("mock transport exhausted");
            }
            Ok(self.responses.borrow_mut().remove(0))
        }
    }
}
