use std::env;

/// Upload ceiling enforced locally before any network call, in megabytes.
pub const MAX_UPLOAD_MB: u64 = 10;
pub const MAX_UPLOAD_BYTES: u64 = MAX_UPLOAD_MB * 1024 * 1024;

/// File extensions accepted for resume uploads.
pub const RESUME_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// Deployment constants for the Etribe backend. Everything here is a
/// per-deployment setting, not a per-user secret; per-user credentials live
/// in the session store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL for the REST endpoints.
    pub api_base: String,
    /// Origin that relative attachment references are joined onto.
    pub file_origin: String,
    /// Static `Client-Service` header sent with every request.
    pub client_service: String,
    /// Static `Auth-Key` header sent with every request.
    pub auth_key: String,
    /// Static `rurl` routing-host header sent with every request.
    pub rurl: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base: env_or("ETRIBE_API_BASE", "https://api.etribe.in/api"),
            file_origin: env_or("ETRIBE_FILE_ORIGIN", "https://api.etribe.in"),
            client_service: env_or("ETRIBE_CLIENT_SERVICE", "COHAPPRT"),
            auth_key: env_or("ETRIBE_AUTH_KEY", "4F21zrjoAASqz25690Zpqf67UyY"),
            rurl: env_or("ETRIBE_RURL", "etribe.in"),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Turn an attachment reference into an absolute URL. References that
    /// already carry a scheme pass through untouched.
    pub fn file_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("{}/{}", self.file_origin.trim_end_matches('/'), reference.trim_start_matches('/'))
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api_base: "https://api.example.org/api/".to_string(),
            file_origin: "https://api.example.org".to_string(),
            client_service: "svc".to_string(),
            auth_key: "key".to_string(),
            rurl: "example.org".to_string(),
        }
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = test_config();
        assert_eq!(
            config.endpoint("/circulars/list"),
            "https://api.example.org/api/circulars/list"
        );
    }

    #[test]
    fn test_file_url_passes_absolute_through() {
        let config = test_config();
        assert_eq!(
            config.file_url("https://cdn.example.org/x.pdf"),
            "https://cdn.example.org/x.pdf"
        );
    }

    #[test]
    fn test_file_url_joins_relative() {
        let config = test_config();
        assert_eq!(
            config.file_url("uploads/x.pdf"),
            "https://api.example.org/uploads/x.pdf"
        );
    }
}
