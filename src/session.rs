use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

/// Session credential pair obtained at login. Both halves are required for
/// every network call; business logic never reads the storage directly and
/// instead receives this capability, so tests can substitute an in-memory
/// fake.
pub trait Session {
    fn token(&self) -> Option<String>;
    fn user_id(&self) -> Option<String>;
    fn save(&self, token: &str, user_id: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    token: Option<String>,
    user_id: Option<String>,
}

/// Persistent session backed by a JSON file in the platform data directory.
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn open() -> Result<Self> {
        Ok(Self { path: Self::default_path()? })
    }

    #[cfg(test)]
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "etribe") {
            Ok(proj_dirs.data_dir().join("session.json"))
        } else {
            // Fallback to current directory
            Ok(PathBuf::from("etribe-session.json"))
        }
    }

    fn load(&self) -> StoredSession {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn store(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))
    }
}

impl Session for FileSession {
    fn token(&self) -> Option<String> {
        self.load().token.filter(|t| !t.is_empty())
    }

    fn user_id(&self) -> Option<String> {
        self.load().user_id.filter(|u| !u.is_empty())
    }

    fn save(&self, token: &str, user_id: &str) -> Result<()> {
        self.store(&StoredSession {
            token: Some(token.to_string()),
            user_id: Some(user_id.to_string()),
        })
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session file: {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// In-memory session backing the tests.
pub struct MemorySession {
    inner: Mutex<StoredSession>,
}

impl MemorySession {
    pub fn new(token: Option<&str>, user_id: Option<&str>) -> Self {
        Self {
            inner: Mutex::new(StoredSession {
                token: token.map(String::from),
                user_id: user_id.map(String::from),
            }),
        }
    }

    pub fn empty() -> Self {
        Self::new(None, None)
    }
}

impl Session for MemorySession {
    fn token(&self) -> Option<String> {
        self.inner.lock().unwrap().token.clone().filter(|t| !t.is_empty())
    }

    fn user_id(&self) -> Option<String> {
        self.inner.lock().unwrap().user_id.clone().filter(|u| !u.is_empty())
    }

    fn save(&self, token: &str, user_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.token = Some(token.to_string());
        inner.user_id = Some(user_id.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.token = None;
        inner.user_id = None;
        Ok(())
    }
}
