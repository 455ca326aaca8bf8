use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::warn;

use crate::api::ApiClient;
use crate::config::Config;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// What to do with a resolved attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    /// Images: shown alongside the record details.
    InlinePreview,
    /// PDFs and unknown types: fetched with credentials and opened externally.
    OpenTab,
    /// Word documents: downloaded only after explicit confirmation.
    ConfirmDownload,
}

#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub action: FileAction,
    pub url: String,
    pub extension: String,
}

/// A record has an attachment iff any alias value is non-empty; every alias
/// resolves the same way regardless of which one the backend populated.
pub fn resolve(attachments: &[String], config: &Config) -> Option<ResolvedFile> {
    let reference = attachments.iter().find(|a| !a.trim().is_empty())?;
    let url = config.file_url(reference);
    let extension = reference
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    let action = match extension.as_str() {
        "doc" | "docx" => FileAction::ConfirmDownload,
        ext if IMAGE_EXTENSIONS.contains(&ext) => FileAction::InlinePreview,
        _ => FileAction::OpenTab,
    };
    Some(ResolvedFile { action, url, extension })
}

fn remote_filename(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("attachment")
        .to_string()
}

/// Fetch the attachment with the session credentials, stage it in a temp
/// file, and hand it to the platform opener. Any failure along the way
/// degrades to opening the raw URL directly; the fallback reports problems
/// but never propagates them.
pub fn fetch_and_open(client: &ApiClient, resolved: &ResolvedFile) {
    match client.fetch_bytes(&resolved.url) {
        Ok(bytes) => {
            let staged = std::env::temp_dir().join(format!("etribe-{}", remote_filename(&resolved.url)));
            match std::fs::write(&staged, &bytes) {
                Ok(()) => {
                    println!("Opening {}", staged.display());
                    open_target(staged.to_string_lossy().as_ref());
                }
                Err(err) => {
                    warn!(%err, "could not stage attachment, falling back to raw URL");
                    open_target(&resolved.url);
                }
            }
        }
        Err(err) => {
            warn!(%err, url = %resolved.url, "authenticated fetch failed, falling back to raw URL");
            open_target(&resolved.url);
        }
    }
}

/// Download to an explicit destination (the confirm-download path).
pub fn download_to(client: &ApiClient, resolved: &ResolvedFile, dest: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let dest = dest.unwrap_or_else(|| PathBuf::from(remote_filename(&resolved.url)));
    let bytes = client.fetch_bytes(&resolved.url)?;
    std::fs::write(&dest, &bytes)?;
    Ok(dest)
}

/// Last line of defense: hand the target to the platform opener and only
/// report failure.
fn open_target(target: &str) {
    let opener = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
    match Command::new(opener).arg(target).status() {
        Ok(status) if status.success() => {}
        Ok(status) => eprintln!("'{} {}' exited with {}", opener, target, status),
        Err(err) => eprintln!("Could not open {}: {}", target, err),
    }
}

/// Where a staged attachment would land; used to tell the user before a
/// confirm-download prompt.
pub fn staging_hint(resolved: &ResolvedFile) -> PathBuf {
    Path::new(&remote_filename(&resolved.url)).to_path_buf()
}
