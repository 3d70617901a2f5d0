use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::input::HookInput;

/// Longest message kept in a status record, in characters
pub const MESSAGE_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Completed,
    WaitingPermission,
}

/// Latest known state of the session, as read by the supervisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub session_id: Option<Value>,
    pub timestamp: String,
    pub status: SessionStatus,
    pub cwd: Option<String>,
    pub message: String,
    pub tool_name: Option<String>,
    pub tool_input: Option<Value>,
    pub hook_event: String,
    pub transcript_path: Option<String>,
    pub initiated_by: String,
}

impl StatusRecord {
    /// Session finished its turn; `message` is the last assistant text.
    pub fn completed(input: &HookInput, message: &str, initiated_by: &str) -> Self {
        StatusRecord {
            session_id: input.session_id.clone(),
            timestamp: utc_now(),
            status: SessionStatus::Completed,
            cwd: input.cwd.clone(),
            message: truncate_chars(message, MESSAGE_MAX_LEN),
            tool_name: None,
            tool_input: None,
            hook_event: "Stop".to_string(),
            transcript_path: input.transcript_path.clone(),
            initiated_by: initiated_by.to_string(),
        }
    }

    /// Session is blocked until someone answers a permission prompt.
    pub fn waiting_permission(input: &HookInput, initiated_by: &str) -> Self {
        let message = format!(
            "Waiting for permission to use tool: {}",
            input.tool_name.as_deref().unwrap_or("")
        );
        StatusRecord {
            session_id: input.session_id.clone(),
            timestamp: utc_now(),
            status: SessionStatus::WaitingPermission,
            cwd: input.cwd.clone(),
            message: truncate_chars(&message, MESSAGE_MAX_LEN),
            tool_name: input.tool_name.clone(),
            tool_input: input.tool_input.clone(),
            hook_event: "PermissionRequest".to_string(),
            transcript_path: input.transcript_path.clone(),
            initiated_by: initiated_by.to_string(),
        }
    }
}

/// UTC now as `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn utc_now() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// First `max` characters of `s` (never splits a code point)
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Publishes status records to a single file path.
/// Readers only ever see a complete record: writes go to a temp sibling
/// and are renamed into place.
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StatusStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the status file with `record`.
    pub fn write(&self, record: &StatusRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_vec_pretty(record).context("Failed to serialize status")?;

        let tmp_path = self.tmp_path();
        if let Err(e) = write_synced(&tmp_path, &content) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e).with_context(|| {
                format!(
                    "Failed to move {} to {}",
                    tmp_path.display(),
                    self.path.display()
                )
            });
        }

        Ok(())
    }

    /// `{path}.tmp.{pid}.{seq}` so concurrent writers never share a temp file
    fn tmp_path(&self) -> PathBuf {
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let mut s = self.path.as_os_str().to_os_string();
        s.push(format!(".tmp.{}.{}", std::process::id(), seq));
        PathBuf::from(s)
    }
}

fn write_synced(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync {}", path.display()))?;
    Ok(())
}
