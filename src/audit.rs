//! Append-only action audit log.
//!
//! Every mutating project operation records its outcome here as one line:
//!
//! ```text
//! [2026-01-05 14:03:11] TOOL:save_code_proposal | STATUS:SUCCESS | MESSAGE:[SUCCESS] Saved proposal to project_files/logic.py.new
//! ```
//!
//! Writing is best-effort. A failed append is reported on the operator's
//! tracing output and never reaches the caller.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the audit log inside the project root.
pub const AUDIT_LOG_FILE: &str = "action_audit.txt";

const MISSING_LOG: &str = "No action audit log found.";

/// Outcome tag of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Success,
    Failure,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "SUCCESS",
            AuditStatus::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub tool: String,
    pub status: AuditStatus,
    pub message: String,
}

impl AuditEntry {
    /// Parse a single audit line. Returns `None` for the header and for
    /// anything else that is not an audit entry.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (timestamp, rest) = rest.split_once("] TOOL:")?;
        let (tool, rest) = rest.split_once(" | STATUS:")?;
        let (status, message) = rest.split_once(" | MESSAGE:")?;
        let status = match status {
            "SUCCESS" => AuditStatus::Success,
            "FAILURE" => AuditStatus::Failure,
            _ => return None,
        };
        Some(Self {
            timestamp: timestamp.to_string(),
            tool: tool.to_string(),
            status,
            message: message.to_string(),
        })
    }
}

/// Audit log scoped to a project root.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Ensure the audit log exists under `root`, writing the start header
    /// when it is created. Re-opening an existing log never truncates it.
    pub fn open(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let path = root.join(AUDIT_LOG_FILE);
        if !path.exists() {
            fs::write(
                &path,
                format!(
                    "--- J.A.R.V.I.S. Action Audit Log (Start: {}) ---\n",
                    Local::now().format("%a %b %e %H:%M:%S %Y")
                ),
            )?;
            info!(path = %path.display(), "created action audit log");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Errors are logged and swallowed.
    pub fn log_action(&self, tool_name: &str, status: AuditStatus, message: &str) {
        let line = format!(
            "[{}] TOOL:{} | STATUS:{} | MESSAGE:{}\n",
            timestamp(),
            tool_name,
            status,
            message
        );

        match self.append(&line) {
            Ok(()) => info!(tool = %tool_name, status = %status, "[AUDIT]"),
            Err(e) => warn!(tool = %tool_name, error = %e, "[AUDIT ERROR] could not write to log"),
        }
    }

    /// Full log text, or a placeholder if the file has gone missing.
    pub fn get_log(&self) -> String {
        fs::read_to_string(&self.path).unwrap_or_else(|_| MISSING_LOG.to_string())
    }

    /// All parseable entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        fs::read_to_string(&self.path)
            .map(|text| text.lines().filter_map(AuditEntry::parse).collect())
            .unwrap_or_default()
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

/// Second-resolution local timestamp shared by the project logs.
pub(crate) fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
