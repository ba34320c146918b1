//! Project file store.
//!
//! A flat project directory holding tracked files, their `.new` proposals
//! and two reserved logs (reflections, action audit). Mutating operations
//! report their result as an [`Outcome`] and an audit entry; they never
//! return an error to the caller.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::audit::{self, AuditLog, AuditStatus, AUDIT_LOG_FILE};

/// File name of the reflection log inside the project root.
pub const REFLECTION_LOG_FILE: &str = "reflections.txt";

/// Suffix appended to a file name to form its proposal.
pub const PROPOSAL_SUFFIX: &str = "new";

const MISSING_REFLECTIONS: &str = "No reflections found.";

const SAVE_TOOL: &str = "save_code_proposal";
const DELETE_TOOL: &str = "delete_project_file";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of a mutating store operation, as reported to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: AuditStatus,
    pub message: String,
}

impl Outcome {
    pub fn success(detail: impl fmt::Display) -> Self {
        Self {
            status: AuditStatus::Success,
            message: format!("[SUCCESS] {}", detail),
        }
    }

    pub fn failure(detail: impl fmt::Display) -> Self {
        Self {
            status: AuditStatus::Failure,
            message: format!("[FAILURE] {}", detail),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AuditStatus::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Project directory with an owned audit log.
#[derive(Debug)]
pub struct ProjectStore {
    root: PathBuf,
    reflection_path: PathBuf,
    audit: AuditLog,
}

impl ProjectStore {
    /// Open (or create) the project directory and both reserved logs.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        let audit = AuditLog::open(&root).map_err(|e| StoreError::io(&root, e))?;

        let reflection_path = root.join(REFLECTION_LOG_FILE);
        if !reflection_path.exists() {
            let header = format!(
                "--- J.A.R.V.I.S. Reflection Log (Start: {}) ---\n",
                Local::now().format("%a %b %e %H:%M:%S %Y")
            );
            fs::write(&reflection_path, header).map_err(|e| StoreError::io(&reflection_path, e))?;
        }

        info!(root = %root.display(), "project store ready");
        Ok(Self {
            root,
            reflection_path,
            audit,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Read a tracked file. A missing file is created as a stub and the
    /// stub is returned.
    pub fn read_file(&self, name: &str) -> Result<String, StoreError> {
        let path = self.root.join(name);
        if !path.exists() {
            let stub = format!("# {}\n# Stub created by J.A.R.V.I.S.\n", name);
            fs::write(&path, &stub).map_err(|e| StoreError::io(&path, e))?;
            debug!(file = %name, "created stub on read");
            return Ok(stub);
        }
        fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))
    }

    /// Names of the regular files directly under the root, sorted, with
    /// the reserved logs left out. Symlinks count by their target; dangling
    /// ones are skipped.
    pub fn list_files(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let is_file = fs::metadata(entry.path())
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == REFLECTION_LOG_FILE || name == AUDIT_LOG_FILE {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Listed files that are proposals awaiting review.
    pub fn pending_proposals(&self) -> Result<Vec<String>, StoreError> {
        let suffix = format!(".{}", PROPOSAL_SUFFIX);
        Ok(self
            .list_files()?
            .into_iter()
            .filter(|name| name.ends_with(&suffix))
            .collect())
    }

    /// Write `content` to `<name>.new`, replacing any earlier proposal.
    /// The original file is never touched.
    pub fn save_proposal(&self, name: &str, content: &str) -> Outcome {
        let path = self.root.join(format!("{}.{}", name, PROPOSAL_SUFFIX));
        let outcome = match fs::write(&path, content) {
            Ok(()) => Outcome::success(format!("Saved proposal to {}", path.display())),
            Err(e) => Outcome::failure(format!("Error saving {}: {}", name, e)),
        };
        self.audit.log_action(SAVE_TOOL, outcome.status, &outcome.message);
        outcome
    }

    /// Delete a tracked file.
    pub fn delete_file(&self, name: &str) -> Outcome {
        let path = self.root.join(name);
        let outcome = if path.exists() {
            match fs::remove_file(&path) {
                Ok(()) => Outcome::success(format!("Deleted {}", name)),
                Err(e) => Outcome::failure(format!("Could not delete {}: {}", name, e)),
            }
        } else {
            Outcome::failure(format!("File {} not found.", name))
        };
        self.audit.log_action(DELETE_TOOL, outcome.status, &outcome.message);
        outcome
    }

    /// Append a timestamped line to the reflection log. Not audited.
    pub fn log_reflection(&self, text: &str) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.reflection_path)
            .map_err(|e| StoreError::io(&self.reflection_path, e))?;
        writeln!(file, "[{}] {}", audit::timestamp(), text)
            .map_err(|e| StoreError::io(&self.reflection_path, e))
    }

    pub fn get_reflections(&self) -> String {
        fs::read_to_string(&self.reflection_path)
            .unwrap_or_else(|_| MISSING_REFLECTIONS.to_string())
    }

    pub fn get_audit_log(&self) -> String {
        self.audit.get_log()
    }
}
