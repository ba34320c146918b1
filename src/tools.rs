//! Project tools exposed to the agent for LLM function calling.
//!
//! Every tool takes JSON parameters and returns plain text. Failures come
//! back as `[FAILURE] ...` sentences, never as errors.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::ProjectStore;

/// Tool definition for LLM function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Project file and reflection tools backed by a shared store
#[derive(Clone)]
pub struct ProjectTools {
    store: Arc<ProjectStore>,
}

impl ProjectTools {
    pub fn new(store: Arc<ProjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Get all available tool definitions for LLM function calling
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "list_project_files".to_string(),
                description: "Lists all files present in the current project directory.".to_string(),
                parameters: no_params(),
            },
            ToolDefinition {
                name: "read_project_file".to_string(),
                description: "Reads the full content of a project file (e.g. 'logic.py'). \
                              If the file does not exist, a stub is created and returned."
                    .to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "filepath": {
                            "type": "string",
                            "description": "File name relative to the project directory"
                        }
                    },
                    "required": ["filepath"]
                }),
            },
            ToolDefinition {
                name: "save_code_proposal".to_string(),
                description: "Saves the complete revised content of a file with a '.new' suffix \
                              (e.g. 'logic.py.new') for manual review. Provide the ENTIRE file."
                    .to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "filepath": {
                            "type": "string",
                            "description": "File the proposal revises"
                        },
                        "new_code": {
                            "type": "string",
                            "description": "Complete new content of the file"
                        }
                    },
                    "required": ["filepath", "new_code"]
                }),
            },
            ToolDefinition {
                name: "delete_project_file".to_string(),
                description: "Deletes a file from the project directory. Use with caution.".to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "filepath": {
                            "type": "string",
                            "description": "File name relative to the project directory"
                        }
                    },
                    "required": ["filepath"]
                }),
            },
            ToolDefinition {
                name: "reflect_and_log".to_string(),
                description: "Records a reflection, error or success note in the long-term \
                              reflection log used as self-improvement context."
                    .to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "reflection": {
                            "type": "string",
                            "description": "Free-text reflection"
                        }
                    },
                    "required": ["reflection"]
                }),
            },
            ToolDefinition {
                name: "get_audit_log".to_string(),
                description: "Returns the audit trail of saved proposals and deletions.".to_string(),
                parameters: no_params(),
            },
            ToolDefinition {
                name: "get_current_datetime".to_string(),
                description: "Returns the current local date and time.".to_string(),
                parameters: no_params(),
            },
        ]
    }

    /// Execute a tool by name with parameters
    pub fn execute(&self, name: &str, params: &HashMap<String, Value>) -> String {
        info!(tool = %name, "executing tool");

        match name {
            "list_project_files" => self.list_project_files(),
            "read_project_file" => match str_param(params, "filepath") {
                Ok(path) => match self.store.read_file(path) {
                    Ok(content) => content,
                    Err(e) => failure(format!("Could not read {}: {}", path, e)),
                },
                Err(msg) => msg,
            },
            "save_code_proposal" => {
                match (str_param(params, "filepath"), str_param(params, "new_code")) {
                    (Ok(path), Ok(code)) => self.store.save_proposal(path, code).to_string(),
                    (Err(msg), _) | (_, Err(msg)) => msg,
                }
            }
            "delete_project_file" => match str_param(params, "filepath") {
                Ok(path) => self.store.delete_file(path).to_string(),
                Err(msg) => msg,
            },
            "reflect_and_log" => match str_param(params, "reflection") {
                Ok(text) => match self.store.log_reflection(text) {
                    Ok(()) => "[SUCCESS] Reflection logged.".to_string(),
                    Err(e) => failure(format!("Could not log reflection: {}", e)),
                },
                Err(msg) => msg,
            },
            "get_audit_log" => self.store.get_audit_log(),
            "get_current_datetime" => Local::now().format("%a %b %e %H:%M:%S %Y").to_string(),
            _ => {
                warn!(tool = %name, "unknown tool requested");
                failure(format!("Unknown tool: {}", name))
            }
        }
    }

    fn list_project_files(&self) -> String {
        match self.store.list_files() {
            Ok(files) if files.is_empty() => "The project directory is currently empty.".to_string(),
            Ok(files) => format!("Project Files:\n{}", files.join("\n")),
            Err(e) => failure(format!("Could not list project files: {}", e)),
        }
    }
}

fn no_params() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

fn failure(detail: String) -> String {
    format!("[FAILURE] {}", detail)
}

fn str_param<'a>(params: &'a HashMap<String, Value>, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| failure(format!("Missing required parameter: {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn params(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn tools_in(dir: &std::path::Path) -> ProjectTools {
        ProjectTools::new(Arc::new(ProjectStore::open(dir).unwrap()))
    }

    #[test]
    fn test_tool_definitions() {
        let dir = tempdir().unwrap();
        let defs = tools_in(dir.path()).get_tool_definitions();
        assert_eq!(defs.len(), 7);
        for name in [
            "list_project_files",
            "read_project_file",
            "save_code_proposal",
            "delete_project_file",
            "reflect_and_log",
            "get_audit_log",
        ] {
            assert!(defs.iter().any(|d| d.name == name), "missing {}", name);
        }
        let save = defs.iter().find(|d| d.name == "save_code_proposal").unwrap();
        assert_eq!(save.parameters["required"], json!(["filepath", "new_code"]));
    }

    #[test]
    fn test_list_project_files_text() {
        let dir = tempdir().unwrap();
        let tools = tools_in(dir.path());
        let empty = HashMap::new();
        assert_eq!(
            tools.execute("list_project_files", &empty),
            "The project directory is currently empty."
        );

        tools.execute("read_project_file", &params(json!({"filepath": "logic.py"})));
        assert_eq!(
            tools.execute("list_project_files", &empty),
            "Project Files:\nlogic.py"
        );
    }

    #[test]
    fn test_save_and_delete_report_status() {
        let dir = tempdir().unwrap();
        let tools = tools_in(dir.path());

        let saved = tools.execute(
            "save_code_proposal",
            &params(json!({"filepath": "logic.py", "new_code": "print(1)\n"})),
        );
        assert!(saved.starts_with("[SUCCESS] Saved proposal to "));

        let deleted = tools.execute("delete_project_file", &params(json!({"filepath": "nope.py"})));
        assert_eq!(deleted, "[FAILURE] File nope.py not found.");

        let log = tools.execute("get_audit_log", &HashMap::new());
        assert!(log.contains("TOOL:save_code_proposal | STATUS:SUCCESS"));
        assert!(log.contains("TOOL:delete_project_file | STATUS:FAILURE"));
    }

    #[test]
    fn test_reflect_and_log() {
        let dir = tempdir().unwrap();
        let tools = tools_in(dir.path());
        let out = tools.execute("reflect_and_log", &params(json!({"reflection": "tests pass"})));
        assert_eq!(out, "[SUCCESS] Reflection logged.");
        assert!(tools.store().get_reflections().contains("tests pass"));
    }

    #[test]
    fn test_missing_parameter_and_unknown_tool() {
        let dir = tempdir().unwrap();
        let tools = tools_in(dir.path());

        let out = tools.execute("save_code_proposal", &params(json!({"filepath": "a.py"})));
        assert_eq!(out, "[FAILURE] Missing required parameter: new_code");
        assert!(tools.store().audit().entries().is_empty());

        let out = tools.execute("rm_rf", &HashMap::new());
        assert_eq!(out, "[FAILURE] Unknown tool: rm_rf");
    }
}
