//! Tool surface for model-driven clients.
//!
//! Exposes the same operations as the gateway through name-dispatched
//! tool calls with JSON arguments and text results, so an assistant
//! holding a tool list can read queues and approve or reject drafts.
//! Guard violations come back as tool errors carrying the domain
//! message instead of protocol failures.

use crate::domain::types::{CaseNumber, CaseStatus};
use crate::gateway::CourtSystem;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// A tool invocation: which tool, with what arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Tool result: text content plus an error flag, never a hard failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

/// Tool metadata for discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// The five case tools over a shared [`CourtSystem`].
pub struct CourtTools {
    system: Arc<CourtSystem>,
}

impl CourtTools {
    pub fn new(system: Arc<CourtSystem>) -> Self {
        Self { system }
    }

    /// Tool list for discovery responses.
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "get_case".to_string(),
                description: "Retrieves the full state of a court case including screening, \
                              secretariat, audit, and draft results."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "case_number": { "type": "string" }
                    },
                    "required": ["case_number"]
                }),
            },
            ToolDefinition {
                name: "list_cases_by_status".to_string(),
                description: "Lists all court cases filtered by their processing status. \
                              Common statuses: AWAITING_HUMAN_APPROVAL, PUBLISHED, FAILED, \
                              SCREENING, DRAFTING."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "status": { "type": "string" }
                    },
                    "required": ["status"]
                }),
            },
            ToolDefinition {
                name: "list_all_cases".to_string(),
                description: "Lists all court cases in the system with their current status, \
                              procedure type, and urgency."
                    .to_string(),
                input_schema: json!({ "type": "object", "properties": {} }),
            },
            ToolDefinition {
                name: "approve_case".to_string(),
                description: "Approves a court case that is awaiting human approval. Only \
                              works when the case status is AWAITING_HUMAN_APPROVAL."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "case_number": { "type": "string" }
                    },
                    "required": ["case_number"]
                }),
            },
            ToolDefinition {
                name: "reject_case".to_string(),
                description: "Rejects a court case that is awaiting human approval with a \
                              reason. The case will be sent back for draft revision."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "case_number": { "type": "string" },
                        "reason": { "type": "string" }
                    },
                    "required": ["case_number", "reason"]
                }),
            },
        ]
    }

    /// Dispatches one tool call.
    pub async fn call(&self, request: ToolRequest) -> ToolResult {
        debug!(tool = %request.name, "tool call");
        match request.name.as_str() {
            "get_case" => self.get_case(&request.arguments).await,
            "list_cases_by_status" => self.list_cases_by_status(&request.arguments),
            "list_all_cases" => self.list_all_cases(),
            "approve_case" => self.approve_case(&request.arguments).await,
            "reject_case" => self.reject_case(&request.arguments).await,
            other => ToolResult::error(format!("unknown tool: {}", other)),
        }
    }

    async fn get_case(&self, arguments: &Value) -> ToolResult {
        let Some(case_number) = string_arg(arguments, "case_number") else {
            return ToolResult::error("missing argument: case_number");
        };
        match self.system.get(&CaseNumber::from(case_number)).await {
            Ok(view) => match serde_json::to_string(&view) {
                Ok(encoded) => ToolResult::text(encoded),
                Err(e) => ToolResult::error(format!("failed to encode case state: {}", e)),
            },
            Err(e) => ToolResult::error(e.to_string()),
        }
    }

    fn list_cases_by_status(&self, arguments: &Value) -> ToolResult {
        let Some(status_arg) = string_arg(arguments, "status") else {
            return ToolResult::error("missing argument: status");
        };
        let Ok(status) = CaseStatus::from_str(status_arg) else {
            return ToolResult::error(format!("unknown status: {}", status_arg));
        };
        let entries = self.system.cases_by_status(status);
        match serde_json::to_string(&json!({ "entries": entries })) {
            Ok(encoded) => ToolResult::text(encoded),
            Err(e) => ToolResult::error(format!("failed to encode entries: {}", e)),
        }
    }

    fn list_all_cases(&self) -> ToolResult {
        let entries = self.system.all_cases();
        match serde_json::to_string(&json!({ "entries": entries })) {
            Ok(encoded) => ToolResult::text(encoded),
            Err(e) => ToolResult::error(format!("failed to encode entries: {}", e)),
        }
    }

    async fn approve_case(&self, arguments: &Value) -> ToolResult {
        let Some(case_number) = string_arg(arguments, "case_number") else {
            return ToolResult::error("missing argument: case_number");
        };
        match self.system.approve(&CaseNumber::from(case_number)).await {
            Ok(_) => ToolResult::text(format!("Case {} approved successfully.", case_number)),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }

    async fn reject_case(&self, arguments: &Value) -> ToolResult {
        let Some(case_number) = string_arg(arguments, "case_number") else {
            return ToolResult::error("missing argument: case_number");
        };
        let Some(reason) = string_arg(arguments, "reason") else {
            return ToolResult::error("missing argument: reason");
        };
        match self
            .system
            .reject(&CaseNumber::from(case_number), reason)
            .await
        {
            Ok(_) => ToolResult::text(format!(
                "Case {} rejected. Reason: {}",
                case_number, reason
            )),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

fn string_arg<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str)
}

#[cfg(test)]
#[path = "tests/tools_tests.rs"]
mod tests;
