//! agent.raw_event.v1 schema definition
//!
//! A collector-agnostic schema for AI coding agent action logs. Collectors
//! (one per supported agent log format) normalize their native transcripts
//! into this shape before handing them to the analysis core. The core only
//! ever borrows these events read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version
pub const SCHEMA_VERSION: &str = "agent.raw_event.v1";

/// Supported AI coding agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    ClaudeCode,
    Cursor,
    Aider,
    Codex,
    Copilot,
    Windsurf,
    /// For custom/unknown agents, use Other with a name
    #[serde(untagged)]
    Other(String),
}

impl AgentKind {
    pub fn as_str(&self) -> &str {
        match self {
            AgentKind::ClaudeCode => "claude_code",
            AgentKind::Cursor => "cursor",
            AgentKind::Aider => "aider",
            AgentKind::Codex => "codex",
            AgentKind::Copilot => "copilot",
            AgentKind::Windsurf => "windsurf",
            AgentKind::Other(name) => name.as_str(),
        }
    }
}

/// Kind of action recorded in the event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Shell command execution
    Bash,
    /// File creation or modification
    FileWrite,
    /// File or manifest read
    Read,
    /// Web/documentation search or lookup
    Search,
    /// User-originated instruction to the agent
    UserMessage,
    /// For extensibility
    #[serde(untagged)]
    Other(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Bash => "bash",
            ActionKind::FileWrite => "file_write",
            ActionKind::Read => "read",
            ActionKind::Search => "search",
            ActionKind::UserMessage => "user_message",
            ActionKind::Other(name) => name.as_str(),
        }
    }
}

/// A single normalized agent action.
///
/// `raw` carries the command line for `bash` events, the target path for
/// `file_write`/`read` events, and the query or message text otherwise.
/// `result` carries command output or file content when the collector
/// captured it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Unique event identifier
    pub id: Uuid,
    /// Session this event belongs to; derived structures never span sessions
    pub session_id: String,
    /// When the action occurred (UTC)
    pub timestamp: DateTime<Utc>,
    /// Agent that performed the action
    pub agent: AgentKind,
    /// Kind of action
    pub action: ActionKind,
    /// Command line, file path, or message text
    pub raw: String,
    /// Command output or file content, if captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Process exit code for `bash` events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Working directory at the time of the action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl RawEvent {
    /// Whether this event records a failure: a non-zero exit code, or
    /// error text in the captured output.
    pub fn is_failure(&self) -> bool {
        if matches!(self.exit_code, Some(code) if code != 0) {
            return true;
        }
        match &self.result {
            Some(output) => {
                let lower = output.to_lowercase();
                lower.contains("error")
                    || lower.contains("failed")
                    || lower.contains("exception")
                    || output.contains("ERR!")
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_event(action: ActionKind) -> RawEvent {
        RawEvent {
            id: Uuid::new_v4(),
            session_id: "session-1".to_string(),
            timestamp: Utc::now(),
            agent: AgentKind::ClaudeCode,
            action,
            raw: "npm install express".to_string(),
            result: None,
            exit_code: Some(0),
            cwd: None,
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let event = make_event(ActionKind::Bash);
        let json = serde_json::to_string(&event).unwrap();
        let back: RawEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.session_id, event.session_id);
        assert_eq!(back.action, ActionKind::Bash);
        assert_eq!(back.agent, AgentKind::ClaudeCode);
    }

    #[test]
    fn test_unknown_agent_round_trips_as_other() {
        let json = r#""some-new-agent""#;
        let agent: AgentKind = serde_json::from_str(json).unwrap();
        assert_eq!(agent, AgentKind::Other("some-new-agent".to_string()));
        assert_eq!(agent.as_str(), "some-new-agent");
    }

    #[test]
    fn test_failure_detection() {
        let mut event = make_event(ActionKind::Bash);
        assert!(!event.is_failure());

        event.exit_code = Some(1);
        assert!(event.is_failure());

        event.exit_code = Some(0);
        event.result = Some("npm ERR! code ERESOLVE".to_string());
        assert!(event.is_failure());

        event.result = Some("added 12 packages".to_string());
        assert!(!event.is_failure());
    }
}
