//! Backend commands and their allow-list.

use serde::{Deserialize, Serialize};

/// A command object as emitted by a backend: `{"cmd": "...", "value": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommand {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RawCommand {
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            value: None,
        }
    }

    pub fn with_value(cmd: &str, value: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            value: Some(value.to_string()),
        }
    }
}

/// A validated command the engine is allowed to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendCommand {
    GetState,
    Propose,
    SetIntention(String),
    Pause,
    Resume,
}

impl BackendCommand {
    /// Validate one raw command. Unknown verbs and value-less SET_INTENTION yield `None`.
    pub fn from_raw(raw: &RawCommand) -> Option<Self> {
        match raw.cmd.trim().to_uppercase().as_str() {
            "GET_STATE" => Some(Self::GetState),
            "PROPOSE" => Some(Self::Propose),
            "PAUSE" => Some(Self::Pause),
            "RESUME" => Some(Self::Resume),
            "SET_INTENTION" => raw
                .value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| Self::SetIntention(v.to_string())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetState => "GET_STATE",
            Self::Propose => "PROPOSE",
            Self::SetIntention(_) => "SET_INTENTION",
            Self::Pause => "PAUSE",
            Self::Resume => "RESUME",
        }
    }
}

/// Drop everything outside the allow-list.
pub fn sanitize_commands(raw: &[RawCommand]) -> Vec<BackendCommand> {
    let commands: Vec<BackendCommand> = raw.iter().filter_map(BackendCommand::from_raw).collect();
    if commands.len() < raw.len() {
        tracing::debug!(
            dropped = raw.len() - commands.len(),
            "dropped backend commands outside the allow-list"
        );
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_and_incomplete_commands_are_dropped() {
        let raw = vec![
            RawCommand::new("get_state"),
            RawCommand::new("RM_RF"),
            RawCommand::new("SET_INTENTION"),
            RawCommand::with_value("SET_INTENTION", "  "),
            RawCommand::with_value("SET_INTENTION", "stabilize"),
            RawCommand::new("RESUME"),
        ];
        assert_eq!(
            sanitize_commands(&raw),
            vec![
                BackendCommand::GetState,
                BackendCommand::SetIntention("stabilize".to_string()),
                BackendCommand::Resume,
            ]
        );
    }

    #[test]
    fn raw_commands_parse_from_json() {
        let raw: Vec<RawCommand> =
            serde_json::from_str(r#"[{"cmd":"PROPOSE"},{"cmd":"SET_INTENTION","value":"recover"}]"#)
                .unwrap();
        assert_eq!(sanitize_commands(&raw).len(), 2);
    }

    #[test]
    fn validated_commands_serialize_tagged() {
        let json = serde_json::to_value(BackendCommand::SetIntention("explore".into())).unwrap();
        assert_eq!(json["cmd"], "SET_INTENTION");
        assert_eq!(json["value"], "explore");
    }
}
