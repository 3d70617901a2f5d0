use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Input JSON from Claude Code hook system.
/// A field with an unexpected JSON type reads as absent instead of
/// rejecting the whole payload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HookInput {
    #[serde(deserialize_with = "string_or_empty")]
    pub hook_event_name: String,
    /// Opaque; recorded verbatim whatever its JSON type
    pub session_id: Option<Value>,
    #[serde(deserialize_with = "string_or_none")]
    pub cwd: Option<String>,
    #[serde(deserialize_with = "string_or_none")]
    pub transcript_path: Option<String>,
    /// Tool name (only present for tool-related events)
    #[serde(deserialize_with = "string_or_none")]
    pub tool_name: Option<String>,
    pub tool_input: Option<Value>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(String::from))
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_none(deserializer)?.unwrap_or_default())
}

/// The hook events this handler reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    Stop,
    PermissionRequest,
    PreToolUse,
    Other,
}

impl HookInput {
    /// Parse a hook payload. Anything but a JSON object is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            bail!("expected a JSON object, got {}", json_type(&value));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn event(&self) -> HookEvent {
        match self.hook_event_name.as_str() {
            "Stop" => HookEvent::Stop,
            "PermissionRequest" => HookEvent::PermissionRequest,
            "PreToolUse" => HookEvent::PreToolUse,
            _ => HookEvent::Other,
        }
    }

    /// Shell command carried in `tool_input.command`, or "" when absent.
    pub fn command(&self) -> &str {
        self.tool_input
            .as_ref()
            .and_then(|input| input.get("command"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
