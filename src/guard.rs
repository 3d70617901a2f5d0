use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

use crate::config::HUMAN;

/// The only tool whose input is a shell command
const SHELL_TOOL: &str = "Bash";

/// Assignment that marks a deliberate, orchestrated sub-invocation
const ORCHESTRATION_MARKER: &str = "CLAW_INITIATED_BY=";

/// A bare `claude` token: at the start or after a shell separator,
/// optionally behind `./` or a path ending in `/`, never inside a longer word.
const INVOKE_PATTERN: &str = r"(?:^|[\s;|&`(])\.?(?:\S*/)?\bclaude\b";

/// Which rule applies once a bot-initiated session runs `claude`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuardPolicy {
    /// Deny unless the command sets CLAW_INITIATED_BY explicitly
    #[default]
    MarkerExempt,
    /// Deny every detected invocation
    Strict,
}

impl GuardPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "marker" | "marker-exempt" => Some(GuardPolicy::MarkerExempt),
            "strict" => Some(GuardPolicy::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    /// PreToolUse payload for a deny; `None` means stay silent.
    pub fn into_hook_output(self) -> Option<Value> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(json!({
                "hookSpecificOutput": {
                    "hookEventName": "PreToolUse",
                    "permissionDecision": "deny",
                    "permissionDecisionReason": reason,
                }
            })),
        }
    }
}

#[allow(clippy::expect_used)]
fn invoke_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(INVOKE_PATTERN).expect("INVOKE_PATTERN is a valid regex"))
}

/// Does this shell command run the `claude` binary?
pub fn invokes_assistant(command: &str) -> bool {
    invoke_re().is_match(command)
}

/// Decide whether a tool call would start a recursive claude session.
pub fn evaluate(
    policy: GuardPolicy,
    initiated_by: &str,
    tool_name: &str,
    command: &str,
) -> Decision {
    if initiated_by == HUMAN || tool_name != SHELL_TOOL || !invokes_assistant(command) {
        return Decision::Allow;
    }

    match policy {
        GuardPolicy::MarkerExempt if command.contains(ORCHESTRATION_MARKER) => Decision::Allow,
        GuardPolicy::MarkerExempt => Decision::Deny(format!(
            "Accidental recursive claude invocation blocked: session was initiated by '{}' \
             and the command does not set CLAW_INITIATED_BY. To make an intentional \
             sub-invocation, include CLAW_INITIATED_BY=<caller> in the command.",
            initiated_by
        )),
        GuardPolicy::Strict => Decision::Deny(format!(
            "Recursive claude invocation blocked: session was initiated by '{}'. \
             Invoking claude from within a bot-initiated session would create an infinite loop.",
            initiated_by
        )),
    }
}
