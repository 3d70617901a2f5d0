use std::path::PathBuf;

use tracing::warn;

use crate::guard::GuardPolicy;

const STATUS_FILE_VAR: &str = "CLAW_STATUS_FILE";
const INITIATED_BY_VAR: &str = "CLAW_INITIATED_BY";
const GUARD_POLICY_VAR: &str = "CLAW_GUARD_POLICY";

/// Identity recorded when no automated caller started the session
pub const HUMAN: &str = "human";

/// Settings resolved once at startup and handed to each handler
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the status record is published
    pub status_file: PathBuf,
    /// Who started this Claude session ("human" or a bot name)
    pub initiated_by: String,
    /// Which recursion guard rule applies to bot-initiated sessions
    pub guard_policy: GuardPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup.
    /// An empty identity stays empty (and therefore not human); other
    /// empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let status_file = get(STATUS_FILE_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_status_file(get("HOME")));

        let initiated_by = lookup(INITIATED_BY_VAR).unwrap_or_else(|| HUMAN.to_string());

        let guard_policy = match get(GUARD_POLICY_VAR) {
            None => GuardPolicy::default(),
            Some(raw) => GuardPolicy::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "unknown {}, using marker policy", GUARD_POLICY_VAR);
                GuardPolicy::default()
            }),
        };

        Config {
            status_file,
            initiated_by,
            guard_policy,
        }
    }
}

/// ~/.claw-hook/status.json, falling back to the working directory without HOME
fn default_status_file(home: Option<String>) -> PathBuf {
    let home = home.unwrap_or_else(|| ".".to_string());
    PathBuf::from(home).join(".claw-hook").join("status.json")
}
