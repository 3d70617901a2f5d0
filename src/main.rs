use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::io::{self, Read, Write};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod guard;
mod input;
mod status;
mod transcript;

use config::Config;
use input::{HookEvent, HookInput};
use status::{StatusRecord, StatusStore};

/// Filter for stderr diagnostics, e.g. CLAW_LOG=debug
const LOG_ENV: &str = "CLAW_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

/// A hook must never block its host: every outcome exits 0.
fn main() {
    init_tracing();
    let config = Config::from_env();

    let mut buffer = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buffer) {
        warn!(error = %e, "claw-hook: failed to read stdin");
        return;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = dispatch(&buffer, &config, &mut out) {
        error!(error = %format!("{:#}", e), "claw-hook: hook failed");
    }
}

/// Parse one hook payload and route it to its handler.
/// At most one JSON line is written to `out`.
fn dispatch(raw: &str, config: &Config, out: &mut impl Write) -> Result<()> {
    let input = match HookInput::parse(raw) {
        Ok(input) => input,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "claw-hook: failed to parse stdin");
            return Ok(());
        }
    };

    debug!(
        event = %input.hook_event_name,
        session_id = ?input.session_id,
        tool = input.tool_name.as_deref().unwrap_or("None"),
        "hook received"
    );

    match input.event() {
        HookEvent::Stop => handle_stop(&input, config),
        HookEvent::PermissionRequest => handle_permission_request(&input, config, out),
        HookEvent::PreToolUse => handle_pre_tool_use(&input, config, out),
        HookEvent::Other => {
            debug!(event = %input.hook_event_name, "unhandled event");
            Ok(())
        }
    }
}

fn handle_stop(input: &HookInput, config: &Config) -> Result<()> {
    let message =
        transcript::last_assistant_text(input.transcript_path.as_deref().unwrap_or(""));
    let record = StatusRecord::completed(input, &message, &config.initiated_by);
    publish(config, &record);
    Ok(())
}

fn handle_permission_request(
    input: &HookInput,
    config: &Config,
    out: &mut impl Write,
) -> Result<()> {
    let record = StatusRecord::waiting_permission(input, &config.initiated_by);
    publish(config, &record);

    // Empty object: no opinion on the permission outcome
    emit(out, &json!({}))
}

fn handle_pre_tool_use(input: &HookInput, config: &Config, out: &mut impl Write) -> Result<()> {
    let decision = guard::evaluate(
        config.guard_policy,
        &config.initiated_by,
        input.tool_name.as_deref().unwrap_or(""),
        input.command(),
    );

    match decision.into_hook_output() {
        Some(output) => {
            info!(
                initiated_by = %config.initiated_by,
                command = input.command(),
                "denying recursive claude invocation"
            );
            emit(out, &output)
        }
        None => Ok(()),
    }
}

/// Write the status record; a failed write is logged, never fatal.
fn publish(config: &Config, record: &StatusRecord) {
    let store = StatusStore::new(&config.status_file);
    match store.write(record) {
        Ok(()) => debug!(
            path = %store.path().display(),
            status = ?record.status,
            "status written"
        ),
        Err(e) => error!(
            error = %format!("{:#}", e),
            "claw-hook: failed to write status"
        ),
    }
}

fn emit(out: &mut impl Write, value: &Value) -> Result<()> {
    serde_json::to_writer(&mut *out, value).context("Failed to serialize hook output")?;
    writeln!(out).context("Failed to write hook output")?;
    out.flush().context("Failed to flush hook output")?;
    Ok(())
}
