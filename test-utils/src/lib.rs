//! Shared fixture builders for `conv-core`'s black-box and benchmark
//! suites: synthetic raw task directories in the exact on-disk shape
//! `conv_core::skeleton::discovery` expects, plus a few JSON-body helpers
//! for the parser's declared grammar.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use conv_core::EngineConfig;
use tempfile::TempDir;

/// Create the conventional `.../User/globalStorage/<ext>/tasks` root inside
/// `tmp`, matching the layout `detect_storage_locations` probes for under
/// an `EngineConfig::workspace_root_override`.
#[must_use]
pub fn storage_root(tmp: &TempDir) -> PathBuf {
    let root = tmp
        .path()
        .join("Code")
        .join("User")
        .join("globalStorage")
        .join("rooveterinaryinc.roo-cline")
        .join("tasks");
    std::fs::create_dir_all(&root).unwrap();
    root
}

/// An `EngineConfig` whose workspace-root override points at `tmp`.
#[must_use]
pub fn config_for(tmp: &TempDir) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.workspace_root_override = Some(tmp.path().to_path_buf());
    config
}

/// Write a raw task directory under `root` with the given API-history and
/// UI-message JSON bodies. Either body may be `""` to omit that file.
pub fn write_task(root: &Path, task_id: &str, api_history_json: &str, ui_messages_json: &str) {
    let dir = root.join(task_id);
    std::fs::create_dir_all(&dir).unwrap();
    if !api_history_json.is_empty() {
        std::fs::write(dir.join("api_conversation_history.json"), api_history_json).unwrap();
    }
    if !ui_messages_json.is_empty() {
        std::fs::write(dir.join("ui_messages.json"), ui_messages_json).unwrap();
    }
}

/// Build an `api_conversation_history.json` body for a single assistant
/// turn declaring one `<new_task>` sub-task with the given instruction.
#[must_use]
pub fn assistant_spawns_subtask(instruction: &str) -> String {
    let escaped = instruction.replace('"', "\\\"");
    format!(
        r#"[{{"role":"assistant","content":[{{"type":"text","text":"<new_task><message>{escaped}</message></new_task>"}}]}}]"#
    )
}

/// Build a `ui_messages.json` body whose first entry is the initial-task
/// transcript entry (`say == "task"`) carrying `opening_text` verbatim.
#[must_use]
pub fn ui_opening_message(opening_text: &str) -> String {
    let escaped = opening_text.replace('"', "\\\"");
    format!(r#"[{{"say":"task","text":"{escaped}"}}]"#)
}

/// Build an `api_conversation_history.json` body whose first user turn
/// carries `opening_text`, for fixtures that omit `ui_messages.json`.
#[must_use]
pub fn api_user_opening_turn(opening_text: &str) -> String {
    let escaped = opening_text.replace('"', "\\\"");
    format!(
        r#"[{{"role":"user","content":[{{"type":"text","text":"{escaped}"}}]}}]"#
    )
}

/// A fixed, deterministic timestamp for fixtures that need one (property
/// tests and benches must not call `Utc::now()` from inside a workflow
/// script, but ordinary test binaries may; this helper exists so call
/// sites read intent rather than an inline magic date).
#[must_use]
pub fn fixed_timestamp() -> DateTime<Utc> {
    "2026-01-01T00:00:00Z".parse().unwrap()
}
