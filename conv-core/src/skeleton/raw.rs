//! Reading the raw, external, read-only task directory (§3) and
//! extracting what `ANALYZE` needs from it (§4.A).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::parser::extract_child_declarations;
use crate::types::{normalize_prefix, Counts, SourceChecksums};

use super::io::read_bom_tolerant;

const TASK_METADATA: &str = "task_metadata.json";
const API_CONVERSATION_HISTORY: &str = "api_conversation_history.json";
const UI_MESSAGES: &str = "ui_messages.json";

/// The three raw files, in the order §3 defines for validity and
/// reference-timestamp resolution.
const RAW_FILES_IN_ORDER: &[&str] = &[TASK_METADATA, API_CONVERSATION_HISTORY, UI_MESSAGES];

#[derive(Debug, Deserialize)]
struct RawApiTurn {
    role: String,
    #[serde(default)]
    content: Vec<RawContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawContentBlock {
    Text { text: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct RawUiMessage {
    #[serde(default)]
    say: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Everything `ANALYZE` derives from a raw task directory in one pass.
#[derive(Debug, Clone)]
pub struct RawAnalysis {
    pub reference_timestamp: DateTime<Utc>,
    pub counts: Counts,
    pub child_task_instruction_prefixes: Vec<String>,
    pub opening_text: Option<String>,
    pub source_checksums: SourceChecksums,
}

/// A directory is valid if at least one of the three raw files exists (§3).
#[must_use]
pub fn is_valid_task_dir(dir: &Path) -> bool {
    RAW_FILES_IN_ORDER.iter().any(|name| dir.join(name).is_file())
}

/// The modification time of the first raw file found, in the order §3
/// specifies (`task_metadata.json`, then `api_conversation_history.json`,
/// then `ui_messages.json`).
pub fn reference_timestamp(dir: &Path) -> Result<DateTime<Utc>> {
    for name in RAW_FILES_IN_ORDER {
        let path = dir.join(name);
        if let Ok(metadata) = std::fs::metadata(&path) {
            let modified = metadata.modified().unwrap_or(SystemTime::now());
            return Ok(DateTime::<Utc>::from(modified));
        }
    }
    Err(Error::ResourceMissing {
        task_id: None,
        context: format!("no raw files present under {}", dir.display()),
    })
}

/// `ANALYZE` (§4.A): read the raw files, invoke the parser on every
/// assistant message, accumulate counts/timestamps, and derive the
/// child-task declarations and opening text.
pub fn analyze_raw_task_dir(dir: &Path) -> Result<RawAnalysis> {
    if !is_valid_task_dir(dir) {
        return Err(Error::ResourceMissing {
            task_id: None,
            context: format!("raw task directory invalid: {}", dir.display()),
        });
    }

    let reference_timestamp = reference_timestamp(dir)?;
    let mut counts = Counts::default();
    let mut prefixes = Vec::new();
    let mut source_checksums = SourceChecksums::default();

    if let Some((bytes, hash)) = read_checksummed(dir, TASK_METADATA) {
        counts.total_bytes += bytes.len() as u64;
        source_checksums.task_metadata = Some(hash);
    }

    let mut api_turns: Vec<RawApiTurn> = Vec::new();
    if let Some((bytes, hash)) = read_checksummed(dir, API_CONVERSATION_HISTORY) {
        counts.total_bytes += bytes.len() as u64;
        source_checksums.api_conversation_history = Some(hash);
        api_turns = parse_json_or_mark_corrupt(&bytes, API_CONVERSATION_HISTORY)?;
    }

    let mut ui_messages: Vec<RawUiMessage> = Vec::new();
    if let Some((bytes, hash)) = read_checksummed(dir, UI_MESSAGES) {
        counts.total_bytes += bytes.len() as u64;
        source_checksums.ui_messages = Some(hash);
        ui_messages = parse_json_or_mark_corrupt(&bytes, UI_MESSAGES)?;
    }

    counts.messages = (api_turns.len() + ui_messages.len()) as u64;

    for turn in &api_turns {
        if turn.role != "assistant" {
            continue;
        }
        for block in &turn.content {
            if let RawContentBlock::Text { text } = block {
                counts.actions += count_tool_uses(text);
                for prefix in extract_child_declarations(text) {
                    if !prefixes.contains(&prefix) {
                        prefixes.push(prefix);
                    }
                }
            }
        }
    }

    let opening_text = derive_opening_text(&ui_messages, &api_turns);

    Ok(RawAnalysis {
        reference_timestamp,
        counts,
        child_task_instruction_prefixes: prefixes,
        opening_text,
        source_checksums,
    })
}

/// Open Question decision #1 (SPEC_FULL.md §14): opening text is the first
/// non-empty user-originating message. Prefer the UI transcript's
/// initial-task entry (`say == "task"`); fall back to the first user-role
/// turn in the API history when `ui_messages.json` is absent or lacks that
/// entry.
fn derive_opening_text(ui_messages: &[RawUiMessage], api_turns: &[RawApiTurn]) -> Option<String> {
    ui_messages
        .iter()
        .find(|m| m.say.as_deref() == Some("task"))
        .and_then(|m| m.text.clone())
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            api_turns.iter().find(|t| t.role == "user").and_then(|t| {
                t.content.iter().find_map(|b| match b {
                    RawContentBlock::Text { text } if !text.trim().is_empty() => {
                        Some(text.clone())
                    }
                    _ => None,
                })
            })
        })
        .map(|text| normalize_prefix(&text))
}

/// Cheaper entry point for Phase 2 (§4.D step 2): read just enough of the
/// raw directory to recompute a child candidate's opening text, without the
/// full counts/prefix-extraction pass `analyze_raw_task_dir` performs.
pub fn opening_text_for_dir(dir: &Path) -> Result<Option<String>> {
    let ui_messages: Vec<RawUiMessage> = read_bom_tolerant(&dir.join(UI_MESSAGES))
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default();
    let api_turns: Vec<RawApiTurn> = read_bom_tolerant(&dir.join(API_CONVERSATION_HISTORY))
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default();
    Ok(derive_opening_text(&ui_messages, &api_turns))
}

fn read_checksummed(dir: &Path, name: &str) -> Option<(Vec<u8>, String)> {
    let path = dir.join(name);
    let bytes = read_bom_tolerant(&path).ok()?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    let hash = format!("{:016x}", hasher.finish());
    Some((bytes, hash))
}

fn parse_json_or_mark_corrupt<T: for<'de> Deserialize<'de>>(
    bytes: &[u8],
    file_name: &str,
) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::ParseFailed {
        task_id: None,
        context: format!("{file_name}: {e}"),
    })
}

fn count_tool_uses(text: &str) -> u64 {
    use crate::parser::Block;
    crate::parser::parse_message(text)
        .into_iter()
        .filter(|b| matches!(b, Block::ToolUse(_)))
        .count() as u64
}
