//! Closed vocabularies for the assistant-message grammar (§4.B).

/// The closed recognized parameter-name set (glossary: "Recognized
/// parameter names").
pub const RECOGNIZED_PARAMS: &[&str] = &[
    "path",
    "line_range",
    "paths",
    "file",
    "content",
    "line_count",
    "diff",
    "line",
    "regex",
    "file_pattern",
    "query",
    "search",
    "replace",
    "use_regex",
    "ignore_case",
    "start_line",
    "end_line",
    "command",
    "cwd",
    "server_name",
    "tool_name",
    "arguments",
    "uri",
    "question",
    "follow_up",
    "suggest",
    "result",
    "mode_slug",
    "mode",
    "reason",
    "message",
    "todos",
    "args",
    "task",
    "recursive",
    "index",
    "timeout",
    "preview",
];

/// Reserved bare tool names admitted in addition to underscore-bearing
/// identifiers (§4.B `NAME` production).
pub const RESERVED_BARE_NAMES: &[&str] = &["args", "file", "path", "task"];

/// The conventional "spawn sub-task" tool name (§4.B R5, §4.D step 2).
pub const SPAWN_SUBTASK_TOOL: &str = "new_task";

/// Primary-instruction parameter names tried in order for a spawn-subtask
/// declaration (§9 open question: the source leaves the exact key
/// ambiguous; this crate pins `message` first, falling back to `task`).
pub const PRIMARY_INSTRUCTION_PARAMS: &[&str] = &["message", "task"];

/// Tools for which rule R2 ("if the closing tag appears more than once,
/// the last occurrence wins") applies. Not enumerated in the spec beyond
/// the `write`-class example (S6); this crate pins the closed set to the
/// conventional file-mutating tools, where embedded markers resembling the
/// tool's own closing tag are most likely to appear in captured output.
pub const LAST_CLOSE_WINS_TOOLS: &[&str] =
    &["write_to_file", "apply_diff", "insert_content", "search_and_replace"];

#[must_use]
pub fn is_recognized_param(name: &str) -> bool {
    RECOGNIZED_PARAMS.contains(&name)
}

/// `NAME := identifier containing '_' (or the reserved bare names: args,
/// file, path, task)`.
#[must_use]
pub fn is_valid_tool_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if RESERVED_BARE_NAMES.contains(&name) {
        return true;
    }
    name.contains('_') && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[must_use]
pub fn uses_last_close_wins(name: &str) -> bool {
    LAST_CLOSE_WINS_TOOLS.contains(&name)
}
