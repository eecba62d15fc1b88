//! Hand-rolled stream parser for the custom XML-like tool-invocation grammar
//! (§4.B). Not XML-conformant — no escaping, no attributes beyond an
//! ignored `TAIL`, and a tolerant "last-closing-tag-wins" rule for a
//! handful of tools (R2).

use super::grammar::{is_recognized_param, is_valid_tool_name, uses_last_close_wins};

/// One item inside a tool-use block's body (`BODY := (TEXT | PARAM)*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyItem {
    Text(String),
    Param { name: String, value: String },
}

/// A parsed `tool_use` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolUseBlock {
    pub name: String,
    pub items: Vec<BodyItem>,
    /// Always `false` for blocks this parser emits (R4): an incomplete
    /// block at end-of-input is dropped rather than returned partial.
    pub partial: bool,
}

impl ToolUseBlock {
    /// The first parameter value matching any of `names`, in order.
    #[must_use]
    pub fn param(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| {
            self.items.iter().find_map(|item| match item {
                BodyItem::Param { name: n, value } if n == name => Some(value.as_str()),
                _ => None,
            })
        })
    }
}

/// A top-level message block (`MESSAGE := (TEXT | TOOL_USE)*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text(String),
    ToolUse(ToolUseBlock),
}

/// Parse an assistant message into its sequence of text/tool-use blocks.
#[must_use]
pub fn parse_message(input: &str) -> Vec<Block> {
    let chars: Vec<char> = input.chars().collect();
    let mut blocks = Vec::new();
    let mut text_buf = String::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        if chars[pos] != '<' {
            text_buf.push(chars[pos]);
            pos += 1;
            continue;
        }

        let next = chars.get(pos + 1).copied();
        if matches!(next, None | Some('/') | Some('!') | Some('?')) {
            // R1: not a true tool open — literal text.
            text_buf.push('<');
            pos += 1;
            continue;
        }

        match try_parse_tool_use(&chars, pos) {
            Some((tool, new_pos)) => {
                if !text_buf.is_empty() {
                    blocks.push(Block::Text(std::mem::take(&mut text_buf)));
                }
                blocks.push(Block::ToolUse(tool));
                pos = new_pos;
            }
            None => {
                // Either not a recognized tool name, or no matching close
                // was found before end-of-input (R4: incomplete -> dropped,
                // nothing emitted for this span; but a non-tool-name `<`
                // is ordinary literal text).
                text_buf.push('<');
                pos += 1;
            }
        }
    }

    if !text_buf.is_empty() {
        blocks.push(Block::Text(text_buf));
    }

    blocks
}

/// Attempt to parse a `TOOL_USE` starting at `chars[start]` (`chars[start]
/// == '<'`). Returns the parsed block and the position just past its
/// closing tag, or `None` if this isn't a valid/complete tool-use.
fn try_parse_tool_use(chars: &[char], start: usize) -> Option<(ToolUseBlock, usize)> {
    let mut pos = start + 1;
    let name_start = pos;
    while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
        pos += 1;
    }
    let name: String = chars[name_start..pos].iter().collect();
    if !is_valid_tool_name(&name) {
        return None;
    }

    // TAIL: anything up to the next '>' is consumed and ignored.
    while pos < chars.len() && chars[pos] != '>' {
        pos += 1;
    }
    if pos >= chars.len() {
        return None; // no '>' before EOF: incomplete open tag.
    }
    pos += 1; // past '>'
    let body_start = pos;

    let close_literal: Vec<char> = format!("</{name}>").chars().collect();
    let occurrences = find_all(chars, &close_literal, body_start);
    if occurrences.is_empty() {
        return None; // R4: no matching close, drop.
    }
    let close_idx = if uses_last_close_wins(&name) {
        *occurrences.last()?
    } else {
        occurrences[0]
    };

    let body: String = chars[body_start..close_idx].iter().collect();
    let items = parse_body(&body);
    let end = close_idx + close_literal.len();

    Some((
        ToolUseBlock {
            name,
            items,
            partial: false,
        },
        end,
    ))
}

/// Find every starting index at which `needle` occurs in `haystack` at or
/// after `from`.
fn find_all(haystack: &[char], needle: &[char], from: usize) -> Vec<usize> {
    let mut out = Vec::new();
    if needle.is_empty() || haystack.len() < needle.len() {
        return out;
    }
    let last_start = haystack.len() - needle.len();
    let mut i = from;
    while i <= last_start {
        if haystack[i..i + needle.len()] == *needle {
            out.push(i);
        }
        i += 1;
    }
    out
}

/// Parse a tool-use body into its `PARAM`/`TEXT` items.
fn parse_body(body: &str) -> Vec<BodyItem> {
    let chars: Vec<char> = body.chars().collect();
    let mut items = Vec::new();
    let mut text_buf = String::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        if chars[pos] != '<' {
            text_buf.push(chars[pos]);
            pos += 1;
            continue;
        }
        let next = chars.get(pos + 1).copied();
        if matches!(next, None | Some('/') | Some('!') | Some('?')) {
            text_buf.push('<');
            pos += 1;
            continue;
        }

        match try_parse_param(&chars, pos) {
            Some((name, value, new_pos)) => {
                if !text_buf.is_empty() {
                    items.push(BodyItem::Text(std::mem::take(&mut text_buf)));
                }
                items.push(BodyItem::Param { name, value });
                pos = new_pos;
            }
            None => {
                text_buf.push('<');
                pos += 1;
            }
        }
    }
    if !text_buf.is_empty() {
        items.push(BodyItem::Text(text_buf));
    }
    items
}

fn try_parse_param(chars: &[char], start: usize) -> Option<(String, String, usize)> {
    let mut pos = start + 1;
    let name_start = pos;
    while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
        pos += 1;
    }
    let name: String = chars[name_start..pos].iter().collect();
    if !is_recognized_param(&name) {
        return None;
    }
    if chars.get(pos) != Some(&'>') {
        return None; // PNAME must be followed directly by '>' (no TAIL for params).
    }
    pos += 1;
    let value_start = pos;

    let close_literal: Vec<char> = format!("</{name}>").chars().collect();
    let occurrences = find_all(chars, &close_literal, value_start);
    let close_idx = *occurrences.first()?;

    let raw_value: String = chars[value_start..close_idx].iter().collect();
    // R3: `content` preserves verbatim interior; all other params are trimmed.
    let value = if name == "content" {
        raw_value
    } else {
        raw_value.trim().to_string()
    };
    let end = close_idx + close_literal.len();
    Some((name, value, end))
}
