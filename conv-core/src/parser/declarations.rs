//! Child-task declaration extraction (§4.B R5).

use super::grammar::{PRIMARY_INSTRUCTION_PARAMS, SPAWN_SUBTASK_TOOL};
use super::tokenizer::{parse_message, Block};
use crate::types::normalize_prefix;

/// Parse an assistant message and return the normalized opening-prefix of
/// every child task it declares (every `new_task`-equivalent `tool_use`
/// block, keyed by its primary-instruction parameter).
#[must_use]
pub fn extract_child_declarations(message: &str) -> Vec<String> {
    parse_message(message)
        .into_iter()
        .filter_map(|block| match block {
            Block::ToolUse(tool) if tool.name == SPAWN_SUBTASK_TOOL => tool
                .param(PRIMARY_INSTRUCTION_PARAMS)
                .map(normalize_prefix),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_message_param_from_new_task() {
        let input = "<new_task><mode>code</mode><message>Write a calculator program for the following requirements: add, subtract.</message></new_task>";
        let declarations = extract_child_declarations(input);
        assert_eq!(declarations.len(), 1);
        assert!(declarations[0].starts_with("write a calculator program"));
    }

    #[test]
    fn falls_back_to_task_param_when_message_absent() {
        let input = "<new_task><task>do the other thing</task></new_task>";
        let declarations = extract_child_declarations(input);
        assert_eq!(declarations, vec!["do the other thing".to_string()]);
    }

    #[test]
    fn ignores_unrelated_tool_use() {
        let input = "<read_file><path>a.rs</path></read_file>";
        assert!(extract_child_declarations(input).is_empty());
    }
}
