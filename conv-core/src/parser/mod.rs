//! Assistant-Message Parser (§4.B): tokenizes assistant messages into
//! text/tool-use blocks and extracts child-task declarations from them.

pub mod declarations;
pub mod entities;
pub mod grammar;
pub mod tokenizer;

pub use declarations::extract_child_declarations;
pub use entities::parse_message_entity_decoded;
pub use tokenizer::{parse_message, Block, BodyItem, ToolUseBlock};
