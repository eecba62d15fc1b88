//! HTML-entity-decoding entry point (§4.B "HTML-entity variant").

use super::tokenizer::{parse_message, Block};

/// Decode the handful of HTML entities that show up in entity-encoded raw
/// assistant messages, then parse normally.
///
/// All blocks returned by this entry point carry `partial = false`, same as
/// the primary entry point — this parser never emits partial blocks, so the
/// spec's "forces all output blocks to partial = false" is a no-op
/// guarantee here rather than a behavioral change.
#[must_use]
pub fn parse_message_entity_decoded(input: &str) -> Vec<Block> {
    parse_message(&decode_entities(input))
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        let mut entity = String::new();
        let mut consumed = Vec::new();
        while let Some(&next) = chars.peek() {
            if next == ';' || entity.len() > 10 {
                break;
            }
            entity.push(next);
            consumed.push(next);
            chars.next();
        }
        if chars.peek() == Some(&';') {
            chars.next();
            if let Some(decoded) = decode_one(&entity) {
                out.push_str(&decoded);
                continue;
            }
            // Unknown entity: emit verbatim including the terminating ';'.
            out.push('&');
            out.push_str(&entity);
            out.push(';');
        } else {
            // No terminating ';' found within the lookahead window: not an
            // entity, push back everything literally.
            out.push('&');
            out.push_str(&entity);
        }
    }
    out
}

fn decode_one(entity: &str) -> Option<String> {
    Some(match entity {
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "amp" => "&".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        "nbsp" => "\u{a0}".to_string(),
        _ if entity.starts_with("#x") || entity.starts_with("#X") => {
            let code = u32::from_str_radix(&entity[2..], 16).ok()?;
            char::from_u32(code)?.to_string()
        }
        _ if entity.starts_with('#') => {
            let code: u32 = entity[1..].parse().ok()?;
            char::from_u32(code)?.to_string()
        }
        _ => return None,
    })
}
