//! Pattern input parsing.
//!
//! Two surface syntaxes produce the same [`PatternTemplate`]: a
//! graph-shaped pattern DSL ([`dsl`]) and a compact note-list syntax
//! ([`notelist`]). Both parse the grammar with winnow into raw string
//! shapes first, then assemble and validate semantics in a second pass
//! so spelling mistakes report as validation errors with the offending
//! text, not as generic parse failures.

mod dsl;
mod notelist;

pub use dsl::{parse_dsl, DslQuery};
pub use notelist::parse_note_list;

use crate::error::Error;

/// Map a winnow parse failure to a positioned error carrying the text
/// it choked on.
fn syntax_error(input: &str, offset: usize) -> Error {
    let rest = &input[offset.min(input.len())..];
    let token = if rest.is_empty() {
        "<end of input>".to_string()
    } else {
        rest.chars().take(12).collect()
    };
    Error::Parse {
        token,
        position: offset,
    }
}
