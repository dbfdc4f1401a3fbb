//! Markup repair for template blocks mangled by WYSIWYG editors.
//!
//! Visual email editors entity-encode `<`, `>`, `&` and quotes everywhere,
//! including inside template delimiters, which turns `{% if total > 100 %}`
//! into `{% if total &gt; 100 %}`. Repair decodes entities only inside
//! statement and output blocks; text outside them is left byte-for-byte
//! intact. Comment blocks are never touched.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// `{% ... %}`, non-greedy, spanning newlines
    static ref STATEMENT_BLOCK: Regex = Regex::new(r"(?s)\{%.*?%\}").unwrap();

    /// `{{ ... }}`, non-greedy, spanning newlines
    static ref OUTPUT_BLOCK: Regex = Regex::new(r"(?s)\{\{.*?\}\}").unwrap();
}

/// Decode HTML entities inside statement and output blocks.
///
/// Statement blocks are repaired first, then output blocks are matched
/// against the result. Unbalanced delimiters may pair up unexpectedly; such
/// input fails later at compile time and the processor falls back to the
/// original content.
pub fn repair_markup(content: &str) -> Cow<'_, str> {
    let statements = decode_blocks(&STATEMENT_BLOCK, content);
    if let Cow::Owned(repaired) = decode_blocks(&OUTPUT_BLOCK, &statements) {
        return Cow::Owned(repaired);
    }
    statements
}

fn decode_blocks<'a>(pattern: &Regex, content: &'a str) -> Cow<'a, str> {
    pattern.replace_all(content, |caps: &Captures<'_>| {
        html_escape::decode_html_entities(&caps[0]).into_owned()
    })
}
