// Text normalization shared by the extractors

use serde_json::Value;

/// Number of leading characters (after lower-casing) searched for the word
/// "negative" when deciding whether a prompt is a negative prompt.
pub const NEGATIVE_WINDOW: usize = 50;

/// Decode UTF-8, dropping invalid byte sequences instead of replacing them.
pub fn decode_utf8_ignoring_errors(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                // valid_up_to guarantees this prefix is well formed
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => rest = &after[len..],
                    // truncated sequence at the end of input
                    None => return out,
                }
            }
        }
    }
}

/// String form of a JSON value: strings verbatim, everything else as JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Join list elements with newlines, each element stringified.
pub fn join_lines(items: &[Value]) -> String {
    items.iter().map(stringify).collect::<Vec<_>>().join("\n")
}

/// True when "negative" occurs in the first [`NEGATIVE_WINDOW`] characters
/// of the lower-cased text.
pub fn mentions_negative_early(text: &str) -> bool {
    let window: String = text.to_lowercase().chars().take(NEGATIVE_WINDOW).collect();
    window.contains("negative")
}

/// Line breaks recognised by [`split_lines`]: LF, CR, VT, FF, the ASCII
/// file/group/record separators, NEL and the Unicode line/paragraph
/// separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split on every line break, treating `\r\n` as one. Unlike
/// [`str::lines`], a lone `\r` or U+2028 also ends a line. A trailing break
/// does not produce an empty last line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && matches!(chars.peek(), Some((_, '\n'))) {
            chars.next();
            start += 1;
        }
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Remove one pair of matching outer quotes (`"..."` or `'...'`).
/// A lone quote character strips to the empty string.
pub fn strip_matching_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.starts_with(quote) && text.ends_with(quote) {
            return if text.len() == 1 {
                ""
            } else {
                &text[1..text.len() - 1]
            };
        }
    }
    text
}
