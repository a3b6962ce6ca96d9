//! Positive prompt from the `parameters` metadata field.
//!
//! The field comes in two shapes: a JSON object with a labeled prompt key, or
//! the plain-text layout written by web UIs:
//!
//! ```text
//! Positive prompt: a cat
//! sitting on a mat
//! Negative prompt: blurry
//! Steps: 20, Sampler: Euler a, CFG scale: 7, Seed: 1234, Size: 512x512
//! ```
//!
//! JSON is tried first; anything that does not produce a match falls through
//! to a line scan.

use crate::metadata::{ImageMetadata, MetadataValue};
use crate::text::{join_lines, split_lines, stringify};
use serde_json::Value;
use tracing::debug;

/// Metadata key holding the parameters block.
pub const PARAMETERS_KEY: &str = "parameters";

/// Keys tried in a JSON parameters object. First present key wins.
pub const STRUCTURED_PROMPT_KEYS: [&str; 6] = [
    "Positive prompt",
    "positive prompt",
    "Positive Prompt",
    "positive_prompt",
    "prompt",
    "Prompt",
];

/// Line prefix (trimmed, lower-cased) that opens the prompt block.
const PROMPT_LABEL: &str = "positive prompt:";

/// Labels of the parameter lines that close the prompt block.
const BOUNDARY_LABELS: [&str; 8] = [
    "negative prompt",
    "steps",
    "sampler",
    "cfg scale",
    "seed",
    "size",
    "model",
    "clip skip",
];

/// Outcome of the JSON stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredParse {
    /// A labeled key was present. `None` when its value was JSON `null`.
    Match(Option<String>),
    /// Not JSON, not an object, or no labeled key: scan lines instead.
    FallThrough,
}

/// Extract the positive prompt from `metadata["parameters"]`.
pub fn extract_from_parameters(metadata: &ImageMetadata) -> Option<String> {
    let raw = metadata.get(PARAMETERS_KEY)?;
    let text = normalize(raw);

    match parse_structured(&text) {
        StructuredParse::Match(found) => {
            debug!("Parameters block matched as JSON");
            found
        }
        StructuredParse::FallThrough => scan_lines(&text),
    }
}

/// Text form of the parameters value. Structured values are serialized back
/// to JSON so the structured stage can see them.
pub fn normalize(value: &MetadataValue) -> String {
    match value {
        MetadataValue::Structured(v @ (Value::Array(_) | Value::Object(_))) => v.to_string(),
        other => other.to_text(),
    }
}

/// JSON stage: try [`STRUCTURED_PROMPT_KEYS`] in order.
pub fn parse_structured(text: &str) -> StructuredParse {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) else {
        return StructuredParse::FallThrough;
    };

    for key in STRUCTURED_PROMPT_KEYS {
        if let Some(value) = map.get(key) {
            let found = match value {
                Value::Null => None,
                Value::Array(items) => Some(join_lines(items)),
                other => Some(stringify(other)),
            };
            return StructuredParse::Match(found);
        }
    }

    StructuredParse::FallThrough
}

/// Line-scan stage. Only the first `Positive prompt:` line is used; the
/// block runs until the first parameter label line, which is excluded.
pub fn scan_lines(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let start = lines
        .iter()
        .position(|line| line.trim().to_lowercase().starts_with(PROMPT_LABEL))?;

    let first = lines[start]
        .split_once(':')
        .map(|(_, rest)| rest.trim())
        .unwrap_or("");

    let mut block: Vec<&str> = Vec::new();
    if !first.is_empty() {
        block.push(first);
    }

    for line in &lines[start + 1..] {
        if is_boundary(line) {
            break;
        }
        block.push(line.trim_end());
    }

    let joined = block.join("\n");
    let body: Vec<&str> = split_lines(joined.trim_end())
        .into_iter()
        .skip_while(|line| line.trim().is_empty())
        .collect();

    if body.is_empty() {
        None
    } else {
        Some(body.join("\n"))
    }
}

fn is_boundary(line: &str) -> bool {
    let lowered = line.trim().to_lowercase();
    lowered.contains(':') && BOUNDARY_LABELS.iter().any(|label| lowered.contains(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: impl Into<MetadataValue>) -> ImageMetadata {
        vec![(PARAMETERS_KEY, value.into())].into_iter().collect()
    }

    #[test]
    fn test_line_scan_stops_at_parameter_line() {
        let text = "Positive prompt: a cat\nsitting\nSteps: 20";
        assert_eq!(scan_lines(text), Some("a cat\nsitting".to_string()));
    }

    #[test]
    fn test_line_scan_splits_on_carriage_returns_and_unicode_breaks() {
        let text = "Positive prompt: a cat\rsitting\u{2028}on a mat\nSteps: 20";
        assert_eq!(scan_lines(text), Some("a cat\nsitting\non a mat".to_string()));

        let text = "Positive prompt:\n\r\r  \rlate start\nSeed: 1";
        assert_eq!(scan_lines(text), Some("late start".to_string()));
    }

    #[test]
    fn test_line_scan_stops_at_negative_prompt() {
        let text = "Positive prompt: castle\n  on a hill  \nNegative prompt: fog\nSteps: 30, Seed: 5";
        assert_eq!(scan_lines(text), Some("castle\n  on a hill".to_string()));
    }

    #[test]
    fn test_line_scan_trims_leading_blank_lines() {
        let text = "Positive prompt:\n\n   \nforest path\nCFG scale: 7";
        assert_eq!(scan_lines(text), Some("forest path".to_string()));
    }

    #[test]
    fn test_line_scan_without_label_or_body() {
        assert_eq!(scan_lines("a cat\nNegative prompt: dog\nSteps: 20"), None);
        assert_eq!(scan_lines("Positive prompt:   \nSteps: 20"), None);
    }

    #[test]
    fn test_line_scan_uses_first_block_only() {
        let text = "Positive prompt: one\nSeed: 1\nPositive prompt: two";
        assert_eq!(scan_lines(text), Some("one".to_string()));
    }

    #[test]
    fn test_line_scan_keeps_colons_without_labels() {
        let text = "positive prompt: ratio 2:3 portrait\nstyle: oil\nSampler: Euler";
        assert_eq!(scan_lines(text), Some("ratio 2:3 portrait\nstyle: oil".to_string()));
    }

    #[test]
    fn test_structured_prefers_positive_prompt_over_prompt() {
        let doc = json!({"prompt": "generic", "Positive prompt": "specific"}).to_string();
        assert_eq!(
            parse_structured(&doc),
            StructuredParse::Match(Some("specific".to_string()))
        );
    }

    #[test]
    fn test_structured_value_shapes() {
        assert_eq!(
            parse_structured(r#"{"prompt": ["a", "b"]}"#),
            StructuredParse::Match(Some("a\nb".to_string()))
        );
        assert_eq!(
            parse_structured(r#"{"Prompt": 7}"#),
            StructuredParse::Match(Some("7".to_string()))
        );
        assert_eq!(parse_structured(r#"{"prompt": null}"#), StructuredParse::Match(None));
        assert_eq!(parse_structured(r#"{"seed": 1}"#), StructuredParse::FallThrough);
        assert_eq!(parse_structured(r#"["prompt"]"#), StructuredParse::FallThrough);
        assert_eq!(parse_structured("Positive prompt: x"), StructuredParse::FallThrough);
    }

    #[test]
    fn test_structured_without_match_falls_back_to_lines() {
        // valid JSON string literal containing the text layout
        let doc = json!("Positive prompt: from the scan\nSteps: 4").to_string();
        assert_eq!(
            extract_from_parameters(&params(doc.as_str())),
            None,
            "a JSON string is not an object and its quotes hide the label"
        );

        let metadata = params("Positive prompt: plain text\nSeed: 3");
        assert_eq!(extract_from_parameters(&metadata), Some("plain text".to_string()));
    }

    #[test]
    fn test_structured_metadata_value_is_reserialized() {
        let metadata = params(json!({"positive_prompt": "from a map"}));
        assert_eq!(extract_from_parameters(&metadata), Some("from a map".to_string()));
    }

    #[test]
    fn test_bytes_with_invalid_sequences_decode() {
        let mut raw = b"Positive prompt: neon \xff city".to_vec();
        raw.extend_from_slice(b"\nSteps: 20");
        let metadata = params(raw);
        assert_eq!(extract_from_parameters(&metadata), Some("neon  city".to_string()));
    }

    #[test]
    fn test_missing_key_is_none() {
        assert_eq!(extract_from_parameters(&ImageMetadata::empty()), None);
    }
}
