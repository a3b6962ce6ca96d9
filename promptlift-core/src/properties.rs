// Last-resort lookup of a positive prompt stored directly as a PNG text key

use crate::metadata::ImageMetadata;
use crate::text::strip_matching_quotes;
use tracing::debug;

/// Flat keys tried in order. First key with a non-blank value wins.
pub const PROPERTY_PROMPT_KEYS: [&str; 4] = [
    "Positive prompt",
    "positive prompt",
    "Positive Prompt",
    "positive_prompt",
];

pub fn extract_from_png_properties(metadata: &ImageMetadata) -> Option<String> {
    for key in PROPERTY_PROMPT_KEYS {
        let Some(value) = metadata.get(key) else {
            continue;
        };

        let text = value.to_text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("PNG property '{}' is blank, trying next key", key);
            continue;
        }

        let unquoted = strip_matching_quotes(trimmed);
        return if unquoted.is_empty() {
            None
        } else {
            Some(unquoted.to_string())
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataValue;

    fn with(entries: Vec<(&str, MetadataValue)>) -> Option<String> {
        let metadata: ImageMetadata = entries.into_iter().collect();
        extract_from_png_properties(&metadata)
    }

    #[test]
    fn test_quotes_are_removed() {
        let found = with(vec![("Positive prompt", "\"a dog running\"".into())]);
        assert_eq!(found, Some("a dog running".to_string()));
    }

    #[test]
    fn test_key_order_and_blank_skip() {
        let found = with(vec![
            ("positive_prompt", "last".into()),
            ("Positive Prompt", "third".into()),
            ("positive prompt", "   ".into()),
        ]);
        assert_eq!(found, Some("third".to_string()));
    }

    #[test]
    fn test_bytes_and_structured_values() {
        let found = with(vec![("positive prompt", MetadataValue::Bytes(b"  'tide\xffpool'  ".to_vec()))]);
        assert_eq!(found, Some("tidepool".to_string()));

        let found = with(vec![("positive_prompt", serde_json::json!(["x", "y"]).into())]);
        assert_eq!(found, Some(r#"["x","y"]"#.to_string()));
    }

    #[test]
    fn test_nothing_usable() {
        assert_eq!(with(vec![]), None);
        assert_eq!(with(vec![("prompt", "not a listed key".into())]), None);
        assert_eq!(with(vec![("Positive prompt", "\"".into())]), None);
    }
}
