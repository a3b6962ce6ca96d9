// Positive prompts from the `prompt` node map (node id -> {class_type, inputs})

use crate::model::{ProcessedNodeSet, PromptCandidate, Provenance};
use crate::text::{join_lines, mentions_negative_early, stringify};
use crate::workflow::TEXT_ENCODE_TYPE;
use serde_json::Value;
use tracing::debug;

/// Input names tried for prompt text, in order.
const TEXT_INPUTS: [&str; 2] = ["text", "prompt"];

/// Return every text encoder entry of `prompt_map` whose text does not read
/// as a negative prompt, in document order.
///
/// `processed` is shared with the workflow pass of the same extraction so a
/// node is never reported twice.
pub fn extract_from_prompt_data(prompt_map: &Value, processed: &mut ProcessedNodeSet) -> Vec<PromptCandidate> {
    let Some(entries) = prompt_map.as_object() else {
        debug!("Prompt data is not a JSON object");
        return Vec::new();
    };

    let mut prompts = Vec::new();

    for (key, node) in entries {
        let Some(node) = node.as_object() else {
            continue;
        };
        if processed.contains(key) {
            continue;
        }

        let class_type = node.get("class_type").and_then(Value::as_str).unwrap_or("");
        if class_type != TEXT_ENCODE_TYPE {
            continue;
        }

        let Some(inputs) = node.get("inputs").and_then(Value::as_object) else {
            continue;
        };

        // the first input name present wins, even when its value is null
        let Some(raw) = TEXT_INPUTS.iter().find_map(|name| inputs.get(*name)) else {
            continue;
        };

        let text = match raw {
            Value::Null => continue,
            Value::Array(items) => join_lines(items),
            other => stringify(other),
        };

        if text.trim().is_empty() {
            continue;
        }

        if mentions_negative_early(&text) {
            debug!("Prompt node {} classified as negative", key);
            continue;
        }

        processed.insert(key.clone());
        prompts.push(PromptCandidate {
            text,
            node_id: key.clone(),
            node_type: class_type.to_string(),
            title: format!("Node {key}"),
            source: Provenance::PromptData,
        });
    }

    prompts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(map: Value) -> Vec<PromptCandidate> {
        extract_from_prompt_data(&map, &mut ProcessedNodeSet::new())
    }

    #[test]
    fn test_extracts_text_input() {
        let prompts = run(json!({
            "3": {"class_type": "KSampler", "inputs": {"seed": 1}},
            "6": {"class_type": "CLIPTextEncode", "inputs": {"text": "a lighthouse at dusk"}},
            "7": {"class_type": "CLIPTextEncode", "inputs": {"text": "negative: blurry, lowres"}}
        }));

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].text, "a lighthouse at dusk");
        assert_eq!(prompts[0].node_id, "6");
        assert_eq!(prompts[0].node_type, "CLIPTextEncode");
        assert_eq!(prompts[0].title, "Node 6");
        assert_eq!(prompts[0].source, Provenance::PromptData);
    }

    #[test]
    fn test_falls_back_to_prompt_input() {
        let prompts = run(json!({
            "1": {"class_type": "CLIPTextEncode", "inputs": {"prompt": "from prompt input"}}
        }));
        assert_eq!(prompts[0].text, "from prompt input");
    }

    #[test]
    fn test_null_text_does_not_fall_through() {
        let prompts = run(json!({
            "1": {"class_type": "CLIPTextEncode", "inputs": {"text": null, "prompt": "ignored"}}
        }));
        assert!(prompts.is_empty());
    }

    #[test]
    fn test_list_and_scalar_inputs_are_flattened() {
        let prompts = run(json!({
            "1": {"class_type": "CLIPTextEncode", "inputs": {"text": ["4", 0]}},
            "2": {"class_type": "CLIPTextEncode", "inputs": {"text": 77}}
        }));
        let texts: Vec<_> = prompts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["4\n0", "77"]);
    }

    #[test]
    fn test_skips_blank_and_non_object_entries() {
        let prompts = run(json!({
            "1": "not a node",
            "2": {"class_type": "CLIPTextEncode", "inputs": {"text": "  \n "}},
            "3": {"class_type": "CLIPTextEncode"},
            "4": {"class_type": "CLIPTextEncodeSDXL", "inputs": {"text": "exact type only"}}
        }));
        assert!(prompts.is_empty());
    }

    #[test]
    fn test_processed_nodes_are_excluded() {
        let map = json!({
            "6": {"class_type": "CLIPTextEncode", "inputs": {"text": "already seen"}},
            "8": {"class_type": "CLIPTextEncode", "inputs": {"text": "fresh"}}
        });
        let mut processed = ProcessedNodeSet::new();
        processed.insert("6");

        let prompts = extract_from_prompt_data(&map, &mut processed);
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].node_id, "8");
        assert!(processed.contains("8"));
    }
}
