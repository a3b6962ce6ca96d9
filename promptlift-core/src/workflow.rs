// Positive prompts from a node-graph `workflow` document

use crate::model::{ProcessedNodeSet, PromptCandidate, Provenance, node_id_key};
use crate::text::{join_lines, mentions_negative_early, stringify};
use serde_json::Value;
use tracing::debug;

/// Type name of the text encoder node that carries prompt text.
pub const TEXT_ENCODE_TYPE: &str = "CLIPTextEncode";

/// Case-insensitive fragment that marks custom text encoder variants.
const TEXT_ENCODE_FRAGMENT: &str = "cliptext";

/// Property some graphs use to record the original node type.
const TYPE_ALIAS_PROPERTY: &str = "Node name for S&R";

/// Walk `graph["nodes"]` in document order and return every text encoder
/// node that classifies as a positive prompt.
///
/// Accepted node ids are added to `processed`; ids already present are
/// skipped. A graph without a `nodes` array yields nothing.
pub fn extract_from_workflow(graph: &Value, processed: &mut ProcessedNodeSet) -> Vec<PromptCandidate> {
    let Some(nodes) = graph.get("nodes").and_then(Value::as_array) else {
        debug!("Workflow has no nodes array");
        return Vec::new();
    };

    let mut prompts = Vec::new();

    for node in nodes {
        let Some(node) = node.as_object() else {
            continue;
        };

        let node_id = node_id_key(node.get("id"));
        if processed.contains(&node_id) {
            continue;
        }

        let node_type = node.get("type").and_then(Value::as_str).unwrap_or("");
        if !is_text_encode_node(node_type, node.get("properties")) {
            continue;
        }

        let Some(raw) = node
            .get("widgets_values")
            .and_then(Value::as_array)
            .and_then(|values| values.first())
        else {
            continue;
        };

        let raw_title = node.get("title").and_then(Value::as_str);
        let title = raw_title.unwrap_or("").to_lowercase();

        if !classify(&title, raw) {
            debug!("Node {} ({}) classified as negative", node_id, node_type);
            continue;
        }

        let text = match raw {
            Value::Array(items) => join_lines(items),
            Value::String(_) | Value::Number(_) => stringify(raw),
            _ => {
                debug!("Node {} has a non-text widget value, skipping", node_id);
                continue;
            }
        };

        debug!("Node {} ({}) accepted as positive prompt", node_id, node_type);
        processed.insert(node_id.clone());
        prompts.push(PromptCandidate {
            text,
            node_id,
            node_type: node_type.to_string(),
            title: raw_title.unwrap_or("Untitled").to_string(),
            source: Provenance::Workflow,
        });
    }

    prompts
}

fn is_text_encode_node(node_type: &str, properties: Option<&Value>) -> bool {
    node_type == TEXT_ENCODE_TYPE
        || node_type.to_lowercase().contains(TEXT_ENCODE_FRAGMENT)
        || properties
            .and_then(|p| p.get(TYPE_ALIAS_PROPERTY))
            .and_then(Value::as_str)
            == Some(TEXT_ENCODE_TYPE)
}

/// Positive/negative heuristic over the lower-cased title and the raw first
/// widget value. Text-based rules only look at string values; lists are
/// judged on their title alone.
fn classify(title: &str, raw: &Value) -> bool {
    let text = raw.as_str();

    let untitled = title.is_empty() || title == "untitled";
    let is_positive = title.contains("positive")
        || title.contains("pos")
        || (untitled
            && text.is_some_and(|t| !t.trim().is_empty() && !mentions_negative_early(t)));

    let is_negative = title.contains("negative")
        || title.contains("neg")
        || text.is_some_and(|t| t.trim().is_empty() || t.to_lowercase().trim().starts_with("negative"));

    is_positive && !is_negative
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(graph: Value) -> Vec<PromptCandidate> {
        extract_from_workflow(&graph, &mut ProcessedNodeSet::new())
    }

    #[test]
    fn test_positive_title_is_accepted() {
        let prompts = run(json!({"nodes": [
            {"id": 6, "type": "CLIPTextEncode", "title": "Positive Prompt", "widgets_values": ["a cat"]},
            {"id": 7, "type": "CLIPTextEncode", "title": "Negative Prompt", "widgets_values": ["blurry"]}
        ]}));

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].text, "a cat");
        assert_eq!(prompts[0].node_id, "6");
        assert_eq!(prompts[0].title, "Positive Prompt");
        assert_eq!(prompts[0].source, Provenance::Workflow);
    }

    #[test]
    fn test_untitled_node_uses_text_heuristic() {
        let prompts = run(json!({"nodes": [
            {"id": 1, "type": "CLIPTextEncode", "widgets_values": ["sunset over the sea"]},
            {"id": 2, "type": "CLIPTextEncode", "widgets_values": ["negative: lowres"]},
            {"id": 3, "type": "CLIPTextEncode", "widgets_values": ["   "]},
            {"id": 4, "type": "CLIPTextEncode", "title": "Untitled", "widgets_values": ["ugly, negative tags"]}
        ]}));

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].node_id, "1");
        assert_eq!(prompts[0].title, "Untitled");
    }

    #[test]
    fn test_neutral_title_is_not_positive() {
        let prompts = run(json!({"nodes": [
            {"id": 1, "type": "CLIPTextEncode", "title": "Style", "widgets_values": ["watercolor"]}
        ]}));
        assert!(prompts.is_empty());
    }

    #[test]
    fn test_type_matching_variants() {
        let prompts = run(json!({"nodes": [
            {"id": 1, "type": "CLIPTextEncodeSDXL", "title": "pos", "widgets_values": ["sdxl prompt"]},
            {"id": 2, "type": "Custom", "title": "pos",
             "properties": {"Node name for S&R": "CLIPTextEncode"}, "widgets_values": ["aliased"]},
            {"id": 3, "type": "KSampler", "title": "pos", "widgets_values": [42]}
        ]}));

        let texts: Vec<_> = prompts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["sdxl prompt", "aliased"]);
    }

    #[test]
    fn test_list_values_are_joined() {
        let prompts = run(json!({"nodes": [
            {"id": 1, "type": "CLIPTextEncode", "title": "Positive", "widgets_values": [["a cat", "on a mat", 3]]}
        ]}));
        assert_eq!(prompts[0].text, "a cat\non a mat\n3");
    }

    #[test]
    fn test_numeric_value_is_stringified_and_null_rejected() {
        let prompts = run(json!({"nodes": [
            {"id": 1, "type": "CLIPTextEncode", "title": "Positive", "widgets_values": [1234]},
            {"id": 2, "type": "CLIPTextEncode", "title": "Positive", "widgets_values": [null]},
            {"id": 3, "type": "CLIPTextEncode", "title": "Positive", "widgets_values": [{"k": 1}]}
        ]}));
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].text, "1234");
    }

    #[test]
    fn test_processed_ids_are_skipped() {
        let graph = json!({"nodes": [
            {"id": 9, "type": "CLIPTextEncode", "title": "Positive", "widgets_values": ["first"]},
            {"id": 9, "type": "CLIPTextEncode", "title": "Positive", "widgets_values": ["duplicate id"]}
        ]});
        let mut processed = ProcessedNodeSet::new();
        let prompts = extract_from_workflow(&graph, &mut processed);

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].text, "first");
        assert!(processed.contains("9"));

        // a second pass with the same set finds nothing new
        assert!(extract_from_workflow(&graph, &mut processed).is_empty());
    }

    #[test]
    fn test_malformed_shapes_yield_nothing() {
        assert!(run(json!({"nodes": []})).is_empty());
        assert!(run(json!({})).is_empty());
        assert!(run(json!([1, 2, 3])).is_empty());
        assert!(run(json!({"nodes": [1, "x", {"id": 1, "type": "CLIPTextEncode", "title": "pos"}]})).is_empty());
    }
}
