//! Extraction orchestrator.
//!
//! Picks the strategy for a file, chains the fallbacks and assembles the
//! [`ExtractionResult`]. Everything here is synchronous and keeps no state
//! between calls, so distinct files can be processed concurrently.

use crate::error::Result;
use crate::metadata::{ImageMetadata, load_image};
use crate::model::{
    ExtractionMethod, ExtractionResult, FileInfo, ParseWarning, ProcessedNodeSet, PromptCandidate,
    Provenance,
};
use crate::parameters::extract_from_parameters;
use crate::prompt_data::extract_from_prompt_data;
use crate::properties::extract_from_png_properties;
use crate::workflow::extract_from_workflow;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

pub const WORKFLOW_KEY: &str = "workflow";
pub const PROMPT_KEY: &str = "prompt";

/// Candidates plus any warnings raised while reading the metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub prompts: Vec<PromptCandidate>,
    pub warnings: Vec<ParseWarning>,
}

/// Load `path` and run the extractor for `method`.
///
/// Fails only for file-level problems (unreadable, not a PNG). A file with no
/// recognizable prompt gives an `Ok` result with an empty prompt list.
pub fn extract(path: &Path, method: ExtractionMethod) -> Result<ExtractionResult> {
    let image = load_image(path)?;
    Ok(assemble(image.info, &image.metadata, method))
}

pub fn extract_graph(path: &Path) -> Result<ExtractionResult> {
    extract(path, ExtractionMethod::Graph)
}

pub fn extract_parameters(path: &Path) -> Result<ExtractionResult> {
    extract(path, ExtractionMethod::Parameters)
}

/// Build the result for already loaded metadata.
pub fn assemble(file: FileInfo, metadata: &ImageMetadata, method: ExtractionMethod) -> ExtractionResult {
    let Extracted { prompts, warnings } = match method {
        ExtractionMethod::Graph => extract_graph_metadata(metadata),
        ExtractionMethod::Parameters => extract_parameters_metadata(metadata),
    };

    debug!(
        "{}: {} prompt(s) via {} extraction",
        file.filename,
        prompts.len(),
        method
    );

    ExtractionResult {
        file,
        prompts,
        method,
        warnings,
    }
}

/// Graph strategy: `workflow` first, then `prompt` if the workflow produced
/// nothing. Both passes share one [`ProcessedNodeSet`].
pub fn extract_graph_metadata(metadata: &ImageMetadata) -> Extracted {
    let mut processed = ProcessedNodeSet::new();
    let mut out = Extracted::default();

    if let Some(graph) = parse_json_field(metadata, WORKFLOW_KEY, &mut out.warnings) {
        out.prompts
            .extend(extract_from_workflow(&graph, &mut processed));
    }

    if out.prompts.is_empty()
        && let Some(prompt_map) = parse_json_field(metadata, PROMPT_KEY, &mut out.warnings)
    {
        out.prompts
            .extend(extract_from_prompt_data(&prompt_map, &mut processed));
    }

    out
}

/// Parameters strategy: the `parameters` block, then flat PNG properties.
/// Produces at most one candidate.
pub fn extract_parameters_metadata(metadata: &ImageMetadata) -> Extracted {
    let candidate = extract_from_parameters(metadata)
        .filter(|text| !text.is_empty())
        .map(|text| fixed_candidate(text, Provenance::Parameters, "Parameters"))
        .or_else(|| {
            extract_from_png_properties(metadata)
                .map(|text| fixed_candidate(text, Provenance::PngProperties, "PNG Properties"))
        });

    Extracted {
        prompts: candidate.into_iter().collect(),
        warnings: Vec::new(),
    }
}

fn fixed_candidate(text: String, source: Provenance, title: &str) -> PromptCandidate {
    PromptCandidate {
        text,
        node_id: source.as_str().to_string(),
        node_type: source.as_str().to_string(),
        title: title.to_string(),
        source,
    }
}

/// Parse `metadata[key]` as JSON. Absence is silent; a parse failure is
/// logged and recorded as a warning.
fn parse_json_field(metadata: &ImageMetadata, key: &str, warnings: &mut Vec<ParseWarning>) -> Option<Value> {
    let value = metadata.get(key)?;

    match value.parse_json() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            let warning = ParseWarning {
                source: key.to_string(),
                message: e.to_string(),
            };
            warn!("{}", warning);
            warnings.push(warning);
            None
        }
    }
}
