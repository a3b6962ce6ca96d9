// Value types shared by the extractors and the orchestrator

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Pixel layout of the decoded image, named the way image tooling usually
/// prints it (`RGB`, `RGBA`, `L`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    Bilevel,
    Luma,
    Luma16,
    LumaAlpha,
    Rgb,
    Rgba,
    Palette,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Bilevel => "1",
            ColorMode::Luma => "L",
            ColorMode::Luma16 => "I;16",
            ColorMode::LumaAlpha => "LA",
            ColorMode::Rgb => "RGB",
            ColorMode::Rgba => "RGBA",
            ColorMode::Palette => "P",
        }
    }

    pub fn from_png(color_type: png::ColorType, bit_depth: png::BitDepth) -> Self {
        use png::{BitDepth, ColorType};

        match (color_type, bit_depth) {
            (ColorType::Grayscale, BitDepth::One) => ColorMode::Bilevel,
            (ColorType::Grayscale, BitDepth::Sixteen) => ColorMode::Luma16,
            (ColorType::Grayscale, _) => ColorMode::Luma,
            (ColorType::GrayscaleAlpha, _) => ColorMode::LumaAlpha,
            (ColorType::Rgb, _) => ColorMode::Rgb,
            (ColorType::Rgba, _) => ColorMode::Rgba,
            (ColorType::Indexed, _) => ColorMode::Palette,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of the file an [`ExtractionResult`] was produced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub color_mode: ColorMode,
}

impl FileInfo {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Which metadata source produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Workflow,
    PromptData,
    Parameters,
    PngProperties,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Workflow => "workflow",
            Provenance::PromptData => "prompt_data",
            Provenance::Parameters => "parameters",
            Provenance::PngProperties => "png_properties",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted positive prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptCandidate {
    pub text: String,
    pub node_id: String,
    pub node_type: String,
    pub title: String,
    pub source: Provenance,
}

/// Extraction strategy selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Node-graph metadata (`workflow`, then `prompt`).
    Graph,
    /// `parameters` text block, then flat PNG properties.
    Parameters,
}

impl ExtractionMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "graph" | "comfyui" => Some(ExtractionMethod::Graph),
            "parameters" | "params" => Some(ExtractionMethod::Parameters),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Graph => "graph",
            ExtractionMethod::Parameters => "parameters",
        }
    }

    /// The mode to suggest when this one came up empty.
    pub fn other(&self) -> Self {
        match self {
            ExtractionMethod::Graph => ExtractionMethod::Parameters,
            ExtractionMethod::Parameters => ExtractionMethod::Graph,
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metadata field that could not be parsed. Recorded, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub source: String,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not parse {} JSON: {}", self.source, self.message)
    }
}

/// Per-file extraction outcome. An empty `prompts` list means nothing was
/// found, which is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub file: FileInfo,
    pub prompts: Vec<PromptCandidate>,
    pub method: ExtractionMethod,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<ParseWarning>,
}

impl ExtractionResult {
    pub fn has_prompts(&self) -> bool {
        !self.prompts.is_empty()
    }

    pub fn prompt_texts(&self) -> impl Iterator<Item = &str> {
        self.prompts.iter().map(|p| p.text.as_str())
    }
}

/// Node identifiers already accepted during one extraction call.
///
/// Workflow graphs use numeric ids while prompt maps key nodes by string, so
/// ids are normalized to their textual form before they are compared.
#[derive(Debug, Default, Clone)]
pub struct ProcessedNodeSet {
    ids: HashSet<String>,
}

impl ProcessedNodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns false if the id was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Textual form of a JSON node identifier: strings as-is, everything else
/// in its JSON spelling (`5`, `null`, ...).
pub fn node_id_key(id: Option<&Value>) -> String {
    match id {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}
