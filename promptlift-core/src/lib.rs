//! Positive-prompt extraction from generated PNG metadata.
//!
//! Two strategies are available through [`extract()`]:
//!
//! - [`ExtractionMethod::Graph`] reads the node-graph JSON under `workflow`
//!   (falling back to the node map under `prompt`).
//! - [`ExtractionMethod::Parameters`] reads the `parameters` block (falling
//!   back to flat `Positive prompt` text keys).

pub mod chunks;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod model;
pub mod parameters;
pub mod prompt_data;
pub mod properties;
pub mod report;
pub mod text;
pub mod workflow;

pub use error::{ExtractError, Result};
pub use extract::{extract, extract_graph, extract_parameters};
pub use metadata::{ImageMetadata, LoadedImage, MetadataValue, load_image};
pub use model::{
    ColorMode, ExtractionMethod, ExtractionResult, FileInfo, ParseWarning, ProcessedNodeSet,
    PromptCandidate, Provenance,
};
