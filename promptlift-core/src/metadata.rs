//! PNG metadata loading.
//!
//! Opens a file, checks that it really is a PNG, and collects the key/value
//! text chunks (`tEXt`, `zTXt`, `iTXt`) plus a few header facts into an
//! [`ImageMetadata`] map. Only the chunks before the first `IDAT` are read;
//! pixel data is never decoded. Text chunks go through
//! [`crate::chunks`], so a malformed one is skipped instead of failing the
//! whole file.

use crate::chunks::read_text_chunks;
use crate::error::{ExtractError, Result};
use crate::model::{ColorMode, FileInfo};
use crate::text::decode_utf8_ignoring_errors;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Bytes inspected to identify the container format.
const SNIFF_LEN: u64 = 16;

/// A single metadata value as stored by the image encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Bytes(Vec<u8>),
    Structured(Value),
}

impl MetadataValue {
    /// Text form of the value: bytes are UTF-8 decoded with invalid
    /// sequences dropped, structured values are serialized as JSON.
    pub fn to_text(&self) -> String {
        match self {
            MetadataValue::Text(s) => s.clone(),
            MetadataValue::Bytes(b) => decode_utf8_ignoring_errors(b),
            MetadataValue::Structured(v) => crate::text::stringify(v),
        }
    }

    /// Interpret the value as a JSON document.
    pub fn parse_json(&self) -> std::result::Result<Value, serde_json::Error> {
        match self {
            MetadataValue::Structured(v) => Ok(v.clone()),
            other => serde_json::from_str(&other.to_text()),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<Vec<u8>> for MetadataValue {
    fn from(b: Vec<u8>) -> Self {
        MetadataValue::Bytes(b)
    }
}

impl From<Value> for MetadataValue {
    fn from(v: Value) -> Self {
        MetadataValue::Structured(v)
    }
}

/// Key/value metadata of one image. Keys are case-sensitive.
///
/// Built once (via [`FromIterator`]) and read-only afterwards; when a key
/// repeats, the later entry wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    entries: HashMap<String, MetadataValue>,
}

impl ImageMetadata {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// First key of `candidates` present in the map, with its value.
    pub fn find_first<'a>(&self, candidates: &[&'a str]) -> Option<(&'a str, &MetadataValue)> {
        candidates
            .iter()
            .find_map(|key| self.entries.get(*key).map(|value| (*key, value)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ImageMetadata
where
    K: Into<String>,
    V: Into<MetadataValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Everything the extractors need from one file.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub info: FileInfo,
    pub metadata: ImageMetadata,
}

/// Open `path`, verify it is a PNG and read its text metadata.
///
/// The file handle is dropped before this returns, on success and on error.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let file = File::open(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    load_metadata_from_reader(path, file)
}

/// Same as [`load_image`] but reads from an already opened source. `path`
/// is only used for the descriptor and for error context.
pub fn load_metadata_from_reader<R: Read + Seek>(path: &Path, mut reader: R) -> Result<LoadedImage> {
    let io_err = |source: std::io::Error| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    (&mut reader)
        .take(SNIFF_LEN)
        .read_to_end(&mut header)
        .map_err(io_err)?;
    reader.seek(SeekFrom::Start(0)).map_err(io_err)?;

    match image::guess_format(&header) {
        Ok(image::ImageFormat::Png) => {}
        Ok(other) => {
            return Err(ExtractError::Format {
                path: path.to_path_buf(),
                detected: format!("{other:?}"),
            });
        }
        Err(_) => {
            return Err(ExtractError::Format {
                path: path.to_path_buf(),
                detected: "unknown".to_string(),
            });
        }
    }

    let text_entries = read_text_chunks(BufReader::new(&mut reader)).map_err(io_err)?;
    reader.seek(SeekFrom::Start(0)).map_err(io_err)?;

    // header facts only; text chunks were collected above
    let mut decoder = png::Decoder::new(BufReader::new(reader));
    decoder.set_ignore_text_chunk(true);
    let png_reader = decoder.read_info().map_err(|e| match e {
        png::DecodingError::IoError(source) => ExtractError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => ExtractError::Decode {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let png_info = png_reader.info();

    if png_info.animation_control.is_some() {
        debug!("{} is an animated PNG, reading first-frame metadata only", path.display());
    }

    let info = FileInfo {
        path: path.to_path_buf(),
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        width: png_info.width,
        height: png_info.height,
        color_mode: ColorMode::from_png(png_info.color_type, png_info.bit_depth),
    };

    let mut entries: Vec<(String, MetadataValue)> = Vec::new();

    if let Some(dims) = &png_info.pixel_dims
        && matches!(dims.unit, png::Unit::Meter)
    {
        let dpi = serde_json::json!([dims.xppu as f64 * 0.0254, dims.yppu as f64 * 0.0254]);
        entries.push(("dpi".to_string(), MetadataValue::Structured(dpi)));
    }

    entries.extend(
        text_entries
            .into_iter()
            .map(|(keyword, text)| (keyword, MetadataValue::Text(text))),
    );

    debug!(
        "Loaded {} metadata entries from {} ({}x{} {})",
        entries.len(),
        info.filename,
        info.width,
        info.height,
        info.color_mode
    );

    Ok(LoadedImage {
        info,
        metadata: entries.into_iter().collect(),
    })
}
