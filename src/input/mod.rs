pub mod csv;
pub mod json;

pub use self::csv::parse_csv;
pub use self::json::{parse_json_array, parse_json_lines, parse_json_object};

use crate::core::MessageRecord;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Input format detection result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// One JSON record (or `{"data": ...}` envelope) per line
    JsonLines,
    /// A single JSON array of records
    JsonArray,
    /// One record (or envelope) as the whole document, possibly spread over lines
    JsonObject,
    Csv,
    Unknown,
}

impl InputFormat {
    /// Guess the format from a file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            "json" => Some(Self::JsonArray),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Detect the format of an input file by looking at its first meaningful character
pub fn detect_format(text: &str) -> InputFormat {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    match trimmed.chars().next() {
        Some('[') => InputFormat::JsonArray,
        // Several objects one per line do not parse as a single document
        Some('{') if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() => {
            InputFormat::JsonObject
        }
        Some('{') => InputFormat::JsonLines,
        Some(_) if is_csv(trimmed) => InputFormat::Csv,
        _ => InputFormat::Unknown,
    }
}

fn is_csv(text: &str) -> bool {
    // A header line naming at least a few comma separated columns
    text.lines().next().map_or(false, |line| line.matches(',').count() >= 2)
}

/// Parse records from text in the given format
pub fn parse(text: &str, format: InputFormat) -> Result<Vec<MessageRecord>> {
    match format {
        InputFormat::JsonLines => Ok(parse_json_lines(text)),
        InputFormat::JsonArray => parse_json_array(text),
        InputFormat::JsonObject => parse_json_object(text).map(|record| vec![record]),
        InputFormat::Csv => parse_csv(text),
        InputFormat::Unknown => anyhow::bail!("Unknown input format"),
    }
}

/// Load message records from a file, in file order
pub fn load_file(path: &Path) -> Result<Vec<MessageRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;

    // A `.json` file holding one object per line is still JSON lines
    let format = match InputFormat::from_extension(path) {
        Some(InputFormat::JsonArray) | None => detect_format(&text),
        Some(format) => format,
    };

    let records =
        parse(&text, format).with_context(|| format!("Failed to parse {}", path.display()))?;
    if records.is_empty() && !text.trim().is_empty() {
        anyhow::bail!(
            "No valid records in {} ({:?}), every entry failed to decode",
            path.display(),
            format
        );
    }
    info!("Loaded {} records from {} ({:?})", records.len(), path.display(), format);
    Ok(records)
}
