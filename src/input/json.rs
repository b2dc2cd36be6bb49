use crate::core::MessageRecord;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::error;

/// A record as stored: either bare, or wrapped in a `data` column that
/// holds the record itself or its JSON encoding
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Envelope { data: StoredData },
    Bare(MessageRecord),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredData {
    Encoded(String),
    Record(MessageRecord),
}

impl StoredRecord {
    fn into_record(self) -> Result<MessageRecord> {
        match self {
            StoredRecord::Bare(record)
            | StoredRecord::Envelope {
                data: StoredData::Record(record),
            } => Ok(record),
            StoredRecord::Envelope { data: StoredData::Encoded(json) } => {
                serde_json::from_str(&json).context("Failed to decode record inside data envelope")
            }
        }
    }
}

fn decode(value: serde_json::Value) -> Result<MessageRecord> {
    let stored: StoredRecord = serde_json::from_value(value).context("Not a message record")?;
    stored.into_record()
}

/// Parse one record per line. Blank lines are skipped; lines that fail to
/// decode are logged and dropped.
pub fn parse_json_lines(text: &str) -> Vec<MessageRecord> {
    let mut records = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let decoded = serde_json::from_str::<serde_json::Value>(line)
            .context("Invalid JSON")
            .and_then(decode);
        match decoded {
            Ok(record) => records.push(record),
            Err(e) => error!("Skipping line {}: {:#}", line_no + 1, e),
        }
    }

    records
}

/// Parse a document holding exactly one record or envelope
pub fn parse_json_object(text: &str) -> Result<MessageRecord> {
    let value: serde_json::Value = serde_json::from_str(text).context("Invalid JSON")?;
    decode(value)
}

/// Parse a JSON array of records. Elements that fail to decode are logged
/// and dropped; a document that is not an array is an error.
pub fn parse_json_array(text: &str) -> Result<Vec<MessageRecord>> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(text).context("Expected a JSON array of records")?;

    let mut records = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        match decode(value) {
            Ok(record) => records.push(record),
            Err(e) => error!("Skipping element {}: {:#}", idx, e),
        }
    }

    Ok(records)
}
