use crate::core::MessageRecord;
use anyhow::{Context, Result};
use tracing::error;

/// Parse message records from CSV text
///
/// The header row locates the columns, so order is free and these names
/// are accepted (case-insensitive):
/// - worker, sender, from
/// - destination_worker, destination, to
/// - interval, interval_ms, delay
/// - message, text, body
///
/// Rows that fail to parse are logged and skipped.
pub fn parse_csv(text: &str) -> Result<Vec<MessageRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers().context("Failed to read CSV header")?;
    let columns = detect_columns(headers)?;

    let mut records = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        // Header is line 1
        let line = row + 2;
        let parsed = result
            .context("Failed to read CSV row")
            .and_then(|r| parse_row(&r, &columns));
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => error!("Skipping CSV line {}: {:#}", line, e),
        }
    }

    Ok(records)
}

struct Columns {
    worker: usize,
    destination: usize,
    interval: usize,
    message: usize,
}

fn parse_row(record: &csv::StringRecord, columns: &Columns) -> Result<MessageRecord> {
    let field = |idx: usize, name: &'static str| {
        record
            .get(idx)
            .with_context(|| format!("Missing {} column", name))
    };

    let worker = field(columns.worker, "worker")?
        .parse()
        .context("Invalid worker id")?;
    let destination_worker = field(columns.destination, "destination")?
        .parse()
        .context("Invalid destination worker id")?;
    let interval = field(columns.interval, "interval")?
        .parse()
        .context("Invalid interval")?;
    let message = field(columns.message, "message")?;

    Ok(MessageRecord::new(worker, destination_worker, interval, message))
}

/// Detect column indices from CSV headers
fn detect_columns(headers: &csv::StringRecord) -> Result<Columns> {
    Ok(Columns {
        worker: find_column(headers, &["worker", "sender", "from"])?,
        destination: find_column(headers, &["destination_worker", "destination", "to"])?,
        interval: find_column(headers, &["interval", "interval_ms", "delay"])?,
        message: find_column(headers, &["message", "text", "body"])?,
    })
}

/// Find a column by checking possible names
fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Result<usize> {
    for (idx, header) in headers.iter().enumerate() {
        let header_lower = header.to_lowercase();
        if names.iter().any(|&name| header_lower == name) {
            return Ok(idx);
        }
    }

    anyhow::bail!("Could not find column with names: {:?}", names)
}
