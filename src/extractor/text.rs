use crate::error::ExtractionError;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read the head of a text file, decoding lossily
///
/// At most `max_chars * 4` bytes are read (the widest UTF-8 encoding), so
/// the caller's char truncation always has enough input.
pub async fn read_plain_text(path: &Path, max_chars: usize) -> Result<String, ExtractionError> {
    let file = tokio::fs::File::open(path).await?;
    let limit = (max_chars as u64).saturating_mul(4);
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).await?;

    let text = String::from_utf8_lossy(&bytes);
    // A multi-byte sequence cut at the read limit decodes as U+FFFD
    Ok(text.trim_end_matches('\u{FFFD}').to_string())
}

/// First `max_lines` records of a CSV/TSV file, fields joined by spaces
///
/// Blocking: call from `spawn_blocking`.
pub fn read_csv_head(path: &Path, max_lines: usize, delimiter: u8) -> Result<String, ExtractionError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| ExtractionError::Csv(e.to_string()))?;

    let mut lines = Vec::new();
    for record in reader.byte_records().take(max_lines) {
        let record = record.map_err(|e| ExtractionError::Csv(e.to_string()))?;
        let line = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).trim().to_string())
            .filter(|field| !field.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }

    Ok(lines.join("\n"))
}
