//! Office Open XML text extraction (docx, pptx, xlsx).
//!
//! These formats are ZIP containers of XML parts. Only the parts that carry
//! visible text are read, each bounded in size.

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::models::OfficeFormat;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

/// Maximum decompressed bytes read from a single ZIP entry
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

/// Extract text from an OOXML document held in memory
pub fn extract_office(
    bytes: &[u8],
    format: OfficeFormat,
    config: &ExtractionConfig,
) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(ooxml_err)?;

    match format {
        OfficeFormat::Docx => extract_docx(&mut archive, config.docx_max_paragraphs),
        OfficeFormat::Pptx => extract_pptx(&mut archive, config.pptx_max_slides),
        OfficeFormat::Xlsx => extract_xlsx(&mut archive, config.xlsx_max_rows),
    }
}

fn ooxml_err(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Ooxml(e.to_string())
}

/// Read a ZIP entry, `None` when it does not exist
fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<Option<Vec<u8>>, ExtractionError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ooxml_err(e)),
    };

    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_err)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractionError::Ooxml(format!(
            "{} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(Some(out))
}

/// Entries named `<prefix><n>.xml`, in numeric order
fn numbered_parts(archive: &Archive<'_>, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn extract_docx(archive: &mut Archive<'_>, max_paragraphs: usize) -> Result<String, ExtractionError> {
    let xml = read_entry(archive, "word/document.xml")?
        .ok_or_else(|| ExtractionError::Ooxml("word/document.xml not found".to_string()))?;

    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                current.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let paragraph = std::mem::take(&mut current);
                    if !paragraph.trim().is_empty() {
                        paragraphs.push(paragraph);
                        if paragraphs.len() >= max_paragraphs {
                            break;
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    if !current.trim().is_empty() && paragraphs.len() < max_paragraphs {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}

fn extract_pptx(archive: &mut Archive<'_>, max_slides: usize) -> Result<String, ExtractionError> {
    let slides = numbered_parts(archive, "ppt/slides/slide");
    let mut out = Vec::new();

    for name in slides.into_iter().take(max_slides) {
        if let Some(xml) = read_entry(archive, &name)? {
            let text = collect_text_elements(&xml)?;
            if !text.is_empty() {
                out.push(text);
            }
        }
    }

    Ok(out.join("\n"))
}

/// All `<a:t>` runs of a slide, one shape paragraph per line
fn collect_text_elements(xml: &[u8]) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                current.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let line = std::mem::take(&mut current);
                    if !line.trim().is_empty() {
                        lines.push(line);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }

    Ok(lines.join("\n"))
}

fn extract_xlsx(archive: &mut Archive<'_>, max_rows: usize) -> Result<String, ExtractionError> {
    let shared_strings = match read_entry(archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut out = Vec::new();
    for name in numbered_parts(archive, "xl/worksheets/sheet") {
        if out.len() >= max_rows {
            break;
        }
        if let Some(xml) = read_entry(archive, &name)? {
            let remaining = max_rows - out.len();
            out.extend(parse_sheet_rows(&xml, &shared_strings, remaining)?);
        }
    }

    Ok(out.join("\n"))
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                current.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Cell values of up to `max_rows` rows, one line per row
fn parse_sheet_rows(
    xml: &[u8],
    shared_strings: &[String],
    max_rows: usize,
) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rows = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut cell_type: Option<Vec<u8>> = None;
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    cell_type = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"t")
                        .map(|a| a.value.into_owned());
                }
                b"v" => in_value = true,
                b"t" => in_inline_text = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_value || in_inline_text => {
                let raw = te.unescape().map_err(ooxml_err)?;
                let raw = raw.trim();
                if raw.is_empty() {
                    // nothing to record
                } else if in_value && cell_type.as_deref() == Some(b"s".as_slice()) {
                    if let Some(s) = raw.parse::<usize>().ok().and_then(|i| shared_strings.get(i)) {
                        cells.push(s.clone());
                    }
                } else {
                    cells.push(raw.to_string());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => cell_type = None,
                b"row" => {
                    let row = std::mem::take(&mut cells);
                    if !row.is_empty() {
                        rows.push(row.join(" "));
                        if rows.len() >= max_rows {
                            break;
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}
