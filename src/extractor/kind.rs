use crate::constants::{
    ARCHIVE_EXTENSIONS, AUDIO_EXTENSIONS, CSV_EXTENSIONS, EXECUTABLE_EXTENSIONS,
    IMAGE_EXTENSIONS, TEXT_EXTENSIONS, VIDEO_EXTENSIONS,
};
use crate::models::{BinaryCategory, FileKind, FileMeta, OfficeFormat, TextFormat};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Detect the kind of a file, by extension first and by content sniffing
/// when the extension tells us nothing
pub fn detect_kind(meta: &FileMeta, sniff_bytes: usize) -> FileKind {
    if let Some(kind) = meta.extension.as_deref().and_then(kind_from_extension) {
        return kind;
    }

    match read_head(&meta.path, sniff_bytes) {
        Ok(head) => sniff_kind(&head),
        Err(_) => FileKind::Unsupported,
    }
}

/// Map a lowercase extension to a kind
pub fn kind_from_extension(ext: &str) -> Option<FileKind> {
    // Binary categories are checked first
    if IMAGE_EXTENSIONS.contains(&ext) {
        return Some(FileKind::Binary(BinaryCategory::Image));
    }
    if VIDEO_EXTENSIONS.contains(&ext) {
        return Some(FileKind::Binary(BinaryCategory::Video));
    }
    if AUDIO_EXTENSIONS.contains(&ext) {
        return Some(FileKind::Binary(BinaryCategory::Audio));
    }
    if EXECUTABLE_EXTENSIONS.contains(&ext) {
        return Some(FileKind::Binary(BinaryCategory::Executable));
    }
    if ARCHIVE_EXTENSIONS.contains(&ext) {
        return Some(FileKind::Binary(BinaryCategory::Archive));
    }

    match ext {
        "pdf" => Some(FileKind::Pdf),
        "docx" => Some(FileKind::Office(OfficeFormat::Docx)),
        "pptx" => Some(FileKind::Office(OfficeFormat::Pptx)),
        "xlsx" => Some(FileKind::Office(OfficeFormat::Xlsx)),
        e if CSV_EXTENSIONS.contains(&e) => Some(FileKind::Text(TextFormat::Csv)),
        e if TEXT_EXTENSIONS.contains(&e) => Some(FileKind::Text(TextFormat::Plain)),
        _ => None,
    }
}

/// Classify a file from its first bytes
pub fn sniff_kind(head: &[u8]) -> FileKind {
    if head.is_empty() {
        return FileKind::Unsupported;
    }

    const MAGIC: &[(&[u8], FileKind)] = &[
        (b"%PDF-", FileKind::Pdf),
        (b"\x89PNG", FileKind::Binary(BinaryCategory::Image)),
        (b"\xFF\xD8\xFF", FileKind::Binary(BinaryCategory::Image)),
        (b"GIF8", FileKind::Binary(BinaryCategory::Image)),
        (b"PK\x03\x04", FileKind::Binary(BinaryCategory::Archive)),
        (b"\x1F\x8B", FileKind::Binary(BinaryCategory::Archive)),
        (b"\x7FELF", FileKind::Binary(BinaryCategory::Executable)),
        (b"MZ", FileKind::Binary(BinaryCategory::Executable)),
    ];

    for (magic, kind) in MAGIC {
        if head.starts_with(magic) {
            return *kind;
        }
    }

    if looks_like_text(head) {
        FileKind::Text(TextFormat::Plain)
    } else {
        FileKind::Unsupported
    }
}

/// More than 30% alphanumeric and no NUL bytes
fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    let text = String::from_utf8_lossy(head);
    let total = text.chars().count();
    let alnum = text.chars().filter(|c| c.is_alphanumeric()).count();
    total > 0 && alnum * 10 > total * 3
}

fn read_head(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut head)?;
    Ok(head)
}
