use crate::config::FallbackPolicy;
use crate::constants::{
    ARCHIVES_FOLDER, AUDIO_FOLDER, EXECS_FOLDER, IMAGES_FOLDER, MISC_FOLDER, NO_EXTENSION_FOLDER,
    VIDEOS_FOLDER,
};
use crate::models::{BinaryCategory, FileKind, FileMeta, SortMode};
use crate::organizer::generator::{is_reserved_name, sanitize_segment};
use chrono::{DateTime, Local};

/// Folder for a binary fast-path category
pub fn binary_folder(category: BinaryCategory) -> &'static str {
    match category {
        BinaryCategory::Image => IMAGES_FOLDER,
        BinaryCategory::Video => VIDEOS_FOLDER,
        BinaryCategory::Audio => AUDIO_FOLDER,
        BinaryCategory::Executable => EXECS_FOLDER,
        BinaryCategory::Archive => ARCHIVES_FOLDER,
    }
}

/// `PDF_Files`, `TXT_Files`, ... or `Misc_Files` without an extension
pub fn extension_bucket(meta: &FileMeta, max_len: usize) -> String {
    let ext = meta
        .extension
        .as_deref()
        .map(|e| sanitize_segment(&e.to_uppercase(), max_len.saturating_sub(6)))
        .unwrap_or_default();
    if ext.is_empty() {
        MISC_FOLDER.to_string()
    } else {
        format!("{}_Files", ext)
    }
}

/// Modification month as `YYYY-MM`, in local time
pub fn date_bucket(meta: &FileMeta) -> String {
    let modified: DateTime<Local> = meta.modified.into();
    modified.format("%Y-%m").to_string()
}

/// Folder for a file that is not clustered (binary, empty, failed)
pub fn fallback_bucket(meta: &FileMeta, kind: FileKind, policy: FallbackPolicy, max_len: usize) -> String {
    match (policy, kind) {
        (FallbackPolicy::Date, _) => date_bucket(meta),
        (FallbackPolicy::Extension, FileKind::Binary(category)) => binary_folder(category).to_string(),
        (FallbackPolicy::Extension, _) => extension_bucket(meta, max_len),
    }
}

/// Folder for a file under one of the metadata-only sort modes
///
/// Returns `None` for `SortMode::AiSemantic`, which is content driven.
pub fn metadata_bucket(meta: &FileMeta, mode: SortMode, max_len: usize) -> Option<String> {
    match mode {
        SortMode::AiSemantic => None,
        SortMode::FileExtension => {
            let ext = meta
                .extension
                .as_deref()
                .map(|e| sanitize_segment(e, max_len))
                .unwrap_or_default();
            Some(if ext.is_empty() {
                NO_EXTENSION_FOLDER.to_string()
            } else if is_reserved_name(&ext) {
                // `aux`, `con`, `nul`... are device names on Windows
                format!("{}_files", ext)
            } else {
                ext
            })
        }
        SortMode::DateModified => Some(date_bucket(meta)),
    }
}
