use crate::constants::{GENERIC_LABELS, RESERVED_NAMES};
use crate::error::LabelingError;
use crate::utils;
use std::collections::HashSet;

/// Reduce a string to a single safe path segment
///
/// Separators (whitespace, `-`, `.`, slashes) become `_`; anything outside
/// `[A-Za-z0-9_]` is dropped; runs of `_` collapse and the result is capped
/// at `max_len` characters.
pub fn sanitize_segment(raw: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let mapped = if c.is_ascii_alphanumeric() {
            Some(c)
        } else if c == '_' || c == '-' || c == '.' || c == '/' || c == '\\' || c.is_whitespace() {
            Some('_')
        } else {
            None
        };
        if let Some(m) = mapped {
            if m == '_' && (out.is_empty() || out.ends_with('_')) {
                continue;
            }
            out.push(m);
        }
    }

    // ASCII only from here on, so byte and char lengths agree
    out.truncate(max_len);
    out.trim_end_matches('_').to_string()
}

/// Whether Windows would refuse this name (`CON`, `nul.txt`, `COM1`...)
pub fn is_reserved_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).to_lowercase();
    RESERVED_NAMES.contains(&stem.as_str())
}

/// Turn raw model output into a folder name, or reject it
pub fn clean_model_output(raw: &str, max_len: usize) -> Result<String, LabelingError> {
    let invalid = || LabelingError::InvalidOutput(raw.to_string());

    let line = raw
        .lines()
        .map(|l| strip_prefix_ignore_case(l.trim(), "folder name:").trim())
        .find(|l| !l.is_empty())
        .ok_or_else(invalid)?;

    let unquoted: String = line
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`' | '*' | '#'))
        .collect();
    let name = sanitize_segment(&unquoted, max_len);

    if name.is_empty() || is_reserved_name(&name) {
        return Err(invalid());
    }
    if GENERIC_LABELS.contains(&name.to_lowercase().as_str()) {
        return Err(invalid());
    }
    Ok(name)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}

/// Deterministic name built from keywords, or `Cluster_<id>` without any
pub fn fallback_name(keywords: &[String], cluster_id: usize, max_len: usize) -> String {
    let joined = keywords
        .iter()
        .map(|k| utils::capitalize(k))
        .collect::<Vec<_>>()
        .join("_");
    let name = sanitize_segment(&joined, max_len);
    if name.is_empty() || is_reserved_name(&name) {
        sanitize_segment(&format!("Cluster_{}", cluster_id), max_len)
    } else {
        name
    }
}

/// Destination names already used in one run
///
/// Comparison is case-insensitive, since common filesystems are. A taken
/// name gets a numeric suffix (`Name_2`, `Name_3`, ...) that still fits the
/// length cap.
#[derive(Debug, Clone)]
pub struct NameRegistry {
    taken: HashSet<String>,
    max_len: usize,
}

impl NameRegistry {
    pub fn new(max_len: usize) -> Self {
        Self {
            taken: HashSet::new(),
            max_len,
        }
    }

    /// Mark a name as unavailable (existing folder, fallback bucket)
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_lowercase());
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(&name.to_lowercase())
    }

    /// Claim `name` cut to the length cap, or the first free suffixed
    /// variant of it
    pub fn claim(&mut self, name: &str) -> String {
        let name = utils::truncate_chars(name, self.max_len).trim_end_matches('_');
        if !self.is_taken(name) {
            self.reserve(name);
            return name.to_string();
        }

        let mut n = 2;
        loop {
            let suffix = format!("_{}", n);
            let room = self.max_len.saturating_sub(suffix.len());
            let base = utils::truncate_chars(name, room).trim_end_matches('_');
            let candidate = format!("{}{}", base, suffix);
            if !self.is_taken(&candidate) {
                self.reserve(&candidate);
                return candidate;
            }
            n += 1;
        }
    }
}
