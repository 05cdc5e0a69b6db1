use std::path::Path;

/// Get file extension from path (without the dot)
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Get the file name as a display string
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Keep at most `max_chars` characters from the head of `text`
///
/// Cuts on a char boundary so the result is always valid UTF-8, and the same
/// input always yields the same output.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Split a string into lowercase word tokens
///
/// Splits on anything that is not alphanumeric and on camelCase boundaries,
/// so `MyProject_notes-2024` gives `my`, `project`, `notes`, `2024`.
pub fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for part in s.split(|c: char| !c.is_alphanumeric()) {
        if part.is_empty() {
            continue;
        }
        for word in split_camel_case(part) {
            if !word.is_empty() {
                tokens.push(word);
            }
        }
    }

    tokens
}

/// Split camelCase or PascalCase string
fn split_camel_case(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in s.chars() {
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

/// Uppercase the first character and lowercase the rest
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_extension_with_txt() {
        let path = Path::new("/path/to/file.txt");
        assert_eq!(get_extension(path), Some("txt".to_string()));
    }

    #[test]
    fn test_get_extension_lowercase() {
        let path = Path::new("/path/to/file.TXT");
        assert_eq!(get_extension(path), Some("txt".to_string()));
    }

    #[test]
    fn test_get_extension_no_extension() {
        let path = Path::new("/path/to/file");
        assert_eq!(get_extension(path), None);
    }

    #[test]
    fn test_get_extension_multiple_dots() {
        let path = Path::new("/path/to/file.tar.gz");
        assert_eq!(get_extension(path), Some("gz".to_string()));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 4), "héll");
        assert_eq!(truncate_chars(text, 100), text);
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_tokenize_mixed_delimiters() {
        assert_eq!(
            tokenize("MyProject_notes-2024.final"),
            vec!["my", "project", "notes", "2024", "final"]
        );
    }

    #[test]
    fn test_tokenize_keeps_acronyms_together() {
        assert_eq!(tokenize("PDFReport"), vec!["pdfreport"]);
        assert_eq!(tokenize("camelCase"), vec!["camel", "case"]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("budget"), "Budget");
        assert_eq!(capitalize("INVOICE"), "Invoice");
        assert_eq!(capitalize(""), "");
    }
}
