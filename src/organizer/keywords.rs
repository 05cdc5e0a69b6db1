use crate::constants::STOP_WORDS;
use crate::utils;
use std::collections::HashMap;
use std::path::Path;

/// Meaningful words from a file name (stem only, camelCase split)
pub fn keywords_from_path<P: AsRef<Path>>(path: P) -> Vec<String> {
    path.as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| utils::tokenize(stem).into_iter().filter(|t| is_keyword(t)).collect())
        .unwrap_or_default()
}

/// The `top` most frequent keywords across `texts`
///
/// Ties are broken alphabetically, so the result only depends on the input.
pub fn top_keywords<'a, I>(texts: I, top: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for token in utils::tokenize(text) {
            if is_keyword(&token) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
    }

    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.into_iter().take(top).map(|(word, _)| word).collect()
}

/// At least three characters, not a stop word, not a bare number
fn is_keyword(token: &str) -> bool {
    token.chars().count() >= 3
        && !token.chars().all(|c| c.is_ascii_digit())
        && !STOP_WORDS.contains(&token)
}
