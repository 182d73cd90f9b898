//! URL features used for rescoring.
//!
//! Pure functions only:
//! - URL normalization (scheme and host removal)
//! - Levenshtein edit distance over characters
//! - Edit distance normalized by the longer string

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCHEME_HOST: Regex = Regex::new(r"^https?://[^/:]+").expect("valid regex");
}

/// Strip the leading `scheme://host` from a URL line.
///
/// The line is trimmed first. A port, if any, is kept with the path
/// (`http://h:8080/p` becomes `:8080/p`). Lines without an http(s) prefix
/// come back trimmed but otherwise unchanged.
pub fn normalize_url(line: &str) -> String {
    let trimmed = line.trim();
    match SCHEME_HOST.find(trimmed) {
        // Removes the first occurrence of the matched text, which is the
        // anchored prefix itself; later repeats of the host stay in place.
        Some(prefix) => trimmed.replacen(prefix.as_str(), "", 1),
        None => trimmed.to_string(),
    }
}

/// Length in the unit `edit_distance` works on.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Compute Levenshtein edit distance between two strings.
pub fn edit_distance(s1: &str, s2: &str) -> usize {
    let s1: Vec<char> = s1.chars().collect();
    let s2: Vec<char> = s2.chars().collect();

    if s1.is_empty() {
        return s2.len();
    }
    if s2.is_empty() {
        return s1.len();
    }

    let mut prev: Vec<usize> = (0..=s2.len()).collect();
    let mut curr = vec![0; s2.len() + 1];

    for (i, c1) in s1.iter().enumerate() {
        curr[0] = i + 1;
        for (j, c2) in s2.iter().enumerate() {
            let cost = if c1 == c2 { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[s2.len()]
}

/// Edit distance divided by the longer string's length.
///
/// Returns 0.0 when either side is empty, so a root URL never counts as
/// distant from anything.
pub fn normalized_distance(url1: &str, url2: &str) -> f64 {
    if url1.is_empty() || url2.is_empty() {
        return 0.0;
    }
    let longest = char_len(url1).max(char_len(url2));
    edit_distance(url1, url2) as f64 / longest as f64
}
