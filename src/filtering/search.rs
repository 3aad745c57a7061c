use crate::config::SearchConfig;

/// Turn raw free-text input into search terms using the default limits.
///
/// Every character other than ASCII letters, digits and ASCII whitespace is
/// dropped, then the rest is split on whitespace. Unicode spaces such as
/// NBSP are dropped too, so they join their neighbours. Case is kept.
///
/// ```rust
/// use filtercrate::filtering::normalize_search;
///
/// assert_eq!(normalize_search("Algebra II!"), vec!["Algebra", "II"]);
/// assert!(normalize_search("?!...").is_empty());
/// ```
#[must_use]
pub fn normalize_search(input: &str) -> Vec<String> {
    normalize_search_with(input, &SearchConfig::default())
}

/// [`normalize_search`] with explicit length and term limits.
#[must_use]
pub fn normalize_search_with(input: &str, config: &SearchConfig) -> Vec<String> {
    let sanitized: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || *c == '\x0B')
        .take(config.max_query_length)
        .collect();

    sanitized
        .split_whitespace()
        .take(config.max_terms)
        .map(str::to_string)
        .collect()
}
