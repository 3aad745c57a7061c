use serde::Deserialize;

/// Settings for a listing endpoint.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use filtercrate::config::ListingConfig;
///
/// let config = ListingConfig::from_json(r#"{"cache": {"enabled": false}}"#).unwrap();
/// assert!(!config.cache.enabled);
/// assert_eq!(config.search.max_terms, 32);
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingConfig {
    pub cache: CacheGateConfig,
    pub search: SearchConfig,
}

impl ListingConfig {
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document is not valid JSON or a
    /// field has the wrong type.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// When and under which key a rendered listing may be cached.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheGateConfig {
    /// A disabled gate always bypasses.
    pub enabled: bool,
    /// Request parameter whose value identifies the cache entry.
    pub sharding_param: String,
    /// Derived request flags that must all be true.
    pub required_flags: Vec<String>,
    /// Namespace for keys; omitted from the key when empty.
    pub key_prefix: String,
    /// Bump to orphan every previously stored entry.
    pub key_version: u32,
}

impl Default for CacheGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sharding_param: String::new(),
            required_flags: Vec::new(),
            key_prefix: String::new(),
            key_version: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    /// Characters of sanitized input kept before tokenizing.
    pub max_query_length: usize,
    /// Tokens beyond this count are dropped.
    pub max_terms: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_query_length: 10_000,
            max_terms: 32,
        }
    }
}
