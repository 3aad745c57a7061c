use std::fmt;

/// Where a cached listing lives.
///
/// Rendered as `{prefix}:v{version}:{shard_param}={shard_value}`. An empty
/// prefix and a zero version are left out, so a bare gate yields
/// `department_id=10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix: String,
    version: u32,
    shard_param: String,
    shard_value: String,
}

impl CacheKey {
    pub fn new(
        prefix: impl Into<String>,
        version: u32,
        shard_param: impl Into<String>,
        shard_value: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            version,
            shard_param: shard_param.into(),
            shard_value: shard_value.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn shard_param(&self) -> &str {
        &self.shard_param
    }

    #[must_use]
    pub fn shard_value(&self) -> &str {
        &self.shard_value
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_empty() {
            write!(f, "{}:", self.prefix)?;
        }
        if self.version != 0 {
            write!(f, "v{}:", self.version)?;
        }
        write!(f, "{}={}", self.shard_param, self.shard_value)
    }
}
