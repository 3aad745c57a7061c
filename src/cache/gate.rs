use crate::config::CacheGateConfig;
use crate::context::RequestContext;

use super::key::CacheKey;

/// Outcome of the cache gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
    /// Compute a fresh response and do not store it.
    Bypass,
    /// Serve from, or store under, this key.
    Cached(CacheKey),
}

impl CacheDecision {
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    #[must_use]
    pub const fn key(&self) -> Option<&CacheKey> {
        match self {
            Self::Cached(key) => Some(key),
            Self::Bypass => None,
        }
    }
}

/// Decides whether a listing response may be cached, and under which key.
#[derive(Debug, Clone)]
pub struct CacheGate {
    enabled: bool,
    sharding_param: String,
    required_flags: Vec<String>,
    key_prefix: String,
    key_version: u32,
}

impl CacheGate {
    #[must_use]
    pub fn from_config(config: &CacheGateConfig) -> Self {
        Self {
            enabled: config.enabled,
            sharding_param: config.sharding_param.clone(),
            required_flags: config.required_flags.clone(),
            key_prefix: config.key_prefix.clone(),
            key_version: config.key_version,
        }
    }

    /// A gate that never caches.
    #[must_use]
    pub fn disabled() -> Self {
        Self::from_config(&CacheGateConfig {
            enabled: false,
            ..CacheGateConfig::default()
        })
    }

    #[must_use]
    pub fn sharding_param(&self) -> &str {
        &self.sharding_param
    }

    /// `Cached` only when the gate is enabled, the sharding parameter is
    /// present and every required flag is set. Anything else bypasses.
    #[must_use]
    pub fn decide(&self, ctx: &RequestContext) -> CacheDecision {
        if !self.enabled || self.sharding_param.is_empty() {
            return CacheDecision::Bypass;
        }
        if !self.required_flags.iter().all(|flag| ctx.flag(flag)) {
            return CacheDecision::Bypass;
        }

        let values = ctx.params.list(&self.sharding_param);
        if values.is_empty() {
            return CacheDecision::Bypass;
        }
        CacheDecision::Cached(self.derive_key(&values.join(",")))
    }

    /// Key for a sharding value.
    ///
    /// Only the sharding value goes into the key. Requests that share it but
    /// carry different secondary filters (`search`, `id`, ...) map to the same
    /// entry, and whichever response is stored first is served to all of them.
    /// Callers that combine secondary filters with a cacheable shard must
    /// account for this.
    #[must_use]
    pub fn derive_key(&self, shard_value: &str) -> CacheKey {
        CacheKey::new(
            self.key_prefix.as_str(),
            self.key_version,
            self.sharding_param.as_str(),
            shard_value,
        )
    }
}
