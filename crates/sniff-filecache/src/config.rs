use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::byte_unit::ByteUnit;

pub const DEFAULT_PER_KEY_LIMIT: ByteUnit = ByteUnit::from_kb(512);
pub const DEFAULT_GLOBAL_LIMIT: ByteUnit = ByteUnit::from_mb(64);
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Budgets for a [`crate::FileCache`].
///
/// Every field has a default, so a config file only needs to name the values
/// it wants to change:
///
/// ```toml
/// per_key_limit = "256 KB"
/// global_limit = "32 MB"
/// max_age_secs = 300
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Bytes cached for a single path hash before its oldest segments are evicted.
    pub per_key_limit: ByteUnit,

    /// Bytes cached across all path hashes before whole least recently
    /// touched entries are evicted.
    pub global_limit: ByteUnit,

    /// Idle seconds after which `cleanup` expires an entry.
    pub max_age_secs: u64,
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            per_key_limit: DEFAULT_PER_KEY_LIMIT,
            global_limit: DEFAULT_GLOBAL_LIMIT,
            max_age_secs: DEFAULT_MAX_AGE.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sniff_test::test]
    fn test_partial_config_uses_defaults() {
        let config: CacheConfig =
            serde_json::from_str(r#"{ "per_key_limit": "4 KB", "max_age_secs": 5 }"#).unwrap();

        assert_eq!(config.per_key_limit, ByteUnit::from_kb(4));
        assert_eq!(config.global_limit, DEFAULT_GLOBAL_LIMIT);
        assert_eq!(config.max_age(), Duration::from_secs(5));
    }

    #[sniff_test::test]
    fn test_default() {
        let config = CacheConfig::default();
        assert_eq!(config.per_key_limit.as_u64(), 512 * 1024);
        assert_eq!(config.global_limit.as_u64(), 64 * 1024 * 1024);
        assert_eq!(config.max_age(), DEFAULT_MAX_AGE);
    }
}
