use tracing::warn;

use crate::types::{CompatibilityLevel, Mode};

/// Process-level defaults and tuning knobs for a registry instance.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Size of the id blocks reserved from the durable per-context counter.
    /// Larger blocks mean fewer compare-and-swap round trips under write
    /// contention, at the cost of wider id gaps after a crash.
    pub(crate) id_block_size: u32,
    /// Retry budget for compare-and-swap contention before the operation is
    /// surfaced as an internal error.
    pub(crate) max_retries: u32,
    /// Compatibility level applied when neither subject nor context-global
    /// config sets one.
    pub(crate) default_compatibility: CompatibilityLevel,
    /// Mode applied when neither subject nor context-global mode is set.
    pub(crate) default_mode: Mode,
    /// Whether registration normalizes schemas when the request and the
    /// subject config are both silent.
    pub(crate) normalize_by_default: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_block_size: 50,
            max_retries: 5,
            default_compatibility: CompatibilityLevel::Backward,
            default_mode: Mode::ReadWrite,
            normalize_by_default: false,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the id block size. A size of 1 degrades to one CAS per id, which
    /// keeps ids dense when a source registry must be mirrored one-for-one.
    pub fn id_block_size(mut self, size: u32) -> Self {
        if size == 0 {
            warn!("id block size 0 is not usable, clamping to 1");
            self.id_block_size = 1;
        } else {
            self.id_block_size = size;
        }
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn default_compatibility(mut self, level: CompatibilityLevel) -> Self {
        self.default_compatibility = level;
        self
    }

    pub fn default_mode(mut self, mode: Mode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn normalize_by_default(mut self, normalize: bool) -> Self {
        self.normalize_by_default = normalize;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_block_size_is_clamped() {
        let config = RegistryConfig::new().id_block_size(0);
        assert_eq!(config.id_block_size, 1);
    }

    #[test]
    fn defaults_match_the_documented_contract() {
        let config = RegistryConfig::default();
        assert_eq!(config.id_block_size, 50);
        assert_eq!(config.default_compatibility, CompatibilityLevel::Backward);
        assert_eq!(config.default_mode, Mode::ReadWrite);
        assert!(!config.normalize_by_default);
    }
}
