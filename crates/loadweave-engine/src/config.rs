// Configuration for the loadweave engine
//
// This module provides configuration options for an orchestrator
// instance.

use loadweave_types::NormalizerConfig;

/// Configuration for an orchestrator instance
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Length of environment-assigned unit identifiers
    pub id_length: usize,

    /// Length of the random suffix on generated list names
    pub list_name_length: usize,

    /// Normalizer settings; `None` uses the environment's base settings
    pub normalizer: Option<NormalizerConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_length: 32,
            list_name_length: 12,
            normalizer: None,
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unit identifier length
    pub fn with_id_length(mut self, length: usize) -> Self {
        self.id_length = length;
        self
    }

    /// Set the generated list name suffix length
    pub fn with_list_name_length(mut self, length: usize) -> Self {
        self.list_name_length = length;
        self
    }

    /// Override the environment's normalizer settings
    pub fn with_normalizer(mut self, normalizer: NormalizerConfig) -> Self {
        self.normalizer = Some(normalizer);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.id_length, 32);
        assert_eq!(config.list_name_length, 12);
        assert!(config.normalizer.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .with_id_length(8)
            .with_list_name_length(4)
            .with_normalizer(NormalizerConfig::new().with_host("h.example.org"));
        assert_eq!(config.id_length, 8);
        assert_eq!(config.list_name_length, 4);
        assert_eq!(config.normalizer.unwrap().host, "h.example.org");
    }
}
