use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::types::Config;

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .context("failed to parse YAML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.listener.queue_capacity == 0 {
            anyhow::bail!("listener.queue_capacity must be greater than zero");
        }

        if self.listener.udp_buffer_size == 0 {
            anyhow::bail!("listener.udp_buffer_size must be greater than zero");
        }

        if self.store.max_rules == 0 {
            anyhow::bail!("store.max_rules must be greater than zero");
        }

        if self.rules.len() > self.store.max_rules {
            anyhow::bail!(
                "{} seed rules exceed store.max_rules ({})",
                self.rules.len(),
                self.store.max_rules
            );
        }

        // Seed rule IDs must be unique, otherwise later entries silently replace earlier ones
        let mut ids = std::collections::HashSet::new();
        for rule in &self.rules {
            if let Some(id) = rule.id.as_deref().filter(|id| !id.is_empty()) {
                if !ids.insert(id) {
                    anyhow::bail!("duplicate rule id: {}", id);
                }
            }
        }

        info!("configuration validated successfully");
        Ok(())
    }
}
