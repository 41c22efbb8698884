use crate::collectors::COLLECTOR_NAMES;
use anyhow::{Result, bail};

#[derive(Clone, Debug, Default)]
pub struct CollectorConfig {
    enabled_collectors: Vec<String>,
}

impl CollectorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `collectors`, keeping the first occurrence of each name.
    #[must_use]
    pub fn with_enabled(mut self, collectors: &[String]) -> Self {
        for name in collectors {
            if !self.enabled_collectors.contains(name) {
                self.enabled_collectors.push(name.clone());
            }
        }
        self
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_collectors.iter().any(|n| n == name)
    }

    #[must_use]
    pub fn enabled(&self) -> &[String] {
        &self.enabled_collectors
    }

    /// # Errors
    ///
    /// Returns an error naming the first collector that does not exist.
    pub fn validate(&self) -> Result<()> {
        for name in &self.enabled_collectors {
            if !COLLECTOR_NAMES.contains(&name.as_str()) {
                bail!(
                    "unknown collector '{name}', available: {}",
                    COLLECTOR_NAMES.join(", ")
                );
            }
        }
        Ok(())
    }
}
