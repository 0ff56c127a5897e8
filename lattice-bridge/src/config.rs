//! Host configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for a [`Root`](crate::host::Root).
///
/// ```rust
/// use lattice_bridge::config::HostConfig;
///
/// let config = HostConfig::from_json(r#"{ "max_render_passes": 10 }"#).unwrap();
/// assert_eq!(config.max_render_passes, 10);
/// assert!(config.strict_hooks);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Render passes a single flush may take before it fails with
    /// [`RenderError::RenderLoop`](crate::error::RenderError::RenderLoop).
    pub max_render_passes: usize,

    /// Fail a re-render that calls a different number of hooks.
    pub strict_hooks: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_render_passes: 50,
            strict_hooks: true,
        }
    }
}

impl HostConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_render_passes == 0 {
            return Err(ConfigError::ZeroPasses);
        }
        Ok(())
    }
}
