use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Tunables of the navigation engine.
///
/// Every field has a default, so a config file only needs to list the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryboardConfig {
    /// Horizontal space one frame takes, in logical pixels. Used to derive
    /// the page size from the viewport width.
    pub frame_width_px: f64,
    /// Frames moved per PageLeft / PageRight.
    pub page_step: usize,
    /// Page size used until the presentation layer reports one.
    pub initial_page_size: usize,
}

impl Default for StoryboardConfig {
    fn default() -> Self {
        Self {
            frame_width_px: 200.0,
            page_step: 1,
            initial_page_size: 1,
        }
    }
}

impl StoryboardConfig {
    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frame_width_px.is_finite() && self.frame_width_px > 0.0) {
            return Err(ConfigError::Invalid {
                field: "frame_width_px",
                reason: "must be a positive number",
            });
        }
        if self.page_step == 0 {
            return Err(ConfigError::Invalid {
                field: "page_step",
                reason: "must be at least 1",
            });
        }
        if self.initial_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "initial_page_size",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = StoryboardConfig::from_json(br#"{"page_step": 3}"#).expect("partial config");
        assert_eq!(config.page_step, 3);
        assert_eq!(config.frame_width_px, 200.0);
        assert_eq!(config.initial_page_size, 1);
    }

    #[test]
    fn rejects_zero_step() {
        let err = StoryboardConfig::from_json(br#"{"page_step": 0}"#);
        assert!(matches!(
            err,
            Err(ConfigError::Invalid {
                field: "page_step",
                ..
            })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            StoryboardConfig::from_json(b"{"),
            Err(ConfigError::Json(_))
        ));
    }
}
