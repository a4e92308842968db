use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use storyboard_core::StoryboardConfig;

/// Settings for the terminal viewer, read from an optional JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    pub storyboard: StoryboardConfig,
    /// Simulated delay before the worker answers a child fetch.
    pub fetch_latency_ms: u64,
    /// Input poll interval.
    pub tick_ms: u64,
    /// Terminal columns one frame cell takes.
    pub frame_width_cols: f64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            storyboard: StoryboardConfig::default(),
            fetch_latency_ms: 150,
            tick_ms: 100,
            frame_width_cols: 22.0,
        }
    }
}

impl TuiConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data =
            std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_slice(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.storyboard.validate()?;
        Ok(config)
    }
}
