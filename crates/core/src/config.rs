//! Buffer configuration: size plus diagnostic switches.
//!
//! `OffscreenConfig` is plain data with serde support so a pipeline can keep
//! it next to its filter parameters.

use serde::{Deserialize, Serialize};

use crate::error::OffscreenError;

/// Diagnostic logging switches. Output goes to the `log` facade at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    /// Log every negotiated configuration candidate, not just the selected one.
    pub list_configs: bool,
    /// Log implementation limits right after the context is made current.
    pub log_context_limits: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            list_configs: true,
            log_context_limits: true,
        }
    }
}

impl Diagnostics {
    /// No diagnostic output.
    pub fn quiet() -> Self {
        Self {
            list_configs: false,
            log_context_limits: false,
        }
    }
}

/// Size and diagnostics of an off-screen buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffscreenConfig {
    /// Surface and render target width in pixels.
    pub width: u32,
    /// Surface and render target height in pixels.
    pub height: u32,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl OffscreenConfig {
    /// A `width` x `height` buffer with default diagnostics.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Parses a config from JSON, e.g. `{"width": 64, "height": 64}`.
    ///
    /// # Errors
    ///
    /// Returns `OffscreenError::InvalidConfig` on malformed JSON or missing
    /// fields, and `OffscreenError::InvalidDimensions` for a zero size.
    pub fn from_json(json: &str) -> Result<Self, OffscreenError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| OffscreenError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that both dimensions are positive.
    ///
    /// # Errors
    ///
    /// Returns `OffscreenError::InvalidDimensions` if either is zero.
    pub fn validate(&self) -> Result<(), OffscreenError> {
        if self.width == 0 || self.height == 0 {
            return Err(OffscreenError::InvalidDimensions);
        }
        Ok(())
    }
}
