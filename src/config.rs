//! Filter and processing configuration.
//!
//! `ProcessingConfig` can be loaded from a JSON file; any field left out takes
//! its default.
//!
//! ```json
//! { "marker_cutoff_hz": 6.0, "analog_cutoff_hz": 50.0, "order": 2, "max_edge_skew": 0.001 }
//! ```

use crate::error::{GallopError, Result};
use crate::filters::DEFAULT_ORDER;
use crate::transforms::MAX_EDGE_SKEW;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_order() -> usize {
    DEFAULT_ORDER
}

/// Low-pass design parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LowpassConfig {
    /// -3 dB point of a single pass (Hz).
    pub cutoff_hz: f64,
    /// Sampling rate of the filtered signal (Hz).
    pub sample_rate_hz: f64,
    /// Single-pass order.
    #[serde(default = "default_order")]
    pub order: usize,
}

impl LowpassConfig {
    pub fn new(cutoff_hz: f64, sample_rate_hz: f64) -> Self {
        LowpassConfig {
            cutoff_hz,
            sample_rate_hz,
            order: DEFAULT_ORDER,
        }
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz / 2.0
    }

    /// Cutoff relative to Nyquist.
    pub fn normalized_cutoff(&self) -> f64 {
        self.cutoff_hz / self.nyquist_hz()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(GallopError::argument(format!(
                "sampling rate must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if !(self.cutoff_hz.is_finite() && self.cutoff_hz > 0.0 && self.cutoff_hz < self.nyquist_hz())
        {
            return Err(GallopError::argument(format!(
                "cutoff {} Hz must lie between 0 and the Nyquist frequency {} Hz",
                self.cutoff_hz,
                self.nyquist_hz()
            )));
        }
        if self.order == 0 {
            return Err(GallopError::argument("filter order must be at least 1"));
        }
        Ok(())
    }
}

/// Cutoffs used when filtering a whole trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub marker_cutoff_hz: f64,
    pub analog_cutoff_hz: f64,
    pub order: usize,
    /// Largest |cos| between a platform's X and Y corner edges.
    pub max_edge_skew: f64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            marker_cutoff_hz: 6.0,
            analog_cutoff_hz: 50.0,
            order: DEFAULT_ORDER,
            max_edge_skew: MAX_EDGE_SKEW,
        }
    }
}

impl ProcessingConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| GallopError::argument(format!("invalid processing config: {e}")))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn marker_filter(&self, sample_rate_hz: f64) -> LowpassConfig {
        LowpassConfig::new(self.marker_cutoff_hz, sample_rate_hz).with_order(self.order)
    }

    pub fn analog_filter(&self, sample_rate_hz: f64) -> LowpassConfig {
        LowpassConfig::new(self.analog_cutoff_hz, sample_rate_hz).with_order(self.order)
    }
}
