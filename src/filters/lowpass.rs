//! Gap-aware zero-phase low-pass filtering.
//!
//! Non-finite samples mark occlusion gaps. Each row is compacted to its finite
//! samples, filtered forward and backward with an odd extension one sample
//! shorter than the compacted run, and scattered back. Gap positions come out
//! as NaN; nothing is interpolated across them.

use super::butterworth::butter_lowpass;
use super::zero_phase::ZeroPhase;
use crate::config::LowpassConfig;
use crate::error::{GallopError, Result};
use ndarray::{Array, Array1, ArrayBase, ArrayView1, Axis, Data, Dimension};

/// Designed low-pass filter, reusable across signals sharing a sampling rate.
#[derive(Clone, Debug)]
pub struct LowpassFilter {
    config: LowpassConfig,
    kernel: ZeroPhase,
}

impl LowpassFilter {
    pub fn new(config: LowpassConfig) -> Result<Self> {
        config.validate()?;
        let tf = butter_lowpass(config.order, config.normalized_cutoff())?;
        let kernel = ZeroPhase::new(tf)?;
        Ok(LowpassFilter { config, kernel })
    }

    pub fn config(&self) -> &LowpassConfig {
        &self.config
    }

    /// Filter one row; `row_index` only labels errors.
    pub fn filter_row(&self, row: ArrayView1<'_, f64>, row_index: usize) -> Result<Array1<f64>> {
        let valid: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, _)| i)
            .collect();
        let compact: Vec<f64> = valid.iter().map(|&i| row[i]).collect();
        let available = compact.len();
        let padding = available.saturating_sub(1);

        let filtered = self
            .kernel
            .apply(&compact, padding)
            .ok_or(GallopError::InsufficientSamples {
                row: row_index,
                available,
                padding,
            })?;

        if available == row.len() {
            return Ok(Array1::from(filtered));
        }
        let mut out = Array1::from_elem(row.len(), f64::NAN);
        for (&idx, &value) in valid.iter().zip(filtered.iter()) {
            out[idx] = value;
        }
        Ok(out)
    }

    /// Filter every lane along the last axis. A rank-1 array is one row; a
    /// rank-2 array is filtered row by row. Stops at the first failing row.
    pub fn apply<S, D>(&self, data: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        if data.ndim() == 0 {
            return Err(GallopError::argument("cannot filter a zero-dimensional array"));
        }
        let time_axis = Axis(data.ndim() - 1);
        let mut out = data.to_owned();
        for (row_index, mut lane) in out.lanes_mut(time_axis).into_iter().enumerate() {
            let filtered = self.filter_row(lane.view(), row_index)?;
            lane.assign(&filtered);
        }
        Ok(out)
    }
}

/// One-shot low-pass: design the filter and apply it along the last axis.
pub fn lowpass_filter<S, D>(
    data: &ArrayBase<S, D>,
    cutoff_hz: f64,
    sample_rate_hz: f64,
    order: usize,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let config = LowpassConfig::new(cutoff_hz, sample_rate_hz).with_order(order);
    LowpassFilter::new(config)?.apply(data)
}
