//! Marker trajectory set: (axis, channel, time) samples for labeled markers.

use super::time_vector;
use crate::c3d::ParameterMap;
use crate::error::{GallopError, Result};
use crate::filters::LowpassFilter;
use ndarray::{s, Array1, Array3, ArrayView2, Axis};
use serde::Serialize;
use std::collections::HashSet;

/// Entries of the axis dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MarkerAxis {
    X,
    Y,
    Z,
    /// Residual of the reconstruction; negative for invalid samples.
    W,
}

impl MarkerAxis {
    pub const ALL: [MarkerAxis; 4] = [MarkerAxis::X, MarkerAxis::Y, MarkerAxis::Z, MarkerAxis::W];

    pub fn index(self) -> usize {
        match self {
            MarkerAxis::X => 0,
            MarkerAxis::Y => 1,
            MarkerAxis::Z => 2,
            MarkerAxis::W => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MarkerAxis::X => "x",
            MarkerAxis::Y => "y",
            MarkerAxis::Z => "z",
            MarkerAxis::W => "w",
        }
    }
}

/// Metadata carried by a marker set.
#[derive(Clone, Debug, Serialize)]
pub struct MarkerMeta {
    /// Sampling rate (Hz).
    pub rate: f64,
    /// Index of the first stored frame in the original capture.
    pub first_frame: i64,
    /// Last frame, counted from the first stored frame.
    pub last_frame: i64,
    /// Header fields merged with the POINT group.
    pub parameters: ParameterMap,
}

impl MarkerMeta {
    pub fn sample_count(&self) -> usize {
        (self.last_frame + 1).max(0) as usize
    }
}

/// Labeled marker trajectories. Immutable once built.
#[derive(Clone, Debug)]
pub struct MarkerSet {
    data: Array3<f64>,
    labels: Vec<String>,
    time: Array1<f64>,
    meta: MarkerMeta,
}

impl MarkerSet {
    pub const DIMS: [&'static str; 3] = ["axis", "channel", "time"];

    /// Build from samples shaped (4, labels, last_frame + 1).
    pub fn new(data: Array3<f64>, labels: Vec<String>, meta: MarkerMeta) -> Result<Self> {
        let (axes, channels, samples) = data.dim();
        if axes != MarkerAxis::ALL.len() {
            return Err(GallopError::data_shape(format!(
                "marker data has {axes} axes, expected {}",
                MarkerAxis::ALL.len()
            )));
        }
        if channels != labels.len() {
            return Err(GallopError::data_shape(format!(
                "{} marker labels for {channels} marker channels",
                labels.len()
            )));
        }
        if samples != meta.sample_count() {
            return Err(GallopError::data_shape(format!(
                "marker data holds {samples} frames but last_frame is {}",
                meta.last_frame
            )));
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(GallopError::data_shape(format!(
                    "duplicate marker label '{label}'"
                )));
            }
        }

        let time = time_vector(samples, meta.rate);
        Ok(MarkerSet {
            data,
            labels,
            time,
            meta,
        })
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub fn meta(&self) -> &MarkerMeta {
        &self.meta
    }

    pub fn rate(&self) -> f64 {
        self.meta.rate
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn frame_count(&self) -> usize {
        self.time.len()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// One marker as (axis, time).
    pub fn marker(&self, label: &str) -> Option<ArrayView2<'_, f64>> {
        self.index_of(label)
            .map(|idx| self.data.index_axis(Axis(1), idx))
    }

    /// One axis for every marker as (channel, time).
    pub fn axis(&self, axis: MarkerAxis) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), axis.index())
    }

    /// Frames where the marker has no valid position.
    pub fn gap_count(&self, label: &str) -> Option<usize> {
        self.marker(label).map(|m| {
            m.index_axis(Axis(0), MarkerAxis::X.index())
                .iter()
                .filter(|v| !v.is_finite())
                .count()
        })
    }

    /// New set with x, y and z low-pass filtered along time. Residuals are
    /// copied unchanged and gaps stay gaps.
    pub fn filtered(&self, filter: &LowpassFilter) -> Result<MarkerSet> {
        let positions = filter.apply(&self.data.slice(s![0..3, .., ..]))?;
        let mut data = self.data.clone();
        data.slice_mut(s![0..3, .., ..]).assign(&positions);
        Ok(MarkerSet {
            data,
            labels: self.labels.clone(),
            time: self.time.clone(),
            meta: self.meta.clone(),
        })
    }
}
