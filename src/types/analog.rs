//! Analog channel set: (channel, plate, time) force platform samples.

use super::linalg::{Corners, Rotation3, Vec3};
use super::time_vector;
use crate::c3d::ParameterMap;
use crate::error::{GallopError, Result};
use crate::filters::LowpassFilter;
use ndarray::{Array1, Array3, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

/// AMTI-style platforms report six channels each.
pub const CHANNELS_PER_PLATFORM: usize = 6;

/// Entries of the channel dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AnalogChannel {
    Fx,
    Fy,
    Fz,
    Mx,
    My,
    Mz,
}

impl AnalogChannel {
    pub const ALL: [AnalogChannel; CHANNELS_PER_PLATFORM] = [
        AnalogChannel::Fx,
        AnalogChannel::Fy,
        AnalogChannel::Fz,
        AnalogChannel::Mx,
        AnalogChannel::My,
        AnalogChannel::Mz,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            AnalogChannel::Fx => "fx",
            AnalogChannel::Fy => "fy",
            AnalogChannel::Fz => "fz",
            AnalogChannel::Mx => "mx",
            AnalogChannel::My => "my",
            AnalogChannel::Mz => "mz",
        }
    }
}

/// Origin and orientation of one force platform.
///
/// `rotation` rows are the platform's local X, Y and Z axes expressed in the
/// global frame, so `rotation * v` maps a global vector into the platform frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PlatformFrame {
    pub origin: Vec3,
    pub rotation: Rotation3,
}

impl PlatformFrame {
    /// Global point expressed in platform coordinates.
    pub fn to_local(&self, point: &Vec3) -> Vec3 {
        self.rotation * (point - self.origin)
    }
}

/// Metadata carried by an analog set.
#[derive(Clone, Debug)]
pub struct AnalogMeta {
    /// Analog sampling rate (Hz).
    pub rate: f64,
    pub first_frame: i64,
    /// Last sample, counted from the first stored sample.
    pub last_frame: i64,
    /// Vendor channel slots with a label.
    pub used_channels: Vec<usize>,
    /// Vendor channel slots left blank.
    pub unused_channels: Vec<usize>,
    pub plate_count: usize,
    /// Corner points per used platform.
    pub corners: Vec<Corners>,
    /// Header fields merged with the FORCE_PLATFORM and ANALOG groups.
    pub parameters: ParameterMap,
}

impl AnalogMeta {
    pub fn sample_count(&self) -> usize {
        (self.last_frame + 1).max(0) as usize
    }
}

/// Force platform channels for every used platform. Immutable once built;
/// coordinate frames are attached by [`AnalogSet::with_frames`].
#[derive(Clone, Debug)]
pub struct AnalogSet {
    data: Array3<f64>,
    plates: Vec<String>,
    time: Array1<f64>,
    meta: AnalogMeta,
    frames: Option<Vec<PlatformFrame>>,
}

impl AnalogSet {
    pub const DIMS: [&'static str; 3] = ["channel", "plate", "time"];

    /// Build from samples shaped (6, plate_count, last_frame + 1).
    pub fn new(data: Array3<f64>, meta: AnalogMeta) -> Result<Self> {
        let expected = (CHANNELS_PER_PLATFORM, meta.plate_count, meta.sample_count());
        if data.dim() != expected {
            return Err(GallopError::data_shape(format!(
                "analog data shaped {:?}, expected {:?}",
                data.dim(),
                expected
            )));
        }
        let plates = (1..=meta.plate_count).map(|i| format!("FP{i}")).collect();
        let time = time_vector(meta.sample_count(), meta.rate);
        Ok(AnalogSet {
            data,
            plates,
            time,
            meta,
            frames: None,
        })
    }

    /// Attach one coordinate frame per plate, producing the extended set.
    pub fn with_frames(self, frames: Vec<PlatformFrame>) -> Result<Self> {
        if self.frames.is_some() {
            return Err(GallopError::argument(
                "coordinate frames are already attached to this analog set",
            ));
        }
        if frames.len() != self.meta.plate_count {
            return Err(GallopError::data_shape(format!(
                "{} coordinate frames for {} force platforms",
                frames.len(),
                self.meta.plate_count
            )));
        }
        Ok(AnalogSet {
            frames: Some(frames),
            ..self
        })
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn plate_names(&self) -> &[String] {
        &self.plates
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub fn meta(&self) -> &AnalogMeta {
        &self.meta
    }

    pub fn rate(&self) -> f64 {
        self.meta.rate
    }

    pub fn plate_count(&self) -> usize {
        self.meta.plate_count
    }

    pub fn sample_count(&self) -> usize {
        self.time.len()
    }

    pub fn frames(&self) -> Option<&[PlatformFrame]> {
        self.frames.as_deref()
    }

    /// ORIGIN: platform origins in the global frame, indexed like the plates.
    pub fn origins(&self) -> Option<Vec<Vec3>> {
        self.frames
            .as_ref()
            .map(|frames| frames.iter().map(|f| f.origin).collect())
    }

    /// ROTATION: global-to-platform rotation matrices, indexed like the plates.
    pub fn rotations(&self) -> Option<Vec<Rotation3>> {
        self.frames
            .as_ref()
            .map(|frames| frames.iter().map(|f| f.rotation).collect())
    }

    /// All six channels of one plate as (channel, time).
    pub fn plate(&self, plate: usize) -> Option<ArrayView2<'_, f64>> {
        (plate < self.plate_count()).then(|| self.data.index_axis(Axis(1), plate))
    }

    pub fn channel(&self, channel: AnalogChannel, plate: usize) -> Option<ArrayView1<'_, f64>> {
        self.plate(plate)
            .map(|p| p.index_axis_move(Axis(0), channel.index()))
    }

    /// New set with every channel low-pass filtered along time. Frames carry over.
    pub fn filtered(&self, filter: &LowpassFilter) -> Result<AnalogSet> {
        Ok(AnalogSet {
            data: filter.apply(&self.data)?,
            plates: self.plates.clone(),
            time: self.time.clone(),
            meta: self.meta.clone(),
            frames: self.frames.clone(),
        })
    }
}
