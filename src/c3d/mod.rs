//! Capture decoding
//!
//! The ingestion pipeline only depends on [`DecodedCapture`]: header maps,
//! grouped parameter maps with resolved scalar/sequence tags, and the raw
//! sample matrices. Any [`CaptureDecoder`] can feed it; [`C3dDecoder`] reads
//! the binary C3D layout directly.

pub mod param;
pub mod reader;

pub use param::{ParamValue, ParameterMap, Scalar, Sequence, SequenceData};
pub use reader::{C3dDecoder, Processor};

use crate::error::Result;
use ndarray::{Array2, Array3};
use std::collections::BTreeMap;

// ===== Header keys =====
pub const HEADER_SIZE: &str = "size";
pub const HEADER_FRAME_RATE: &str = "frame_rate";
pub const HEADER_FIRST_FRAME: &str = "first_frame";
pub const HEADER_LAST_FRAME: &str = "last_frame";

// ===== Parameter groups =====
pub const GROUP_POINT: &str = "POINT";
pub const GROUP_ANALOG: &str = "ANALOG";
pub const GROUP_FORCE_PLATFORM: &str = "FORCE_PLATFORM";

/// Header fields for the point and analog streams.
///
/// Each map holds `size`, `frame_rate`, `first_frame` and `last_frame`.
/// `last_frame` counts from the first stored sample, so a stream holds
/// `last_frame + 1` samples.
#[derive(Clone, Debug, Default)]
pub struct HeaderMaps {
    pub points: ParameterMap,
    pub analogs: ParameterMap,
}

/// Output of a capture decoder.
#[derive(Clone, Debug)]
pub struct DecodedCapture {
    pub header: HeaderMaps,
    /// Parameter groups keyed by upper-case group name.
    pub parameters: BTreeMap<String, ParameterMap>,
    /// Marker samples shaped (4, markers, frames): x, y, z, residual.
    pub points: Array3<f64>,
    /// Analog samples shaped (channels, samples), already scaled.
    pub analogs: Array2<f64>,
}

impl DecodedCapture {
    /// Parameter group by name, empty when the file does not carry it.
    pub fn group_or_empty(&self, name: &str) -> ParameterMap {
        self.parameters.get(name).cloned().unwrap_or_default()
    }
}

/// Turns raw capture bytes into a [`DecodedCapture`].
pub trait CaptureDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedCapture>;
}
