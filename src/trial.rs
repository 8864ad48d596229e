//! Trial loading and summaries.

use crate::c3d::{C3dDecoder, CaptureDecoder, DecodedCapture};
use crate::config::ProcessingConfig;
use crate::error::{GallopError, Result};
use crate::filters::LowpassFilter;
use crate::ingest::{map_analogs, map_markers};
use crate::transforms::platform_frames_with_tolerance;
use crate::types::{rotation_to_rows, vec3_to_array, AnalogSet, MarkerSet, SPACE_DIM};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One ingested capture: marker trajectories and force platform channels
/// with coordinate frames attached.
#[derive(Clone, Debug)]
pub struct Trial {
    pub markers: MarkerSet,
    pub analog: AnalogSet,
}

impl Trial {
    /// Map decoder output into labeled sets and attach platform frames.
    /// Any failure aborts the whole trial.
    pub fn from_decoded(capture: &DecodedCapture) -> Result<Self> {
        Self::from_decoded_with(capture, &ProcessingConfig::default())
    }

    /// Like [`Trial::from_decoded`], with the platform edge skew tolerance
    /// taken from `config`.
    pub fn from_decoded_with(capture: &DecodedCapture, config: &ProcessingConfig) -> Result<Self> {
        let markers = map_markers(capture)?;
        let analog = map_analogs(capture)?;
        let frames = platform_frames_with_tolerance(analog.meta(), config.max_edge_skew)?;
        let analog = analog.with_frames(frames)?;
        Ok(Trial { markers, analog })
    }

    /// Low-pass markers and analog channels with their own cutoffs. A trial
    /// without analog samples keeps its empty analog set.
    pub fn filtered(&self, config: &ProcessingConfig) -> Result<Self> {
        let marker_filter = LowpassFilter::new(config.marker_filter(self.markers.rate()))?;
        let analog = if self.analog.sample_count() == 0 {
            self.analog.clone()
        } else {
            let analog_filter = LowpassFilter::new(config.analog_filter(self.analog.rate()))?;
            self.analog.filtered(&analog_filter)?
        };
        Ok(Trial {
            markers: self.markers.filtered(&marker_filter)?,
            analog,
        })
    }

    pub fn summary(&self) -> TrialSummary {
        TrialSummary::from_trial(self)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    if is_gzip(path) {
        GzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        file.read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

/// Read a trial with a custom decoder and processing config.
pub fn read_with<D: CaptureDecoder>(
    path: impl AsRef<Path>,
    decoder: &D,
    config: &ProcessingConfig,
) -> Result<Trial> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(GallopError::argument("trial path is empty"));
    }
    if !path.exists() {
        return Err(GallopError::PathNotFound(path.to_path_buf()));
    }

    let bytes = read_bytes(path)?;
    log::info!("Loaded {} ({} bytes)", path.display(), bytes.len());
    let capture = decoder.decode(&bytes)?;
    Trial::from_decoded_with(&capture, config)
}

/// Read a `.c3d` (or gzipped `.c3d.gz`) trial.
pub fn read_c3d(path: impl AsRef<Path>) -> Result<Trial> {
    read_with(path, &C3dDecoder, &ProcessingConfig::default())
}

#[derive(Clone, Debug, Serialize)]
pub struct MarkerSummary {
    pub count: usize,
    pub frames: usize,
    pub rate: f64,
    pub first_frame: i64,
    pub labels: Vec<String>,
    /// Frames without a valid position, per label.
    pub gaps: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlatformSummary {
    pub name: String,
    pub origin: [f64; SPACE_DIM],
    pub rotation: [[f64; SPACE_DIM]; SPACE_DIM],
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalogSummary {
    pub plates: usize,
    pub samples: usize,
    pub rate: f64,
    pub used_channels: Vec<usize>,
    pub unused_channels: Vec<usize>,
    pub platforms: Vec<PlatformSummary>,
}

/// Serializable overview of a trial.
#[derive(Clone, Debug, Serialize)]
pub struct TrialSummary {
    pub markers: MarkerSummary,
    pub analog: AnalogSummary,
}

impl TrialSummary {
    pub fn from_trial(trial: &Trial) -> Self {
        let markers = &trial.markers;
        let gaps = markers
            .labels()
            .iter()
            .map(|label| (label.clone(), markers.gap_count(label).unwrap_or(0)))
            .collect();

        let analog = &trial.analog;
        let platforms = analog
            .plate_names()
            .iter()
            .zip(analog.frames().unwrap_or(&[]))
            .map(|(name, frame)| PlatformSummary {
                name: name.clone(),
                origin: vec3_to_array(&frame.origin),
                rotation: rotation_to_rows(&frame.rotation),
            })
            .collect();

        TrialSummary {
            markers: MarkerSummary {
                count: markers.len(),
                frames: markers.frame_count(),
                rate: markers.rate(),
                first_frame: markers.meta().first_frame,
                labels: markers.labels().to_vec(),
                gaps,
            },
            analog: AnalogSummary {
                plates: analog.plate_count(),
                samples: analog.sample_count(),
                rate: analog.rate(),
                used_channels: analog.meta().used_channels.clone(),
                unused_channels: analog.meta().unused_channels.clone(),
                platforms,
            },
        }
    }
}
