//! Motion-capture trial ingestion for gait analysis.
//!
//! Reads C3D trials into labeled marker and force platform arrays, derives
//! each platform's coordinate frame from its corners, and low-pass filters
//! signals with occlusion gaps without bridging them.

pub mod c3d;
pub mod config;
pub mod error;
pub mod filters;
pub mod ingest;
pub mod transforms;
pub mod trial;
pub mod types;

pub use config::{LowpassConfig, ProcessingConfig};
pub use error::{GallopError, Result};
pub use filters::{lowpass_filter, LowpassFilter};
pub use transforms::{
    platform_frame, platform_frame_with_tolerance, platform_frames, platform_frames_with_tolerance,
};
pub use trial::{read_c3d, read_with, Trial, TrialSummary};
pub use types::{AnalogChannel, AnalogSet, MarkerAxis, MarkerSet, PlatformFrame};
