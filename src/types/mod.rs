pub mod analog;
pub mod linalg;
pub mod markers;

pub use analog::{AnalogChannel, AnalogMeta, AnalogSet, PlatformFrame, CHANNELS_PER_PLATFORM};
pub use linalg::*;
pub use markers::{MarkerAxis, MarkerMeta, MarkerSet};

use ndarray::Array1;

/// Sample times for `samples` frames at `rate` Hz: starts at 0, spacing 1/rate.
pub fn time_vector(samples: usize, rate: f64) -> Array1<f64> {
    if samples == 0 {
        return Array1::zeros(0);
    }
    let end = (samples - 1) as f64 / rate;
    Array1::linspace(0.0, end, samples)
}
