//! Signal filters for marker and force platform data.

pub mod butterworth;
pub mod lowpass;
pub mod zero_phase;

pub use butterworth::{butter_lowpass, TransferFunction};
pub use lowpass::{lowpass_filter, LowpassFilter};
pub use zero_phase::ZeroPhase;

/// Single-pass Butterworth order; forward-backward filtering doubles it.
pub const DEFAULT_ORDER: usize = 2;
