//! Digital Butterworth low-pass design.
//!
//! Analog prototype poles on the unit circle, pre-warped to the cutoff, then
//! mapped to the z-plane with the bilinear transform. All zeros land on z = -1.

use crate::error::{GallopError, Result};
use nalgebra::Complex;
use std::f64::consts::PI;

/// Transfer function coefficients, `a[0] == 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl TransferFunction {
    pub fn order(&self) -> usize {
        self.a.len().saturating_sub(1)
    }

    /// Gain at 0 Hz.
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }
}

/// Polynomial coefficients (highest power first) with the given roots.
fn poly(roots: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let mut coeffs = vec![Complex::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}

/// Low-pass Butterworth of `order` at normalized cutoff `wn` (1.0 = Nyquist).
pub fn butter_lowpass(order: usize, wn: f64) -> Result<TransferFunction> {
    if order == 0 {
        return Err(GallopError::argument("filter order must be at least 1"));
    }
    if !(wn > 0.0 && wn < 1.0) {
        return Err(GallopError::argument(format!(
            "normalized cutoff {wn} must lie strictly between 0 and 1"
        )));
    }

    // Design happens at fs = 2 so that wn is already relative to Nyquist.
    let fs = 2.0;
    let warped = 2.0 * fs * (PI * wn / fs).tan();
    let n = order as f64;

    let poles: Vec<Complex<f64>> = (0..order)
        .map(|i| {
            let m = -(n - 1.0) + 2.0 * i as f64;
            -Complex::from_polar(1.0, PI * m / (2.0 * n)) * warped
        })
        .collect();
    let gain = warped.powi(order as i32);

    let fs2 = Complex::new(2.0 * fs, 0.0);
    let z_poles: Vec<Complex<f64>> = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    let denominator = poles
        .iter()
        .fold(Complex::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let k = gain * (Complex::new(1.0, 0.0) / denominator).re;

    let zeros = vec![Complex::new(-1.0, 0.0); order];
    let b = poly(&zeros).iter().map(|c| k * c.re).collect();
    let a = poly(&z_poles).iter().map(|c| c.re).collect();

    Ok(TransferFunction { b, a })
}
