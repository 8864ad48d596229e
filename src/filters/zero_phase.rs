//! Forward-backward IIR filtering with odd edge extension.

use super::butterworth::TransferFunction;
use crate::error::{GallopError, Result};
use nalgebra::{DMatrix, DVector};

/// Direct form II transposed filter over `input`, starting from state `zi`.
pub fn lfilter(tf: &TransferFunction, input: &[f64], zi: &[f64]) -> Vec<f64> {
    let n = tf.a.len().max(tf.b.len());
    let mut b = tf.b.clone();
    let mut a = tf.a.clone();
    b.resize(n, 0.0);
    a.resize(n, 0.0);

    let mut state = zi.to_vec();
    state.resize(n - 1, 0.0);
    let mut output = Vec::with_capacity(input.len());

    for &x in input {
        let y = b[0] * x + state.first().copied().unwrap_or(0.0);
        for i in 0..n.saturating_sub(2) {
            state[i] = b[i + 1] * x + state[i + 1] - a[i + 1] * y;
        }
        if n >= 2 {
            state[n - 2] = b[n - 1] * x - a[n - 1] * y;
        }
        output.push(y);
    }
    output
}

/// Filter state that makes a unit step input produce a unit step output, so
/// scaling it by the first sample starts the filter in steady state.
pub fn lfilter_zi(tf: &TransferFunction) -> Result<Vec<f64>> {
    let n = tf.a.len().max(tf.b.len());
    if n < 2 {
        return Ok(Vec::new());
    }
    let a0 = tf.a[0];
    let mut b: Vec<f64> = tf.b.iter().map(|v| v / a0).collect();
    let mut a: Vec<f64> = tf.a.iter().map(|v| v / a0).collect();
    b.resize(n, 0.0);
    a.resize(n, 0.0);

    // (I - companion(a)^T) zi = b[1:] - a[1:] * b[0]
    let mut system = DMatrix::<f64>::identity(n - 1, n - 1);
    for i in 0..n - 1 {
        system[(i, 0)] += a[i + 1];
    }
    for i in 0..n - 2 {
        system[(i, i + 1)] -= 1.0;
    }
    let rhs = DVector::from_iterator(n - 1, (0..n - 1).map(|i| b[i + 1] - a[i + 1] * b[0]));

    let zi = system
        .lu()
        .solve(&rhs)
        .ok_or_else(|| GallopError::argument("filter has no steady state (singular initial-condition system)"))?;
    Ok(zi.iter().copied().collect())
}

/// Odd extension: `padlen` samples reflected through each end point.
fn odd_extension(x: &[f64], padlen: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];
    let mut ext = Vec::with_capacity(n + 2 * padlen);
    for i in (1..=padlen).rev() {
        ext.push(2.0 * first - x[i]);
    }
    ext.extend_from_slice(x);
    for i in 1..=padlen {
        ext.push(2.0 * last - x[n - 1 - i]);
    }
    ext
}

/// Zero-phase application of a fixed transfer function.
#[derive(Clone, Debug)]
pub struct ZeroPhase {
    tf: TransferFunction,
    zi: Vec<f64>,
}

impl ZeroPhase {
    pub fn new(tf: TransferFunction) -> Result<Self> {
        let zi = lfilter_zi(&tf)?;
        Ok(ZeroPhase { tf, zi })
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.tf
    }

    /// Filter forward then backward. Returns `None` when the signal is empty
    /// or not longer than `padlen`.
    pub fn apply(&self, x: &[f64], padlen: usize) -> Option<Vec<f64>> {
        if x.is_empty() || padlen >= x.len() {
            return None;
        }
        let ext = odd_extension(x, padlen);

        let zi_forward: Vec<f64> = self.zi.iter().map(|z| z * ext[0]).collect();
        let forward = lfilter(&self.tf, &ext, &zi_forward);

        let y0 = forward[forward.len() - 1];
        let reversed: Vec<f64> = forward.into_iter().rev().collect();
        let zi_backward: Vec<f64> = self.zi.iter().map(|z| z * y0).collect();
        let mut backward = lfilter(&self.tf, &reversed, &zi_backward);
        backward.reverse();

        Some(backward[padlen..backward.len() - padlen].to_vec())
    }
}
