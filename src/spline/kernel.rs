//! Interpolation kernels over a knot sequence.
//!
//! Every kernel is expressed as a small set of linear weights over
//! neighboring knots. Forward evaluation and the gradient backward map
//! share this one weight computation, so the backward map is the exact
//! adjoint of evaluation by construction.

use serde::{Deserialize, Serialize};

/// Interpolation kernel kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplineKind {
    /// Piecewise-constant hold of the lower knot.
    Step,
    /// Piecewise-linear interpolation.
    Linear,
    /// Cubic Hermite interpolation with finite-difference knot slopes
    /// (one-sided at the boundary knots).
    Cubic,
}

impl SplineKind {
    /// Minimum knot count the kernel is defined for. Policies below
    /// this must fail construction, never degrade to another kernel.
    pub fn min_knots(self) -> usize {
        match self {
            SplineKind::Step => 1,
            SplineKind::Linear => 2,
            SplineKind::Cubic => 4,
        }
    }
}

/// Linear weights over a contiguous knot window.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KnotWeights {
    /// First contributing knot index.
    pub start: usize,
    /// Number of contributing knots (at most 4).
    pub count: usize,
    /// Weights, indexed relative to `start`.
    pub w: [f64; 4],
}

impl KnotWeights {
    fn single(index: usize) -> Self {
        Self {
            start: index,
            count: 1,
            w: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

/// Index of the interval containing `t`: the largest `i` with
/// `times[i] <= t`, clamped to a valid interval start.
fn find_interval(times: &[f64], t: f64) -> usize {
    let upper = times.partition_point(|&x| x <= t);
    upper.saturating_sub(1).min(times.len().saturating_sub(2))
}

/// Slope coefficients for the finite-difference tangent at knot `j`:
/// `m_j = left * (p_j - p_{j-1}) + right * (p_{j+1} - p_j)`.
/// One-sided at the boundary knots.
fn slope_coefficients(times: &[f64], j: usize) -> (f64, f64) {
    let n = times.len();
    if j == 0 {
        (0.0, 1.0 / (times[1] - times[0]))
    } else if j == n - 1 {
        (1.0 / (times[j] - times[j - 1]), 0.0)
    } else {
        (
            0.5 / (times[j] - times[j - 1]),
            0.5 / (times[j + 1] - times[j]),
        )
    }
}

/// Compute the kernel weights at query time `t`.
///
/// Outside the knot span the result clamps to the boundary knot.
pub(crate) fn knot_weights(kind: SplineKind, times: &[f64], t: f64) -> KnotWeights {
    let n = times.len();
    debug_assert!(n >= kind.min_knots());
    if n == 1 || t <= times[0] {
        return KnotWeights::single(0);
    }
    if t >= times[n - 1] {
        return KnotWeights::single(n - 1);
    }

    let i = find_interval(times, t);
    let t0 = times[i];
    let t1 = times[i + 1];
    let dt = t1 - t0;
    if dt <= 0.0 {
        return KnotWeights::single(i);
    }

    match kind {
        SplineKind::Step => KnotWeights::single(i),
        SplineKind::Linear => {
            let s = (t - t0) / dt;
            KnotWeights {
                start: i,
                count: 2,
                w: [1.0 - s, s, 0.0, 0.0],
            }
        }
        SplineKind::Cubic => {
            let s = (t - t0) / dt;
            let s2 = s * s;
            let s3 = s2 * s;
            let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
            let h10 = s3 - 2.0 * s2 + s;
            let h01 = -2.0 * s3 + 3.0 * s2;
            let h11 = s3 - s2;

            // tangents m_i, m_{i+1} are linear in the neighboring knots,
            // so the Hermite value folds into per-knot weights
            let (al, ar) = slope_coefficients(times, i);
            let (bl, br) = slope_coefficients(times, i + 1);

            let lo = i.saturating_sub(1);
            let hi = (i + 2).min(n - 1);
            let mut w = [0.0; 4];
            if i > 0 {
                w[i - 1 - lo] += -h10 * dt * al;
            }
            w[i - lo] += h00 + h10 * dt * (al - ar) - h11 * dt * bl;
            w[i + 1 - lo] += h01 + h10 * dt * ar + h11 * dt * (bl - br);
            if i + 2 <= n - 1 {
                w[i + 2 - lo] += h11 * dt * br;
            }
            KnotWeights {
                start: lo,
                count: hi - lo + 1,
                w,
            }
        }
    }
}
