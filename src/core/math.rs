//! Math primitives for the planning loop.
//!
//! Step-size generation, knot-time sequences, and the small dense
//! matrix-vector products used by the backward pass.

/// Fill `values` with a geometric sequence descending from `max_value`
/// to `min_value` (inclusive at both ends).
///
/// A single-element slice gets `max_value`; an empty slice is a no-op.
pub fn log_scale(values: &mut [f64], max_value: f64, min_value: f64) {
    let n = values.len();
    if n == 0 {
        return;
    }
    if n == 1 {
        values[0] = max_value;
        return;
    }
    let step = (max_value.ln() - min_value.ln()) / (n - 1) as f64;
    for (i, v) in values.iter_mut().enumerate() {
        *v = (max_value.ln() - i as f64 * step).exp();
    }
}

/// Fill `times` with a power-law warped sequence.
///
/// Maps the uniform sequence `t1 + i*t_step` through `a*t^power + b`,
/// with `a` and `b` chosen so the endpoints `t1` and `t2` are fixed.
/// `power == 1.0` reproduces the uniform sequence. Falls back to the
/// uniform sequence when the warp is degenerate (`t2^p == t1^p`).
pub fn power_sequence(times: &mut [f64], t_step: f64, t1: f64, t2: f64, power: f64) {
    let n = times.len();
    if n == 0 {
        return;
    }
    let den = t2.powf(power) - t1.powf(power);
    if den.abs() < 1.0e-12 || !den.is_finite() {
        for (i, t) in times.iter_mut().enumerate() {
            *t = t1 + i as f64 * t_step;
        }
        return;
    }
    let a = t_step * (n - 1) as f64 / den;
    let b = t1 - a * t1.powf(power);
    for (i, t) in times.iter_mut().enumerate() {
        let ti = t1 + i as f64 * t_step;
        *t = a * ti.powf(power) + b;
    }
}

/// Knot-time spacing used when resampling the policy onto a new horizon.
///
/// `max((horizon - 1) * timestep / (num_knots - 1), 1e-5)`; the floor
/// keeps knot times strictly increasing for degenerate horizons.
pub fn spline_time_shift(horizon: usize, timestep: f64, num_knots: usize) -> f64 {
    debug_assert!(num_knots >= 2);
    let shift = (horizon - 1) as f64 * timestep / (num_knots - 1) as f64;
    shift.max(1.0e-5)
}

/// `out = mat^T * vec` for a row-major `rows x cols` matrix.
pub fn mul_mat_t_vec(out: &mut [f64], mat: &[f64], vec: &[f64], rows: usize, cols: usize) {
    debug_assert_eq!(out.len(), cols);
    debug_assert_eq!(vec.len(), rows);
    debug_assert!(mat.len() >= rows * cols);
    out.fill(0.0);
    for r in 0..rows {
        let row = &mat[r * cols..(r + 1) * cols];
        let v = vec[r];
        for c in 0..cols {
            out[c] += row[c] * v;
        }
    }
}

/// `out += scale * other`.
pub fn add_scaled(out: &mut [f64], other: &[f64], scale: f64) {
    debug_assert_eq!(out.len(), other.len());
    for (o, x) in out.iter_mut().zip(other) {
        *o += scale * x;
    }
}

/// Dot product.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
