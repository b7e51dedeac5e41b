//! Deterministic decimation and its cubic-spline interpolation counterpart.

/// Length of `samples` truncated down to a whole number of `factor`-sample
/// groups. This is the high-res reference length every run reconstructs to.
#[inline]
#[must_use]
pub fn truncated_len(len: usize, factor: usize) -> usize {
    debug_assert!(factor > 0);
    len - len % factor
}

/// Decimate by keeping every `factor`-th sample of the truncated prefix.
///
/// No anti-aliasing filter is applied; this mirrors how the training pairs
/// were produced, so inference inputs must match. Result length is
/// `floor(len / factor)`.
#[must_use]
pub fn downsample(samples: &[f32], factor: usize) -> Vec<f32> {
    debug_assert!(factor > 0);
    let keep = truncated_len(samples.len(), factor);
    samples[..keep].iter().copied().step_by(factor).collect()
}

/// Interpolate `samples` up by `factor` with a natural cubic spline.
///
/// Knots sit at positions `i * factor` of the output grid; positions past
/// the last knot extrapolate along the final segment. Result length is
/// exactly `samples.len() * factor`.
#[must_use]
pub fn upsample_spline(samples: &[f32], factor: usize) -> Vec<f32> {
    debug_assert!(factor > 0);
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![samples[0]; factor];
    }

    let curvature = natural_curvatures(samples);

    let mut out = Vec::with_capacity(n * factor);
    for j in 0..n * factor {
        let t = (j as f64) / (factor as f64);
        let i = (t.floor() as usize).min(n - 2);
        let dx = t - i as f64;

        let y0 = f64::from(samples[i]);
        let y1 = f64::from(samples[i + 1]);
        let m0 = curvature[i];
        let m1 = curvature[i + 1];

        // Segment polynomial for unit knot spacing.
        let b = (y1 - y0) - (2.0 * m0 + m1) / 6.0;
        let c = m0 / 2.0;
        let d = (m1 - m0) / 6.0;
        let v = y0 + dx * (b + dx * (c + dx * d));
        out.push(v as f32);
    }
    out
}

/// Second derivatives at the knots for a natural cubic spline
/// (zero curvature at both ends), via the Thomas algorithm.
fn natural_curvatures(samples: &[f32]) -> Vec<f64> {
    let n = samples.len();
    let mut m = vec![0.0f64; n];
    if n < 3 {
        return m;
    }

    let interior = n - 2;
    let mut diag = vec![4.0f64; interior];
    let mut rhs = vec![0.0f64; interior];
    for i in 0..interior {
        let y_prev = f64::from(samples[i]);
        let y_mid = f64::from(samples[i + 1]);
        let y_next = f64::from(samples[i + 2]);
        rhs[i] = 6.0 * (y_next - 2.0 * y_mid + y_prev);
    }

    // Forward sweep: sub- and super-diagonals are all 1.
    for i in 1..interior {
        let w = 1.0 / diag[i - 1];
        diag[i] -= w;
        rhs[i] -= w * rhs[i - 1];
    }
    // Back substitution.
    m[interior] = rhs[interior - 1] / diag[interior - 1];
    for i in (1..interior).rev() {
        m[i] = (rhs[i - 1] - m[i + 1]) / diag[i - 1];
    }
    m
}
