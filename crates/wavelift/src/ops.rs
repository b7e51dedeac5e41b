//! Kernels for the residual upsampling network.

#[inline]
pub fn relu_inplace(x: &mut [f32]) {
    for v in x {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

pub fn add_inplace(dst: &mut [f32], src: &[f32]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src.iter().copied()) {
        *d += s;
    }
}

/// Same-padded 1-D convolution, stride 1.
///
/// Layout is column-major:
/// - `input`: `[channels_in, length]` stored as `input[ic * length + t]`
/// - `output`: `[channels_out, length]` stored as `output[oc * length + t]`
/// - `weight`: `[channels_out, channels_in, kernel]` contiguous
///
/// `kernel` must be odd; `(kernel - 1) / 2` implicit zeros pad each side so
/// output length equals input length.
#[allow(clippy::too_many_arguments)]
pub fn conv1d_same(
    output: &mut [f32],
    input: &[f32],
    weight: &[f32],
    bias: Option<&[f32]>,
    channels_in: usize,
    channels_out: usize,
    length: usize,
    kernel: usize,
) {
    debug_assert_eq!(kernel % 2, 1, "same padding needs an odd kernel");
    debug_assert_eq!(output.len(), channels_out * length);
    debug_assert_eq!(input.len(), channels_in * length);
    debug_assert_eq!(weight.len(), channels_out * channels_in * kernel);
    if let Some(b) = bias {
        debug_assert_eq!(b.len(), channels_out);
    }

    let half = (kernel / 2) as isize;

    for oc in 0..channels_out {
        let b = bias.map_or(0.0, |bb| bb[oc]);
        let out_row = &mut output[oc * length..(oc + 1) * length];

        for (t, out_elem) in out_row.iter_mut().enumerate() {
            let mut sum = b;
            let base = t as isize - half;
            for ic in 0..channels_in {
                let in_row = &input[ic * length..(ic + 1) * length];
                let w_base = (oc * channels_in + ic) * kernel;
                for k in 0..kernel {
                    let it = base + k as isize;
                    if it >= 0 && (it as usize) < length {
                        sum += in_row[it as usize] * weight[w_base + k];
                    }
                }
            }
            *out_elem = sum;
        }
    }
}

/// Interleave `factor` channels into a single sequence of `length * factor`
/// samples (sub-pixel shuffle): output position `t * factor + c` reads
/// channel `c` at position `t`.
#[must_use]
pub fn pixel_shuffle1d(input: &[f32], factor: usize, length: usize) -> Vec<f32> {
    debug_assert_eq!(input.len(), factor * length);
    let mut out = vec![0.0f32; factor * length];
    for c in 0..factor {
        let row = &input[c * length..(c + 1) * length];
        for (t, &v) in row.iter().enumerate() {
            out[t * factor + c] = v;
        }
    }
    out
}
