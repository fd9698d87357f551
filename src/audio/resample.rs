//! Linear-interpolation resampler.
//!
//! Converts capture-rate blocks to the 16kHz the streaming service expects.
//! Linear interpolation is adequate for short speech blocks where latency
//! matters more than phase accuracy.

/// Resample `input` from `source_rate` to `target_rate` by linear
/// interpolation between neighboring source samples.
///
/// Output length is `round(input.len() * target_rate / source_rate)`.
/// Equal rates are an identity pass-through with no resampling cost.
pub fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    // Guard rails
    if source_rate == 0 || target_rate == 0 {
        return input.to_vec();
    }
    if input.is_empty() {
        return Vec::new();
    }
    if source_rate == target_rate {
        return input.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (input.len() as f64 * target_rate as f64 / source_rate as f64).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 * ratio;
        let idx = src_idx.floor() as usize;
        let frac = (src_idx - idx as f64) as f32;

        if idx + 1 < input.len() {
            output.push(input[idx] * (1.0 - frac) + input[idx + 1] * frac);
        } else {
            // Past the last sample pair; hold the final value.
            let pad = input.last().copied().unwrap_or(0.0);
            output.push(pad);
        }
    }

    output
}
