// Unit tests for the linear-interpolation resampler.

use medlingo::audio::resample_linear;

#[test]
fn test_identity_when_rates_match() {
    let input = vec![0.1, -0.2, 0.3, -0.4, 0.5];
    let output = resample_linear(&input, 16000, 16000);
    assert_eq!(output, input, "equal rates must be a pass-through");
}

#[test]
fn test_output_length_downsampling() {
    let input = vec![0.0f32; 4410];
    let output = resample_linear(&input, 44100, 16000);
    let expected = (4410.0f64 * 16000.0 / 44100.0).round() as usize;
    assert_eq!(output.len(), expected);
}

#[test]
fn test_output_length_upsampling() {
    let input = vec![0.0f32; 800];
    let output = resample_linear(&input, 8000, 16000);
    assert_eq!(output.len(), 1600);
}

#[test]
fn test_output_length_odd_ratio() {
    // 48kHz -> 16kHz with a block size that doesn't divide evenly
    let input = vec![0.0f32; 481];
    let output = resample_linear(&input, 48000, 16000);
    let expected = (481.0f64 * 16000.0 / 48000.0).round() as usize;
    assert_eq!(output.len(), expected);
}

#[test]
fn test_linear_interpolation_midpoints() {
    // Doubling the rate inserts midpoints between neighboring samples.
    let input = vec![0.0, 1.0];
    let output = resample_linear(&input, 8000, 16000);
    assert_eq!(output.len(), 4);
    assert!((output[0] - 0.0).abs() < 1e-6);
    assert!((output[1] - 0.5).abs() < 1e-6);
    assert!((output[2] - 1.0).abs() < 1e-6);
    // Past the last sample pair the final value is held.
    assert!((output[3] - 1.0).abs() < 1e-6);
}

#[test]
fn test_empty_input() {
    let output = resample_linear(&[], 44100, 16000);
    assert!(output.is_empty());
}

#[test]
fn test_zero_rate_is_passthrough() {
    let input = vec![0.5, 0.25];
    assert_eq!(resample_linear(&input, 0, 16000), input);
    assert_eq!(resample_linear(&input, 16000, 0), input);
}
