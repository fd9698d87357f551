//! Float to PCM16 conversion for outbound audio frames.

/// Encode float samples as little-endian signed 16-bit PCM.
///
/// Samples are clamped to [-1.0, 1.0] and scaled asymmetrically so that
/// 1.0 maps to 32767 (0x7fff) and -1.0 maps to -32768 (0x8000).
pub fn encode_pcm16_le(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = if clamped >= 0.0 {
            (clamped * 0x7fff as f32) as i16
        } else {
            (clamped * 0x8000 as f32) as i16
        };
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
