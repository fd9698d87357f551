// Tests for the WAV file backend and audio file loading.

use medlingo::audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioSource, FileBackend,
};
use medlingo::error::SessionError;
use std::path::PathBuf;

fn write_wav(path: &std::path::Path, channels: u16, sample_rate: u32, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &sample in samples {
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

#[test]
fn test_audio_file_loads_mono_wav() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("mono.wav");
    let samples: Vec<i16> = (0..1600).map(|i| (i % 100) as i16 * 100).collect();
    write_wav(&path, 1, 16000, &samples);

    let audio = AudioFile::open(&path).expect("open wav");
    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.samples.len(), 1600);
    assert!((audio.duration_seconds - 0.1).abs() < 1e-6);
}

#[test]
fn test_audio_file_downmixes_stereo() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("stereo.wav");
    // Left = 8000, right = -8000: averages to silence.
    let samples: Vec<i16> = [8000i16, -8000].repeat(400);
    write_wav(&path, 2, 16000, &samples);

    let audio = AudioFile::open(&path).expect("open wav");
    assert_eq!(audio.samples.len(), 400);
    for &sample in &audio.samples {
        assert!(sample.abs() < 1e-6, "downmix should average to zero");
    }
}

#[tokio::test]
async fn test_file_backend_emits_frames() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("speech.wav");
    let samples: Vec<i16> = vec![1000; 3200]; // 0.2s at 16kHz
    write_wav(&path, 1, 16000, &samples);

    let config = AudioBackendConfig {
        frame_duration_ms: 100,
        ..Default::default()
    };
    let mut backend = FileBackend::new(path, config);
    assert!(!backend.is_capturing());

    let mut rx = backend.start().await.expect("backend starts");
    assert!(backend.is_capturing());

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        assert_eq!(frame.sample_rate, 16000);
        frames.push(frame);
    }

    assert_eq!(frames.len(), 2, "0.2s of audio in 100ms frames");
    assert_eq!(frames[0].samples.len(), 1600);
    assert_eq!(frames[0].timestamp_ms, 0);
    assert_eq!(frames[1].timestamp_ms, 100);

    backend.stop().await.expect("stop succeeds");
}

#[tokio::test]
async fn test_file_backend_stop_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("short.wav");
    write_wav(&path, 1, 16000, &vec![0i16; 160]);

    let mut backend = FileBackend::new(path, AudioBackendConfig::default());
    let _rx = backend.start().await.expect("backend starts");

    backend.stop().await.expect("first stop succeeds");
    backend.stop().await.expect("second stop succeeds");
    assert!(!backend.is_capturing());
}

#[test]
fn test_factory_rejects_missing_file() {
    let err = AudioBackendFactory::create(
        AudioSource::File(PathBuf::from("/nonexistent/audio.wav")),
        AudioBackendConfig::default(),
    )
    .err()
    .expect("missing file is an error");

    assert!(matches!(err, SessionError::DeviceNotFound(_)));
}
