// Unit tests for the voice activity gate.

use medlingo::audio::{GateConfig, VoiceGate};

fn loud_frame() -> Vec<f32> {
    vec![0.5; 160]
}

fn quiet_frame() -> Vec<f32> {
    vec![0.0001; 160]
}

fn gate(min_speech: u32, max_pad: u32) -> VoiceGate {
    VoiceGate::new(GateConfig {
        energy_threshold: 0.005,
        min_speech_frames: min_speech,
        max_silence_pad_frames: max_pad,
    })
}

#[test]
fn test_debounce_requires_consecutive_speech_frames() {
    let mut gate = gate(3, 2);

    // A single loud frame must not assert speech when debounce > 1.
    gate.admit(&loud_frame());
    assert!(!gate.is_speech());

    for _ in 0..10 {
        gate.admit(&quiet_frame());
    }
    assert!(!gate.is_speech(), "isolated spike must not open the gate");
}

#[test]
fn test_speech_asserts_after_debounce() {
    let mut gate = gate(3, 2);

    gate.admit(&loud_frame());
    gate.admit(&loud_frame());
    assert!(!gate.is_speech());
    gate.admit(&loud_frame());
    assert!(gate.is_speech());
}

#[test]
fn test_silence_between_spikes_resets_debounce() {
    let mut gate = gate(3, 2);

    gate.admit(&loud_frame());
    gate.admit(&loud_frame());
    gate.admit(&quiet_frame());
    gate.admit(&loud_frame());
    gate.admit(&loud_frame());
    assert!(!gate.is_speech(), "the speech run counter resets on silence");
}

#[test]
fn test_trailing_silence_padding_is_exact() {
    let max_pad = 4;
    let mut gate = gate(3, max_pad);

    for _ in 0..3 {
        assert!(gate.admit(&loud_frame()));
    }
    assert!(gate.is_speech());

    // Exactly max_pad trailing silence frames are still admitted.
    for i in 0..max_pad {
        assert!(
            gate.admit(&quiet_frame()),
            "padding frame {} should be admitted",
            i
        );
        assert!(gate.is_speech());
    }

    // The next silence frame ends the utterance and is not sent.
    assert!(!gate.admit(&quiet_frame()));
    assert!(!gate.is_speech());
}

#[test]
fn test_leading_silence_admitted_up_to_padding_budget() {
    let mut gate = gate(3, 2);

    assert!(gate.admit(&quiet_frame()));
    assert!(gate.admit(&quiet_frame()));
    assert!(!gate.admit(&quiet_frame()));
    assert!(!gate.admit(&quiet_frame()));
}

#[test]
fn test_new_utterance_reopens_gate() {
    let mut gate = gate(2, 1);

    gate.admit(&loud_frame());
    gate.admit(&loud_frame());
    assert!(gate.is_speech());

    gate.admit(&quiet_frame());
    assert!(!gate.admit(&quiet_frame()));
    assert!(!gate.is_speech());

    gate.admit(&loud_frame());
    gate.admit(&loud_frame());
    assert!(gate.is_speech(), "gate reopens for the next utterance");
}

#[test]
fn test_reset() {
    let mut gate = gate(2, 1);
    gate.admit(&loud_frame());
    gate.admit(&loud_frame());
    assert!(gate.is_speech());

    gate.reset();
    assert!(!gate.is_speech());
    gate.admit(&loud_frame());
    assert!(!gate.is_speech(), "debounce restarts after reset");
}

#[test]
fn test_empty_frame_counts_as_silence() {
    let mut gate = gate(1, 0);
    gate.admit(&loud_frame());
    assert!(gate.is_speech());
    gate.admit(&[]);
    assert!(!gate.is_speech());
}
