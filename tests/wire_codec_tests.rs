// Unit tests for the event-stream codec and PCM encoding.

use medlingo::audio::encode_pcm16_le;
use medlingo::wire::codec::FrameError;
use medlingo::wire::headers::{
    Header, CONTENT_TYPE_OCTET_STREAM, EVENT_TYPE_AUDIO, EVENT_TYPE_TRANSCRIPT,
    HEADER_CONTENT_TYPE, HEADER_EVENT_TYPE, HEADER_MESSAGE_TYPE, MESSAGE_TYPE_EVENT,
};
use medlingo::wire::{encode_transcript_body, parse_transcript_body, TranscriptResult, WireFrame};

#[test]
fn test_pcm_full_scale_positive() {
    let bytes = encode_pcm16_le(&[1.0]);
    assert_eq!(bytes, 32767i16.to_le_bytes().to_vec());
}

#[test]
fn test_pcm_full_scale_negative() {
    let bytes = encode_pcm16_le(&[-1.0]);
    assert_eq!(bytes, (-32768i16).to_le_bytes().to_vec());
}

#[test]
fn test_pcm_clamps_out_of_range_input() {
    assert_eq!(encode_pcm16_le(&[2.5]), encode_pcm16_le(&[1.0]));
    assert_eq!(encode_pcm16_le(&[-3.0]), encode_pcm16_le(&[-1.0]));
}

#[test]
fn test_pcm_zero_and_midpoints() {
    let bytes = encode_pcm16_le(&[0.0, 0.5, -0.5]);
    assert_eq!(bytes.len(), 6);
    let zero = i16::from_le_bytes([bytes[0], bytes[1]]);
    let pos = i16::from_le_bytes([bytes[2], bytes[3]]);
    let neg = i16::from_le_bytes([bytes[4], bytes[5]]);
    assert_eq!(zero, 0);
    assert_eq!(pos, 16383); // 0.5 * 0x7fff truncated
    assert_eq!(neg, -16384);
}

#[test]
fn test_audio_event_round_trip() {
    let pcm = encode_pcm16_le(&[0.25, -0.25, 0.75]);
    let encoded = WireFrame::audio_event(pcm.clone()).encode();

    let decoded = WireFrame::decode(&encoded).expect("frame decodes");
    assert_eq!(decoded.header(HEADER_MESSAGE_TYPE), Some(MESSAGE_TYPE_EVENT));
    assert_eq!(decoded.header(HEADER_EVENT_TYPE), Some(EVENT_TYPE_AUDIO));
    assert_eq!(
        decoded.header(HEADER_CONTENT_TYPE),
        Some(CONTENT_TYPE_OCTET_STREAM)
    );
    assert_eq!(decoded.body, pcm);
}

#[test]
fn test_empty_body_round_trip() {
    // The end-of-audio signal is an AudioEvent with an empty body.
    let encoded = WireFrame::audio_event(Vec::new()).encode();
    let decoded = WireFrame::decode(&encoded).expect("frame decodes");
    assert!(decoded.body.is_empty());
    assert_eq!(decoded.header(HEADER_EVENT_TYPE), Some(EVENT_TYPE_AUDIO));
}

#[test]
fn test_truncated_frame_is_rejected() {
    let encoded = WireFrame::audio_event(vec![1, 2, 3, 4]).encode();
    let err = WireFrame::decode(&encoded[..10]).unwrap_err();
    assert!(matches!(err, FrameError::Truncated { .. }));
}

#[test]
fn test_corrupt_prelude_is_rejected() {
    let mut encoded = WireFrame::audio_event(vec![1, 2, 3, 4]).encode();
    encoded[0] ^= 0xff;
    let err = WireFrame::decode(&encoded).unwrap_err();
    assert!(matches!(err, FrameError::PreludeChecksum));
}

#[test]
fn test_corrupt_body_fails_message_checksum() {
    let mut encoded = WireFrame::audio_event(vec![1, 2, 3, 4]).encode();
    let body_offset = encoded.len() - 8; // inside the body, before the CRC
    encoded[body_offset] ^= 0xff;
    let err = WireFrame::decode(&encoded).unwrap_err();
    assert!(matches!(err, FrameError::MessageChecksum));
}

#[test]
fn test_garbage_is_rejected_without_panic() {
    assert!(WireFrame::decode(&[]).is_err());
    assert!(WireFrame::decode(&[0x00]).is_err());
    assert!(WireFrame::decode(&[0xff; 64]).is_err());
}

#[test]
fn test_transcript_event_round_trip() {
    let results = vec![
        TranscriptResult {
            text: "the patient".to_string(),
            is_partial: true,
        },
        TranscriptResult {
            text: "The patient has chest pain".to_string(),
            is_partial: false,
        },
    ];

    let frame = WireFrame::new(
        vec![
            Header::string(HEADER_MESSAGE_TYPE, MESSAGE_TYPE_EVENT),
            Header::string(HEADER_EVENT_TYPE, EVENT_TYPE_TRANSCRIPT),
        ],
        encode_transcript_body(&results).expect("body encodes"),
    );

    let decoded = WireFrame::decode(&frame.encode()).expect("frame decodes");
    assert_eq!(
        decoded.header(HEADER_EVENT_TYPE),
        Some(EVENT_TYPE_TRANSCRIPT)
    );

    let parsed = parse_transcript_body(&decoded.body).expect("payload parses");
    assert_eq!(parsed, results);
}

#[test]
fn test_transcript_payload_takes_first_alternative() {
    let body = br#"{"Results":[{"IsPartial":false,"Alternatives":[{"Transcript":"first"},{"Transcript":"second"}]}]}"#;
    let parsed = parse_transcript_body(body).expect("payload parses");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].text, "first");
    assert!(!parsed[0].is_partial);
}

#[test]
fn test_transcript_payload_skips_results_without_alternatives() {
    let body = br#"{"Results":[{"IsPartial":true,"Alternatives":[]}]}"#;
    let parsed = parse_transcript_body(body).expect("payload parses");
    assert!(parsed.is_empty());
}

#[test]
fn test_transcript_payload_rejects_invalid_json() {
    assert!(parse_transcript_body(b"not json").is_err());
}
