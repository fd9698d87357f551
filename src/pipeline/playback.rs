//! Playback of synthesized utterances.
//!
//! Audio references are fetched and decoded directly (the fetch+decode
//! fallback path); rendering to an output device is a presentation concern
//! that sits outside this crate.

use super::services::{StageError, StageResult};
use std::io::Cursor;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PlaybackInfo {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: usize,
}

pub struct AudioPlayer {
    http: reqwest::Client,
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlayer {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Fetch and decode an audio reference, confirming it is playable.
    pub async fn play(&self, audio_url: &str) -> StageResult<PlaybackInfo> {
        let response = self.http.get(audio_url).send().await?;
        if !response.status().is_success() {
            return Err(StageError::Status(response.status()));
        }
        let bytes = response.bytes().await?.to_vec();

        let info = tokio::task::spawn_blocking(move || decode_audio(bytes))
            .await
            .map_err(|e| StageError::Malformed(format!("decode task failed: {e}")))??;

        info!(
            duration_secs = info.duration_seconds,
            sample_rate = info.sample_rate,
            channels = info.channels,
            "playback started"
        );
        Ok(info)
    }
}

fn decode_audio(bytes: Vec<u8>) -> StageResult<PlaybackInfo> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| StageError::Malformed(format!("unrecognized audio container: {e}")))?;

    let mut format = probed.format;
    let (track_id, params) = {
        let track = format
            .default_track()
            .ok_or_else(|| StageError::Malformed("no audio track".to_string()))?;
        (track.id, track.codec_params.clone())
    };

    let sample_rate = params.sample_rate.unwrap_or(0);
    let channels = params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| StageError::Malformed(format!("unsupported codec: {e}")))?;

    let mut frames: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }
                match decoder.decode(&packet) {
                    Ok(buffer) => frames += buffer.frames() as u64,
                    // Recoverable bitstream error; keep decoding.
                    Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                    Err(_) => break,
                }
            }
            Err(_) => break,
        }
    }

    if frames == 0 {
        return Err(StageError::Malformed("no decodable audio frames".to_string()));
    }

    let duration_seconds = if sample_rate > 0 {
        frames as f64 / sample_rate as f64
    } else {
        0.0
    };

    Ok(PlaybackInfo {
        duration_seconds,
        sample_rate,
        channels,
    })
}
