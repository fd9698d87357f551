//! Per-utterance translation pipeline.
//!
//! Each final transcript runs translate → enhance → synthesize as one
//! spawned task. Utterance pipelines run concurrently and independently;
//! stages within one utterance are strictly sequential. Failures are
//! stage-local: a failed translation drops the utterance's pipeline, a
//! failed enhancement falls back to the basic translation, and a failed
//! synthesis leaves the utterance without audio.

use super::playback::AudioPlayer;
use super::services::{LanguageServices, StageError, StageResult};
use crate::stream::session::TranscriptLog;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything an utterance pipeline needs, cloneable into spawned tasks.
#[derive(Clone)]
pub struct PipelineContext {
    pub services: Arc<dyn LanguageServices>,
    pub player: Arc<AudioPlayer>,
    pub log: Arc<Mutex<TranscriptLog>>,
    /// Bumped when the session is cleared; stale pipelines stop mutating.
    pub epoch: Arc<AtomicU64>,
    pub source_language: String,
    pub target_language: String,
    pub stage_timeout: Duration,
}

/// Fire-and-forget dispatch for one finalized utterance. Never awaited by
/// the caller; the receive loop must keep consuming transport events.
pub fn spawn_utterance(ctx: &PipelineContext, index: usize, text: String) -> JoinHandle<()> {
    let ctx = ctx.clone();
    let epoch_at_spawn = ctx.epoch.load(Ordering::SeqCst);
    tokio::spawn(run_utterance(ctx, epoch_at_spawn, index, text))
}

async fn run_utterance(ctx: PipelineContext, epoch_at_spawn: u64, index: usize, text: String) {
    let source = ctx.source_language.as_str();
    let target = ctx.target_language.as_str();

    let translated = match bounded(
        ctx.stage_timeout,
        ctx.services.translate(&text, source, target),
    )
    .await
    {
        Ok(t) => t,
        Err(e) => {
            warn!(index, error = %e, "translation failed; dropping utterance pipeline");
            return;
        }
    };

    // Enhancement is best-effort; "no enhancement available" is a normal
    // fallback path, not an error path.
    let final_text = match bounded(
        ctx.stage_timeout,
        ctx.services.enhance(&translated, source, target, &text),
    )
    .await
    {
        Ok(enhanced) if !enhanced.trim().is_empty() => enhanced,
        Ok(_) => translated.clone(),
        Err(e) => {
            debug!(index, error = %e, "no enhancement available; using basic translation");
            translated.clone()
        }
    };

    {
        let mut log = ctx.log.lock().await;
        // The session may have been cleared while this stage was in flight.
        if ctx.epoch.load(Ordering::SeqCst) != epoch_at_spawn {
            return;
        }
        if let Some(slot) = log.translations.get_mut(index) {
            *slot = Some(final_text.clone());
        }
    }
    info!(index, "translation recorded");

    let audio_url = match bounded(
        ctx.stage_timeout,
        ctx.services.synthesize(&final_text, target),
    )
    .await
    {
        Ok(url) => url,
        Err(e) => {
            warn!(index, error = %e, "synthesis failed; utterance has no audio");
            return;
        }
    };

    {
        let mut log = ctx.log.lock().await;
        if ctx.epoch.load(Ordering::SeqCst) != epoch_at_spawn {
            return;
        }
        if let Some(slot) = log.audio_references.get_mut(index) {
            *slot = Some(audio_url.clone());
        }
    }

    if let Err(e) = ctx.player.play(&audio_url).await {
        warn!(index, error = %e, "playback failed");
    }
}

async fn bounded<T>(
    timeout: Duration,
    stage: impl Future<Output = StageResult<T>>,
) -> StageResult<T> {
    match tokio::time::timeout(timeout, stage).await {
        Ok(result) => result,
        Err(_) => Err(StageError::Timeout(timeout)),
    }
}
