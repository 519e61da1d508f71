//! Streaming session controller.
//!
//! One controller owns one generation session at a time. It opens the
//! provider stream, coalesces small content deltas into flushes for the
//! caller, and tracks the session's phase, counters, and last error.
//! Cancellation is an ordinary outcome, not an error: a stopped session
//! keeps everything flushed so far and settles back to idle.

use draftsmith_core::error::EngineError;
use draftsmith_core::message::{ChatMessage, GenerationParams};
use draftsmith_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Deltas accumulate in a buffer until it holds this many characters
/// (not bytes — multibyte prose counts per character), then the buffer
/// is flushed in one callback. Keeps per-chunk overhead (UI repaints,
/// sink writes) bounded during fast streams.
const FLUSH_THRESHOLD_CHARS: usize = 50;

/// How long a stopped session stays in `Stopping` before returning to
/// `Idle`. Lets in-flight provider chunks drain without being mistaken
/// for a new session's output.
const STOP_SETTLE_MS: u64 = 500;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No generation in progress; `generate` is accepted.
    Idle,
    /// A stream is being consumed.
    Generating,
    /// A stop was requested; the session is settling back to idle.
    Stopping,
}

/// Mutable per-session state, guarded by the controller's mutex.
struct SessionState {
    phase: Phase,
    session_id: Option<Uuid>,
    accumulated: String,
    chunk_count: u64,
    started_at: Option<Instant>,
    last_error: Option<EngineError>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            session_id: None,
            accumulated: String::new(),
            chunk_count: 0,
            started_at: None,
            last_error: None,
        }
    }
}

/// A read-only snapshot of the session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub phase: Phase,
    pub session_id: Option<Uuid>,
    /// Number of provider-delivered increments so far. An approximate
    /// proxy for output size, not a tokenizer count.
    pub chunk_count: u64,
    /// Length in bytes of everything accumulated so far.
    pub accumulated_len: usize,
    /// `chunk_count / elapsed_secs`; 0.0 until the first chunk arrives.
    pub tokens_per_second: f64,
    pub last_error: Option<EngineError>,
}

/// Drives one streaming generation session at a time.
pub struct StreamController {
    provider: Arc<dyn Provider>,
    endpoint: String,
    model: String,
    state: Arc<Mutex<SessionState>>,
    cancel_tx: watch::Sender<bool>,
}

impl StreamController {
    /// Create a controller bound to a provider, endpoint, and model.
    ///
    /// Empty `endpoint` or `model` is allowed at construction; `generate`
    /// fails fast with [`EngineError::NotConfigured`] until both are set.
    pub fn new(
        provider: Arc<dyn Provider>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            provider,
            endpoint: endpoint.into(),
            model: model.into(),
            state: Arc::new(Mutex::new(SessionState::new())),
            cancel_tx,
        }
    }

    /// Run one generation session.
    ///
    /// `on_chunk` is called once per flush: whenever the coalescing
    /// buffer reaches [`FLUSH_THRESHOLD_CHARS`], and once more with any
    /// remainder when the stream ends, errors, or is cancelled. The
    /// concatenation of all flushes equals the accumulated text exactly.
    ///
    /// Returns the full accumulated text. Cancellation via [`stop`]
    /// returns `Ok` with the partial text; a failed stream returns the
    /// error after recording it as `last_error`. Output already flushed
    /// is never retracted in either case.
    ///
    /// [`stop`]: Self::stop
    pub async fn generate<F>(
        &self,
        messages: Vec<ChatMessage>,
        params: GenerationParams,
        mut on_chunk: F,
    ) -> Result<String, EngineError>
    where
        F: FnMut(&str) + Send,
    {
        let session_id = Uuid::new_v4();
        {
            let mut state = self.state.lock().await;
            if state.phase != Phase::Idle {
                return Err(EngineError::Busy);
            }
            if self.endpoint.is_empty() || self.model.is_empty() {
                return Err(EngineError::NotConfigured(
                    "endpoint and model must both be set".into(),
                ));
            }

            state.phase = Phase::Generating;
            state.session_id = Some(session_id);
            state.accumulated.clear();
            state.chunk_count = 0;
            state.started_at = Some(Instant::now());
            state.last_error = None;
        }
        // Clear any flag left over from a previous session's stop.
        self.cancel_tx.send_replace(false);

        info!(session = %session_id, model = %self.model, "Starting generation");

        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            params,
        };

        let mut rx = match self.provider.stream(request).await {
            Ok(rx) => rx,
            Err(e) => {
                let error = EngineError::Generation(e.to_string());
                let mut state = self.state.lock().await;
                state.last_error = Some(error.clone());
                state.phase = Phase::Idle;
                return Err(error);
            }
        };

        let mut cancel_rx = self.cancel_tx.subscribe();
        let mut buffer = String::new();
        let mut cancelled = false;
        let mut session_error: Option<EngineError> = None;

        loop {
            // A stop issued before the subscription above would not
            // trigger `changed`; check the flag directly each pass.
            if *cancel_rx.borrow() {
                cancelled = true;
                break;
            }

            tokio::select! {
                changed = cancel_rx.changed() => {
                    if changed.is_ok() && *cancel_rx.borrow() {
                        debug!(session = %session_id, "Cancellation observed");
                        cancelled = true;
                        break;
                    }
                }
                chunk = rx.recv() => {
                    match chunk {
                        Some(Ok(chunk)) => {
                            if let Some(content) = chunk.content.as_deref() {
                                if !content.is_empty() {
                                    buffer.push_str(content);
                                    let mut state = self.state.lock().await;
                                    state.accumulated.push_str(content);
                                    state.chunk_count += 1;
                                    drop(state);

                                    if buffer.chars().count() >= FLUSH_THRESHOLD_CHARS {
                                        on_chunk(&buffer);
                                        buffer.clear();
                                    }
                                }
                            }
                            if chunk.done {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            warn!(session = %session_id, error = %e, "Stream failed");
                            session_error = Some(EngineError::Generation(e.to_string()));
                            break;
                        }
                        // Channel closed without a done chunk: treat as end
                        // of stream, keep what we have.
                        None => break,
                    }
                }
            }
        }

        if !buffer.is_empty() {
            on_chunk(&buffer);
        }

        let output = {
            let mut state = self.state.lock().await;
            state.last_error = session_error.clone();
            if !cancelled {
                state.phase = Phase::Idle;
            }
            // A stop may have set Stopping already; the settle task below
            // finishes the transition.
            state.accumulated.clone()
        };

        if cancelled {
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(STOP_SETTLE_MS)).await;
                let mut state = state.lock().await;
                if state.phase == Phase::Stopping {
                    state.phase = Phase::Idle;
                }
            });
        }

        match session_error {
            Some(e) => Err(e),
            None => {
                info!(
                    session = %session_id,
                    chars = output.len(),
                    cancelled,
                    "Generation finished"
                );
                Ok(output)
            }
        }
    }

    /// Request cancellation of the active session.
    ///
    /// No-op when nothing is generating. The session moves to `Stopping`
    /// immediately and settles to `Idle` shortly after; `generate`
    /// returns `Ok` with the partial text.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock().await;
            if state.phase != Phase::Generating {
                return;
            }
            state.phase = Phase::Stopping;
        }
        let _ = self.cancel_tx.send(true);
    }

    /// The current session phase.
    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// A snapshot of the session counters.
    pub async fn stats(&self) -> SessionStats {
        let state = self.state.lock().await;
        let tokens_per_second = match (state.chunk_count, state.started_at) {
            (0, _) | (_, None) => 0.0,
            (count, Some(started)) => {
                let elapsed = started.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    count as f64 / elapsed
                } else {
                    0.0
                }
            }
        };

        SessionStats {
            phase: state.phase,
            session_id: state.session_id,
            chunk_count: state.chunk_count,
            accumulated_len: state.accumulated.len(),
            tokens_per_second,
            last_error: state.last_error.clone(),
        }
    }

    /// Everything accumulated in the current or most recent session.
    pub async fn accumulated(&self) -> String {
        self.state.lock().await.accumulated.clone()
    }
}
