//! Scripted providers and sinks for engine tests.

use async_trait::async_trait;
use draftsmith_core::error::ProviderError;
use draftsmith_core::provider::{Provider, ProviderRequest, StreamChunk};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A provider that plays back a fixed script of chunks.
///
/// Records every request it receives so tests can assert on message
/// assembly. The script is consumed by the first `stream` call; later
/// calls deliver an immediate `done`.
pub struct MockProvider {
    script: Mutex<Option<Vec<Result<StreamChunk, ProviderError>>>>,
    connect_error: Mutex<Option<ProviderError>>,
    chunk_delay: Option<Duration>,
    calls: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    /// A provider that streams the given deltas and then finishes.
    pub fn streaming(deltas: &[&str]) -> Self {
        let mut script: Vec<Result<StreamChunk, ProviderError>> = deltas
            .iter()
            .map(|d| Ok(StreamChunk::content(*d)))
            .collect();
        script.push(Ok(StreamChunk::done()));
        Self::scripted(script)
    }

    /// A provider that plays back exactly the given chunk results.
    pub fn scripted(script: Vec<Result<StreamChunk, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            connect_error: Mutex::new(None),
            chunk_delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider whose `stream` call itself fails.
    pub fn failing_connect(error: ProviderError) -> Self {
        let provider = Self::scripted(Vec::new());
        *provider.connect_error.lock().unwrap() = Some(error);
        provider
    }

    /// Wait this long before each scripted chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Handle to the requests recorded so far.
    pub fn call_log(&self) -> Arc<Mutex<Vec<ProviderRequest>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>, ProviderError>
    {
        if let Some(error) = self.connect_error.lock().unwrap().take() {
            return Err(error);
        }

        self.calls.lock().unwrap().push(request);

        let script = self
            .script
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| vec![Ok(StreamChunk::done())]);
        let delay = self.chunk_delay;

        let (tx, rx) = tokio::sync::mpsc::channel(16);
        tokio::spawn(async move {
            for item in script {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }
}

/// An `on_chunk` callback that collects flushes into a shared vec.
pub fn collecting_sink() -> (impl FnMut(&str) + Send, Arc<Mutex<Vec<String>>>) {
    let flushes = Arc::new(Mutex::new(Vec::new()));
    let handle = Arc::clone(&flushes);
    let sink = move |chunk: &str| {
        handle.lock().unwrap().push(chunk.to_string());
    };
    (sink, flushes)
}
