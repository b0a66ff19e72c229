use std::{pin::Pin, sync::Arc};

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::{
    config::RelayConfig, error::RelayError, generation::GenerationAdapter,
    live_data::LiveDataProvider, prompt::augment, LOG_TARGET,
};

pub const DONE_MARKER: &str = "[DONE]";
pub const ERROR_PREFIX: &str = "[ERROR]";

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatRequest {
    /// The trimmed message, or `InvalidRequest` if there is nothing to send.
    pub fn validated(&self) -> Result<&str, RelayError> {
        let message = self.message.as_deref().unwrap_or_default().trim();
        if message.is_empty() {
            Err(RelayError::InvalidRequest)
        } else {
            Ok(message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Fragment(String),
    Error(String),
    Done,
}

impl RelayEvent {
    /// Payload of the `data:` line carrying this event.
    pub fn data(&self) -> String {
        match self {
            RelayEvent::Fragment(text) => text.replace("\r\n", "\n").replace('\r', "\n"),
            RelayEvent::Error(message) => format!("{ERROR_PREFIX} {message}"),
            RelayEvent::Done => DONE_MARKER.to_string(),
        }
    }
}

pub type RelayEventStream = Pin<Box<dyn Stream<Item = RelayEvent> + Send>>;

/// Per-process service context: the live-data provider (with its weather
/// cache) and the lazily initialized generation client.
pub struct RelayService {
    pub live: LiveDataProvider,
    pub generator: GenerationAdapter,
}

impl RelayService {
    pub fn new(live: LiveDataProvider, generator: GenerationAdapter) -> Self {
        Self { live, generator }
    }

    pub fn from_config(cfg: &RelayConfig) -> Result<Self, anyhow::Error> {
        let live = LiveDataProvider::from_config(cfg)?;
        let generator = GenerationAdapter::genai(&cfg.model, cfg.api_key());
        Ok(Self::new(live, generator))
    }

    pub async fn reply(&self, message: &str) -> Result<String, RelayError> {
        let prompt = augment(message, &self.live).await;
        let reply = self.generator.generate(&prompt).await?;
        tracing::info!(target: LOG_TARGET, "reply generated ({} chars)", reply.len());
        Ok(reply)
    }

    /// Augment, generate and forward fragments as they arrive. The stream
    /// always ends with [`RelayEvent::Done`], preceded by a single
    /// [`RelayEvent::Error`] when generation fails.
    pub fn reply_stream(self: Arc<Self>, message: String) -> RelayEventStream {
        Box::pin(stream! {
            let prompt = augment(&message, &self.live).await;
            match self.generator.generate_stream(&prompt).await {
                Ok(mut fragments) => {
                    let mut count = 0usize;
                    while let Some(fragment) = fragments.next().await {
                        match fragment {
                            Ok(text) if text.is_empty() => continue,
                            Ok(text) => {
                                count += 1;
                                yield RelayEvent::Fragment(text);
                            }
                            Err(err) => {
                                tracing::warn!(target: LOG_TARGET, "stream aborted after {count} fragment(s): {err}");
                                yield RelayEvent::Error(err.single_line());
                                break;
                            }
                        }
                    }
                    tracing::debug!(target: LOG_TARGET, "stream finished with {count} fragment(s)");
                }
                Err(err) => {
                    tracing::warn!(target: LOG_TARGET, "stream failed before any data: {err}");
                    yield RelayEvent::Error(err.single_line());
                }
            }
            yield RelayEvent::Done;
        })
    }
}
