use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use genai::chat::{ChatMessage, ChatRequest, ChatStreamEvent, StreamChunk};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, ModelIden};

use crate::{error::RelayError, LOG_TARGET};

/// Fragments in upstream order; every item is non-empty.
pub type LlmStreamOut = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, RelayError>;
    async fn generate_stream(&self, prompt: &str) -> Result<LlmStreamOut, RelayError>;
}

pub struct GenaiLlmClient {
    pub model: String,
    client: Client,
}

impl GenaiLlmClient {
    pub fn new(model: &str, api_key: &str) -> Self {
        let api_key = api_key.to_string();
        let auth_resolver = AuthResolver::from_resolver_fn(
            move |_model_iden: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(api_key.clone())))
            },
        );
        let client = Client::builder().with_auth_resolver(auth_resolver).build();
        Self {
            model: model.to_string(),
            client,
        }
    }
}

fn user_request(prompt: &str) -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::user(prompt.to_string())])
}

#[async_trait]
impl LlmClient for GenaiLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, RelayError> {
        let response = self
            .client
            .exec_chat(&self.model, user_request(prompt), None)
            .await
            .map_err(RelayError::generation)?;

        Ok(response.content_text_into_string().unwrap_or_default())
    }

    async fn generate_stream(&self, prompt: &str) -> Result<LlmStreamOut, RelayError> {
        let llm_stream = self
            .client
            .exec_chat_stream(&self.model, user_request(prompt), None)
            .await
            .map_err(RelayError::generation)?
            .stream;

        let llm_output = llm_stream.filter_map(|result| async move {
            match result {
                Ok(ChatStreamEvent::Chunk(StreamChunk { content })) => {
                    if content.is_empty() {
                        None
                    } else {
                        Some(Ok(content))
                    }
                }
                Ok(_) => None,
                Err(err) => {
                    tracing::warn!(target: LOG_TARGET, "LLM stream error: {err}");
                    Some(Err(RelayError::generation(err)))
                }
            }
        });

        Ok(Box::pin(llm_output))
    }
}
