use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    error::RelayError,
    llm_service::{GenaiLlmClient, LlmClient, LlmStreamOut},
    LOG_TARGET,
};

pub type ClientFactory = Box<dyn Fn() -> Result<Arc<dyn LlmClient>, RelayError> + Send + Sync>;

pub enum ClientState {
    Uninitialized,
    Ready(Arc<dyn LlmClient>),
    Failed(RelayError),
}

/// Generation client created on first use and memoized afterwards, so the
/// process can start (and answer health checks) without a credential.
pub struct GenerationAdapter {
    state: RwLock<ClientState>,
    factory: ClientFactory,
}

impl GenerationAdapter {
    pub fn new(factory: ClientFactory) -> Self {
        Self {
            state: RwLock::new(ClientState::Uninitialized),
            factory,
        }
    }

    pub fn genai(model: &str, api_key: Option<String>) -> Self {
        let model = model.to_string();
        Self::new(Box::new(move || {
            let key = api_key.as_deref().ok_or(RelayError::MissingCredential)?;
            tracing::info!(target: LOG_TARGET, "initializing generation client for model {model}");
            Ok(Arc::new(GenaiLlmClient::new(&model, key)) as Arc<dyn LlmClient>)
        }))
    }

    pub async fn client(&self) -> Result<Arc<dyn LlmClient>, RelayError> {
        {
            let state = self.state.read().await;
            match &*state {
                ClientState::Ready(client) => return Ok(client.clone()),
                ClientState::Failed(err) => return Err(err.clone()),
                ClientState::Uninitialized => {}
            }
        }

        let mut state = self.state.write().await;
        // another request may have resolved it while we waited for the lock
        match &*state {
            ClientState::Ready(client) => return Ok(client.clone()),
            ClientState::Failed(err) => return Err(err.clone()),
            ClientState::Uninitialized => {}
        }
        match (self.factory)() {
            Ok(client) => {
                *state = ClientState::Ready(client.clone());
                Ok(client)
            }
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, "generation client unavailable: {err}");
                *state = ClientState::Failed(err.clone());
                Err(err)
            }
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, RelayError> {
        self.client().await?.generate(prompt).await
    }

    pub async fn generate_stream(&self, prompt: &str) -> Result<LlmStreamOut, RelayError> {
        self.client().await?.generate_stream(prompt).await
    }
}
