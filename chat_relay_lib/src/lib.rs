pub mod config;
pub mod error;
pub mod generation;
pub mod live_data;
pub mod llm_service;
pub mod prompt;
pub mod relay;

pub use config::RelayConfig;
pub use error::RelayError;
pub use generation::GenerationAdapter;
pub use live_data::{LiveDataProvider, WeatherSnapshot, WeatherSource};
pub use llm_service::{GenaiLlmClient, LlmClient, LlmStreamOut};
pub use relay::{ChatRequest, RelayEvent, RelayEventStream, RelayService};

pub const LOG_TARGET: &str = "chat_relay";
