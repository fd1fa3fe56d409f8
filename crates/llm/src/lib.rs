//! Inference engine boundary: role-tagged requests in, incremental text events out.

use std::sync::Arc;

mod events;
mod model;
mod provider;
mod rig_adapter;

pub use events::{
    Role, SessionId, StreamEventMapped, StreamEventPayload, StreamTarget, TurnId,
};
pub use model::{Model, ModelCatalog, ModelCatalogSource, parse_model_ids};
pub use provider::{
    BoxFuture, LlmProvider, ProviderConfig, ProviderError, ProviderEventStream, ProviderMessage,
    ProviderResult, ProviderStreamHandle, ProviderWorker, StreamRequest, make_event_stream,
};
pub use rig_adapter::{LLAMA_CPP_PROVIDER_ID, OPENAI_COMPATIBLE_PROVIDER_ID, RigProviderAdapter};

/// Builds the engine client named by `config.provider_id`.
///
/// An empty id selects the local llama.cpp server.
pub fn create_provider(
    mut config: ProviderConfig,
    fallback_models: Vec<Model>,
) -> ProviderResult<Arc<dyn LlmProvider>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = LLAMA_CPP_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        "llama-cpp" | "llama.cpp" | "llamacpp" => {
            config.provider_id = LLAMA_CPP_PROVIDER_ID.to_string();
            Ok(Arc::new(RigProviderAdapter::new(config, fallback_models)))
        }
        "openai" | "openai-compatible" => {
            config.provider_id = OPENAI_COMPATIBLE_PROVIDER_ID.to_string();
            Ok(Arc::new(RigProviderAdapter::new(config, fallback_models)))
        }
        _ => Err(ProviderError::UnsupportedProvider {
            stage: "create-provider",
            provider_id: config.provider_id,
        }),
    }
}

pub async fn fetch_models_for_provider(provider: &dyn LlmProvider) -> ProviderResult<ModelCatalog> {
    provider.fetch_models().await
}
