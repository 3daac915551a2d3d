//! Text generation via an OpenAI-compatible chat completions API.

use crate::types::RemoteCallError;
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;

const SYSTEM_PROMPT: &str =
    "You are a careful research assistant. Ground every statement in the material you are given.";

/// [`super::GenerateClient`] backed by the `async-openai` client.
pub struct OpenAiGenerate {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerate {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(config),
            model,
        }
    }

    /// The configured model identifier.
    pub fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl super::GenerateClient for OpenAiGenerate {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> std::result::Result<String, RemoteCallError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(
                    SYSTEM_PROMPT.to_string(),
                )),
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
                    prompt.to_string(),
                )),
            ])
            .max_tokens(max_tokens)
            .temperature(temperature)
            .build()
            .map_err(|e| RemoteCallError::InvalidResponse(format!("failed to build request: {e}")))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify)?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| RemoteCallError::InvalidResponse("empty completion".to_string()))
    }
}

/// Map provider errors onto the gateway taxonomy. Rate limits must come
/// back as `RateLimited` so the gateway's single retry applies.
fn classify(err: OpenAIError) -> RemoteCallError {
    let message = err.to_string();
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("rate limit") || lowered.contains("429") {
        return RemoteCallError::RateLimited(message);
    }
    match err {
        OpenAIError::JSONDeserialize(..) | OpenAIError::InvalidArgument(_) => {
            RemoteCallError::InvalidResponse(message)
        }
        _ => RemoteCallError::Unavailable(message),
    }
}
