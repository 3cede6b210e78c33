//! services/api/src/adapters/study_llm.rs
//!
//! This module contains the adapter for the study-material LLM.
//! It implements the `StudyModelService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;

use studyforge_core::domain::{ModelChoice, ProcessingDirective};
use studyforge_core::ports::{ModelError, StudyModelService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `StudyModelService` using an OpenAI-compatible LLM.
///
/// The budget allocator picks an abstract model tier; this adapter owns the
/// mapping from tier to concrete model id.
#[derive(Clone)]
pub struct OpenAiStudyAdapter {
    client: Client<OpenAIConfig>,
    fast_model: String,
    balanced_model: String,
    powerful_model: String,
}

impl OpenAiStudyAdapter {
    /// Creates a new `OpenAiStudyAdapter`.
    pub fn new(
        client: Client<OpenAIConfig>,
        fast_model: String,
        balanced_model: String,
        powerful_model: String,
    ) -> Self {
        Self {
            client,
            fast_model,
            balanced_model,
            powerful_model,
        }
    }

    fn model_id(&self, choice: ModelChoice) -> &str {
        match choice {
            ModelChoice::Fast => &self.fast_model,
            ModelChoice::Balanced => &self.balanced_model,
            ModelChoice::Powerful => &self.powerful_model,
        }
    }
}

/// Classifies an upstream API failure into the port-level taxonomy so the
/// pipeline never has to inspect provider-specific messages.
fn classify(e: OpenAIError) -> ModelError {
    match e {
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.clone().unwrap_or_default();
            let text = format!("{} {}", kind, api.message).to_lowercase();
            if text.contains("invalid_api_key")
                || text.contains("incorrect api key")
                || text.contains("authentication")
            {
                ModelError::Auth
            } else if text.contains("rate limit") || text.contains("rate_limit") {
                ModelError::RateLimited
            } else {
                ModelError::Other(api.message)
            }
        }
        other => ModelError::Other(other.to_string()),
    }
}

//=========================================================================================
// `StudyModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StudyModelService for OpenAiStudyAdapter {
    /// Sends the fully built prompt to the selected model tier and returns the
    /// raw reply text. The prompt already carries the JSON contract; the
    /// response validator downstream handles malformed replies.
    async fn generate(
        &self,
        prompt: &str,
        directive: &ProcessingDirective,
    ) -> Result<String, ModelError> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| ModelError::Other(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model_id(directive.model))
            .messages(messages)
            .max_tokens(directive.max_tokens)
            .temperature(directive.temperature)
            .n(1)
            .build()
            .map_err(|e| ModelError::Other(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify)?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(ModelError::Other(
                    "Study LLM response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(ModelError::Other(
                "Study LLM returned no choices in its response.".to_string(),
            ))
        }
    }
}
