//! Chat completion model used to phrase answers.

use crate::config::{Credential, RagSettings};
use crate::error::{Result, TubechatError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// An earlier question and the answer it got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Produces a completion for a system prompt, earlier turns and a new user prompt.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        history: &[ConversationTurn],
        user: &str,
    ) -> Result<String>;
}

/// OpenAI chat completion model.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn new(credential: &Credential, settings: &RagSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(credential)?,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl AnswerModel for OpenAIChatModel {
    #[instrument(skip(self, system, history, user), fields(model = %self.model, turns = history.len()))]
    async fn complete(
        &self,
        system: &str,
        history: &[ConversationTurn],
        user: &str,
    ) -> Result<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| TubechatError::Engine(e.to_string()))?
                .into(),
        ];

        for turn in history {
            messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.question.clone())
                    .build()
                    .map_err(|e| TubechatError::Engine(e.to_string()))?
                    .into(),
            );
            messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.answer.clone())
                    .build()
                    .map_err(|e| TubechatError::Engine(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| TubechatError::Engine(e.to_string()))?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| TubechatError::Engine(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| TubechatError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| TubechatError::Engine("Empty response from LLM".to_string()))?;

        debug!("Generated answer of {} chars", answer.len());
        Ok(answer)
    }
}
