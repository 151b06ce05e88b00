//! OpenAI-compatible chat completion client.
//!
//! Behaviour:
//! - Prepend the configured system prompt to the prior turns (timestamps dropped).
//! - `POST {base_url}/chat/completions` with model, temperature and `max_tokens`.
//! - Return the first choice's text, or a fixed apology when anything goes wrong.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::CompletionConfig;
use crate::conversation::{Role, Turn};
use crate::llm::error::{CompletionError, CompletionResult};

/// Text returned to the user when the completion call fails.
pub const FALLBACK_REPLY: &str = "I apologize, but I'm having trouble processing your message right now. Please try again later.";

/// How a reply was obtained.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReplyStatus {
    /// Text came from the model.
    Generated,
    /// The call failed and [`FALLBACK_REPLY`] was substituted.
    Fallback,
}

/// Reply text plus its provenance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    /// Text to show the user.
    pub text: String,
    /// Whether the text is real model output.
    pub status: ReplyStatus,
}

impl Reply {
    /// Wrap model output.
    #[must_use]
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: ReplyStatus::Generated,
        }
    }

    /// The fixed apology.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            text: FALLBACK_REPLY.to_string(),
            status: ReplyStatus::Fallback,
        }
    }

    /// True when the service was degraded.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.status, ReplyStatus::Fallback)
    }
}

#[derive(Debug, PartialEq, Serialize)]
struct ChatMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Stateless client: all history is passed in on every call.
pub struct CompletionClient {
    client: Client,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Build a client for the given endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: CompletionConfig) -> CompletionResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    /// Endpoint settings in use.
    #[must_use]
    pub const fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Generate one reply to the conversation so far.
    ///
    /// Never fails: errors are logged and turned into [`Reply::fallback`].
    pub async fn generate_reply(&self, prior_turns: &[Turn]) -> Reply {
        match self.try_generate_reply(prior_turns).await {
            Ok(text) => Reply::generated(text),
            Err(err) => {
                tracing::error!(model = %self.config.model, error = %err, "completion request failed");
                Reply::fallback()
            }
        }
    }

    /// Generate one reply, surfacing the failure kind.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status, or a
    /// response without usable text.
    pub async fn try_generate_reply(&self, prior_turns: &[Turn]) -> CompletionResult<String> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: self.build_messages(prior_turns),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.http_referer)
            .header("X-Title", &self.config.app_title)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::EmptyChoices)?
            .message
            .content
            .ok_or(CompletionError::MissingContent)
    }

    fn build_messages<'a>(&'a self, prior_turns: &'a [Turn]) -> Vec<ChatMessage<'a>> {
        std::iter::once(ChatMessage {
            role: Role::System,
            content: &self.config.system_prompt,
        })
        .chain(prior_turns.iter().map(|turn| ChatMessage {
            role: turn.role,
            content: &turn.content,
        }))
        .collect()
    }
}
