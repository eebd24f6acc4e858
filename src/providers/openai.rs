use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::retry::{is_rate_limited, retry_after, Backoff, RATE_LIMIT_MAX_ATTEMPTS};
use super::{ChatProvider, Message, ProviderFuture};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAI {
    key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAI {
    pub fn new(key: impl Into<String>) -> Self {
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            key: key.into(),
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.trim().is_empty() {
            self.base_url = base_url;
        }
        self
    }

    async fn chat_completion(&self, model: &str, messages: &[Message]) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": model,
            "messages": messages,
        });

        let mut backoff = Backoff::new();
        loop {
            debug!(
                "POST {} (model {}, attempt {})",
                url,
                model,
                backoff.attempt()
            );
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.key)
                .json(&body)
                .send()
                .await
                .with_context(|| format!("failed to reach {}", url))?;

            let status = response.status();
            let retry_after = retry_after(response.headers());
            let text = response
                .text()
                .await
                .with_context(|| format!("failed to read response body from {}", url))?;
            if status.is_success() {
                return extract_content(&text);
            }
            if is_rate_limited(status, &text) {
                let attempt = backoff.attempt();
                if let Some(wait) = backoff.next_wait(retry_after) {
                    warn!(
                        "OpenAI rate limited; retrying in {:.1}s (attempt {}/{})",
                        wait.as_secs_f32(),
                        attempt,
                        RATE_LIMIT_MAX_ATTEMPTS
                    );
                    sleep(wait).await;
                    continue;
                }
            }
            return Err(anyhow!(
                "OpenAI API error ({}): {}",
                status,
                extract_openai_error(&text).unwrap_or(text)
            ));
        }
    }
}

impl ChatProvider for OpenAI {
    fn complete<'a>(&'a self, model: &'a str, messages: &'a [Message]) -> ProviderFuture<'a> {
        Box::pin(async move {
            match self.chat_completion(model, messages).await {
                Ok(content) => content,
                Err(err) => {
                    warn!("chat completion failed: {:#}", err);
                    None
                }
            }
        })
    }
}

fn extract_content(text: &str) -> Result<Option<String>> {
    let payload: ChatCompletionResponse =
        serde_json::from_str(text).with_context(|| "failed to parse OpenAI response JSON")?;
    Ok(payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty()))
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    #[derive(Deserialize)]
    struct OpenAIError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<String>,
    }

    let error = serde_json::from_str::<ErrorBody>(body).ok()?.error?;
    let parts = [
        error.message,
        error.kind.map(|kind| format!("type: {}", kind)),
        error.code.map(|code| format!("code: {}", code)),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect::<Vec<_>>();

    if parts.is_empty() {
        Some("unknown error".to_string())
    } else {
        Some(parts.join(" | "))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
