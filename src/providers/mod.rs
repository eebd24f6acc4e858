use anyhow::{anyhow, Result};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

mod openai;
mod retry;

pub use openai::OpenAI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

pub type ProviderFuture<'a> = Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;

/// A chat-completion backend. Transport or API failures resolve to `None`,
/// the same as an empty reply.
pub trait ChatProvider: Send + Sync {
    fn complete<'a>(&'a self, model: &'a str, messages: &'a [Message]) -> ProviderFuture<'a>;
}

pub fn resolve_key(override_key: Option<&str>) -> Result<String> {
    override_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| get_env("OPENAI_API_KEY"))
        .ok_or_else(|| anyhow!("no API key found (pass --api-key or set OPENAI_API_KEY)"))
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
