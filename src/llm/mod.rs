//! LLM classification service: provider trait, pricing table, OpenAI
//! provider and the JSON-answering [`ChatBot`].

pub mod chatbot;
pub mod models;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use chatbot::{parse_structured, ChatBot, Classification, JsonMap};
pub use models::ChatModel;
pub use openai::OpenAiProvider;

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// One completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub usage: Usage,
}

/// A chat model endpoint taking a system message and one user message.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, system: &str, human: &str) -> Result<ChatReply>;
}
