//! System-prompted chatbot that expects a JSON object back and tracks cost.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ClassificationFormatError, Result};

use super::{ChatModel, ChatProvider, Usage};

pub type JsonMap = Map<String, Value>;

/// Outcome of one [`ChatBot::call`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Parsed reply, or why it could not be parsed.
    pub response: std::result::Result<JsonMap, ClassificationFormatError>,
    /// Cost of the call in USD.
    pub price: f64,
    pub usage: Usage,
}

impl Classification {
    /// Parsed reply, or an empty map (with a warning) when the reply was
    /// malformed.
    pub fn into_degraded(self) -> (JsonMap, f64) {
        let map = match self.response {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "Error checking item relevance, using empty result");
                JsonMap::new()
            }
        };
        (map, self.price)
    }
}

/// Parse a classifier reply. Anything other than a JSON object is a
/// [`ClassificationFormatError`].
pub fn parse_structured(content: &str) -> std::result::Result<JsonMap, ClassificationFormatError> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ClassificationFormatError {
            reason: format!("expected an object, got {}", json_kind(&other)),
            raw: content.to_string(),
        }),
        Err(e) => Err(ClassificationFormatError {
            reason: e.to_string(),
            raw: content.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A provider, its pricing and a fixed system message.
pub struct ChatBot {
    provider: Arc<dyn ChatProvider>,
    model: ChatModel,
    system_message: String,
}

impl std::fmt::Debug for ChatBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatBot")
            .field("model", &self.model.name)
            .field("system_message_len", &self.system_message.len())
            .finish()
    }
}

impl ChatBot {
    pub fn new(provider: Arc<dyn ChatProvider>, model: ChatModel, system_message: &str) -> Self {
        Self {
            provider,
            model,
            system_message: system_message.to_string(),
        }
    }

    pub fn model(&self) -> &ChatModel {
        &self.model
    }

    /// Send `human_message`. Transport errors propagate; a malformed reply is
    /// reported in [`Classification::response`].
    pub async fn call(&self, human_message: &str) -> Result<Classification> {
        let reply = self
            .provider
            .chat(&self.system_message, human_message)
            .await?;
        Ok(Classification {
            response: parse_structured(&reply.content),
            price: self.model.price(&reply.usage),
            usage: reply.usage,
        })
    }
}
