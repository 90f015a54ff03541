//! Supported chat models and their per-token prices (USD).

use crate::error::{Result, ReviewDeskError};

use super::Usage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatModel {
    pub name: &'static str,
    /// USD per input token.
    pub pricing_input: f64,
    /// USD per output token.
    pub pricing_output: f64,
}

pub const GPT_4O: ChatModel = ChatModel {
    name: "gpt-4o",
    pricing_input: 5.0 / 1_000_000.0,
    pricing_output: 15.0 / 1_000_000.0,
};

pub const GPT_3_5_TURBO: ChatModel = ChatModel {
    name: "gpt-3.5-turbo",
    pricing_input: 0.5 / 1_000_000.0,
    pricing_output: 1.5 / 1_000_000.0,
};

pub const KNOWN_MODELS: &[ChatModel] = &[GPT_4O, GPT_3_5_TURBO];

impl ChatModel {
    /// Look up a model by name (case-insensitive).
    pub fn by_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        KNOWN_MODELS
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| {
                ReviewDeskError::Config(format!(
                    "Unknown model '{}'. Known models: {}",
                    name,
                    KNOWN_MODELS
                        .iter()
                        .map(|m| m.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    /// Cost of one call in USD.
    pub fn price(&self, usage: &Usage) -> f64 {
        f64::from(usage.input_tokens) * self.pricing_input
            + f64::from(usage.output_tokens) * self.pricing_output
    }
}
