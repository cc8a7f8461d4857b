use anyhow::Result;
use tiktoken_rs::CoreBPE;

use tilgen_types::Message;

/// Fixed per-message cost of the chat framing (role markers, separators)
pub const MESSAGE_OVERHEAD_TOKENS: usize = 3;

/// Estimates how many tokens text occupies for the target model
pub trait TokenCounter: Send + Sync {
    fn count_text(&self, text: &str) -> usize;

    fn count_message(&self, message: &Message) -> usize {
        self.count_text(&message.content) + self.count_text(message.role.as_str()) + MESSAGE_OVERHEAD_TOKENS
    }

    fn count_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.count_message(m)).sum()
    }
}

/// BPE token counter matching the completion model's tokenizer
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Pick the encoding for `model`, falling back to cl100k for unknown names
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(_) => {
                tracing::debug!(model, "no tokenizer registered for model, using cl100k_base");
                tiktoken_rs::cl100k_base()?
            }
        };
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_text(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Rough estimate of one token per four characters
#[derive(Debug, Default, Clone, Copy)]
pub struct CharEstimateCounter;

impl TokenCounter for CharEstimateCounter {
    fn count_text(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}
