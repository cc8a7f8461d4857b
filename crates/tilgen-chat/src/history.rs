use std::sync::Arc;

use tilgen_types::{Message, Role, DEFAULT_MAX_HISTORY_TOKENS};

use crate::tokens::TokenCounter;

/// Which end of the history survives trimming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimStrategy {
    /// Keep the most recent messages
    Last,
    /// Keep the oldest messages
    First,
}

impl TrimStrategy {
    /// Parse strategy from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "last" => Some(Self::Last),
            "first" => Some(Self::First),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Last => "last",
            Self::First => "first",
        }
    }
}

/// Token budget and shape rules for the history sent with each request
#[derive(Debug, Clone)]
pub struct TrimConfig {
    pub max_tokens: usize,
    pub strategy: TrimStrategy,
    /// Keep a leading system message ahead of everything else if it fits
    pub include_system: bool,
    /// Allow the boundary message to be cut down to its trailing lines
    pub allow_partial: bool,
    /// First retained conversation message must have this role.
    /// Only applies to [`TrimStrategy::Last`]; a `First` trim always keeps the oldest message.
    pub start_on: Option<Role>,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_HISTORY_TOKENS,
            strategy: TrimStrategy::Last,
            include_system: true,
            allow_partial: false,
            start_on: Some(Role::Human),
        }
    }
}

/// Bounds a message history to a token budget.
///
/// Only ever removes a prefix (or, for [`TrimStrategy::First`], a suffix);
/// retained messages keep their order and content unless `allow_partial`
/// cuts the single boundary message.
pub struct HistoryTrimmer {
    config: TrimConfig,
    counter: Arc<dyn TokenCounter>,
}

impl HistoryTrimmer {
    pub fn new(config: TrimConfig, counter: Arc<dyn TokenCounter>) -> Self {
        if config.strategy == TrimStrategy::First && config.start_on.is_some() {
            tracing::debug!("start_on is ignored when keeping the oldest messages");
        }
        Self { config, counter }
    }

    pub fn config(&self) -> &TrimConfig {
        &self.config
    }

    pub fn counter(&self) -> &Arc<dyn TokenCounter> {
        &self.counter
    }

    pub fn trim(&self, messages: &[Message]) -> Vec<Message> {
        let mut budget = self.config.max_tokens;
        let mut head: Option<Message> = None;
        let mut rest = messages;

        if self.config.include_system {
            if let Some((first, tail)) = messages.split_first() {
                if first.is_system() {
                    rest = tail;
                    let cost = self.counter.count_message(first);
                    if cost <= budget {
                        budget -= cost;
                        head = Some(first.clone());
                    }
                }
            }
        }

        let kept = match self.config.strategy {
            TrimStrategy::Last => self.keep_last(rest, budget),
            TrimStrategy::First => self.keep_first(rest, budget),
        };

        head.into_iter().chain(kept).collect()
    }

    fn keep_last(&self, messages: &[Message], budget: usize) -> Vec<Message> {
        let mut used = 0;
        let mut kept = Vec::new();

        for message in messages.iter().rev() {
            let cost = self.counter.count_message(message);
            if used + cost <= budget {
                used += cost;
                kept.push(message.clone());
                continue;
            }
            if self.config.allow_partial {
                if let Some(partial) = self.partial_tail(message, budget - used) {
                    kept.push(partial);
                }
            }
            break;
        }
        kept.reverse();

        if let Some(role) = self.config.start_on {
            let start = kept.iter().position(|m| m.role == role).unwrap_or(kept.len());
            kept.drain(..start);
        }
        kept
    }

    fn keep_first(&self, messages: &[Message], budget: usize) -> Vec<Message> {
        let mut used = 0;
        let mut kept = Vec::new();

        for message in messages {
            let cost = self.counter.count_message(message);
            if used + cost <= budget {
                used += cost;
                kept.push(message.clone());
                continue;
            }
            if self.config.allow_partial {
                if let Some(partial) = self.partial_head(message, budget - used) {
                    kept.push(partial);
                }
            }
            break;
        }
        kept
    }

    /// Longest run of trailing lines of `message` that fits in `remaining`
    fn partial_tail(&self, message: &Message, remaining: usize) -> Option<Message> {
        let lines: Vec<&str> = message.content.split('\n').collect();
        let mut best = None;
        for start in (1..lines.len()).rev() {
            let candidate = Message::new(message.role, lines[start..].join("\n"));
            if self.counter.count_message(&candidate) > remaining {
                break;
            }
            best = Some(candidate);
        }
        best
    }

    /// Longest run of leading lines of `message` that fits in `remaining`
    fn partial_head(&self, message: &Message, remaining: usize) -> Option<Message> {
        let lines: Vec<&str> = message.content.split('\n').collect();
        let mut best = None;
        for end in 1..lines.len() {
            let candidate = Message::new(message.role, lines[..end].join("\n"));
            if self.counter.count_message(&candidate) > remaining {
                break;
            }
            best = Some(candidate);
        }
        best
    }
}
