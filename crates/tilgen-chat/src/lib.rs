// Chat crate - conversation state, history trimming, prompt assembly and the session pipeline
pub mod history;
pub mod persistence;
pub mod prompt;
pub mod session;
pub mod store;
pub mod tokens;

// Re-export commonly used items
pub use history::{HistoryTrimmer, TrimConfig, TrimStrategy};
pub use persistence::FileStore;
pub use prompt::{PromptAssembler, PromptBlocks};
pub use session::{normalize_markdown_newlines, GenerationError, PipelineStage, SessionRunner};
pub use store::{InMemoryStore, MessageStore, StoreError};
pub use tokens::{CharEstimateCounter, TiktokenCounter, TokenCounter};
