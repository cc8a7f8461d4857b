//! TIL Generator Application Library
//!
//! CLI, wiring and the HTTP surface around the session pipeline.

// Re-export workspace crates
pub use tilgen_chat as chat;
pub use tilgen_llm_api as llm_api;
pub use tilgen_types::{self as types, Message, Role};

// Local modules
pub mod app;
pub mod cli;
pub mod web;

pub use cli::Cli;
