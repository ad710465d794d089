//! A terminal assistant that explains code snippets and answers
//! programming questions.
//!
//! Every input first passes a guardrail that rejects anything unrelated to
//! programming. Code snippets are then explained and their language
//! detected by two tool agents, while other questions are handed off to a
//! general programming agent. The conversation is kept in a SQLite session
//! so follow-up questions see the earlier turns.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
mod explainer;
pub mod guardrail;
pub mod repl;
pub mod roles;
pub mod routing;

pub use config::{Config, ConfigError};
pub use explainer::Explainer;
pub use repl::{Repl, ReplError};

/// Re-exports of [`code_explainer_core`] crate.
pub mod core {
    pub use code_explainer_core::*;
}
