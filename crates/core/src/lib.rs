//! Core logic including agent configuration, guardrails, routing, session
//! storage and the turn runner.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
mod error;
pub mod guardrail;
mod model_client;
pub mod router;
mod runner;
pub mod session;
pub mod tool;

pub use agent::{Agent, AgentBuilder};
pub use error::{Error, Result};
pub use model_client::{ModelClient, ModelClientResponse};
pub use runner::{GuardrailTripped, RunOutcome, Runner, ToolOutput, TurnResult};
