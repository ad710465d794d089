//! The protocol spoken between agents and the LLM services behind them.
//!
//! Every agent role (guardrail, tool agents, fallback, triage) talks to
//! its model only through the types defined here, so the orchestration
//! layer never depends on a particular vendor API. A provider crate
//! implements [`ModelProvider`] and translates these types to its own
//! wire format.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
