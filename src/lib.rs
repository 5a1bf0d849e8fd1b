//! TelepatIA: conversational medical-intake orchestration.
//!
//! A chat turn runs through a guardrail check and then a fixed chain of
//! agents (Manager → Extractor → Diagnostic); a diagnosis from the terminal
//! agent ends the session. A stateless pipeline exposes the same stages
//! (transcribe, extract, diagnose) as single-shot calls.
//!
//! # Quick Start
//!
//! ```no_run
//! use telepatia::prelude::*;
//!
//! # async fn example() -> telepatia::error::Result<()> {
//! let config = IntakeConfig::from_env()?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//! let envelope = orchestrator
//!     .handle("session-1", &ChatRequest::text("Tengo fiebre desde ayer"))
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&envelope)?);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod capability;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod prompts;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
