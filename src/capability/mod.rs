//! External collaborators: the completion/transcription capability and the audio store.

pub mod audio_store;
pub mod http;
pub mod openai;

pub use audio_store::HttpAudioStore;
pub use openai::OpenAiCapability;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::agent::{AgentDefinition, AgentRole};
use crate::error::Result;
use crate::types::{ConversationItem, OutputSchema};

/// Result of running one agent turn, handoffs included.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTurnOutput {
    pub final_output: serde_json::Value,
    /// The agent that produced `final_output`.
    pub answering_agent: AgentRole,
    /// Every agent that held control, in order, starting with the entry agent.
    pub handoff_path: Vec<AgentRole>,
}

impl AgentTurnOutput {
    /// Output of an agent that answered without handing off.
    pub fn direct(agent: AgentRole, final_output: serde_json::Value) -> Self {
        Self {
            final_output,
            answering_agent: agent,
            handoff_path: vec![agent],
        }
    }

    /// Final output as conversation text.
    pub fn output_text(&self) -> String {
        match &self.final_output {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Language-model completion and transcription.
#[async_trait]
pub trait Capability: Send + Sync {
    /// One completion constrained to `schema`.
    async fn complete_structured(
        &self,
        instructions: &str,
        input: &str,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value>;

    /// Run `agent` over the forwarding view, following handoffs internally.
    async fn complete_agent_turn(
        &self,
        agent: &AgentDefinition,
        view: &[ConversationItem],
    ) -> Result<AgentTurnOutput>;

    /// Transcribe a locally staged audio file.
    async fn transcribe(&self, local_audio: &Path) -> Result<String>;
}

/// Stages remote audio on local disk.
#[async_trait]
pub trait AudioStore: Send + Sync {
    async fn download(&self, url: &str) -> Result<PathBuf>;
    async fn delete(&self, local_path: &Path) -> Result<()>;
}
