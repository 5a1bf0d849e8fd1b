//! Convenience re-exports for common use.

pub use crate::agent::{AgentDefinition, AgentRole, AgentTopology, GuardrailGate, TopologyRegistry};
pub use crate::capability::{AgentTurnOutput, AudioStore, Capability, HttpAudioStore, OpenAiCapability};
pub use crate::config::IntakeConfig;
pub use crate::conversation::{ConversationState, SessionStore};
pub use crate::engine::{Orchestrator, TurnOutcome};
pub use crate::error::{IntakeError, Result};
pub use crate::pipeline::PipelineService;
pub use crate::prompts::{InMemoryPrompts, PromptLoader, PromptName, PromptSource};
pub use crate::types::{
    ChatRequest, ConversationItem, DataModel, DiagnosisModel, GuardrailVerdict, PatientInfo,
    PipelineRequest, ResponseEnvelope,
};
