//! Guardrail gate: a moderation agent run as a pre-check before the entry agent.

use std::sync::Arc;

use tokio::sync::OnceCell;

use super::definition::AgentDefinition;
use super::role::AgentRole;
use crate::capability::Capability;
use crate::error::Result;
use crate::prompts::PromptSource;
use crate::types::{ConversationItem, GuardrailVerdict};

/// Lazily builds and caches the moderation agent, then scans forwarding views with it.
pub struct GuardrailGate {
    prompts: Arc<dyn PromptSource>,
    agent: OnceCell<Arc<AgentDefinition>>,
}

impl GuardrailGate {
    pub fn new(prompts: Arc<dyn PromptSource>) -> Self {
        Self {
            prompts,
            agent: OnceCell::new(),
        }
    }

    /// The moderation agent, built at most once.
    pub async fn moderation_agent(&self) -> Result<Arc<AgentDefinition>> {
        self.agent
            .get_or_try_init(|| async {
                tracing::info!("Building guardrail agent");
                let agent = AgentDefinition {
                    output_schema: Some(GuardrailVerdict::output_schema()),
                    ..AgentDefinition::for_role(AgentRole::Guardrail, self.prompts.as_ref())?
                };
                Ok(Arc::new(agent))
            })
            .await
            .cloned()
    }

    /// Ask the moderation agent whether this turn's input may proceed.
    ///
    /// The agent goes through the same capability call as any other agent.
    pub async fn scan(
        &self,
        capability: &dyn Capability,
        view: &[ConversationItem],
    ) -> Result<GuardrailVerdict> {
        let agent = self.moderation_agent().await?;
        let output = capability.complete_agent_turn(&agent, view).await?;
        let verdict: GuardrailVerdict = GuardrailVerdict::output_schema().decode(output.final_output)?;

        if verdict.block {
            tracing::warn!(info = verdict.info.as_deref().unwrap_or(""), "Guardrail blocked input");
        } else {
            tracing::debug!("Guardrail passed input");
        }
        Ok(verdict)
    }
}
