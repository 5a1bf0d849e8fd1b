//! Agent topology construction and its at-most-once registry.

use std::sync::Arc;

use tokio::sync::OnceCell;

use super::definition::AgentDefinition;
use super::role::AgentRole;
use crate::error::{IntakeError, Result};
use crate::prompts::PromptSource;
use crate::tools::ToolKind;
use crate::types::DiagnosisModel;

/// The three conversational agents, wired Manager → Extractor → Diagnostic.
#[derive(Debug)]
pub struct AgentTopology {
    manager: Arc<AgentDefinition>,
    extractor: Arc<AgentDefinition>,
    diagnostic: Arc<AgentDefinition>,
}

impl AgentTopology {
    /// Build all agents, terminal first. Fails as a whole if any prompt is missing.
    pub fn build(prompts: &dyn PromptSource) -> Result<Self> {
        let diagnostic = Arc::new(AgentDefinition {
            output_schema: Some(DiagnosisModel::output_schema()),
            ..AgentDefinition::for_role(AgentRole::Diagnostic, prompts)?
        });
        let extractor = Arc::new(AgentDefinition {
            tools: vec![ToolKind::TranscribeAudio, ToolKind::RetrieveMedicalData],
            handoffs: vec![Arc::clone(&diagnostic)],
            ..AgentDefinition::for_role(AgentRole::Extractor, prompts)?
        });
        let manager = Arc::new(AgentDefinition {
            handoffs: vec![Arc::clone(&extractor)],
            guarded: true,
            ..AgentDefinition::for_role(AgentRole::Manager, prompts)?
        });

        let topology = Self {
            manager,
            extractor,
            diagnostic,
        };
        topology.check_edges()?;
        Ok(topology)
    }

    /// The agent every turn starts with.
    pub fn entry(&self) -> &Arc<AgentDefinition> {
        &self.manager
    }

    pub fn agent(&self, role: AgentRole) -> Option<&Arc<AgentDefinition>> {
        match role {
            AgentRole::Manager => Some(&self.manager),
            AgentRole::Extractor => Some(&self.extractor),
            AgentRole::Diagnostic => Some(&self.diagnostic),
            AgentRole::Guardrail => None,
        }
    }

    fn check_edges(&self) -> Result<()> {
        for agent in [&self.manager, &self.extractor, &self.diagnostic] {
            let wired: Vec<_> = agent.handoffs.iter().map(|h| h.role).collect();
            let expected: Vec<_> = agent.role.handoff_targets().collect();
            if wired != expected {
                return Err(IntakeError::Initialization(format!(
                    "{} handoffs {wired:?} do not match the transition table {expected:?}",
                    agent.name
                )));
            }
        }
        Ok(())
    }
}

/// Process-wide holder of the topology, built on first use.
///
/// Concurrent first callers wait on one build; a failed build leaves the
/// registry empty so no partial topology is ever handed out.
pub struct TopologyRegistry {
    prompts: Arc<dyn PromptSource>,
    topology: OnceCell<Arc<AgentTopology>>,
}

impl TopologyRegistry {
    pub fn new(prompts: Arc<dyn PromptSource>) -> Self {
        Self {
            prompts,
            topology: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<Arc<AgentTopology>> {
        self.topology
            .get_or_try_init(|| async {
                tracing::info!("Building agent topology");
                let topology = AgentTopology::build(self.prompts.as_ref()).map_err(|e| {
                    tracing::error!(error = %e, "Agent topology build failed");
                    e
                })?;
                Ok(Arc::new(topology))
            })
            .await
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.topology.initialized()
    }
}
