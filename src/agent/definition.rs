//! Immutable agent definitions.

use std::sync::Arc;

use bon::Builder;

use super::role::AgentRole;
use crate::error::Result;
use crate::prompts::PromptSource;
use crate::tools::ToolKind;
use crate::types::OutputSchema;

/// One reasoning agent: instructions, tools, output schema and handoff targets.
///
/// Built once and shared by every session.
#[derive(Debug, Clone, Builder)]
pub struct AgentDefinition {
    pub role: AgentRole,
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub instructions: String,
    #[builder(into)]
    pub handoff_description: Option<String>,
    pub output_schema: Option<OutputSchema>,
    #[builder(default)]
    pub tools: Vec<ToolKind>,
    #[builder(default)]
    pub handoffs: Vec<Arc<AgentDefinition>>,
    /// Input must pass the guardrail gate before this agent reasons over it.
    #[builder(default)]
    pub guarded: bool,
}

impl AgentDefinition {
    /// A bare definition for `role` with its prompt, name and handoff description.
    pub fn for_role(role: AgentRole, prompts: &dyn PromptSource) -> Result<Self> {
        Ok(Self::builder()
            .role(role)
            .name(role.display_name())
            .instructions(prompts.load(role.prompt())?)
            .maybe_handoff_description(role.handoff_description())
            .build())
    }

    /// Resolve a handoff target by role.
    pub fn handoff(&self, role: AgentRole) -> Option<&Arc<AgentDefinition>> {
        self.handoffs.iter().find(|target| target.role == role)
    }

    pub fn offers_tool(&self, tool: ToolKind) -> bool {
        self.tools.contains(&tool)
    }

    pub fn is_terminal(&self) -> bool {
        self.role.is_terminal()
    }
}
