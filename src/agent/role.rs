//! Agent roles and the static handoff table.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::prompts::PromptName;

/// States of the agent graph.
///
/// `Guardrail` is the moderation agent. It has no edges and is only ever
/// invoked as a pre-check, never as part of a conversational turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentRole {
    Manager,
    Extractor,
    Diagnostic,
    Guardrail,
}

/// Handoff edges `(from, to)`. The graph is the single path
/// Manager → Extractor → Diagnostic.
pub const HANDOFFS: &[(AgentRole, AgentRole)] = &[
    (AgentRole::Manager, AgentRole::Extractor),
    (AgentRole::Extractor, AgentRole::Diagnostic),
];

const TRANSFER_PREFIX: &str = "transfer_to_";

impl AgentRole {
    /// Roles this role may hand control to.
    pub fn handoff_targets(self) -> impl Iterator<Item = AgentRole> {
        HANDOFFS
            .iter()
            .filter(move |(from, _)| *from == self)
            .map(|(_, to)| *to)
    }

    pub fn can_hand_off_to(self, target: AgentRole) -> bool {
        HANDOFFS.contains(&(self, target))
    }

    /// Whether an answer from this role ends the session.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Diagnostic)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Manager => "Manager Agent",
            Self::Extractor => "Extractor Agent",
            Self::Diagnostic => "Diagnostic Agent",
            Self::Guardrail => "Content Guardrail Agent",
        }
    }

    /// Shown to the model when this role is offered as a handoff target.
    pub fn handoff_description(self) -> Option<&'static str> {
        match self {
            Self::Manager => None,
            Self::Extractor => Some(
                "Handles transcription of audio inputs and extraction of structured medical data \
                 (symptoms, patient info, reason for consultation). Asks the user for any missing field.",
            ),
            Self::Diagnostic => Some(
                "Receives structured medical data and returns a diagnosis, a treatment plan, \
                 and specific health recommendations.",
            ),
            Self::Guardrail => Some("Moderates all content to prevent harmful requests."),
        }
    }

    pub fn prompt(self) -> PromptName {
        match self {
            Self::Manager => PromptName::ManagerAgent,
            Self::Extractor => PromptName::ExtractorAgent,
            Self::Diagnostic => PromptName::DiagnosticAgent,
            Self::Guardrail => PromptName::GuardrailAgent,
        }
    }

    /// Function name under which a handoff to this role is offered.
    pub fn transfer_tool_name(self) -> String {
        format!("{TRANSFER_PREFIX}{self}_agent")
    }

    pub fn from_transfer_tool(name: &str) -> Option<Self> {
        name.strip_prefix(TRANSFER_PREFIX)?
            .strip_suffix("_agent")?
            .parse()
            .ok()
    }
}
