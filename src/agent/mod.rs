//! Agent system: roles, immutable definitions, the handoff topology and the guardrail gate.

pub mod definition;
pub mod guardrail;
pub mod role;
pub mod topology;

pub use definition::AgentDefinition;
pub use guardrail::GuardrailGate;
pub use role::{AgentRole, HANDOFFS};
pub use topology::{AgentTopology, TopologyRegistry};
