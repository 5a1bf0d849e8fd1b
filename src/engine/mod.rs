//! Conversational turn orchestration.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, info_span, Instrument};

use crate::agent::{AgentRole, GuardrailGate, TopologyRegistry};
use crate::capability::{Capability, HttpAudioStore, OpenAiCapability};
use crate::config::IntakeConfig;
use crate::conversation::{ConversationState, SessionStore};
use crate::error::Result;
use crate::prompts::{PromptLoader, PromptSource};
use crate::types::{ChatRequest, ResponseEnvelope};

pub const TURN_SUCCESS_MESSAGE: &str = "Successfully processed your request.";
pub const TURN_ERROR_MESSAGE: &str = "An error occurred while processing your request.";
pub const TURN_BLOCKED_MESSAGE: &str = "Your request was blocked by the content guardrail.";

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// A non-terminal agent answered; the session continues.
    Replied {
        agent: AgentRole,
        output: serde_json::Value,
    },
    /// The terminal agent answered; the session was reset.
    Completed { output: serde_json::Value },
    /// The guardrail stopped the turn before any agent ran.
    Blocked { info: Option<String> },
}

impl TurnOutcome {
    pub fn into_envelope(self) -> ResponseEnvelope {
        match self {
            Self::Replied { output, .. } | Self::Completed { output } => {
                ResponseEnvelope::ok(TURN_SUCCESS_MESSAGE, output)
            }
            Self::Blocked { info } => {
                ResponseEnvelope::ok(TURN_BLOCKED_MESSAGE, json!({"blocked": true, "info": info}))
            }
        }
    }
}

static SHARED: OnceCell<Orchestrator> = OnceCell::const_new();

/// Drives conversational turns over shared agents and per-session state.
///
/// The agent topology and the moderation agent are built once per
/// orchestrator and shared by its clones. [`Orchestrator::shared`] is the
/// process-wide instance; construct others only for tests or embedding.
#[derive(Clone)]
pub struct Orchestrator {
    capability: Arc<dyn Capability>,
    topology: Arc<TopologyRegistry>,
    guardrail: Arc<GuardrailGate>,
    sessions: Arc<SessionStore>,
}

impl Orchestrator {
    pub fn new(capability: Arc<dyn Capability>, prompts: Arc<dyn PromptSource>) -> Self {
        Self {
            capability,
            topology: Arc::new(TopologyRegistry::new(Arc::clone(&prompts))),
            guardrail: Arc::new(GuardrailGate::new(prompts)),
            sessions: Arc::new(SessionStore::new()),
        }
    }

    /// Wire the OpenAI capability, HTTP audio store and on-disk prompts from `config`.
    pub fn from_config(config: &IntakeConfig) -> Result<Self> {
        let audio_store =
            Arc::new(HttpAudioStore::new(&config.audio_dir).with_timeout(config.request_timeout));
        let capability = Arc::new(OpenAiCapability::new(config.clone(), audio_store)?);
        let prompts = Arc::new(PromptLoader::new(&config.prompts_dir));
        Ok(Self::new(capability, prompts))
    }

    /// The process-wide orchestrator, built from [`IntakeConfig::global`] on first use.
    pub async fn shared() -> Result<&'static Orchestrator> {
        SHARED
            .get_or_try_init(|| async { Self::from_config(IntakeConfig::global()) })
            .await
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn topology(&self) -> &Arc<TopologyRegistry> {
        &self.topology
    }

    /// Handle one request for `session_id`. Turns on the same session run one at a time.
    pub async fn handle(&self, session_id: &str, request: &ChatRequest) -> ResponseEnvelope {
        if let Err(e) = request.validate() {
            return ResponseEnvelope::from_error(TURN_ERROR_MESSAGE, &e);
        }

        let trace = format!("TelepatIA - {}", Utc::now().to_rfc3339());
        let span = info_span!("turn", session_id, trace = %trace);
        async {
            let state = self.sessions.session(session_id);
            let mut state = state.lock().await;
            info!(history = state.len(), "Turn started");
            let envelope = match self.run_turn(&mut state, request).await {
                Ok(outcome) => outcome.into_envelope(),
                Err(e) => {
                    error!(error = %e, "Error getting agent response");
                    ResponseEnvelope::internal_error(TURN_ERROR_MESSAGE, &e)
                }
            };
            info!(status = envelope.status_code, history = state.len(), "Turn finished");
            envelope
        }
        .instrument(span)
        .await
    }

    /// Run one turn against `state`.
    ///
    /// On error the state is restored to its length before the turn.
    pub async fn run_turn(
        &self,
        state: &mut ConversationState,
        request: &ChatRequest,
    ) -> Result<TurnOutcome> {
        let topology = self.topology.get().await?;
        let checkpoint = state.len();
        state.push_user(request.content());

        let result = self.advance(state, &topology).await;
        if result.is_err() {
            state.truncate(checkpoint);
        }
        result
    }

    async fn advance(
        &self,
        state: &mut ConversationState,
        topology: &crate::agent::AgentTopology,
    ) -> Result<TurnOutcome> {
        let view = state.forwarding_view();
        let entry = topology.entry();

        if entry.guarded {
            let verdict = self.guardrail.scan(self.capability.as_ref(), &view).await?;
            if verdict.block {
                return Ok(TurnOutcome::Blocked { info: verdict.info });
            }
        }

        let mut output = self.capability.complete_agent_turn(entry, &view).await?;
        debug!(path = ?output.handoff_path, "Agent turn finished");

        let schema = topology
            .agent(output.answering_agent)
            .and_then(|agent| agent.output_schema.as_ref());
        if let Some(schema) = schema {
            output.final_output = schema.conform(std::mem::take(&mut output.final_output))?;
        }

        if output.answering_agent.is_terminal() {
            info!(agent = %output.answering_agent, "Terminal agent answered; resetting session");
            state.clear();
            return Ok(TurnOutcome::Completed {
                output: output.final_output,
            });
        }

        state.push_assistant(output.output_text());
        Ok(TurnOutcome::Replied {
            agent: output.answering_agent,
            output: output.final_output,
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("sessions", &self.sessions.len())
            .field("topology_ready", &self.topology.is_initialized())
            .finish_non_exhaustive()
    }
}
