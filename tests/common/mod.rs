//! Shared test helpers: scripted capability and audio store fakes.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Notify;

use telepatia::agent::{AgentDefinition, AgentRole};
use telepatia::capability::{AgentTurnOutput, AudioStore, Capability};
use telepatia::error::{IntakeError, Result};
use telepatia::prompts::{InMemoryPrompts, PromptName, PromptSource};
use telepatia::types::{ConversationItem, DataModel, GuardrailVerdict, OutputSchema, PatientInfo};

/// A capability that replays queued outputs and counts every invocation.
#[derive(Default)]
pub struct FakeCapability {
    structured_calls: AtomicUsize,
    agent_calls: AtomicUsize,
    guardrail_calls: AtomicUsize,
    transcribe_calls: AtomicUsize,
    verdicts: Mutex<VecDeque<GuardrailVerdict>>,
    turns: Mutex<VecDeque<Result<AgentTurnOutput>>>,
    structured: Mutex<HashMap<&'static str, serde_json::Value>>,
    transcript: Mutex<Option<String>>,
    hang_transcribe: AtomicBool,
    transcribe_started: Notify,
    views: Mutex<Vec<Vec<ConversationItem>>>,
}

impl FakeCapability {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Next guardrail scan returns this verdict. Unqueued scans allow.
    pub fn queue_verdict(&self, verdict: GuardrailVerdict) {
        self.verdicts.lock().unwrap().push_back(verdict);
    }

    /// Next agent turn is answered by `agent` with `output`.
    pub fn queue_answer(&self, agent: AgentRole, output: serde_json::Value) {
        let mut path = vec![AgentRole::Manager];
        match agent {
            AgentRole::Extractor => path.push(AgentRole::Extractor),
            AgentRole::Diagnostic => path.extend([AgentRole::Extractor, AgentRole::Diagnostic]),
            _ => {}
        }
        self.turns.lock().unwrap().push_back(Ok(AgentTurnOutput {
            final_output: output,
            answering_agent: agent,
            handoff_path: path,
        }));
    }

    pub fn queue_turn_error(&self, error: IntakeError) {
        self.turns.lock().unwrap().push_back(Err(error));
    }

    /// Structured output returned for the schema named `schema`.
    pub fn set_structured(&self, schema: &'static str, value: serde_json::Value) {
        self.structured.lock().unwrap().insert(schema, value);
    }

    /// `None` makes transcription fail.
    pub fn set_transcript(&self, text: Option<&str>) {
        *self.transcript.lock().unwrap() = text.map(str::to_string);
    }

    /// Transcription never completes; the call only ends when cancelled.
    pub fn hang_transcription(&self) {
        self.hang_transcribe.store(true, Ordering::SeqCst);
    }

    /// Resolves once a transcription call has started.
    pub async fn transcribe_started(&self) {
        self.transcribe_started.notified().await;
    }

    pub fn calls(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
            + self.agent_calls.load(Ordering::SeqCst)
            + self.guardrail_calls.load(Ordering::SeqCst)
            + self.transcribe_calls.load(Ordering::SeqCst)
    }

    pub fn agent_calls(&self) -> usize {
        self.agent_calls.load(Ordering::SeqCst)
    }

    pub fn guardrail_calls(&self) -> usize {
        self.guardrail_calls.load(Ordering::SeqCst)
    }

    /// Forwarding views passed to the entry agent, in call order.
    pub fn views(&self) -> Vec<Vec<ConversationItem>> {
        self.views.lock().unwrap().clone()
    }
}

#[async_trait]
impl Capability for FakeCapability {
    async fn complete_structured(
        &self,
        _instructions: &str,
        _input: &str,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        self.structured
            .lock()
            .unwrap()
            .get(schema.name)
            .cloned()
            .ok_or_else(|| IntakeError::capability("complete_structured", "no scripted output"))
    }

    async fn complete_agent_turn(
        &self,
        agent: &AgentDefinition,
        view: &[ConversationItem],
    ) -> Result<AgentTurnOutput> {
        if agent.role == AgentRole::Guardrail {
            self.guardrail_calls.fetch_add(1, Ordering::SeqCst);
            let verdict = self
                .verdicts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(GuardrailVerdict::allow);
            return Ok(AgentTurnOutput::direct(
                AgentRole::Guardrail,
                serde_json::to_value(verdict)?,
            ));
        }

        self.agent_calls.fetch_add(1, Ordering::SeqCst);
        self.views.lock().unwrap().push(view.to_vec());
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AgentTurnOutput::direct(agent.role, json!("¿En qué puedo ayudarle?"))))
    }

    async fn transcribe(&self, local_audio: &Path) -> Result<String> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        assert!(local_audio.exists(), "transcribe called on a missing staged file");
        self.transcribe_started.notify_one();
        if self.hang_transcribe.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.transcript
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| IntakeError::capability("transcribe", "transcription service unavailable"))
    }
}

/// Stages "downloads" as real files in a temp dir and records deletions.
pub struct FakeAudioStore {
    dir: TempDir,
    staged: Mutex<Vec<PathBuf>>,
    deleted: Mutex<Vec<PathBuf>>,
}

impl FakeAudioStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dir: TempDir::new().unwrap(),
            staged: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        })
    }

    pub fn staged(&self) -> Vec<PathBuf> {
        self.staged.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<PathBuf> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioStore for FakeAudioStore {
    async fn download(&self, url: &str) -> Result<PathBuf> {
        let name = url.rsplit('/').next().unwrap_or("audio");
        let path = self.dir.path().join(name);
        tokio::fs::write(&path, b"ID3fakeaudio").await?;
        self.staged.lock().unwrap().push(path.clone());
        Ok(path)
    }

    async fn delete(&self, local_path: &Path) -> Result<()> {
        tokio::fs::remove_file(local_path).await?;
        self.deleted.lock().unwrap().push(local_path.to_path_buf());
        Ok(())
    }
}

/// Prompt source that counts loads per prompt, slowly.
#[derive(Default)]
pub struct CountingPrompts {
    inner: InMemoryPrompts,
    loads: Mutex<HashMap<PromptName, usize>>,
}

impl CountingPrompts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryPrompts::placeholder(),
            loads: Mutex::new(HashMap::new()),
        })
    }

    pub fn loads(&self, name: PromptName) -> usize {
        self.loads.lock().unwrap().get(&name).copied().unwrap_or(0)
    }
}

impl PromptSource for CountingPrompts {
    fn load(&self, name: PromptName) -> Result<String> {
        *self.loads.lock().unwrap().entry(name).or_default() += 1;
        std::thread::sleep(std::time::Duration::from_millis(20));
        self.inner.load(name)
    }
}

pub fn prompts() -> Arc<InMemoryPrompts> {
    Arc::new(InMemoryPrompts::placeholder())
}

pub fn ana() -> DataModel {
    DataModel {
        symptoms: vec!["fever".into()],
        patient_info: PatientInfo {
            id: "1".into(),
            name: "Ana".into(),
            age: 30,
        },
        reason_for_consultation: "fever check".into(),
    }
}

pub fn diagnosis_json() -> serde_json::Value {
    json!({
        "diagnosis": "Viral fever",
        "treatment": "Paracetamol 500mg every 8 hours",
        "recommendations": "Rest and hydration"
    })
}
