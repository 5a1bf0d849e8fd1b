//! Single-shot pipeline: transcribe, extract, diagnose.
//!
//! Each stage is one capability call with a fixed prompt and schema. The
//! service holds no mutable state and may be shared across sessions.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::capability::{AudioStore, Capability, HttpAudioStore, OpenAiCapability};
use crate::config::IntakeConfig;
use crate::error::Result;
use crate::prompts::{PromptLoader, PromptName, PromptSource};
use crate::types::{DataModel, DiagnosisModel, PipelineRequest, ResponseEnvelope};

/// A downloaded audio file that is removed when this value goes away.
///
/// [`StagedAudio::release`] deletes through the store. If the owning future
/// is dropped first, `Drop` removes the file synchronously.
struct StagedAudio {
    path: PathBuf,
    armed: bool,
}

impl StagedAudio {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    async fn release(mut self, store: &dyn AudioStore) {
        if let Err(e) = store.delete(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "Failed to delete staged audio");
        }
        self.armed = false;
    }
}

impl Drop for StagedAudio {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed abandoned staged audio"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to delete staged audio"),
        }
    }
}

/// Stage remote audio, transcribe it, and always delete the staged copy.
///
/// A failed delete is logged; the transcription result (or its error) is
/// returned unchanged. Cancelling the future still removes the file.
pub async fn transcribe_staged(
    capability: &dyn Capability,
    store: &dyn AudioStore,
    url: &str,
) -> Result<String> {
    let staged = StagedAudio::new(store.download(url).await?);
    let result = capability.transcribe(&staged.path).await;
    staged.release(store).await;
    result
}

#[derive(Clone)]
pub struct PipelineService {
    capability: Arc<dyn Capability>,
    audio_store: Arc<dyn AudioStore>,
    prompts: Arc<dyn PromptSource>,
}

impl PipelineService {
    pub fn new(
        capability: Arc<dyn Capability>,
        audio_store: Arc<dyn AudioStore>,
        prompts: Arc<dyn PromptSource>,
    ) -> Self {
        Self {
            capability,
            audio_store,
            prompts,
        }
    }

    pub fn from_config(config: &IntakeConfig) -> Result<Self> {
        let audio_store: Arc<dyn AudioStore> =
            Arc::new(HttpAudioStore::new(&config.audio_dir).with_timeout(config.request_timeout));
        let capability = Arc::new(OpenAiCapability::new(config.clone(), Arc::clone(&audio_store))?);
        Ok(Self::new(
            capability,
            audio_store,
            Arc::new(PromptLoader::new(&config.prompts_dir)),
        ))
    }

    pub async fn transcribe(&self, audio_url: &str) -> Result<String> {
        debug!(audio_url, "Transcribing audio");
        transcribe_staged(self.capability.as_ref(), self.audio_store.as_ref(), audio_url).await
    }

    pub async fn extract(&self, text: &str) -> Result<DataModel> {
        let instructions = self.prompts.load(PromptName::DataExtractor)?;
        let schema = DataModel::output_schema();
        let output = self
            .capability
            .complete_structured(&instructions, text, &schema)
            .await?;
        schema.decode(output)
    }

    pub async fn diagnose(&self, data: &DataModel) -> Result<DiagnosisModel> {
        let instructions = self.prompts.load(PromptName::Diagnosis)?;
        let input = serde_json::to_string(data)?;
        let schema = DiagnosisModel::output_schema();
        let output = self
            .capability
            .complete_structured(&instructions, &input, &schema)
            .await?;
        schema.decode(output)
    }

    pub async fn handle_transcribe(&self, request: &PipelineRequest) -> ResponseEnvelope {
        let Some(audio_url) = request.audio_url() else {
            return ResponseEnvelope::unprocessable("audioUrl is required");
        };
        match self.transcribe(audio_url).await {
            Ok(text) => {
                info!("Audio transcription successful");
                ResponseEnvelope::ok("Audio transcription successful", text)
            }
            Err(e) => failure("Error transcribing audio", &e),
        }
    }

    /// Extract from `inputText`, or from the transcript of `audioUrl`.
    pub async fn handle_extract(&self, request: &PipelineRequest) -> ResponseEnvelope {
        let result = match (request.input_text(), request.audio_url()) {
            (Some(text), _) => self.extract(text).await,
            (None, Some(audio_url)) => self.transcribe_then_extract(audio_url).await,
            (None, None) => return ResponseEnvelope::unprocessable("inputText or audioUrl is required"),
        };
        match result.and_then(|data| Ok(serde_json::to_value(data)?)) {
            Ok(data) => ResponseEnvelope::ok("Data extracted successfully", data),
            Err(e) => failure("Error extracting data", &e),
        }
    }

    /// Diagnose `data`, or run the whole chain from `audioUrl`.
    pub async fn handle_diagnose(&self, request: &PipelineRequest) -> ResponseEnvelope {
        let result = match (&request.data, request.audio_url()) {
            (Some(data), _) => self.diagnose(data).await,
            (None, Some(audio_url)) => match self.transcribe_then_extract(audio_url).await {
                Ok(data) => self.diagnose(&data).await,
                Err(e) => Err(e),
            },
            (None, None) => return ResponseEnvelope::unprocessable("data or audioUrl is required"),
        };
        match result.and_then(|diagnosis| Ok(serde_json::to_value(diagnosis)?)) {
            Ok(diagnosis) => ResponseEnvelope::ok("Diagnosis generated successfully", diagnosis),
            Err(e) => failure("Error generating diagnosis", &e),
        }
    }

    async fn transcribe_then_extract(&self, audio_url: &str) -> Result<DataModel> {
        let text = self.transcribe(audio_url).await?;
        self.extract(&text).await
    }
}

fn failure(message: &str, e: &crate::error::IntakeError) -> ResponseEnvelope {
    error!(error = %e, "{message}");
    ResponseEnvelope::internal_error(message, e)
}

impl std::fmt::Debug for PipelineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineService").finish_non_exhaustive()
    }
}
