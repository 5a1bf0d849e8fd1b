//! Extractor tools: a fixed set of typed functions looked up by name.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use strum::{Display, EnumIter, EnumString};

use crate::capability::{AudioStore, Capability};
use crate::error::{IntakeError, Result};
use crate::pipeline::transcribe_staged;
use crate::types::{DataModel, PatientInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ToolKind {
    TranscribeAudio,
    RetrieveMedicalData,
}

/// Collaborators a tool may call. Passed per call; tools hold no state.
#[derive(Clone, Copy)]
pub struct ToolContext<'a> {
    pub capability: &'a dyn Capability,
    pub audio_store: &'a dyn AudioStore,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranscribeAudioInput {
    pub audio_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetrieveMedicalDataInput {
    pub user_id: String,
    pub name: String,
    pub age: u32,
    pub symptoms: Vec<String>,
    pub reason_for_consultation: String,
}

/// Assemble the collected fields into a [`DataModel`].
pub fn retrieve_medical_data(input: RetrieveMedicalDataInput) -> DataModel {
    DataModel {
        symptoms: input.symptoms,
        patient_info: PatientInfo {
            id: input.user_id,
            name: input.name,
            age: input.age,
        },
        reason_for_consultation: input.reason_for_consultation,
    }
}

impl ToolKind {
    /// Look a tool up by the name the model called it with.
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::TranscribeAudio => {
                "Transcribe an audio recording. The audio must be reachable at the given URL."
            }
            Self::RetrieveMedicalData => {
                "Record the patient's structured medical data once every field is known."
            }
        }
    }

    /// JSON Schema of the tool's arguments.
    pub fn parameters(self) -> serde_json::Value {
        match self {
            Self::TranscribeAudio => json!({
                "type": "object",
                "properties": {
                    "audio_url": { "type": "string", "description": "URL of the audio file." }
                },
                "required": ["audio_url"],
                "additionalProperties": false
            }),
            Self::RetrieveMedicalData => json!({
                "type": "object",
                "properties": {
                    "user_id": { "type": "string" },
                    "name": { "type": "string" },
                    "age": { "type": "integer" },
                    "symptoms": { "type": "array", "items": { "type": "string" } },
                    "reason_for_consultation": { "type": "string" }
                },
                "required": ["user_id", "name", "age", "symptoms", "reason_for_consultation"],
                "additionalProperties": false
            }),
        }
    }

    /// Run the tool. Every failure surfaces as [`IntakeError::ToolExecution`].
    pub async fn execute(self, ctx: ToolContext<'_>, args: serde_json::Value) -> Result<serde_json::Value> {
        tracing::info!(tool = %self, "Executing tool");
        self.run(ctx, args).await.map_err(|e| match e {
            IntakeError::ToolExecution { .. } => e,
            other => IntakeError::ToolExecution {
                tool_name: self.to_string(),
                message: other.to_string(),
            },
        })
    }

    async fn run(self, ctx: ToolContext<'_>, args: serde_json::Value) -> Result<serde_json::Value> {
        match self {
            Self::TranscribeAudio => {
                let input: TranscribeAudioInput = self.parse_args(args)?;
                let text = transcribe_staged(ctx.capability, ctx.audio_store, &input.audio_url).await?;
                Ok(serde_json::Value::String(text))
            }
            Self::RetrieveMedicalData => {
                let input: RetrieveMedicalDataInput = self.parse_args(args)?;
                Ok(serde_json::to_value(retrieve_medical_data(input))?)
            }
        }
    }

    fn parse_args<T: DeserializeOwned>(self, args: serde_json::Value) -> Result<T> {
        serde_json::from_value(args).map_err(|e| IntakeError::ToolExecution {
            tool_name: self.to_string(),
            message: format!("invalid arguments: {e}"),
        })
    }
}
