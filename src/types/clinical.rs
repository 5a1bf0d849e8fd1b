//! Clinical data models and their output schemas.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{IntakeError, Result};

/// A named JSON Schema that a structured completion must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

impl OutputSchema {
    /// Decode a structured result into `T`.
    ///
    /// Any mismatch is a hard error; no field is defaulted or coerced.
    pub fn decode<T: DeserializeOwned>(&self, value: serde_json::Value) -> Result<T> {
        serde_json::from_value(value)
            .map_err(|e| IntakeError::schema_mismatch(self.name, e.to_string()))
    }

    /// Check `value` against the typed model behind this schema and return
    /// it in that model's canonical form.
    pub fn conform(&self, value: serde_json::Value) -> Result<serde_json::Value> {
        match self.name {
            "DataModel" => self.round_trip::<DataModel>(value),
            "DiagnosisModel" => self.round_trip::<DiagnosisModel>(value),
            "GuardrailVerdict" => self.round_trip::<GuardrailVerdict>(value),
            other => Err(IntakeError::schema_mismatch(other, "no typed model for this schema")),
        }
    }

    fn round_trip<T: DeserializeOwned + Serialize>(&self, value: serde_json::Value) -> Result<serde_json::Value> {
        let typed: T = self.decode(value)?;
        Ok(serde_json::to_value(typed)?)
    }
}

/// Patient identity block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientInfo {
    pub id: String,
    pub name: String,
    pub age: u32,
}

/// Structured intake data extracted from free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataModel {
    pub symptoms: Vec<String>,
    #[serde(alias = "patient_info")]
    pub patient_info: PatientInfo,
    #[serde(alias = "reason_for_consultation")]
    pub reason_for_consultation: String,
}

impl DataModel {
    pub fn output_schema() -> OutputSchema {
        OutputSchema {
            name: "DataModel",
            schema: json!({
                "type": "object",
                "properties": {
                    "symptoms": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Symptoms reported by the patient."
                    },
                    "patientInfo": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Unique identifier for the patient." },
                            "name": { "type": "string", "description": "Name of the patient." },
                            "age": { "type": "integer", "description": "Age of the patient." }
                        },
                        "required": ["id", "name", "age"],
                        "additionalProperties": false
                    },
                    "reasonForConsultation": {
                        "type": "string",
                        "description": "Reason for the patient's consultation."
                    }
                },
                "required": ["symptoms", "patientInfo", "reasonForConsultation"],
                "additionalProperties": false
            }),
        }
    }
}

/// Diagnosis produced from a [`DataModel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosisModel {
    pub diagnosis: String,
    pub treatment: String,
    #[serde(alias = "recomendations")]
    pub recommendations: String,
}

impl DiagnosisModel {
    pub fn output_schema() -> OutputSchema {
        OutputSchema {
            name: "DiagnosisModel",
            schema: json!({
                "type": "object",
                "properties": {
                    "diagnosis": { "type": "string", "description": "The diagnosis made for the patient." },
                    "treatment": { "type": "string", "description": "The recommended treatment plan." },
                    "recommendations": { "type": "string", "description": "Additional care recommendations." }
                },
                "required": ["diagnosis", "treatment", "recommendations"],
                "additionalProperties": false
            }),
        }
    }
}

/// Moderation outcome for one turn's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    pub block: bool,
    #[serde(default)]
    pub info: Option<String>,
}

impl GuardrailVerdict {
    pub fn allow() -> Self {
        Self { block: false, info: None }
    }

    pub fn block(info: impl Into<String>) -> Self {
        Self {
            block: true,
            info: Some(info.into()),
        }
    }

    pub fn output_schema() -> OutputSchema {
        OutputSchema {
            name: "GuardrailVerdict",
            schema: json!({
                "type": "object",
                "properties": {
                    "block": { "type": "boolean", "description": "Whether the input violates the content policy." },
                    "info": { "type": ["string", "null"], "description": "Why the input was blocked." }
                },
                "required": ["block", "info"],
                "additionalProperties": false
            }),
        }
    }
}
