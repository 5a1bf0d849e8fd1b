//! Entry request models.

use serde::{Deserialize, Serialize};

use super::clinical::DataModel;
use crate::error::{IntakeError, Result};

/// Single-shot pipeline request. Which field is required depends on the operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    #[serde(default, alias = "audio_url")]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub data: Option<DataModel>,
    #[serde(default, alias = "input_text")]
    pub input_text: Option<String>,
}

impl PipelineRequest {
    pub fn audio(url: impl Into<String>) -> Self {
        Self {
            audio_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn text(input: impl Into<String>) -> Self {
        Self {
            input_text: Some(input.into()),
            ..Default::default()
        }
    }

    pub fn data(data: DataModel) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn audio_url(&self) -> Option<&str> {
        non_blank(self.audio_url.as_deref())
    }

    pub fn input_text(&self) -> Option<&str> {
        non_blank(self.input_text.as_deref())
    }
}

/// One conversational turn from the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "audio_url")]
    pub audio_url: Option<String>,
}

impl ChatRequest {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            audio_url: None,
        }
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if non_blank(self.message.as_deref()).is_none() && non_blank(self.audio_url.as_deref()).is_none() {
            return Err(IntakeError::Validation("message or audioUrl is required".into()));
        }
        Ok(())
    }

    /// User content for the conversation log.
    ///
    /// An accompanying audio reference is folded in as a tagged marker;
    /// the audio itself is never inlined.
    pub fn content(&self) -> String {
        let message = non_blank(self.message.as_deref()).unwrap_or_default();
        match non_blank(self.audio_url.as_deref()) {
            Some(url) if message.is_empty() => format!("[Audio URL: {url}]"),
            Some(url) => format!("{message}\n\n[Audio URL: {url}]"),
            None => message.to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
