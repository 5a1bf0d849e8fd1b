//! Command-line interface for TelepatIA.

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::{IntakeError, Result};
use crate::types::{DataModel, PipelineRequest};

/// TelepatIA medical-intake CLI
#[derive(Parser, Debug)]
#[command(name = "telepatia", version, about = "Conversational medical-intake assistant")]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive conversation over one session
    Chat(ChatArgs),
    /// Transcribe an audio file reachable by URL
    Transcribe(TranscribeArgs),
    /// Extract structured patient data from text or audio
    Extract(ExtractArgs),
    /// Generate a diagnosis from patient data or audio
    Diagnose(DiagnoseArgs),
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Session id; a random one is used when omitted
    #[arg(long)]
    pub session: Option<String>,

    /// Audio URL attached to the first message
    #[arg(long)]
    pub audio_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct TranscribeArgs {
    pub audio_url: String,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Free text to extract from
    pub input_text: Option<String>,

    #[arg(long, conflicts_with = "input_text")]
    pub audio_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct DiagnoseArgs {
    /// Patient data as a JSON DataModel
    #[arg(long)]
    pub data: Option<String>,

    #[arg(long, conflicts_with = "data")]
    pub audio_url: Option<String>,
}

impl ExtractArgs {
    pub fn to_request(&self) -> PipelineRequest {
        PipelineRequest {
            input_text: self.input_text.clone(),
            audio_url: self.audio_url.clone(),
            data: None,
        }
    }
}

impl DiagnoseArgs {
    /// Fails when `--data` is not a valid DataModel.
    pub fn to_request(&self) -> Result<PipelineRequest> {
        let data = self
            .data
            .as_deref()
            .map(serde_json::from_str::<DataModel>)
            .transpose()
            .map_err(|e| IntakeError::Validation(format!("invalid --data: {e}")))?;
        Ok(PipelineRequest {
            audio_url: self.audio_url.clone(),
            data,
            input_text: None,
        })
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
