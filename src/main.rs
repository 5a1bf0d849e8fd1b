//! TelepatIA CLI binary entry point.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use telepatia::cli::{ChatArgs, Cli, Commands};
use telepatia::config::IntakeConfig;
use telepatia::engine::Orchestrator;
use telepatia::pipeline::PipelineService;
use telepatia::types::{intercept, ChatRequest, PipelineRequest, ResponseEnvelope};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    telepatia::cli::init_tracing(&cli.log);

    let envelope = match cli.command {
        Commands::Chat(args) => {
            if let Err(e) = handle_chat(args).await {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            return;
        }
        Commands::Transcribe(args) => {
            intercept("transcribe_audio", async {
                let service = PipelineService::from_config(&IntakeConfig::from_env()?)?;
                Ok(service.handle_transcribe(&PipelineRequest::audio(args.audio_url)).await)
            })
            .await
        }
        Commands::Extract(args) => {
            intercept("extract_data", async {
                let service = PipelineService::from_config(&IntakeConfig::from_env()?)?;
                Ok(service.handle_extract(&args.to_request()).await)
            })
            .await
        }
        Commands::Diagnose(args) => {
            intercept("generate_diagnosis", async {
                let request = args.to_request()?;
                let service = PipelineService::from_config(&IntakeConfig::from_env()?)?;
                Ok(service.handle_diagnose(&request).await)
            })
            .await
        }
    };

    print_envelope(&envelope);
    if !envelope.is_success() {
        std::process::exit(1);
    }
}

async fn handle_chat(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = Orchestrator::shared().await?;
    let session = args.session.unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut audio_url = args.audio_url;

    eprintln!("Session {session}. Type 'exit' to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        let mut request = ChatRequest::text(line);
        if let Some(url) = audio_url.take() {
            request = request.with_audio_url(url);
        }
        print_envelope(&orchestrator.handle(&session, &request).await);
    }
    Ok(())
}

fn print_envelope(envelope: &ResponseEnvelope) {
    match serde_json::to_string_pretty(envelope) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: failed to render response: {e}"),
    }
}
