mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{diagnosis_json, FakeAudioStore};
use telepatia::agent::{AgentRole, AgentTopology};
use telepatia::capability::{AudioStore, Capability, HttpAudioStore, OpenAiCapability};
use telepatia::config::IntakeConfig;
use telepatia::engine::{Orchestrator, TURN_ERROR_MESSAGE};
use telepatia::error::IntakeError;
use telepatia::prompts::InMemoryPrompts;
use telepatia::types::{ChatRequest, ConversationItem, DataModel};

fn config(server: &MockServer) -> IntakeConfig {
    IntakeConfig::default()
        .with_api_key("test-key")
        .with_base_url(server.uri())
}

fn capability(server: &MockServer) -> OpenAiCapability {
    OpenAiCapability::new(config(server), FakeAudioStore::new()).unwrap()
}

fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments.to_string()}
                }]
            }
        }]
    })
}

fn answer(content: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

fn topology() -> AgentTopology {
    AgentTopology::build(&InMemoryPrompts::placeholder()).unwrap()
}

#[tokio::test]
async fn structured_completion_strips_code_fences() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("\"strict\":true"))
        .and(body_string_contains("DataModel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer(
            "```json\n{\"symptoms\":[\"fever\"],\"patientInfo\":{\"id\":\"1\",\"name\":\"Ana\",\"age\":30},\"reasonForConsultation\":\"fever check\"}\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let schema = DataModel::output_schema();
    let value = capability(&server)
        .complete_structured("extract", "patient reports fever", &schema)
        .await
        .unwrap();
    let data: DataModel = schema.decode(value).unwrap();
    assert_eq!(data, common::ana());
}

#[tokio::test]
async fn agent_turn_follows_handoffs_to_terminal_agent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("manager_agent instructions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call(
            "call_1",
            "transfer_to_extractor_agent",
            json!({}),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("extractor_agent instructions"))
        .and(body_string_contains("fever check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call(
            "call_3",
            "transfer_to_diagnostic_agent",
            json!({}),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("extractor_agent instructions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call(
            "call_2",
            "retrieve_medical_data",
            json!({
                "user_id": "1",
                "name": "Ana",
                "age": 30,
                "symptoms": ["fever"],
                "reason_for_consultation": "fever check"
            }),
        )))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("diagnostic_agent instructions"))
        .and(body_string_contains("DiagnosisModel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer(&format!(
            "```json\n{}\n```",
            diagnosis_json()
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let topology = topology();
    let output = capability(&server)
        .complete_agent_turn(topology.entry(), &[ConversationItem::user("Ana, 30, fiebre")])
        .await
        .unwrap();

    assert_eq!(output.answering_agent, AgentRole::Diagnostic);
    assert_eq!(
        output.handoff_path,
        vec![AgentRole::Manager, AgentRole::Extractor, AgentRole::Diagnostic]
    );
    assert_eq!(output.final_output, diagnosis_json());
}

#[tokio::test]
async fn plain_answer_ends_turn_at_entry_agent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer("¿Cuál es su nombre?")))
        .expect(1)
        .mount(&server)
        .await;

    let topology = topology();
    let output = capability(&server)
        .complete_agent_turn(topology.entry(), &[ConversationItem::user("Hola")])
        .await
        .unwrap();

    assert_eq!(output.answering_agent, AgentRole::Manager);
    assert_eq!(output.output_text(), "¿Cuál es su nombre?");
}

#[tokio::test]
async fn tool_not_offered_by_agent_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call(
            "call_1",
            "retrieve_medical_data",
            json!({}),
        )))
        .mount(&server)
        .await;

    let topology = topology();
    let err = capability(&server)
        .complete_agent_turn(topology.entry(), &[ConversationItem::user("Hola")])
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::ToolExecution { ref tool_name, .. } if tool_name == "retrieve_medical_data"));
}

#[tokio::test]
async fn agent_turn_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call(
            "call_n",
            "retrieve_medical_data",
            json!({
                "user_id": "1",
                "name": "Ana",
                "age": 30,
                "symptoms": ["fever"],
                "reason_for_consultation": "fever check"
            }),
        )))
        .expect(2)
        .mount(&server)
        .await;

    let topology = topology();
    let capability =
        OpenAiCapability::new(config(&server).with_max_agent_turns(2), FakeAudioStore::new())
            .unwrap();
    let err = capability
        .complete_agent_turn(
            topology.agent(AgentRole::Extractor).unwrap(),
            &[ConversationItem::user("Ana")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::Capability { ref stage, .. } if stage == "agent_turn"));
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = capability(&server)
        .complete_structured("x", "y", &DataModel::output_schema())
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::Authentication(_)));
}

#[tokio::test]
async fn malformed_body_is_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = capability(&server)
        .complete_structured("x", "y", &DataModel::output_schema())
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::Serialization(_)));
}

#[tokio::test]
async fn transcription_uploads_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("name=\"model\""))
        .and(body_string_contains("gpt-4o-transcribe"))
        .and(body_string_contains("filename=\"a.mp3\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"text": "patient reports fever"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let audio = dir.path().join("a.mp3");
    std::fs::write(&audio, b"ID3fakeaudio").unwrap();

    let text = capability(&server).transcribe(&audio).await.unwrap();
    assert_eq!(text, "patient reports fever");
}

#[tokio::test]
async fn transcribe_tool_stages_and_cleans_up_audio() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/a.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3fakeaudio".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"text": "patient reports fever"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("patient reports fever"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer("¿Cuál es su edad?")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call(
            "call_1",
            "transcribe_audio",
            json!({"audio_url": format!("{}/files/a.mp3", server.uri())}),
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let staging = TempDir::new().unwrap();
    let store = Arc::new(HttpAudioStore::new(staging.path()));
    let capability = OpenAiCapability::new(config(&server), store).unwrap();

    let topology = topology();
    let output = capability
        .complete_agent_turn(
            topology.agent(AgentRole::Extractor).unwrap(),
            &[ConversationItem::user("[Audio URL: http://x/a.mp3]")],
        )
        .await
        .unwrap();

    assert_eq!(output.answering_agent, AgentRole::Extractor);
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn audio_store_downloads_and_deletes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audio/visit.wav"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFfakewav".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = HttpAudioStore::new(dir.path().join("staging"));

    let local = store
        .download(&format!("{}/audio/visit.wav", server.uri()))
        .await
        .unwrap();
    assert!(local.starts_with(store.dir()));
    assert!(local.to_string_lossy().ends_with("-visit.wav"));
    assert_eq!(std::fs::read(&local).unwrap(), b"RIFFfakewav");

    store.delete(&local).await.unwrap();
    assert!(!local.exists());

    let err = store.delete(&local).await.unwrap_err();
    assert!(matches!(err, IntakeError::AudioStore(ref m) if m.starts_with("Audio file not found")));
}

#[tokio::test]
async fn audio_store_rejects_failed_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = HttpAudioStore::new(dir.path());
    let err = store
        .download(&format!("{}/missing.mp3", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::AudioStore(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn transcribe_tool_with_malformed_url_fails_turn_with_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("guardrail_agent instructions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(answer(r#"{"block":false,"info":null}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("manager_agent instructions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call(
            "call_1",
            "transfer_to_extractor_agent",
            json!({}),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("extractor_agent instructions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call(
            "call_2",
            "transcribe_audio",
            json!({"audio_url": "not a url"}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let staging = TempDir::new().unwrap();
    let capability =
        OpenAiCapability::new(config(&server), Arc::new(HttpAudioStore::new(staging.path())))
            .unwrap();
    let engine = Orchestrator::new(Arc::new(capability), Arc::new(InMemoryPrompts::placeholder()));

    let envelope = engine
        .handle("s1", &ChatRequest::text("Aquí está el audio: not a url"))
        .await;

    assert_eq!(envelope.status_code, 500);
    assert_eq!(envelope.message, TURN_ERROR_MESSAGE);
    let detail = envelope.response.unwrap().as_str().unwrap().to_string();
    assert!(detail.starts_with("Tool execution error: transcribe_audio"), "{detail}");
    assert!(detail.contains("not a url"), "{detail}");
    assert!(engine.sessions().snapshot("s1").await.unwrap().is_empty());
}

#[tokio::test]
async fn diagnostic_answer_outside_schema_is_schema_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer(r#"{"oops":1}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let topology = topology();
    let err = capability(&server)
        .complete_agent_turn(
            topology.agent(AgentRole::Diagnostic).unwrap(),
            &[ConversationItem::user("Ana, 30, fiebre")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::SchemaMismatch { ref schema, .. } if schema == "DiagnosisModel"));
}
