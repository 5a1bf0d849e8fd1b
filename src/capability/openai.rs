//! OpenAI Chat Completions capability.
//!
//! Handoffs are offered to the model as `transfer_to_<role>_agent` function
//! tools. Calling one swaps the active agent (instructions, tools, output
//! schema) for the next round-trip; the turn ends when the active agent
//! answers with plain content.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::http::{
    audio_mime_for, bearer_headers, build_transcription_multipart, status_to_error,
    strip_code_fences, trim_trailing_slash,
};
use super::{AgentTurnOutput, AudioStore, Capability};
use crate::agent::{AgentDefinition, AgentRole};
use crate::config::IntakeConfig;
use crate::error::{IntakeError, Result};
use crate::tools::{ToolContext, ToolKind};
use crate::types::{ConversationItem, OutputSchema};
use crate::util::timeout::with_timeout;

pub struct OpenAiCapability {
    config: IntakeConfig,
    audio_store: std::sync::Arc<dyn AudioStore>,
    client: reqwest::Client,
}

impl OpenAiCapability {
    /// `audio_store` stages audio for the transcription tool.
    pub fn new(config: IntakeConfig, audio_store: std::sync::Arc<dyn AudioStore>) -> Result<Self> {
        config.require_api_key()?;
        Ok(Self {
            config,
            audio_store,
            client: reqwest::Client::new(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", trim_trailing_slash(&self.config.base_url))
    }

    async fn chat(&self, body: &serde_json::Value) -> Result<ChatMessage> {
        let api_key = self.config.require_api_key()?;
        let url = self.url("chat/completions");

        with_timeout(self.config.request_timeout, async {
            let resp = self
                .client
                .post(&url)
                .headers(bearer_headers(api_key))
                .json(body)
                .send()
                .await?;

            let status = resp.status().as_u16();
            let text = resp.text().await?;
            if !(200..300).contains(&status) {
                return Err(status_to_error(status, &text));
            }

            let data: ChatResponse = serde_json::from_str(&text)?;
            data.choices
                .into_iter()
                .next()
                .map(|choice| choice.message)
                .ok_or_else(|| IntakeError::api(status, "No choices in completion response"))
        })
        .await
    }

    fn agent_request_body(&self, agent: &AgentDefinition, transcript: &[serde_json::Value]) -> serde_json::Value {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(json!({"role": "system", "content": agent.instructions}));
        messages.extend(transcript.iter().cloned());

        let mut tools: Vec<serde_json::Value> = agent
            .tools
            .iter()
            .map(|tool| function_tool(&tool.to_string(), tool.description(), tool.parameters()))
            .collect();
        tools.extend(agent.handoffs.iter().map(|target| {
            function_tool(
                &target.role.transfer_tool_name(),
                target
                    .handoff_description
                    .as_deref()
                    .unwrap_or(target.name.as_str()),
                json!({"type": "object", "properties": {}, "additionalProperties": false}),
            )
        }));

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
        });
        if let Some(obj) = body.as_object_mut() {
            if !tools.is_empty() {
                obj.insert("tools".into(), tools.into());
            }
            if let Some(schema) = &agent.output_schema {
                obj.insert("response_format".into(), response_format(schema));
            }
        }
        body
    }

    async fn run_tool_call(
        &self,
        agent: &AgentDefinition,
        call: &ToolCall,
    ) -> Result<serde_json::Value> {
        let kind = ToolKind::from_name(&call.function.name)
            .filter(|kind| agent.offers_tool(*kind))
            .ok_or_else(|| IntakeError::ToolExecution {
                tool_name: call.function.name.clone(),
                message: format!("not offered by {}", agent.name),
            })?;
        let args = if call.function.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.function.arguments)?
        };
        let ctx = ToolContext {
            capability: self,
            audio_store: self.audio_store.as_ref(),
        };
        kind.execute(ctx, args).await
    }
}

#[async_trait]
impl Capability for OpenAiCapability {
    async fn complete_structured(
        &self,
        instructions: &str,
        input: &str,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value> {
        debug!(model = %self.config.model, schema = schema.name, "OpenAI structured completion");
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": instructions},
                {"role": "user", "content": input},
            ],
            "response_format": response_format(schema),
        });
        let reply = self.chat(&body).await?;
        parse_structured(schema, reply.content.as_deref().unwrap_or_default())
    }

    async fn complete_agent_turn(
        &self,
        agent: &AgentDefinition,
        view: &[ConversationItem],
    ) -> Result<AgentTurnOutput> {
        let mut current = agent;
        let mut handoff_path = vec![agent.role];
        let mut transcript: Vec<serde_json::Value> = view
            .iter()
            .filter(|item| item.is_message())
            .map(|item| json!({"role": item.role.to_string(), "content": item.content}))
            .collect();

        for _ in 0..self.config.max_agent_turns {
            debug!(agent = %current.role, messages = transcript.len(), "OpenAI agent round-trip");
            let reply = self.chat(&self.agent_request_body(current, &transcript)).await?;
            let tool_calls = reply.tool_calls.unwrap_or_default();

            if tool_calls.is_empty() {
                let content = reply.content.unwrap_or_default();
                let final_output = match &current.output_schema {
                    Some(schema) => schema.conform(parse_structured(schema, &content)?)?,
                    None => serde_json::Value::String(content),
                };
                return Ok(AgentTurnOutput {
                    final_output,
                    answering_agent: current.role,
                    handoff_path,
                });
            }

            transcript.push(json!({
                "role": "assistant",
                "content": reply.content,
                "tool_calls": tool_calls
                    .iter()
                    .map(|call| json!({
                        "id": call.id,
                        "type": "function",
                        "function": {"name": call.function.name, "arguments": call.function.arguments},
                    }))
                    .collect::<Vec<_>>(),
            }));

            let mut next: Option<&AgentDefinition> = None;
            for call in &tool_calls {
                let handoff = AgentRole::from_transfer_tool(&call.function.name)
                    .and_then(|role| current.handoff(role));
                let result = match handoff {
                    Some(target) => {
                        next.get_or_insert(target.as_ref());
                        json!({"assistant": target.name})
                    }
                    None => self.run_tool_call(current, call).await?,
                };
                transcript.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": result.to_string(),
                }));
            }

            if let Some(target) = next {
                debug!(from = %current.role, to = %target.role, "Agent handoff");
                current = target;
                handoff_path.push(current.role);
            }
        }

        Err(IntakeError::capability(
            "agent_turn",
            format!(
                "no final output after {} model round-trips",
                self.config.max_agent_turns
            ),
        ))
    }

    async fn transcribe(&self, local_audio: &Path) -> Result<String> {
        let api_key = self.config.require_api_key()?;
        let audio = tokio::fs::read(local_audio).await?;
        let file_name = local_audio
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let boundary = format!("telepatia-{}", Uuid::new_v4().simple());
        let body = build_transcription_multipart(
            &boundary,
            &self.config.transcription_model,
            &audio,
            &file_name,
            audio_mime_for(&file_name),
        );

        let mut headers = bearer_headers(api_key);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}")).map_err(
                |e| IntakeError::capability("transcribe", format!("invalid content-type: {e}")),
            )?,
        );

        debug!(file = %file_name, bytes = audio.len(), "OpenAI transcription");
        let url = self.url("audio/transcriptions");
        with_timeout(self.config.request_timeout, async {
            let resp = self.client.post(&url).headers(headers).body(body).send().await?;
            let status = resp.status().as_u16();
            let text = resp.text().await?;
            if !(200..300).contains(&status) {
                return Err(status_to_error(status, &text));
            }
            let parsed: TranscriptionResponse = serde_json::from_str(&text)?;
            Ok(parsed.text)
        })
        .await
    }
}

fn function_tool(name: &str, description: &str, parameters: serde_json::Value) -> serde_json::Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters,
        }
    })
}

fn response_format(schema: &OutputSchema) -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": schema.name,
            "schema": schema.schema,
            "strict": true,
        }
    })
}

fn parse_structured(schema: &OutputSchema, content: &str) -> Result<serde_json::Value> {
    serde_json::from_str(strip_code_fences(content))
        .map_err(|e| IntakeError::schema_mismatch(schema.name, format!("output is not JSON: {e}")))
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    id: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}
