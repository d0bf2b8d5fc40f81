//! OpenAI-compatible adapter (OpenRouter by default).
//!
//! Works with any endpoint that follows the chat-completions contract:
//! OpenRouter, OpenAI, vLLM, Ollama. Tool calls arrive as
//! `choices[0].message.tool_calls` with JSON-string arguments.

use serde_json::Value;

use sufra_domain::config::LlmConfig;
use sufra_domain::error::{Error, Result};
use sufra_domain::tool::{ChatMessage, Role, ToolCall, ToolDefinition, Usage};

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OpenRouterProvider {
    id: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_sec))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            id: "openrouter".into(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            client,
        })
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(msg_to_wire).collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });
        if !req.tools.is_empty() {
            let tools: Vec<Value> = req.tools.iter().map(tool_to_wire).collect();
            body["tools"] = Value::Array(tools);
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        if req.json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        body
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(req);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = resp.status();
        let payload: Value = resp.json().await.map_err(map_reqwest)?;

        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error")
                .to_string();
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {status}: {message}"),
            });
        }

        parse_response(&self.id, &payload)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

fn map_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire serialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn msg_to_wire(msg: &ChatMessage) -> Value {
    let mut obj = serde_json::json!({
        "role": role_to_str(msg.role),
        "content": msg.content,
    });
    if !msg.tool_calls.is_empty() {
        let calls: Vec<Value> = msg
            .tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.call_id,
                    "type": "function",
                    "function": {
                        "name": tc.tool_name,
                        "arguments": tc.arguments.to_string(),
                    }
                })
            })
            .collect();
        obj["tool_calls"] = Value::Array(calls);
        if msg.content.is_empty() {
            obj["content"] = Value::Null;
        }
    }
    if let Some(id) = &msg.tool_call_id {
        obj["tool_call_id"] = Value::String(id.clone());
    }
    obj
}

fn tool_to_wire(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_response(provider: &str, payload: &Value) -> Result<ChatResponse> {
    let message = payload
        .pointer("/choices/0/message")
        .ok_or_else(|| Error::Provider {
            provider: provider.to_string(),
            message: "response has no choices".into(),
        })?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(raw_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for raw in raw_calls {
            let call_id = raw
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let name = raw
                .pointer("/function/name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let args_raw = raw
                .pointer("/function/arguments")
                .and_then(Value::as_str)
                .unwrap_or("{}");
            // Some models emit empty or malformed argument strings;
            // surface those as an empty object so the tool layer can
            // report a typed validation error instead of crashing.
            let arguments = serde_json::from_str(args_raw).unwrap_or_else(|e| {
                tracing::warn!(
                    tool = %name,
                    error = %e,
                    "tool call arguments are not valid JSON; defaulting to empty object"
                );
                Value::Object(Default::default())
            });
            tool_calls.push(ToolCall {
                call_id,
                tool_name: name,
                arguments,
            });
        }
    }

    let usage = payload
        .get("usage")
        .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok());

    let model = payload
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(ChatResponse {
        content,
        tool_calls,
        usage,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text_response() {
        let payload = serde_json::json!({
            "model": "openai/gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "هلا!"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        });
        let resp = parse_response("openrouter", &payload).unwrap();
        assert_eq!(resp.content, "هلا!");
        assert!(resp.tool_calls.is_empty());
        assert_eq!(resp.usage.unwrap().total_tokens, 14);
    }

    #[test]
    fn parses_tool_calls_in_order() {
        let payload = serde_json::json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "c1", "type": "function",
                     "function": {"name": "search_menu", "arguments": "{\"query\":\"برجر\"}"}},
                    {"id": "c2", "type": "function",
                     "function": {"name": "get_current_order", "arguments": "{}"}}
                ]
            }}]
        });
        let resp = parse_response("openrouter", &payload).unwrap();
        assert_eq!(resp.tool_calls.len(), 2);
        assert_eq!(resp.tool_calls[0].tool_name, "search_menu");
        assert_eq!(resp.tool_calls[0].arguments["query"], "برجر");
        assert_eq!(resp.tool_calls[1].call_id, "c2");
    }

    #[test]
    fn malformed_arguments_become_empty_object() {
        let payload = serde_json::json!({
            "choices": [{"message": {
                "role": "assistant",
                "tool_calls": [
                    {"id": "c1", "type": "function",
                     "function": {"name": "add_to_order", "arguments": "{broken"}}
                ]
            }}]
        });
        let resp = parse_response("openrouter", &payload).unwrap();
        assert!(resp.tool_calls[0].arguments.as_object().unwrap().is_empty());
    }

    #[test]
    fn missing_choices_is_provider_error() {
        let payload = serde_json::json!({"error": {"message": "overloaded"}});
        assert!(parse_response("openrouter", &payload).is_err());
    }

    #[test]
    fn assistant_tool_message_serializes_null_content() {
        let msg = ChatMessage::assistant_with_tools(
            "",
            vec![ToolCall {
                call_id: "c1".into(),
                tool_name: "search_menu".into(),
                arguments: serde_json::json!({"query": "شاورما"}),
            }],
        );
        let wire = msg_to_wire(&msg);
        assert!(wire["content"].is_null());
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "search_menu");
    }

    #[test]
    fn tool_result_carries_call_id_on_wire() {
        let wire = msg_to_wire(&ChatMessage::tool_result("c9", "{\"success\":true}"));
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "c9");
    }
}
