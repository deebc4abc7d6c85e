use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::LlmSettings,
    tool::{self, Tool, ToolDeclaration},
    util::truncate_body,
};

use super::{ExecutionSettings, LlmError, LlmHost};

/// Upper bound on model turns that end in tool calls.
pub const MAX_TOOL_ROUNDS: usize = 8;

/// Azure OpenAI chat-completions host with automatic tool invocation.
#[derive(Debug, Clone)]
pub struct AzureOpenAiHost {
    url: String,
    api_key: String,
    api_version: String,
    http: Client,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool(call_id: String, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(call_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded arguments object, as produced by the model.
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize)]
struct FunctionSpec {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolDeclaration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [FunctionSpec],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f32,
    max_tokens: u32,
}

fn no_tools(tools: &&[FunctionSpec]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

impl AzureOpenAiHost {
    pub fn new(settings: &LlmSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client for Azure OpenAI")?;

        let url = format!(
            "{}/openai/deployments/{}/chat/completions",
            settings.endpoint.trim_end_matches('/'),
            settings.deployment
        );

        Ok(Self {
            url,
            api_key: settings.api_key.clone(),
            api_version: settings.api_version.clone(),
            http,
        })
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionSpec],
        settings: &ExecutionSettings,
    ) -> Result<ChatMessage, LlmError> {
        let body = ChatRequest {
            messages,
            tools,
            tool_choice: (!tools.is_empty()).then_some("auto"),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        let res = self
            .http
            .post(&self.url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status,
                body: truncate_body(&text),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(LlmError::EmptyChoices)
    }
}

#[async_trait]
impl LlmHost for AzureOpenAiHost {
    async fn invoke_prompt(
        &self,
        prompt: &str,
        tools: &[&dyn Tool],
        settings: &ExecutionSettings,
    ) -> Result<Option<String>, LlmError> {
        let specs: Vec<FunctionSpec> = if settings.auto_invoke_tools {
            tools
                .iter()
                .map(|t| FunctionSpec {
                    kind: "function",
                    function: ToolDeclaration::of(*t),
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut messages = vec![ChatMessage::user(prompt)];

        for round in 0..MAX_TOOL_ROUNDS {
            let reply = self.complete(&messages, &specs, settings).await?;

            let calls = reply.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() || specs.is_empty() {
                debug!(target: "llm", round, "Model produced final answer");
                return Ok(reply.content.filter(|c| !c.trim().is_empty()));
            }

            info!(target: "llm", round, calls = calls.len(), "Model requested tool calls");
            messages.push(reply);

            for call in calls {
                let output = run_tool_call(tools, &call).await;
                messages.push(ChatMessage::tool(call.id, output));
            }
        }

        Err(LlmError::ToolLoop(MAX_TOOL_ROUNDS))
    }
}

/// Execute one model-issued call. Failures are reported back to the model as text.
async fn run_tool_call(tools: &[&dyn Tool], call: &ToolCall) -> String {
    let arguments = if call.function.arguments.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_str::<Value>(&call.function.arguments) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "llm", tool = %call.function.name, error = %e, "Malformed tool arguments");
                return format!("Error: invalid arguments for {}: {e}", call.function.name);
            }
        }
    };

    match tool::invoke(tools, &call.function.name, arguments).await {
        Ok(output) => output,
        Err(e) => {
            warn!(target: "llm", tool = %call.function.name, error = %e, "Tool call failed");
            format!("Error: {e}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_deployment_url() {
        let host = AzureOpenAiHost::new(&LlmSettings {
            endpoint: "https://res.openai.azure.com/".into(),
            api_key: "KEY".into(),
            deployment: "gpt-4".into(),
            api_version: "2024-02-01".into(),
            temperature: 0.7,
            max_tokens: 500,
        })
        .unwrap();

        assert_eq!(
            host.url,
            "https://res.openai.azure.com/openai/deployments/gpt-4/chat/completions"
        );
    }

    #[test]
    fn request_omits_tools_when_none_registered() {
        let messages = [ChatMessage::user("hi")];
        let body = ChatRequest {
            messages: &messages,
            tools: &[],
            tool_choice: None,
            temperature: 0.7,
            max_tokens: 500,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
        assert_eq!(json["messages"][0], json!({"role": "user", "content": "hi"}));
        assert_eq!(json["max_tokens"], 500);
    }

    #[test]
    fn parses_assistant_tool_calls() {
        let raw = json!({
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "GetCurrentWeather", "arguments": "{\"cityName\":\"Paris\"}"}
                    }]
                }
            }]
        });

        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        let message = &parsed.choices[0].message;
        let calls = message.tool_calls.as_ref().unwrap();

        assert!(message.content.is_none());
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "GetCurrentWeather");
    }

    #[tokio::test]
    async fn malformed_arguments_are_reported_as_text() {
        let call = ToolCall {
            id: "call_1".into(),
            kind: function_kind(),
            function: FunctionCall {
                name: "GetCurrentWeather".into(),
                arguments: "{not json".into(),
            },
        };

        let out = run_tool_call(&[], &call).await;
        assert!(out.starts_with("Error: invalid arguments for GetCurrentWeather"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_as_text() {
        let call = ToolCall {
            id: "call_1".into(),
            kind: function_kind(),
            function: FunctionCall {
                name: "Nope".into(),
                arguments: "{}".into(),
            },
        };

        let out = run_tool_call(&[], &call).await;
        assert_eq!(out, "Error: Tool not found: Nope");
    }
}
