use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::{Config, ModelPrice, resolve_api_key};

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// One chat-completions call: a system prompt and a single user message.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user_content: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest<'_> {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system".to_string(),
                content: self.system_prompt.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: self.user_content.to_string(),
            },
        ]
    }
}

/// `message.content` of a choice, keeping "absent" apart from "null".
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Missing,
    Null,
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionChoice {
    pub content: MessageContent,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
    /// USD.
    pub cost: f64,
}

pub trait ReviewBackend {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<CompletionResponse>;
}

/// OpenAI-compatible `chat/completions` over HTTPS.
pub struct HttpBackend<'a> {
    cfg: &'a Config,
    client: Client,
}

impl<'a> HttpBackend<'a> {
    pub fn new(cfg: &'a Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { cfg, client })
    }
}

impl ReviewBackend for HttpBackend<'_> {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<CompletionResponse> {
        let (provider, profile) = self.cfg.provider_for(request.model)?;
        let api_key = resolve_api_key(&provider, &profile)?;
        let body = request_body(&provider, request);
        debug!(url = %profile.base_url, provider = %provider, "sending completion request");

        let resp = self
            .client
            .post(&profile.base_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .with_context(|| format!("Request failed: {}", profile.base_url))?;

        let status = resp.status();
        let text = resp.text().context("Failed to read response body")?;
        if !status.is_success() {
            bail!("API error {}: {}", status, text);
        }
        let val: Value = serde_json::from_str(&text).context("Invalid JSON response")?;
        Ok(parse_completion(&val, self.cfg.price_for(request.model)))
    }
}

/// Strip the routing prefix: `openrouter/openai/gpt-4o` is sent as `openai/gpt-4o`.
fn wire_model<'m>(provider: &str, model: &'m str) -> &'m str {
    model
        .strip_prefix(provider)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(model)
}

/// OpenAI reasoning models take `max_completion_tokens` and reject `temperature`.
fn is_openai_reasoning_model(provider: &str, model: &str) -> bool {
    if provider != "openai" {
        return false;
    }
    let mut chars = model.chars();
    chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn request_body(provider: &str, request: &CompletionRequest<'_>) -> Value {
    let model = wire_model(provider, request.model);
    let mut body = Map::new();
    body.insert("model".to_string(), json!(model));
    body.insert("messages".to_string(), json!(request.messages()));
    if is_openai_reasoning_model(provider, model) {
        body.insert(
            "max_completion_tokens".to_string(),
            json!(request.max_tokens),
        );
    } else {
        body.insert("max_tokens".to_string(), json!(request.max_tokens));
        body.insert("temperature".to_string(), json!(request.temperature));
    }
    Value::Object(body)
}

pub fn parse_completion(value: &Value, price: Option<ModelPrice>) -> CompletionResponse {
    let choices = value
        .get("choices")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(parse_choice).collect())
        .unwrap_or_default();
    CompletionResponse {
        choices,
        cost: completion_cost(value, price),
    }
}

fn parse_choice(choice: &Value) -> CompletionChoice {
    let content = match choice.get("message").and_then(|m| m.get("content")) {
        None => MessageContent::Missing,
        Some(Value::Null) => MessageContent::Null,
        Some(Value::String(s)) => MessageContent::Text(s.clone()),
        Some(Value::Array(items)) => {
            let mut out = String::new();
            for item in items {
                if item.get("type").and_then(|t| t.as_str()) == Some("text")
                    && let Some(t) = item.get("text").and_then(|t| t.as_str())
                {
                    out.push_str(t);
                }
            }
            MessageContent::Text(out)
        }
        Some(_) => MessageContent::Missing,
    };
    CompletionChoice {
        content,
        finish_reason: choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// Provider-reported `usage.cost` if present, else token counts times the price table.
fn completion_cost(value: &Value, price: Option<ModelPrice>) -> f64 {
    let Some(usage) = value.get("usage") else {
        return 0.0;
    };
    if let Some(cost) = usage.get("cost").and_then(Value::as_f64) {
        return cost;
    }
    let Some(price) = price else {
        return 0.0;
    };
    let tokens = |key: &str| usage.get(key).and_then(Value::as_u64).unwrap_or(0) as f64;
    (tokens("prompt_tokens") * price.input_per_million
        + tokens("completion_tokens") * price.output_per_million)
        / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn request<'a>(model: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            model,
            system_prompt: "be kind",
            user_content: "```diff\n+x\n```",
            max_tokens: 512,
            temperature: 0.3,
        }
    }

    #[test]
    fn parses_string_null_missing_and_parts() {
        let val = json!({
            "choices": [
                {"message": {"content": "looks good"}, "finish_reason": "stop"},
                {"message": {"content": null}, "finish_reason": "content_filter"},
                {"message": {"role": "assistant"}},
                {"message": {"content": [
                    {"type": "text", "text": "part one, "},
                    {"type": "image_url", "image_url": "x"},
                    {"type": "text", "text": "part two"}
                ]}}
            ]
        });
        let resp = parse_completion(&val, None);
        let contents: Vec<MessageContent> =
            resp.choices.iter().map(|c| c.content.clone()).collect();
        assert_eq!(
            contents,
            vec![
                MessageContent::Text("looks good".to_string()),
                MessageContent::Null,
                MessageContent::Missing,
                MessageContent::Text("part one, part two".to_string()),
            ]
        );
        assert_eq!(resp.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.choices[2].finish_reason, None);
    }

    #[test]
    fn missing_choices_is_empty() {
        assert!(parse_completion(&json!({"error": "nope"}), None).choices.is_empty());
    }

    #[test]
    fn cost_prefers_reported_usage_cost() {
        let price = ModelPrice {
            input_per_million: 1.0,
            output_per_million: 2.0,
        };
        let reported = json!({"choices": [], "usage": {"cost": 0.0123, "prompt_tokens": 10}});
        assert_eq!(parse_completion(&reported, Some(price)).cost, 0.0123);

        let counted = json!({
            "choices": [],
            "usage": {"prompt_tokens": 1_000_000, "completion_tokens": 500_000}
        });
        assert_eq!(parse_completion(&counted, Some(price)).cost, 2.0);
        assert_eq!(parse_completion(&counted, None).cost, 0.0);
    }

    #[test]
    fn body_strips_provider_prefix() {
        let body = request_body("openrouter", &request("openrouter/anthropic/claude-3.5-sonnet"));
        assert_eq!(body["model"], "anthropic/claude-3.5-sonnet");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "```diff\n+x\n```");
    }

    #[test]
    fn openai_reasoning_models_drop_temperature() {
        let body = request_body("openai", &request("openai/o4-mini"));
        assert_eq!(body["model"], "o4-mini");
        assert_eq!(body["max_completion_tokens"], 512);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());

        let body = request_body("openai", &request("openai/gpt-4.1"));
        assert!(body.get("temperature").is_some());
    }
}
