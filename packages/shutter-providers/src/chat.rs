use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use shutter_config::LlmProviderConfig;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct ChatOptions<'a> {
	pub model: &'a str,
	pub temperature: f32,
	pub max_tokens: u32,
}

/// Runs one chat-completions call and returns the first choice's text.
pub async fn complete(
	cfg: &LlmProviderConfig,
	options: ChatOptions<'_>,
	messages: &[Value],
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": options.model,
		"temperature": options.temperature,
		"max_tokens": options.max_tokens,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(Some(&cfg.api_key), &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = crate::check_status(res).await?.json().await?;

	parse_chat_content(&json)
}

fn parse_chat_content(json: &Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(Value::as_array)
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat response is missing message content.".to_string(),
		})?;

	match content {
		Value::String(text) => Ok(text.clone()),
		// Some providers return content as typed parts.
		Value::Array(parts) => Ok(parts
			.iter()
			.filter_map(|part| part.get("text").and_then(Value::as_str))
			.collect::<Vec<_>>()
			.join("")),
		_ => Err(Error::InvalidResponse {
			message: "Chat message content must be text.".to_string(),
		}),
	}
}
