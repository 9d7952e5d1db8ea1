use std::time::Duration;

use color_eyre::Result;
use reqwest::Client;
use serde_json::Value;

/// Sends one chat completion and returns the JSON object embedded in the reply.
///
/// There is no retry: a non-success status surfaces as [`crate::Error::Status`] so the caller can
/// decide whether to back off.
pub async fn complete_json(
	cfg: &vibe_config::LlmProviderConfig,
	api_key: &str,
	messages: &[Value],
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json = crate::read_json(res).await?;

	parse_completion_json(&json)
}

/// Parses the span between the first `{` and the last `}` of model output.
pub fn extract_json(text: &str) -> Option<Value> {
	let start = text.find('{')?;
	let end = text.rfind('}')?;

	if end <= start {
		return None;
	}

	serde_json::from_str::<Value>(&text[start..=end]).ok().filter(Value::is_object)
}

fn parse_completion_json(json: &Value) -> Result<Value> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.unwrap_or_default();

	extract_json(content).ok_or_else(|| {
		crate::Error::InvalidResponse {
			message: "Completion content does not contain a JSON object.".to_string(),
		}
		.into()
	})
}
