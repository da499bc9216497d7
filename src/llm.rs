//! LLM extraction client
//!
//! Turns free-text workout notes into a structured [`ParsedPayload`] via the
//! Claude API. This is the system's only natural-language boundary: the
//! engine itself never parses text, it receives the structured candidate
//! this module returns.

use crate::models::ParsedPayload;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";
const PARSE_MAX_TOKENS: u32 = 4096;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest {
  model: String,
  max_tokens: u32,
  system: String,
  messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
  role: String,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Usage {
  pub input_tokens: u32,
  pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Extraction Client
/// ---------------------------------------------------------------------------

pub struct ExtractionClient {
  client: Client,
  api_key: String,
  base_url: String,
}

impl ExtractionClient {
  /// Create a client, loading the API key from the environment
  pub fn from_env() -> Result<Self, LlmError> {
    let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
    Ok(Self::new(api_key, DEFAULT_API_BASE.to_string()))
  }

  pub fn new(api_key: String, base_url: String) -> Self {
    Self {
      client: Client::new(),
      api_key,
      base_url,
    }
  }

  /// Call Claude with a system prompt and user message
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    max_tokens: u32,
  ) -> Result<(String, Usage), LlmError> {
    let request = ClaudeRequest {
      model: CLAUDE_MODEL.to_string(),
      max_tokens,
      system: system_prompt.to_string(),
      messages: vec![ClaudeMessage {
        role: "user".to_string(),
        content: user_message.to_string(),
      }],
    };

    let url = format!("{}{}", self.base_url, MESSAGES_PATH);
    let response = self
      .client
      .post(&url)
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    let text = claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))?;

    Ok((text, claude_response.usage))
  }

  /// Parse free workout text into a structured payload. The athlete context
  /// block (current PBs, recent sessions, active injuries) helps the model
  /// resolve ambiguous shorthand like "usual warmup".
  pub async fn parse_workout_text(
    &self,
    text: &str,
    athlete_context: &str,
    today: &str,
  ) -> Result<(ParsedPayload, Usage), LlmError> {
    let system_prompt = include_str!("prompts/parser_system.txt");

    let user_message = format!(
      r#"TODAY'S DATE: {}

{}

WORKOUT TEXT:
{}

Respond with valid JSON matching the OUTPUT FORMAT in your instructions."#,
      today, athlete_context, text
    );

    let (response_text, usage) = self
      .complete(system_prompt, &user_message, PARSE_MAX_TOKENS)
      .await?;

    let json_str = extract_json(&response_text)?;
    let payload: ParsedPayload = serde_json::from_str(&json_str)
      .map_err(|e| LlmError::Parse(format!("{}: {}", e, json_str)))?;

    Ok((payload, usage))
  }
}

/// Extract JSON from a model response (handles markdown code blocks)
fn extract_json(text: &str) -> Result<String, LlmError> {
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  if let Some(start) = text.find("```") {
    let start = start + 3;
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    return Ok(text[start..=end].to_string());
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn test_extract_json_direct() {
    let input = r#"{"sessions": []}"#;
    let result = extract_json(input).unwrap();
    assert!(result.contains("sessions"));
  }

  #[test]
  fn test_extract_json_code_block() {
    let input = r#"Here is the extraction:

```json
{"sessions": [], "personalBests": []}
```

Let me know if anything looks off."#;
    let result = extract_json(input).unwrap();
    assert!(result.contains("personalBests"));
  }

  #[test]
  fn test_extract_json_fallback() {
    let input = r#"The payload is {"sessions": []} as parsed."#;
    let result = extract_json(input).unwrap();
    assert!(result.starts_with('{'));
  }

  #[test]
  #[serial]
  fn test_from_env_requires_key() {
    temp_env::with_var("ANTHROPIC_API_KEY", None::<&str>, || {
      assert!(matches!(ExtractionClient::from_env(), Err(LlmError::MissingApiKey)));
    });
  }

  #[tokio::test]
  async fn test_parse_workout_text_against_mock_server() {
    let mut server = mockito::Server::new_async().await;

    let payload_json = r#"{
      \"sessions\": [{
        \"session\": {\"date\": \"2026-06-01\", \"type\": \"track\", \"title\": \"Sprints\", \"rpe\": 8, \"notes\": null},
        \"groups\": [{\"name\": \"Main\", \"order_index\": 1, \"sets\": [
          {\"exercise_name\": \"100m sprint\", \"category\": \"sprint\", \"sets\": 3, \"reps\": null,
           \"weight_kg\": null, \"distance_m\": 100, \"time_s\": 11.2, \"recovery_s\": 300, \"notes\": null}
        ], \"notes\": null}]
      }],
      \"personalBests\": [{\"type\": \"race\", \"distance_m\": 100, \"time_s\": 11.2, \"notes\": null}],
      \"injuries\": []
    }"#;

    let body = format!(
      r#"{{
        "content": [{{"type": "text", "text": "{}"}}],
        "usage": {{"input_tokens": 900, "output_tokens": 210}}
      }}"#,
      payload_json.replace('\n', " ")
    );

    let mock = server
      .mock("POST", "/v1/messages")
      .match_header("x-api-key", "test-key")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body)
      .create_async()
      .await;

    let client = ExtractionClient::new("test-key".to_string(), server.url());
    let (payload, usage) = client
      .parse_workout_text("3x100m in 11.2, felt great, PB!", "", "2026-06-01")
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(payload.sessions.len(), 1);
    assert_eq!(payload.personal_bests.len(), 1);
    assert_eq!(usage.output_tokens, 210);
  }

  #[tokio::test]
  async fn test_api_error_surfaces_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/v1/messages")
      .with_status(401)
      .with_body(r#"{"error": {"message": "invalid x-api-key"}}"#)
      .create_async()
      .await;

    let client = ExtractionClient::new("bad-key".to_string(), server.url());
    let result = client.parse_workout_text("easy jog", "", "2026-06-01").await;

    match result {
      Err(LlmError::Api(msg)) => assert!(msg.contains("invalid x-api-key")),
      other => panic!("Expected Api error, got {:?}", other.map(|(p, _)| p.sessions.len())),
    }
  }
}
