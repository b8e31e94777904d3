//! Gemini chat client for testing AI agents
//!
//! Sends the agent's system prompt, the conversation so far and a new user
//! message to `generateContent`, and appends the reply to the history.

use crate::error::{KitError, Result};
use crate::settings;
use crate::utils::safe_truncate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Who said a chat line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One line of a test conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: &str) -> Self {
        Self { role: ChatRole::User, text: text.to_string() }
    }

    pub fn model(text: &str) -> Self {
        Self { role: ChatRole::Model, text: text.to_string() }
    }
}

/// Gemini API content part
#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Gemini API message format
#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

/// Gemini API request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Map the model labels stored on agents to API model names.
/// Empty means the configured default.
pub fn resolve_model(agent_model: &str) -> String {
    match agent_model.trim() {
        "" => settings::get_gemini_model(),
        "gemini-flash" => "gemini-1.5-flash".to_string(),
        "gemini-pro" => "gemini-1.5-pro".to_string(),
        other => other.to_string(),
    }
}

pub struct ChatClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.to_string(),
            base_url: DEFAULT_API_BASE.to_string(),
            http,
        }
    }

    /// Point the client at another endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn from_settings() -> Result<Self> {
        let key = settings::get_gemini_api_key().ok_or(KitError::MissingConfig("gemini-api-key"))?;
        Ok(Self::new(&key))
    }

    /// Send `message` with the previous `history` and the agent's system prompt.
    ///
    /// A blank message is ignored and returns `None`. On success the user turn
    /// and the reply are both appended to `history`; on failure it is left as it was.
    pub async fn send_message(
        &self,
        model: &str,
        system_prompt: &str,
        history: &mut Vec<ChatTurn>,
        message: &str,
    ) -> Result<Option<String>> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }

        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content {
                role: Some(match turn.role {
                    ChatRole::User => "user".to_string(),
                    ChatRole::Model => "model".to_string(),
                }),
                parts: vec![Part { text: turn.text.clone() }],
            })
            .collect();
        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part { text: message.to_string() }],
        });

        let system_instruction = if system_prompt.trim().is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part { text: system_prompt.to_string() }],
            })
        };
        let request = GenerateRequest { system_instruction, contents };

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        debug!(model, turns = history.len() + 1, "Sending chat message");
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(KitError::Ai { status, body });
        }

        let api_response: GenerateResponse = response.json().await?;
        let reply: String = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(KitError::Ai {
                status: 200,
                body: "response contained no text".into(),
            });
        }

        info!(model, reply = %safe_truncate(&reply, 80), "Agent replied");
        history.push(ChatTurn::user(message));
        history.push(ChatTurn::model(&reply));
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, MockResponse};

    const REPLY: &str = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Did you notice the clock? "},{"text":"It stopped at three."}]}}]}"#;

    #[tokio::test]
    async fn test_send_message_builds_history() {
        let server = serve(vec![MockResponse::json(200, REPLY)]);
        let client = ChatClient::new("test-key").with_base_url(&server.url);

        let mut history = vec![ChatTurn::user("Who are you?"), ChatTurn::model("Inspector Lestrade.")];
        let reply = client
            .send_message("gemini-1.5-flash", "You are a Victorian detective.", &mut history, " What now? ")
            .await
            .unwrap();

        assert_eq!(reply.as_deref(), Some("Did you notice the clock? It stopped at three."));
        assert_eq!(history.len(), 4);
        assert_eq!(history[2], ChatTurn::user("What now?"));
        assert_eq!(history[3].role, ChatRole::Model);

        let reqs = server.requests();
        assert_eq!(reqs[0].url, "/v1beta/models/gemini-1.5-flash:generateContent?key=test-key");
        let body = reqs[0].body_json();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a Victorian detective.");
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "What now?");
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let client = ChatClient::new("k").with_base_url("http://127.0.0.1:9");
        let mut history = Vec::new();
        let reply = client.send_message("m", "", &mut history, "   ").await.unwrap();
        assert!(reply.is_none());
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_keeps_history() {
        let server = serve(vec![MockResponse::json(403, r#"{"error":{"message":"API key not valid"}}"#)]);
        let client = ChatClient::new("bad").with_base_url(&server.url);
        let mut history = vec![ChatTurn::user("hi")];
        let err = client.send_message("m", "p", &mut history, "hello").await.unwrap_err();
        assert!(matches!(err, KitError::Ai { status: 403, .. }));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_resolve_model_labels() {
        assert_eq!(resolve_model("gemini-pro"), "gemini-1.5-pro");
        assert_eq!(resolve_model("gemini-flash"), "gemini-1.5-flash");
        assert_eq!(resolve_model("gemini-2.0-flash"), "gemini-2.0-flash");
    }
}
