//! OpenRouter chat-completion client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Identification headers OpenRouter uses for app attribution.
const HTTP_REFERER: &str = "https://t.me/routerchat_bot";
const X_TITLE: &str = "Telegram AI Bot";

/// A single request/response exchange with a completion backend.
///
/// The handlers depend on this trait rather than on a concrete client, so
/// retry policies or alternative backends can be layered in at the call
/// boundary.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Ask `model` to answer `message`. One attempt, no retry.
    async fn complete(&self, model: &str, message: &str) -> Result<String, CompletionError>;
}

pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenRouterClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENROUTER_API_URL.to_string())
    }

    /// Point the client at a different endpoint. Tests use this to talk to
    /// a local mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, model: &str, message: &str) -> Result<String, CompletionError> {
        let request = ApiRequest {
            model,
            messages: vec![ApiMessage {
                role: "user",
                content: message,
            }],
        };

        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", HTTP_REFERER)
            .header("X-Title", X_TITLE)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        let status = response.status();
        debug!("OpenRouter response status: {status}");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api(format!("{status}: {body}")));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(CompletionError::Empty)
    }
}

#[derive(Debug)]
pub enum CompletionError {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionError::Http(e) => write!(f, "HTTP error: {e}"),
            CompletionError::Api(e) => write!(f, "API error: {e}"),
            CompletionError::Parse(e) => write!(f, "Parse error: {e}"),
            CompletionError::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for CompletionError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> OpenRouterClient {
        OpenRouterClient::with_base_url(
            "test-key".to_string(),
            format!("{}/chat/completions", server.url()),
        )
    }

    #[tokio::test]
    async fn test_success_extracts_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "gen-123",
                    "model": "gemini-pro",
                    "choices": [
                        {"message": {"role": "assistant", "content": "Hello there!"}},
                        {"message": {"role": "assistant", "content": "ignored"}}
                    ],
                    "usage": {"total_tokens": 12}
                }"#,
            )
            .create_async()
            .await;

        let reply = client_for(&server)
            .complete("gemini-pro", "hi")
            .await
            .expect("upstream success");

        assert_eq!(reply, "Hello there!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_carries_model_and_user_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "model": "llama2-70b",
                "messages": [{"role": "user", "content": "what is rust?"}]
            })))
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"content": "a language"}}]}"#)
            .create_async()
            .await;

        let reply = client_for(&server)
            .complete("llama2-70b", "what is rust?")
            .await
            .expect("upstream success");

        assert_eq!(reply, "a language");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_yields_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let err = client_for(&server)
            .complete("gemini-pro", "hi")
            .await
            .unwrap_err();

        match err {
            CompletionError::Api(detail) => {
                assert!(detail.contains("500"));
                assert!(detail.contains("upstream exploded"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_yields_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let err = client_for(&server)
            .complete("gemini-pro", "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_yields_empty_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .complete("gemini-pro", "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::Empty));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_http_error() {
        // Nothing listens on this port; the connection is refused.
        let client = OpenRouterClient::with_base_url(
            "test-key".to_string(),
            "http://127.0.0.1:9/chat/completions".to_string(),
        );

        let err = client.complete("gemini-pro", "hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::Http(_)));
    }
}
