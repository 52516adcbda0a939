use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failures. A non-OK status from the provider is not one
/// of these, it comes back as a [`ProviderResponse`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderOutput {
    pub text: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status_code: StatusCode,
    pub output: ProviderOutput,
    pub request_id: String,
    pub message: String,
}

impl ProviderResponse {
    pub fn is_ok(&self) -> bool {
        self.status_code == StatusCode::OK
    }
}

/// Generative-response provider: takes a prompt and an optional session to
/// continue, returns text plus the session to use next time.
#[async_trait]
pub trait ResponseProvider: Send + Sync {
    async fn call(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// Client for DashScope application completions
/// (`POST {base}/apps/{app_id}/completion`).
#[derive(Clone)]
pub struct DashScopeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    app_id: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    input: CompletionInput<'a>,
    parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct CompletionInput<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Deserialize, Default)]
struct CompletionBody {
    #[serde(default)]
    output: ProviderOutput,
    #[serde(default)]
    request_id: String,
    code: Option<String>,
    message: Option<String>,
}

impl DashScopeClient {
    pub fn new(base_url: &str, api_key: String, app_id: String) -> DashScopeClient {
        DashScopeClient::with_client(reqwest::Client::new(), base_url, api_key, app_id)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        api_key: String,
        app_id: String,
    ) -> DashScopeClient {
        DashScopeClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            app_id,
        }
    }

    fn completion_url(&self) -> String {
        format!("{}/apps/{}/completion", self.base_url, self.app_id)
    }
}

#[async_trait]
impl ResponseProvider for DashScopeClient {
    async fn call(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = CompletionRequest {
            input: CompletionInput { prompt, session_id },
            parameters: serde_json::Map::new(),
        };

        let response = self
            .http
            .post(self.completion_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status_code = response.status();
        let raw = response.text().await?;

        // Error bodies are usually JSON too, but a gateway may answer with plain text.
        let body = match serde_json::from_str::<CompletionBody>(&raw) {
            Ok(body) => body,
            Err(_) => CompletionBody {
                message: Some(raw),
                ..CompletionBody::default()
            },
        };

        let message = match (body.code, body.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (code, message) => message.or(code).unwrap_or_default(),
        };

        Ok(ProviderResponse {
            status_code,
            output: body.output,
            request_id: body.request_id,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn client(server: &mockito::ServerGuard) -> DashScopeClient {
        DashScopeClient::new(&server.url(), "sk-test".to_string(), "app-1".to_string())
    }

    #[tokio::test]
    async fn sends_prompt_without_session_for_fresh_conversation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/apps/app-1/completion")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(json!({
                "input": {"prompt": "привет"},
                "parameters": {}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "output": {"text": "Ответ модели", "session_id": "abc", "finish_reason": "stop"},
                    "usage": {"models": []},
                    "request_id": "req-1"
                }"#,
            )
            .create_async()
            .await;

        let res = client(&server).call("привет", None).await.unwrap();

        mock.assert_async().await;
        assert!(res.is_ok());
        assert_eq!(res.request_id, "req-1");
        assert_eq!(res.output.text.as_deref(), Some("Ответ модели"));
        assert_eq!(res.output.session_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn passes_session_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/apps/app-1/completion")
            .match_body(Matcher::PartialJson(json!({
                "input": {"prompt": "и ещё", "session_id": "abc"}
            })))
            .with_status(200)
            .with_body(r#"{"output": {"text": "ok"}, "request_id": "req-2"}"#)
            .create_async()
            .await;

        let res = client(&server).call("и ещё", Some("abc")).await.unwrap();

        mock.assert_async().await;
        assert!(res.is_ok());
        assert_eq!(res.output.session_id, None);
    }

    #[tokio::test]
    async fn non_ok_status_is_a_response_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/apps/app-1/completion")
            .with_status(401)
            .with_body(
                r#"{"code": "InvalidApiKey", "message": "Invalid API-key provided.", "request_id": "req-3"}"#,
            )
            .create_async()
            .await;

        let res = client(&server).call("привет", None).await.unwrap();

        assert!(!res.is_ok());
        assert_eq!(res.status_code, StatusCode::UNAUTHORIZED);
        assert_eq!(res.request_id, "req-3");
        assert_eq!(res.message, "InvalidApiKey: Invalid API-key provided.");
        assert_eq!(res.output, ProviderOutput::default());
    }

    #[tokio::test]
    async fn plain_text_error_body_becomes_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/apps/app-1/completion")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let res = client(&server).call("привет", None).await.unwrap();

        assert_eq!(res.status_code, StatusCode::BAD_GATEWAY);
        assert_eq!(res.message, "Bad Gateway");
        assert_eq!(res.request_id, "");
    }

    #[test]
    fn trailing_slash_in_base_url_is_dropped() {
        let client = DashScopeClient::new(
            "https://dashscope-intl.aliyuncs.com/api/v1/",
            "sk".to_string(),
            "app-9".to_string(),
        );

        assert_eq!(
            client.completion_url(),
            "https://dashscope-intl.aliyuncs.com/api/v1/apps/app-9/completion"
        );
    }
}
