use super::ChatModel;
use crate::errors::TransportError;
use crate::model::{ChatMessage, ChatResponse, DecodingParams};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatModel {
    pub model: String,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            TransportError::from(err)
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &DecodingParams,
    ) -> Result<ChatResponse, TransportError> {
        let url = self.endpoint();
        crate::providers::network::check_outbound(&url)?;

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": params.temperature,
            "top_p": params.top_p,
        });
        if let Some(max_tokens) = params.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| self.map_send_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| self.map_send_error(e))?;

        // Parse choices[0].message.content
        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TransportError::InvalidResponse {
                message: "chat completion response missing choices[0].message.content"
                    .to_string(),
            })?
            .trim()
            .to_string();

        Ok(ChatResponse {
            content,
            provider: "openai".to_string(),
            model: json
                .get("model")
                .and_then(|v| v.as_str())
                .unwrap_or(&self.model)
                .to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::network::NetworkPolicyGuard;
    use serial_test::serial;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiChatModel {
        OpenAiChatModel::new(
            "test-model",
            format!("{}/v1/", server.uri()),
            Some("test-key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn sends_messages_and_decoding_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "top_p": 0.9,
                "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "test-model-2024",
                "choices": [{"message": {"role": "assistant", "content": "  {\"answer\": \"yes\"}  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(&server)
            .chat(
                &[ChatMessage::system("sys"), ChatMessage::user("hi")],
                &DecodingParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(resp.content, "{\"answer\": \"yes\"}");
        assert_eq!(resp.model, "test-model-2024");
    }

    #[tokio::test]
    #[serial]
    async fn server_error_is_retryable_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(&server)
            .chat(&[ChatMessage::user("hi")], &DecodingParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http { status: 503, ref body } if body == "overloaded"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    #[serial]
    async fn missing_content_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server)
            .chat(&[ChatMessage::user("hi")], &DecodingParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse { .. }));
    }

    #[tokio::test]
    #[serial]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = OpenAiChatModel::new(
            "m",
            server.uri(),
            None,
            Duration::from_millis(50),
        )
        .unwrap();
        let err = client
            .chat(&[ChatMessage::user("hi")], &DecodingParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    #[serial]
    async fn respects_network_deny_policy() {
        let _guard = NetworkPolicyGuard::deny("unit test");
        let client = OpenAiChatModel::new(
            "m",
            "https://api.openai.com/v1",
            Some("k".into()),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client
            .chat(&[ChatMessage::user("hello")], &DecodingParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Blocked { .. }));
        assert!(err.to_string().contains("api.openai.com"));
    }
}
