use super::ChatModel;
use crate::errors::TransportError;
use crate::model::{ChatMessage, ChatResponse, DecodingParams};
use async_trait::async_trait;

/// Offline provider: answers every request with a fixed `idk` judgment.
/// Used for dry runs of the pipeline without a model endpoint.
pub struct FakeChatModel {
    model: String,
}

impl FakeChatModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[async_trait]
impl ChatModel for FakeChatModel {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _params: &DecodingParams,
    ) -> Result<ChatResponse, TransportError> {
        Ok(ChatResponse {
            content: serde_json::json!({
                "answer": "idk",
                "reasoning": "fake provider: no model was consulted",
            })
            .to_string(),
            provider: "fake".to_string(),
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
