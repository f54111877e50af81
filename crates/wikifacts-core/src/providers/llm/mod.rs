pub mod fake;
pub mod openai;

use crate::errors::TransportError;
use crate::model::{ChatMessage, ChatResponse, DecodingParams};
use async_trait::async_trait;

/// Chat-style completion endpoint.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &DecodingParams,
    ) -> Result<ChatResponse, TransportError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}
