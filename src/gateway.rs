//! The two model calls the application makes: structured photo analysis and
//! free-form gardening chat.
//!
//! [`PlantGateway`] is the seam between session logic and the network. The
//! production implementation is [`Client`]; tests drive the controller with
//! scripted fakes.

use crate::analysis::{ANALYSIS_PROMPT, PlantAnalysis, response_schema};
use crate::chat::{CHAT_SYSTEM_INSTRUCTION, ChatMessage, Role};
use crate::client::Client;
use crate::errors::GatewayError;
use crate::models::{Content, GenerateContentRequest, GenerationConfig, Part};
use async_trait::async_trait;
use tracing::debug;

/// Translates domain requests into model calls and shapes the responses.
///
/// Implementations are stateless: the caller owns the conversation and
/// resends it in full on every chat call.
#[async_trait]
pub trait PlantGateway: Send + Sync {
    /// Identifies the plant in a base64-encoded image and returns care advice.
    ///
    /// The payload is forwarded as-is; a bad image surfaces as a provider
    /// rejection.
    async fn analyze_image(
        &self,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<PlantAnalysis, GatewayError>;

    /// Returns the model's reply to `message`, given every prior turn.
    async fn chat_reply(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, GatewayError>;
}

/// Builds the schema-constrained analysis request: image part first, then the
/// instruction.
pub fn analysis_request(image_base64: &str, mime_type: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::inline_data(mime_type, image_base64),
                Part::text(ANALYSIS_PROMPT),
            ],
            role: Some(Role::User.as_str().to_string()),
        }],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(response_schema().clone()),
        }),
    }
}

/// Builds the chat request: full history replayed, then `message` as the
/// latest user turn.
pub fn chat_request(history: &[ChatMessage], message: &str) -> GenerateContentRequest {
    let contents = history
        .iter()
        .map(|turn| Content::text(Some(turn.role.as_str()), turn.text.clone()))
        .chain(std::iter::once(Content::text(
            Some(Role::User.as_str()),
            message,
        )))
        .collect();

    GenerateContentRequest {
        contents,
        system_instruction: Some(Content::text(None, CHAT_SYSTEM_INSTRUCTION)),
        generation_config: None,
    }
}

#[async_trait]
impl PlantGateway for Client {
    async fn analyze_image(
        &self,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<PlantAnalysis, GatewayError> {
        debug!(
            "Analyzing plant image: mime_type={}, payload_len={}",
            mime_type,
            image_base64.len()
        );

        let response = self
            .generate_content(&analysis_request(image_base64, mime_type))
            .await?;
        let text = response
            .text()
            .ok_or_else(|| GatewayError::MalformedResponse(response.missing_text_reason()))?;

        let analysis = PlantAnalysis::from_model_text(&text)?;
        debug!("Analysis complete: plant={}", analysis.plant_name);
        Ok(analysis)
    }

    async fn chat_reply(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, GatewayError> {
        if message.trim().is_empty() {
            return Err(GatewayError::InvalidInput(
                "chat message must not be empty".to_string(),
            ));
        }

        debug!("Sending chat turn: history_len={}", history.len());

        let response = self.generate_content(&chat_request(history, message)).await?;
        response
            .text()
            .ok_or_else(|| GatewayError::MalformedResponse(response.missing_text_reason()))
    }
}
