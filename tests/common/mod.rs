//! Common test utilities shared across integration test files.
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use plant_advisor::{
    CareInstructions, ChatMessage, Client, GatewayError, PlantAnalysis, PlantGateway,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_MODEL: &str = "gemini-2.5-flash";

/// Path the client posts to for [`TEST_MODEL`].
pub fn generate_path() -> String {
    format!("/v1beta/models/{TEST_MODEL}:generateContent")
}

/// Client pointed at a mock server.
pub fn mock_client(server: &MockServer) -> Client {
    Client::builder(TEST_API_KEY.to_string())
        .base_url(server.uri())
        .model(TEST_MODEL)
        .build()
        .expect("client should build")
}

/// A `generateContent` response body whose single candidate says `text`.
pub fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP",
            "index": 0
        }],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
    })
}

pub fn sample_analysis_json() -> Value {
    json!({
        "plantName": "Fiddle Leaf Fig",
        "careInstructions": {
            "watering": "Water when the top 3 cm of soil is dry",
            "sunlight": "Bright, filtered light",
            "soil": "Well-draining potting mix"
        },
        "currentCondition": "Brown spots on two lower leaves suggest overwatering",
        "nextSteps": ["Let the soil dry out", "Check drainage holes"],
        "estimatedPriceAED": "AED 120 - 250"
    })
}

pub fn analysis_named(name: &str) -> PlantAnalysis {
    PlantAnalysis {
        plant_name: name.to_string(),
        care_instructions: CareInstructions {
            watering: "Weekly".to_string(),
            sunlight: "Bright".to_string(),
            soil: "Loam".to_string(),
        },
        current_condition: "Healthy".to_string(),
        next_steps: vec!["Keep going".to_string()],
        estimated_price_aed: "AED 50".to_string(),
    }
}

/// Google's response body for a rejected API key.
pub fn invalid_key_body() -> Value {
    json!({
        "error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT",
            "details": [{
                "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                "reason": "API_KEY_INVALID",
                "domain": "googleapis.com"
            }]
        }
    })
}

type AnalysisOutcome = Result<PlantAnalysis, GatewayError>;
type ChatOutcome = Result<String, GatewayError>;

/// Gateway whose analysis calls block until the test releases them.
///
/// Calls are keyed by the image payload, so a test can resolve them in any
/// order it likes.
#[derive(Default)]
pub struct ScriptedGateway {
    pending: Mutex<HashMap<String, oneshot::Receiver<AnalysisOutcome>>>,
    chat_replies: Mutex<Vec<ChatOutcome>>,
    chat_calls: Mutex<Vec<(Vec<ChatMessage>, String)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an analysis call for `payload`; send on the returned handle to resolve it.
    pub fn expect_analysis(&self, payload: &str) -> oneshot::Sender<AnalysisOutcome> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .insert(payload.to_string(), rx);
        tx
    }

    /// Queues chat outcomes, returned in order.
    pub fn with_chat_replies(self, replies: Vec<ChatOutcome>) -> Self {
        *self.chat_replies.lock().unwrap() = replies;
        self
    }

    /// Every `(history, message)` pair the gateway was called with.
    pub fn chat_calls(&self) -> Vec<(Vec<ChatMessage>, String)> {
        self.chat_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlantGateway for ScriptedGateway {
    async fn analyze_image(
        &self,
        image_base64: &str,
        _mime_type: &str,
    ) -> Result<PlantAnalysis, GatewayError> {
        let rx = self
            .pending
            .lock()
            .unwrap()
            .remove(image_base64)
            .unwrap_or_else(|| panic!("unexpected analysis call for {image_base64}"));
        rx.await.expect("test dropped the analysis sender")
    }

    async fn chat_reply(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, GatewayError> {
        self.chat_calls
            .lock()
            .unwrap()
            .push((history.to_vec(), message.to_string()));
        let mut replies = self.chat_replies.lock().unwrap();
        assert!(!replies.is_empty(), "unexpected chat call");
        replies.remove(0)
    }
}
