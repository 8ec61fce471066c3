// Gateway behavior against a mocked generateContent endpoint
mod common;

use common::*;
use plant_advisor::analysis::response_schema;
use plant_advisor::chat::CHAT_SYSTEM_INSTRUCTION;
use plant_advisor::{ChatMessage, Client, GatewayError, PlantGateway, image_from_bytes};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_analyze_image_sends_schema_and_parses_result() {
    let server = MockServer::start().await;
    let image = image_from_bytes(b"\x89PNG fake", "image/png");

    Mock::given(method("POST"))
        .and(path(generate_path()))
        .and(header("x-goog-api-key", TEST_API_KEY))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema()
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_response(&sample_analysis_json().to_string())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let analysis = client
        .analyze_image(&image.data, &image.mime_type)
        .await
        .expect("analysis should succeed");

    assert_eq!(analysis.plant_name, "Fiddle Leaf Fig");
    assert_eq!(analysis.care_instructions.soil, "Well-draining potting mix");
    assert_eq!(analysis.next_steps.len(), 2);
    assert_eq!(analysis.estimated_price_aed, "AED 120 - 250");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[0]["inlineData"]["data"], image.data);
    assert!(parts[1]["text"].as_str().unwrap().contains("botanist"));
}

#[tokio::test]
async fn test_analyze_image_rejects_schema_violation() {
    let server = MockServer::start().await;
    let mut partial = sample_analysis_json();
    partial.as_object_mut().unwrap().remove("nextSteps");

    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&partial.to_string())))
        .mount(&server)
        .await;

    let err = mock_client(&server)
        .analyze_image("AAAA", "image/jpeg")
        .await
        .unwrap_err();
    match err {
        GatewayError::MalformedResponse(msg) => assert!(msg.contains("nextSteps")),
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_analyze_image_blocked_prompt_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"promptFeedback": {"blockReason": "SAFETY"}})),
        )
        .mount(&server)
        .await;

    let err = mock_client(&server)
        .analyze_image("AAAA", "image/jpeg")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::MalformedResponse(ref m) if m.contains("SAFETY")));
}

#[tokio::test]
async fn test_invalid_api_key_is_classified() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-goog-request-id", "req-789")
                .set_body_json(invalid_key_body()),
        )
        .mount(&server)
        .await;

    let err = mock_client(&server)
        .analyze_image("AAAA", "image/jpeg")
        .await
        .unwrap_err();

    assert!(err.is_invalid_credential());
    match err {
        GatewayError::Api {
            status_code,
            message,
            request_id,
        } => {
            assert_eq!(status_code, 400);
            assert_eq!(message, "API key not valid. Please pass a valid API key.");
            assert_eq!(request_id.as_deref(), Some("req-789"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_not_credential_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = mock_client(&server)
        .chat_reply(&[], "hello")
        .await
        .unwrap_err();
    assert!(!err.is_invalid_credential());
    assert!(matches!(err, GatewayError::Api { status_code: 503, .. }));
}

#[tokio::test]
async fn test_missing_api_key_never_reaches_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("hi")))
        .expect(0)
        .mount(&server)
        .await;

    let client = Client::builder(String::new())
        .base_url(server.uri())
        .build()
        .unwrap();

    let err = client.chat_reply(&[], "hello").await.unwrap_err();
    assert!(matches!(err, GatewayError::MissingCredential));
    assert!(err.is_invalid_credential());
}

#[tokio::test]
async fn test_chat_reply_replays_full_history() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_path()))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": CHAT_SYSTEM_INSTRUCTION}]}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(text_response("Every 7-10 days.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let history = vec![
        ChatMessage::model("Hello! How can I help you with your garden today?"),
        ChatMessage::user("I have a peace lily."),
        ChatMessage::model("Lovely plant! What would you like to know?"),
    ];
    let reply = mock_client(&server)
        .chat_reply(&history, "How often should I water it?")
        .await
        .unwrap();
    assert_eq!(reply, "Every 7-10 days.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 4);
    assert_eq!(contents[0]["role"], "model");
    assert_eq!(contents[1]["parts"][0]["text"], "I have a peace lily.");
    assert_eq!(contents[3]["role"], "user");
    assert_eq!(contents[3]["parts"][0]["text"], "How often should I water it?");
}

#[tokio::test]
async fn test_non_json_success_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = mock_client(&server)
        .chat_reply(&[], "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::MalformedResponse(_)));
}
