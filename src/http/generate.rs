use super::common::{API_KEY_HEADER, Endpoint, construct_endpoint_url};
use super::error_helpers::{check_response, deserialize_with_context};
use super::loud_wire;
use crate::errors::GatewayError;
use crate::models::{GenerateContentRequest, GenerateContentResponse};
use reqwest::Client as ReqwestClient;
use tracing::debug;

/// Sends a `generateContent` request to the Gemini API.
///
/// # Errors
///
/// Returns an error if:
/// - The HTTP request fails
/// - The response status is not successful
/// - The response cannot be parsed as JSON
pub async fn generate_content(
    http_client: &ReqwestClient,
    base_url: &str,
    api_key: &str,
    model: &str,
    request: &GenerateContentRequest,
) -> Result<GenerateContentResponse, GatewayError> {
    let url = construct_endpoint_url(base_url, Endpoint::GenerateContent { model });

    let request_id = loud_wire::next_request_id();
    if loud_wire::is_enabled() {
        match serde_json::to_string(request) {
            Ok(body) => loud_wire::log_request(request_id, "POST", &url, Some(&body)),
            Err(e) => {
                tracing::warn!("LOUD_WIRE: Failed to serialize request body: {}", e);
                loud_wire::log_request(request_id, "POST", &url, None);
            }
        }
    }

    debug!(
        "Sending generateContent: model={}, contents={}",
        model,
        request.contents.len()
    );

    let response = http_client
        .post(&url)
        .header(API_KEY_HEADER, api_key)
        .json(request)
        .send()
        .await?;

    loud_wire::log_response_status(request_id, response.status().as_u16());

    let response = check_response(response).await?;
    let response_text = response.text().await.map_err(GatewayError::Http)?;

    loud_wire::log_response_body(request_id, &response_text);

    deserialize_with_context(&response_text, "GenerateContentResponse")
}
