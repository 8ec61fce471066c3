use thiserror::Error;

/// Substring Google uses in the rejection message for a bad API key.
///
/// Matched case-insensitively; the API has shipped both "API key" and
/// "API Key" spellings.
const INVALID_KEY_MARKER: &str = "api key not valid";

/// Defines errors that can occur when talking to the Gemini API.
///
/// # Example: Mapping errors to user-facing text
///
/// ```ignore
/// match gateway.analyze_image(&image.data, &image.mime_type).await {
///     Err(e) if e.is_invalid_credential() => {
///         tracing::error!("credential rejected: {e}");
///     }
///     Err(GatewayError::Api { status_code: 429, request_id, .. }) => {
///         tracing::warn!("Rate limited, request_id: {:?}", request_id);
///     }
///     // ...
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// API error with structured context for debugging and automated handling.
    ///
    /// Contains the HTTP status code, the provider's error message, and
    /// optional request ID (for correlation with Google API logs/support).
    #[error("API error (HTTP {status_code}): {message}")]
    Api {
        /// HTTP status code (e.g., 400, 429, 500)
        status_code: u16,
        /// `error.message` from the response body, or a preview of the raw body
        message: String,
        /// Request ID from `x-goog-request-id` header, if available
        request_id: Option<String>,
    },
    /// API returned a successful response but with unexpected or invalid content.
    ///
    /// Covers empty candidate lists, missing text, and structured output that
    /// does not satisfy the declared response schema.
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// No API key was configured, so no request was sent.
    #[error("No API key configured")]
    MissingCredential,
    /// Failed to build the HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl GatewayError {
    /// Returns `true` if the failure is caused by a missing or rejected API key.
    ///
    /// ```rust
    /// use plant_advisor::GatewayError;
    ///
    /// let rejected = GatewayError::Api {
    ///     status_code: 400,
    ///     message: "API key not valid. Please pass a valid API key.".to_string(),
    ///     request_id: None,
    /// };
    /// assert!(rejected.is_invalid_credential());
    /// assert!(GatewayError::MissingCredential.is_invalid_credential());
    ///
    /// let throttled = GatewayError::Api {
    ///     status_code: 429,
    ///     message: "Resource exhausted".to_string(),
    ///     request_id: None,
    /// };
    /// assert!(!throttled.is_invalid_credential());
    /// ```
    #[must_use]
    pub fn is_invalid_credential(&self) -> bool {
        match self {
            GatewayError::MissingCredential => true,
            GatewayError::Api { message, .. } => {
                message.to_lowercase().contains(INVALID_KEY_MARKER)
            }
            GatewayError::Http(_)
            | GatewayError::Json(_)
            | GatewayError::MalformedResponse(_)
            | GatewayError::InvalidInput(_)
            | GatewayError::ClientBuild(_) => false,
        }
    }
}
