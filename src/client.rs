use crate::errors::GatewayError;
use crate::http::common::DEFAULT_BASE_URL;
use crate::models::{GenerateContentRequest, GenerateContentResponse};
use reqwest::Client as ReqwestClient;
use std::time::Duration;

/// Model used for both analysis and chat unless overridden.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Client for the Google Generative AI API, bound to one model.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) api_key: String,
    #[allow(clippy::struct_field_names)]
    pub(crate) http_client: ReqwestClient,
    pub(crate) base_url: String,
    pub(crate) model: String,
}

/// Builder for `Client` instances.
///
/// # Example
///
/// ```
/// use plant_advisor::Client;
/// use std::time::Duration;
///
/// let client = Client::builder("api_key".to_string())
///     .timeout(Duration::from_secs(120))
///     .connect_timeout(Duration::from_secs(10))
///     .build()
///     .expect("client should build");
/// assert_eq!(client.model(), "gemini-2.5-flash");
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    api_key: String,
    base_url: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Sets the total request timeout.
    ///
    /// Covers connecting, sending the request, and receiving the response.
    /// If not set, uses reqwest's default (no timeout), so a hung provider
    /// call never resolves.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// If not set, uses reqwest's default.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Overrides the API host, e.g. to point at a proxy or a mock server.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the model name (default [`DEFAULT_MODEL`]).
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builds the `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ClientBuild`] if the HTTP client cannot be
    /// constructed (e.g. TLS backend initialization failure).
    pub fn build(self) -> Result<Client, GatewayError> {
        let mut builder = ReqwestClient::builder();

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| GatewayError::ClientBuild(e.to_string()))?;

        Ok(Client {
            api_key: self.api_key,
            http_client,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

impl Client {
    /// Creates a new builder for `Client` instances.
    ///
    /// An empty `api_key` is accepted here; every request made with it fails
    /// with [`GatewayError::MissingCredential`] without touching the network.
    #[must_use]
    pub const fn builder(api_key: String) -> ClientBuilder {
        ClientBuilder {
            api_key,
            base_url: None,
            model: None,
            timeout: None,
            connect_timeout: None,
        }
    }

    /// Creates a client with default settings.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http_client: ReqwestClient::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// The model every request is sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a raw `generateContent` request.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingCredential`] if no API key is set, or
    /// any HTTP, API, or response-parsing error.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        if self.api_key.trim().is_empty() {
            return Err(GatewayError::MissingCredential);
        }

        let response = crate::http::generate::generate_content(
            &self.http_client,
            &self.base_url,
            &self.api_key,
            &self.model,
            request,
        )
        .await?;

        tracing::debug!(
            "generateContent completed: candidates={}",
            response.candidates.len()
        );

        Ok(response)
    }
}
