/// Represents the API version to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// V1 Beta API version (current)
    V1Beta,
}

impl ApiVersion {
    const fn as_str(self) -> &'static str {
        match self {
            Self::V1Beta => "v1beta",
        }
    }
}

// --- URL Construction ---
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Header name for API key authentication.
///
/// Keeps the key out of URLs, and therefore out of proxy logs and of
/// error messages that echo the request URL.
pub const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// Represents the API endpoints this crate calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// Single-shot content generation for a model
    GenerateContent { model: &'a str },
}

impl Endpoint<'_> {
    /// Constructs the URL path for this endpoint
    fn to_path(&self, version: ApiVersion) -> String {
        match self {
            Self::GenerateContent { model } => format!(
                "/{}/models/{}:generateContent",
                version.as_str(),
                urlencoding::encode(model)
            ),
        }
    }
}

/// Constructs a URL for a specific endpoint against `base_url`.
///
/// A trailing slash on `base_url` is tolerated. API key authentication is
/// handled via the [`API_KEY_HEADER`] header, never as a query parameter.
#[must_use]
pub fn construct_endpoint_url(base_url: &str, endpoint: Endpoint) -> String {
    let version = ApiVersion::V1Beta;
    let path = endpoint.to_path(version);
    format!("{}{path}", base_url.trim_end_matches('/'))
}
