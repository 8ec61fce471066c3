//! Image loading and encoding for analysis requests.
//!
//! Turns a photo on disk, raw bytes, or a `data:` URL into the base64 payload
//! plus MIME type the gateway sends inline.
//!
//! # Example
//!
//! ```no_run
//! use plant_advisor::{Client, PlantGateway, image_from_file};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new("api-key".to_string());
//! let image = image_from_file("monstera.jpg").await?;
//! let analysis = client.analyze_image(&image.data, &image.mime_type).await?;
//! println!("{}", analysis.plant_name);
//! # Ok(())
//! # }
//! ```

use crate::errors::GatewayError;
use base64::Engine;
use std::path::Path;

/// A base64-encoded image ready to be sent inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Standard base64, no line breaks.
    pub data: String,
}

impl EncodedImage {
    /// Renders the image as a `data:` URL, the reference kept in session state.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Splits a `data:<mime>;base64,<payload>` URL, as produced by a browser
    /// file reader.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if the URL is not a base64 data URL.
    ///
    /// ```
    /// use plant_advisor::EncodedImage;
    ///
    /// let image = EncodedImage::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
    /// assert_eq!(image.mime_type, "image/png");
    /// assert_eq!(image.data, "iVBORw0KGgo=");
    /// ```
    pub fn from_data_url(url: &str) -> Result<Self, GatewayError> {
        let invalid = || GatewayError::InvalidInput("expected a base64 data URL".to_string());
        let (meta, data) = url.split_once(',').ok_or_else(invalid)?;
        let mime_type = meta
            .strip_prefix("data:")
            .and_then(|m| m.strip_suffix(";base64"))
            .filter(|m| !m.is_empty())
            .ok_or_else(invalid)?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }
}

/// Detects an image MIME type from a file extension.
///
/// Returns `None` for unsupported or missing extensions.
///
/// ```
/// use std::path::Path;
/// use plant_advisor::detect_mime_type;
///
/// assert_eq!(detect_mime_type(Path::new("fern.JPG")), Some("image/jpeg"));
/// assert_eq!(detect_mime_type(Path::new("notes.txt")), None);
/// ```
pub fn detect_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" | "heif" => Some("image/heic"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Encodes raw image bytes.
#[must_use]
pub fn image_from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> EncodedImage {
    EncodedImage {
        mime_type: mime_type.into(),
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
    }
}

/// Loads an image file and encodes it, detecting the MIME type from the
/// extension.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidInput`] if the extension is not a known
/// image type or the file cannot be read.
pub async fn image_from_file(path: impl AsRef<Path>) -> Result<EncodedImage, GatewayError> {
    let path = path.as_ref();
    let mime_type = detect_mime_type(path).ok_or_else(|| {
        GatewayError::InvalidInput(format!(
            "'{}' is not a supported image type (jpg, png, gif, webp, heic, bmp)",
            path.display()
        ))
    })?;

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        let suggestion = match e.kind() {
            std::io::ErrorKind::NotFound => " Check that the file path is correct.",
            std::io::ErrorKind::PermissionDenied => " Check file permissions.",
            _ => "",
        };
        GatewayError::InvalidInput(format!(
            "Failed to read file '{}': {}.{}",
            path.display(),
            e,
            suggestion
        ))
    })?;

    tracing::debug!(
        "Encoded image '{}': mime_type={}, bytes={}",
        path.display(),
        mime_type,
        bytes.len()
    );

    Ok(image_from_bytes(&bytes, mime_type))
}
