//! # plant-advisor
//!
//! Plant identification and gardening chat backed by Google's Gemini API.
//!
//! Two calls reach the model:
//!
//! - **Analysis**: a photo plus a fixed botanist prompt, constrained by a
//!   response schema, parsed into a [`PlantAnalysis`].
//! - **Chat**: the whole transcript replayed with a gardening-assistant
//!   system instruction, returning free text.
//!
//! [`SessionState`] holds what a front end renders (current image, analysis
//! or error, loading flags, transcript) and [`Controller`] runs the two flows
//! against any [`PlantGateway`].
//!
//! # Example
//!
//! ```no_run
//! use plant_advisor::{Config, Controller, image_from_file};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Config::from_env().client()?;
//! let controller = Controller::new(client);
//!
//! controller.select_image(image_from_file("fern.jpg").await?).await;
//! let state = controller.snapshot().await;
//! match (state.analysis(), state.error()) {
//!     (Some(analysis), _) => println!("{}", analysis.plant_name),
//!     (None, Some(error)) => eprintln!("{error}"),
//!     (None, None) => unreachable!("analysis flow always settles"),
//! }
//!
//! controller.send_message("How often should I mist it?").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Debugging
//!
//! Set `LOUD_WIRE=1` to dump raw request and response JSON to stderr.

pub mod analysis;
pub mod chat;
mod client;
pub mod config;
pub mod controller;
mod errors;
pub mod gateway;
mod http;
pub mod models;
pub mod multimodal;

pub use analysis::{CareInstructions, PlantAnalysis};
pub use chat::{ChatMessage, Role};
pub use client::{Client, ClientBuilder, DEFAULT_MODEL};
pub use config::Config;
pub use controller::{
    AnalysisPhase, ChatPhase, ChatRejection, Controller, SessionState, StaleResponsePolicy,
    UnknownPolicy,
};
pub use errors::GatewayError;
pub use gateway::PlantGateway;
pub use multimodal::{EncodedImage, detect_mime_type, image_from_bytes, image_from_file};
