//! Session state and the transitions around gateway calls.
//!
//! [`SessionState`] is plain data. Each flow is split into a `begin_*` step,
//! applied before the gateway call, and a `complete_*` step applied with the
//! call's outcome, so callers can interleave other work (or other requests)
//! between the two. [`Controller`] pairs a state with a gateway and runs both
//! steps for you.

use crate::analysis::PlantAnalysis;
use crate::chat::ChatMessage;
use crate::errors::GatewayError;
use crate::gateway::PlantGateway;
use crate::multimodal::EncodedImage;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// First message of every session.
pub const GREETING: &str = "Hello! How can I help you with your garden today?";

/// Shown when the API key is missing or rejected.
pub const INVALID_KEY_MESSAGE: &str = "The API key configured for this application is invalid. \
Please contact the site administrator.";

/// Shown for every other failure.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Maps a gateway failure to the text shown to the user.
///
/// Raw provider messages are never surfaced.
#[must_use]
pub fn user_facing_message(error: &GatewayError) -> &'static str {
    if error.is_invalid_credential() {
        INVALID_KEY_MESSAGE
    } else {
        GENERIC_ERROR_MESSAGE
    }
}

/// Model turn appended to the transcript in place of a failed reply.
#[must_use]
pub fn apology(error: &GatewayError) -> String {
    format!("Sorry, I encountered an error. {}", user_facing_message(error))
}

/// What to do with an analysis response once a newer image has been selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleResponsePolicy {
    /// Every response is applied as it arrives; the last to resolve wins even
    /// if it belongs to an earlier image.
    #[default]
    LastResolvedWins,
    /// Responses for anything but the most recent selection are dropped.
    LatestRequestWins,
}

impl StaleResponsePolicy {
    /// Name accepted by [`FromStr`] and used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastResolvedWins => "last-resolved-wins",
            Self::LatestRequestWins => "latest-request-wins",
        }
    }
}

impl fmt::Display for StaleResponsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a policy name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stale response policy `{0}` (expected last-resolved-wins or latest-request-wins)")]
pub struct UnknownPolicy(pub String);

impl FromStr for StaleResponsePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "last-resolved-wins" | "last-resolved" => Ok(Self::LastResolvedWins),
            "latest-request-wins" | "latest-request" => Ok(Self::LatestRequestWins),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Observable phase of the analysis flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Idle,
    Loading,
    Success,
    Failed,
}

/// Observable phase of the chat flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    Thinking,
}

/// Why a chat submission was refused. No state changes when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChatRejection {
    #[error("message is empty")]
    Empty,
    #[error("still waiting for the previous reply")]
    Busy,
}

/// Handle for an in-flight analysis, returned by [`SessionState::begin_analysis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "pass the ticket to complete_analysis once the gateway call settles"]
pub struct AnalysisTicket {
    generation: u64,
}

/// An accepted chat submission, returned by [`SessionState::begin_chat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Transcript as it stood before this submission.
    pub history: Vec<ChatMessage>,
    /// The trimmed user message.
    pub message: String,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    uploaded_image: Option<String>,
    analysis: Option<PlantAnalysis>,
    error: Option<String>,
    is_loading: bool,
    is_chat_thinking: bool,
    chat_history: Vec<ChatMessage>,
    policy: StaleResponsePolicy,
    generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Fresh session: no image, no analysis, transcript seeded with [`GREETING`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(StaleResponsePolicy::default())
    }

    /// Fresh session that handles superseded analysis responses per `policy`.
    #[must_use]
    pub fn with_policy(policy: StaleResponsePolicy) -> Self {
        Self {
            uploaded_image: None,
            analysis: None,
            error: None,
            is_loading: false,
            is_chat_thinking: false,
            chat_history: vec![ChatMessage::model(GREETING)],
            policy,
            generation: 0,
        }
    }

    /// `data:` URL of the most recently selected image.
    pub fn uploaded_image(&self) -> Option<&str> {
        self.uploaded_image.as_deref()
    }

    /// Result of the last applied successful analysis.
    pub fn analysis(&self) -> Option<&PlantAnalysis> {
        self.analysis.as_ref()
    }

    /// User-facing analysis error, if the last applied outcome was a failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True between an image selection and the outcome that settles it.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// True while a chat reply is pending.
    pub fn is_chat_thinking(&self) -> bool {
        self.is_chat_thinking
    }

    /// Full transcript, oldest turn first.
    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    /// How superseded analysis responses are handled.
    pub fn policy(&self) -> StaleResponsePolicy {
        self.policy
    }

    /// Derived analysis phase. `Loading` takes precedence over any result.
    pub fn analysis_phase(&self) -> AnalysisPhase {
        if self.is_loading {
            AnalysisPhase::Loading
        } else if self.error.is_some() {
            AnalysisPhase::Failed
        } else if self.analysis.is_some() {
            AnalysisPhase::Success
        } else {
            AnalysisPhase::Idle
        }
    }

    /// Derived chat phase.
    pub fn chat_phase(&self) -> ChatPhase {
        if self.is_chat_thinking {
            ChatPhase::Thinking
        } else {
            ChatPhase::Idle
        }
    }

    /// Records a new image selection and enters `Loading`.
    ///
    /// Clears the previous result and error. Allowed from any phase; requests
    /// already in flight are not cancelled.
    pub fn begin_analysis(&mut self, image: &EncodedImage) -> AnalysisTicket {
        self.generation += 1;
        self.uploaded_image = Some(image.data_url());
        self.analysis = None;
        self.error = None;
        self.is_loading = true;
        AnalysisTicket {
            generation: self.generation,
        }
    }

    /// Applies the outcome of an analysis call.
    ///
    /// Returns `false` if the outcome was dropped as stale under
    /// [`StaleResponsePolicy::LatestRequestWins`]. An applied outcome replaces
    /// both the result and the error, so at most one of them is ever set.
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<PlantAnalysis, GatewayError>,
    ) -> bool {
        if self.policy == StaleResponsePolicy::LatestRequestWins
            && ticket.generation != self.generation
        {
            debug!(
                "Dropping stale analysis response: generation={}, latest={}",
                ticket.generation, self.generation
            );
            return false;
        }

        match outcome {
            Ok(analysis) => {
                self.analysis = Some(analysis);
                self.error = None;
            }
            Err(e) => {
                warn!("Plant analysis failed: {e}");
                self.analysis = None;
                self.error = Some(user_facing_message(&e).to_string());
            }
        }
        self.is_loading = false;
        true
    }

    /// Validates a chat submission and appends it to the transcript.
    ///
    /// # Errors
    ///
    /// [`ChatRejection::Empty`] for blank input, [`ChatRejection::Busy`] while
    /// a reply is pending. Either way the state is untouched.
    pub fn begin_chat(&mut self, input: &str) -> Result<ChatTurn, ChatRejection> {
        let message = input.trim();
        if message.is_empty() {
            return Err(ChatRejection::Empty);
        }
        if self.is_chat_thinking {
            return Err(ChatRejection::Busy);
        }

        let turn = ChatTurn {
            history: self.chat_history.clone(),
            message: message.to_string(),
        };
        self.chat_history.push(ChatMessage::user(message));
        self.is_chat_thinking = true;
        Ok(turn)
    }

    /// Appends the reply, or an apology carrying the user-facing error, and
    /// returns to `Idle`.
    pub fn complete_chat(&mut self, outcome: Result<String, GatewayError>) {
        let reply = match outcome {
            Ok(text) => text,
            Err(e) => {
                warn!("Chat reply failed: {e}");
                apology(&e)
            }
        };
        self.chat_history.push(ChatMessage::model(reply));
        self.is_chat_thinking = false;
    }
}

/// A session bound to a gateway.
///
/// Methods take `&self`, so several selections can be in flight at once; the
/// state lock is never held across a gateway call.
pub struct Controller<G> {
    gateway: G,
    state: Mutex<SessionState>,
}

impl<G: PlantGateway> Controller<G> {
    /// Wraps `gateway` with a fresh [`SessionState`].
    pub fn new(gateway: G) -> Self {
        Self::with_state(gateway, SessionState::new())
    }

    /// Wraps `gateway` with an existing state, e.g. one built with
    /// [`SessionState::with_policy`].
    pub fn with_state(gateway: G, state: SessionState) -> Self {
        Self {
            gateway,
            state: Mutex::new(state),
        }
    }

    /// The wrapped gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Copy of the current state for rendering.
    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Runs the analysis flow for a newly selected image.
    ///
    /// Returns whether this call's outcome was applied to the session.
    pub async fn select_image(&self, image: EncodedImage) -> bool {
        let ticket = self.state.lock().await.begin_analysis(&image);
        let outcome = self
            .gateway
            .analyze_image(&image.data, &image.mime_type)
            .await;
        self.state.lock().await.complete_analysis(ticket, outcome)
    }

    /// Runs the chat flow for one user submission.
    ///
    /// # Errors
    ///
    /// Returns the [`ChatRejection`] if the input was refused; gateway
    /// failures are not errors here, they become an apology in the transcript.
    pub async fn send_message(&self, input: &str) -> Result<(), ChatRejection> {
        let turn = self.state.lock().await.begin_chat(input)?;
        let outcome = self.gateway.chat_reply(&turn.history, &turn.message).await;
        self.state.lock().await.complete_chat(outcome);
        Ok(())
    }
}
