//! Wire protocol for the VTube Studio public API.
//!
//! DESIGN
//! ======
//! Every exchange is a JSON object with `apiName`, `apiVersion`,
//! `requestID`, `messageType`, and an optional `data` payload. Only the
//! three request types and four inbound types the zoom pipeline needs are
//! modeled; everything else lands in [`Response::Unknown`] and is ignored
//! by the client after a debug log.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const API_NAME: &str = "VTubeStudioPublicAPI";
pub const API_VERSION: &str = "1.0";

/// Identity presented during authentication.
pub const PLUGIN_NAME: &str = "VTS Smart Zoom";
pub const PLUGIN_DEVELOPER: &str = "vts-zoom";

/// The one event the zoom pipeline subscribes to.
pub const MODEL_MOVED_EVENT: &str = "ModelMovedEvent";

// =============================================================================
// REQUESTS
// =============================================================================

/// Outbound request envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub api_name: &'static str,
    pub api_version: &'static str,
    #[serde(rename = "requestID")]
    pub request_id: String,
    pub message_type: &'static str,
    pub data: RequestData,
}

/// Typed payloads for the three request types in use.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestData {
    Auth(AuthData),
    EventSubscription(EventSubscriptionData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub plugin_name: &'static str,
    pub plugin_developer: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscriptionData {
    pub event_name: &'static str,
    pub subscribe: bool,
}

impl Request {
    fn new(message_type: &'static str, data: RequestData) -> Self {
        Self {
            api_name: API_NAME,
            api_version: API_VERSION,
            request_id: Uuid::new_v4().to_string(),
            message_type,
            data,
        }
    }

    /// Ask the tracker to mint a fresh authentication token.
    #[must_use]
    pub fn token_request() -> Self {
        Self::new(
            "AuthenticationTokenRequest",
            RequestData::Auth(AuthData {
                plugin_name: PLUGIN_NAME,
                plugin_developer: PLUGIN_DEVELOPER,
                authentication_token: None,
            }),
        )
    }

    /// Authenticate the session with a previously issued token.
    #[must_use]
    pub fn authentication(token: &str) -> Self {
        Self::new(
            "AuthenticationRequest",
            RequestData::Auth(AuthData {
                plugin_name: PLUGIN_NAME,
                plugin_developer: PLUGIN_DEVELOPER,
                authentication_token: Some(token.to_owned()),
            }),
        )
    }

    /// Subscribe to model movement events.
    #[must_use]
    pub fn subscribe_model_moved() -> Self {
        Self::new(
            "EventSubscriptionRequest",
            RequestData::EventSubscription(EventSubscriptionData {
                event_name: MODEL_MOVED_EVENT,
                subscribe: true,
            }),
        )
    }

    /// Serialize to the JSON text frame sent over the socket.
    ///
    /// # Errors
    ///
    /// Returns the underlying serialization error, which does not occur
    /// for the request shapes built by this module.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Inbound frames, dispatched on `messageType`. Extra envelope fields
/// (`apiName`, `requestID`, ...) are ignored during deserialization.
#[derive(Debug, Deserialize)]
#[serde(tag = "messageType", content = "data")]
pub enum Response {
    AuthenticationTokenResponse(TokenResponseData),
    AuthenticationResponse(AuthResponseData),
    ModelMovedEvent(ModelMovedData),
    #[serde(rename = "APIError")]
    ApiError(ApiErrorData),
    /// Any message type the pipeline does not consume.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponseData {
    pub authentication_token: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponseData {
    pub authenticated: bool,
}

#[derive(Debug, Deserialize)]
pub struct ModelMovedData {
    #[serde(rename = "modelPosition")]
    pub model_position: PoseSample,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorData {
    #[serde(rename = "errorID", default)]
    pub error_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One model pose event: apparent size plus screen position in the
/// tracker's convention (size roughly in [-102, 300]; position in [-1, 1]
/// with y inverted).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PoseSample {
    pub size: f64,
    #[serde(rename = "positionX")]
    pub position_x: f64,
    #[serde(rename = "positionY")]
    pub position_y: f64,
}

impl Response {
    /// Parse one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns an error for non-JSON payloads or frames without a
    /// `messageType`.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// =============================================================================
// TESTS
// =============================================================================
