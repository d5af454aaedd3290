//! Debrief requests to the external text-generation service.
//!
//! The transport lives outside this crate; it plugs in through
//! [`DebriefService`]. [`request_debrief`] never fails: every error path
//! degrades to a readable placeholder so the session screen always has
//! something to show.

use std::fmt;

use glucoguard_logic::debrief::{DebriefRequest, DebriefResponse};

/// Shown when the service answers successfully but without text.
pub const FALLBACK_EMPTY: &str = "Analysis complete.";
/// Shown when the service reports an error without text.
pub const FALLBACK_SERVER: &str = "Medical server error.";
/// Shown when the service cannot be reached or answers garbage.
pub const FALLBACK_TRANSPORT: &str = "Connection lost. Reviewing local logs.";

/// Boundary to whatever actually carries the request.
pub trait DebriefService {
    fn request(&self, req: &DebriefRequest) -> Result<DebriefResponse, DebriefError>;
}

#[derive(Debug)]
pub enum DebriefError {
    /// The service answered with an error status. It may still carry text.
    Server { status: u16, text: Option<String> },
    /// No answer at all.
    Transport(String),
    /// Body could not be encoded or decoded.
    Decode(serde_json::Error),
}

impl fmt::Display for DebriefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebriefError::Server { status, .. } => write!(f, "debrief service returned {status}"),
            DebriefError::Transport(msg) => write!(f, "debrief transport failed: {msg}"),
            DebriefError::Decode(e) => write!(f, "debrief body malformed: {e}"),
        }
    }
}

impl std::error::Error for DebriefError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DebriefError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DebriefError {
    fn from(e: serde_json::Error) -> Self {
        DebriefError::Decode(e)
    }
}

/// JSON body for a debrief POST.
pub fn encode_request(req: &DebriefRequest) -> Result<String, DebriefError> {
    Ok(serde_json::to_string(req)?)
}

/// Interpret a raw HTTP status and body. Error statuses become
/// [`DebriefError::Server`], keeping any `text` the body carries.
pub fn decode_response(status: u16, body: &str) -> Result<DebriefResponse, DebriefError> {
    if (200..300).contains(&status) {
        return Ok(serde_json::from_str(body)?);
    }
    let text = serde_json::from_str::<DebriefResponse>(body)
        .ok()
        .and_then(|r| r.text);
    Err(DebriefError::Server { status, text })
}

/// Ask the service for narrative feedback, substituting a placeholder on
/// any failure.
pub fn request_debrief(service: &impl DebriefService, req: &DebriefRequest) -> String {
    match service.request(req) {
        Ok(resp) => non_empty(resp.text).unwrap_or_else(|| FALLBACK_EMPTY.to_string()),
        Err(DebriefError::Server { status, text }) => {
            log::warn!("Debrief service error {}", status);
            non_empty(text).unwrap_or_else(|| FALLBACK_SERVER.to_string())
        }
        Err(e) => {
            log::warn!("Debrief unavailable: {}", e);
            FALLBACK_TRANSPORT.to_string()
        }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}
