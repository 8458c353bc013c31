use serde::{Deserialize, Serialize};

/// Source recorded when the form does not say where the signup came from
pub const DEFAULT_WAITLIST_SOURCE: &str = "landing";

/// Body of `POST /api/waitlist`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistRequest {
    pub email: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// Insert payload for the `waitlist` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWaitlistEntry {
    pub email: String,
    pub source: String,
}

impl From<WaitlistRequest> for NewWaitlistEntry {
    fn from(request: WaitlistRequest) -> Self {
        Self {
            email: normalize_email(&request.email),
            source: request
                .source
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_WAITLIST_SOURCE.to_string()),
        }
    }
}

/// Outcome of a signup attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitlistOutcome {
    Joined,
    AlreadyJoined,
}

impl WaitlistOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            WaitlistOutcome::Joined => "Successfully joined the waitlist!",
            WaitlistOutcome::AlreadyJoined => "You're already on the waitlist!",
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            WaitlistOutcome::Joined => "joined",
            WaitlistOutcome::AlreadyJoined => "duplicate",
        }
    }
}

/// Data returned by `POST /api/waitlist`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistResponse {
    pub message: String,
}

impl From<WaitlistOutcome> for WaitlistResponse {
    fn from(outcome: WaitlistOutcome) -> Self {
        Self {
            message: outcome.message().to_string(),
        }
    }
}

/// Emails are stored trimmed and lowercased so uniqueness is case-insensitive
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
