//! Error types for the onboarding core.
//!
//! The taxonomy mirrors how errors are surfaced to the wizard: validation
//! problems are data (`FieldErrors`), not errors; everything here is a
//! side-effect failure that the orchestrator classifies as recoverable,
//! conflict, retryable, or fatal.

use chrono::{DateTime, Utc};

/// Top-level error type for the onboarding core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),
}

/// Transport-level and protocol-level failures talking to the backend.
///
/// Everything in here is network-class: the orchestrator treats it as
/// retryable and renders it inline, never as a wizard abort.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {reason}")]
    Http { endpoint: String, reason: String },

    #[error("Backend returned {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// Profile-creation and email-verification failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    /// The email is already bound to an account.
    #[error("An account already exists for {email}")]
    EmailInUse { email: String },

    /// The backend refused the create/send/check call.
    #[error("{0}")]
    Rejected(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Device detection, uniqueness, and registration failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeviceError {
    /// The serial number is already bound to another account. Carries the
    /// detail the backend reported so the message stays actionable
    /// (use a different device or contact support), distinct from the
    /// generic fallback.
    #[error(
        "This device is already registered to another account. \
         Use a different device or contact support. ({message})"
    )]
    AlreadyRegistered {
        message: String,
        owner: Option<String>,
        registered_at: Option<DateTime<Utc>>,
    },

    /// The serial number is not in the detection registry.
    #[error("Device not recognized: {0}")]
    NotDetected(String),

    /// The tri-state song-request choice was still unset at bind time.
    #[error("Choose whether to allow song requests")]
    SongChoiceRequired,

    /// The backend refused the registration for another reason.
    #[error("Device registration failed: {0}")]
    Rejected(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Payment-account provisioning failures, split into the retryable class
/// (transient, worth polling again or re-entering the step) and the fatal
/// class (explicit rejection, malformed response, local give-up).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionError {
    // Retryable class.
    #[error("Payment account setup timed out")]
    Timeout,

    #[error("Network error during payment account setup")]
    Network,

    #[error("Payment account creation failed: {0}")]
    Creation(String),

    // Fatal class.
    #[error("Payment account setup was rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from payment provisioning: {0}")]
    Malformed(String),

    /// The poller gave up locally. The remote provisioning is not proven
    /// dead, so the message must not claim it failed outright.
    #[error(
        "Payment account setup is taking longer than expected and may still \
         be completing in the background. Please try again later."
    )]
    CeilingExceeded,
}

impl ProvisionError {
    /// Whether this error is in the retryable class (transient) rather
    /// than the fatal class (explicit rejection or local give-up).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network | Self::Creation(_))
    }
}

/// Result type alias for the onboarding core.
pub type Result<T> = std::result::Result<T, Error>;
