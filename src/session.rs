//! Onboarding session state — the wizard's step machine and form data.
//!
//! The session is in-memory and client-owned: it lives for the duration of
//! the wizard, is mutated only by the [`crate::orchestrator::Orchestrator`],
//! and is discarded once the flow completes or the user navigates away.
//! There is no cross-session resume.

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Field name → error message, rendered inline next to each field.
pub type FieldErrors = BTreeMap<String, String>;

/// The steps of the onboarding wizard.
///
/// Progresses linearly: PersonalInfo → Password → EmailVerification →
/// DeviceSetup → KycVerification → Complete. Steps are not skippable and
/// not reorderable; "Back" revisits without re-running side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    PersonalInfo,
    Password,
    EmailVerification,
    DeviceSetup,
    KycVerification,
    Complete,
}

impl Step {
    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<Step> {
        use Step::*;
        match self {
            PersonalInfo => Some(Password),
            Password => Some(EmailVerification),
            EmailVerification => Some(DeviceSetup),
            DeviceSetup => Some(KycVerification),
            KycVerification => Some(Complete),
            Complete => None,
        }
    }

    /// Get the immediately prior step, if any ("Back" target).
    pub fn prev(&self) -> Option<Step> {
        use Step::*;
        match self {
            PersonalInfo => None,
            Password => Some(PersonalInfo),
            EmailVerification => Some(Password),
            DeviceSetup => Some(EmailVerification),
            KycVerification => Some(DeviceSetup),
            Complete => Some(KycVerification),
        }
    }

    /// Whether this step is terminal (the wizard is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::PersonalInfo
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PersonalInfo => "personal_info",
            Self::Password => "password",
            Self::EmailVerification => "email_verification",
            Self::DeviceSetup => "device_setup",
            Self::KycVerification => "kyc_verification",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// The performer's identity fields collected on the first step.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email: String,
    pub phone: String,
    pub bio: String,
}

/// Password and confirmation. Held as secrets and never persisted beyond
/// the profile-create call; `Debug` output is redacted.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub password: SecretString,
    pub confirmation: SecretString,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            password: SecretString::from(String::new()),
            confirmation: SecretString::from(String::new()),
        }
    }
}

impl Credentials {
    /// Whether the two entries match (constant-shape comparison is not
    /// required here; both values came from the same keyboard).
    pub fn matches(&self) -> bool {
        self.password.expose_secret() == self.confirmation.expose_secret()
    }
}

/// Tri-state song-request choice on the device step. The wizard must not
/// advance while this is `Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongRequestChoice {
    Yes,
    No,
    Unset,
}

impl Default for SongRequestChoice {
    fn default() -> Self {
        Self::Unset
    }
}

/// Device fields collected on the device step.
#[derive(Debug, Clone, Default)]
pub struct DeviceFields {
    pub serial_number: String,
    pub nickname: String,
    pub allow_song_request: SongRequestChoice,
}

/// Cache of the last successful device-detection check.
///
/// Invalidated the instant the serial-number input changes, so a stale
/// validation can never authorize a bind for a different identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDevice {
    pub canonical_uuid: String,
    pub serial_number: String,
}

/// Status of the asynchronous payment-account creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStatus {
    Idle,
    Requesting,
    Processing,
    Ready,
    Failed,
}

/// Tracks the asynchronous payment-account creation.
///
/// Invariant: `continuation_url` is set if and only if `status == Ready`.
/// Invariant: once `Ready` or `Failed` is reached, polling stops for good.
#[derive(Debug, Clone)]
pub struct ProvisioningState {
    pub status: ProvisioningStatus,
    pub continuation_url: Option<String>,
    pub attempt_count: u32,
    pub last_error: Option<String>,
}

impl Default for ProvisioningState {
    fn default() -> Self {
        Self {
            status: ProvisioningStatus::Idle,
            continuation_url: None,
            attempt_count: 0,
            last_error: None,
        }
    }
}

impl ProvisioningState {
    /// Transition to `Ready` with the given continuation URL.
    pub fn resolve_ready(&mut self, url: String) {
        self.status = ProvisioningStatus::Ready;
        self.continuation_url = Some(url);
        self.last_error = None;
    }

    /// Transition to `Failed`, recording the error.
    pub fn resolve_failed(&mut self, error: String) {
        self.status = ProvisioningStatus::Failed;
        self.continuation_url = None;
        self.last_error = Some(error);
    }

    /// Whether provisioning has reached a terminal outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ProvisioningStatus::Ready | ProvisioningStatus::Failed
        )
    }
}

/// In-memory wizard state, owned and mutated exclusively by the
/// orchestrator. Collaborators receive the fields they need and return
/// results; none of them reach into this struct.
#[derive(Debug, Clone, Default)]
pub struct OnboardingSession {
    pub current_step: Step,
    pub profile: ProfileFields,
    pub credentials: Credentials,
    pub email_verified: bool,
    pub verification_code: String,
    pub device: DeviceFields,
    /// Guards re-submission of the non-idempotent profile create.
    pub profile_created: bool,
    pub validated_device: Option<ValidatedDevice>,
    pub provisioning: ProvisioningState,
    pub errors: FieldErrors,
}

impl OnboardingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cached device validation still covers the serial number
    /// currently in the form.
    pub fn device_validation_fresh(&self) -> bool {
        self.validated_device
            .as_ref()
            .is_some_and(|v| v.serial_number == self.device.serial_number)
    }
}

/// Well-known keys for short-lived, session-scoped storage shared with the
/// surrounding application (e.g. pending credentials for the
/// post-verification auto-login). Cleared once consumed.
pub mod session_keys {
    /// Key under which [`PendingCredentials`](super::PendingCredentials)
    /// is stashed.
    pub const PENDING_CREDENTIALS: &str = "tipflow.pending_credentials";
}

/// Credentials handed to the post-verification auto-login path, outside
/// this core. Placed in session storage under
/// [`session_keys::PENDING_CREDENTIALS`] and cleared on consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCredentials {
    pub email: String,
    pub password: String,
}
