//! Profile provisioning and email-verification challenges.
//!
//! The create-profile call is not idempotent on the backend; the
//! orchestrator guards it with the session's `profile_created` flag and
//! calls in here at most once per account. Code sending is re-entrant —
//! every resend supersedes the previous code.

use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::api::{CreateProfileRequest, OnboardingApi};
use crate::device::is_already_registered;
use crate::error::AccountError;
use crate::session::{Credentials, ProfileFields};

/// Create the account record and set credentials.
///
/// The password leaves its secret wrapper only here, inside the request
/// body, which is dropped as soon as the call returns.
pub async fn create_profile(
    api: &dyn OnboardingApi,
    profile: &ProfileFields,
    credentials: &Credentials,
) -> Result<(), AccountError> {
    let req = CreateProfileRequest {
        first_name: profile.first_name.trim().to_string(),
        last_name: profile.last_name.trim().to_string(),
        display_name: profile.display_name.trim().to_string(),
        email: profile.email.trim().to_string(),
        phone: profile.phone.trim().to_string(),
        bio: profile.bio.clone(),
        password: credentials.password.expose_secret().to_string(),
    };
    let ack = api.create_profile(&req).await?;
    if let Err(message) = ack.into_result() {
        warn!(email = %req.email, error = %message, "Profile creation refused");
        if is_already_registered(&message) {
            return Err(AccountError::EmailInUse { email: req.email });
        }
        return Err(AccountError::Rejected(message));
    }
    debug!(email = %req.email, "Profile created");
    Ok(())
}

/// Issue (or re-issue) a short-lived one-time code to `email`.
pub async fn send_code(api: &dyn OnboardingApi, email: &str) -> Result<(), AccountError> {
    let ack = api.send_code(email.trim()).await?;
    ack.into_result().map_err(AccountError::Rejected)?;
    debug!(email = %email, "Verification code sent");
    Ok(())
}

/// Check a one-time code. A wrong or expired code comes back as
/// `AccountError::Rejected` with the backend's message.
pub async fn check_code(
    api: &dyn OnboardingApi,
    email: &str,
    code: &str,
) -> Result<(), AccountError> {
    let ack = api.check_code(email.trim(), code.trim()).await?;
    ack.into_result().map_err(AccountError::Rejected)?;
    Ok(())
}
