//! Per-step input validators.
//!
//! Pure, deterministic, and side-effect free: safe to run on every
//! keystroke and again at step-advance time. Each validator returns a
//! [`FieldErrors`] map; an empty map means the step may proceed.

use std::sync::LazyLock;

use regex::Regex;
use secrecy::ExposeSecret;

use crate::session::{Credentials, DeviceFields, FieldErrors, ProfileFields, SongRequestChoice};

/// Minimum password length accepted by the backend.
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // RFC-shape check, not full RFC 5322: something@something.tld
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

/// Whether a string looks like an email address.
pub fn email_shape_ok(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Validate the PersonalInfo step.
pub fn personal_info(profile: &ProfileFields) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if profile.first_name.trim().is_empty() {
        errors.insert("first_name".into(), "First name is required".into());
    }
    if profile.last_name.trim().is_empty() {
        errors.insert("last_name".into(), "Last name is required".into());
    }
    if profile.display_name.trim().is_empty() {
        errors.insert("display_name".into(), "Stage name is required".into());
    }
    if profile.email.trim().is_empty() {
        errors.insert("email".into(), "Email is required".into());
    } else if !email_shape_ok(profile.email.trim()) {
        errors.insert("email".into(), "Enter a valid email address".into());
    }
    errors
}

/// Validate the Password step.
pub fn password(credentials: &Credentials) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let pw = credentials.password.expose_secret();
    if pw.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(
            "password".into(),
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
    if !credentials.matches() {
        errors.insert("confirmation".into(), "Passwords do not match".into());
    }
    errors
}

/// Validate the EmailVerification step (code presence only; correctness is
/// checked against the backend).
pub fn verification_code(code: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if code.trim().is_empty() {
        errors.insert(
            "verification_code".into(),
            "Enter the code we emailed you".into(),
        );
    }
    errors
}

/// Validate the DeviceSetup step.
pub fn device(device: &DeviceFields) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if device.serial_number.trim().is_empty() {
        errors.insert("serial_number".into(), "Serial number is required".into());
    }
    if device.allow_song_request == SongRequestChoice::Unset {
        errors.insert(
            "allow_song_request".into(),
            "Choose whether to allow song requests".into(),
        );
    }
    errors
}

/// Validate the identity fields required by payment-account provisioning.
///
/// A missing field is reported as a named-field validation error and is
/// never sent to the remote call.
pub fn kyc_identity(serial_number: &str, profile: &ProfileFields) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if serial_number.trim().is_empty() {
        errors.insert("serial_number".into(), "Serial number is required".into());
    }
    if profile.first_name.trim().is_empty() {
        errors.insert("first_name".into(), "First name is required".into());
    }
    if profile.last_name.trim().is_empty() {
        errors.insert("last_name".into(), "Last name is required".into());
    }
    if profile.email.trim().is_empty() {
        errors.insert("email".into(), "Email is required".into());
    }
    errors
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn profile() -> ProfileFields {
        ProfileFields {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            display_name: "DJ Ada".into(),
            email: "ada@example.com".into(),
            phone: String::new(),
            bio: String::new(),
        }
    }

    fn creds(pw: &str, confirm: &str) -> Credentials {
        Credentials {
            password: SecretString::from(pw.to_string()),
            confirmation: SecretString::from(confirm.to_string()),
        }
    }

    #[test]
    fn personal_info_accepts_complete_profile() {
        assert!(personal_info(&profile()).is_empty());
    }

    #[test]
    fn personal_info_requires_names_and_email() {
        let empty = ProfileFields::default();
        let errors = personal_info(&empty);
        assert!(errors.contains_key("first_name"));
        assert!(errors.contains_key("last_name"));
        assert!(errors.contains_key("display_name"));
        assert!(errors.contains_key("email"));
        // Phone and bio are optional
        assert!(!errors.contains_key("phone"));
        assert!(!errors.contains_key("bio"));
    }

    #[test]
    fn email_shape() {
        assert!(email_shape_ok("a@b.com"));
        assert!(email_shape_ok("first.last+tag@sub.domain.io"));
        assert!(!email_shape_ok("not-an-email"));
        assert!(!email_shape_ok("missing@tld"));
        assert!(!email_shape_ok("spaces in@mail.com"));
        assert!(!email_shape_ok("@no-local.com"));
    }

    #[test]
    fn password_rules() {
        assert!(password(&creds("secret1", "secret1")).is_empty());

        let short = password(&creds("abc", "abc"));
        assert!(short.contains_key("password"));

        let mismatch = password(&creds("secret1", "secret2"));
        assert!(mismatch.contains_key("confirmation"));
        assert!(!mismatch.contains_key("password"));
    }

    #[test]
    fn code_required() {
        assert!(verification_code("123456").is_empty());
        assert!(verification_code("").contains_key("verification_code"));
        assert!(verification_code("   ").contains_key("verification_code"));
    }

    #[test]
    fn device_requires_serial_and_choice() {
        let mut fields = DeviceFields {
            serial_number: "TPY-0001".into(),
            nickname: String::new(),
            allow_song_request: SongRequestChoice::Yes,
        };
        assert!(device(&fields).is_empty());

        fields.allow_song_request = SongRequestChoice::Unset;
        assert!(device(&fields).contains_key("allow_song_request"));

        fields.serial_number.clear();
        assert!(device(&fields).contains_key("serial_number"));
    }

    #[test]
    fn kyc_identity_names_missing_fields() {
        let errors = kyc_identity("", &ProfileFields::default());
        assert_eq!(errors.len(), 4);
        assert!(errors.contains_key("serial_number"));
        assert!(errors.contains_key("first_name"));
        assert!(errors.contains_key("last_name"));
        assert!(errors.contains_key("email"));
    }

    #[test]
    fn validators_are_deterministic() {
        let p = profile();
        assert_eq!(personal_info(&p), personal_info(&p));
    }
}
