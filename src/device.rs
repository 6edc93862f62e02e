//! Device detection, uniqueness checks, and binding.
//!
//! Two distinct remote checks exist and must not be conflated: the
//! *detection* check (`/device/detected`) asks whether the serial is a
//! known device at all, while the *ownership* check (`/device/exists`)
//! asks whether it is already bound to another account.

use tracing::{debug, warn};

use crate::api::{OnboardingApi, RegisterDeviceRequest};
use crate::error::DeviceError;
use crate::session::{DeviceFields, ProfileFields, SongRequestChoice, ValidatedDevice};

/// Classify a backend registration error string as the already-registered
/// conflict.
///
/// The backend reports this conflict as an error string containing
/// "already exists" rather than a structured code; this function is the
/// single home of that substring convention so the contract is documented
/// and tested in one place.
pub fn is_already_registered(message: &str) -> bool {
    message.to_lowercase().contains("already exists")
}

/// Run the detection check and produce a validated-device cache entry.
pub async fn check_detected(
    api: &dyn OnboardingApi,
    serial: &str,
) -> Result<ValidatedDevice, DeviceError> {
    let resp = api.device_detected(serial).await?;
    if !resp.exists {
        let message = resp
            .message
            .unwrap_or_else(|| "No device with this serial number was found".to_string());
        return Err(DeviceError::NotDetected(message));
    }
    // Older registry entries have no canonical id; the serial stands in.
    let canonical_uuid = resp.canonical_id.unwrap_or_else(|| serial.to_string());
    debug!(serial = %serial, uuid = %canonical_uuid, "Device detected");
    Ok(ValidatedDevice {
        canonical_uuid,
        serial_number: serial.to_string(),
    })
}

/// Ownership check: error if the serial is already bound to an account.
pub async fn check_not_owned(api: &dyn OnboardingApi, serial: &str) -> Result<(), DeviceError> {
    let resp = api.device_exists(serial).await?;
    if resp.exists {
        let (owner, registered_at) = resp
            .owner
            .map(|o| (o.display_name, o.registered_at))
            .unwrap_or((None, None));
        return Err(DeviceError::AlreadyRegistered {
            message: "device already exists".to_string(),
            owner,
            registered_at,
        });
    }
    Ok(())
}

/// Return the cached validation if it still covers `serial`, otherwise run
/// a fresh detection check. A cache entry for a different serial is never
/// reused.
pub async fn ensure_validated(
    api: &dyn OnboardingApi,
    serial: &str,
    cached: Option<&ValidatedDevice>,
) -> Result<ValidatedDevice, DeviceError> {
    if let Some(v) = cached {
        if v.serial_number == serial {
            return Ok(v.clone());
        }
        debug!(
            cached = %v.serial_number,
            current = %serial,
            "Cached device validation is stale"
        );
    }
    check_detected(api, serial).await
}

/// Bind the device to the account.
///
/// Preconditions run in order, each short-circuiting on failure:
/// 1. detection re-check when the cached validation is stale or absent,
/// 2. the song-request choice is set,
/// 3. the serial does not already belong to another account.
///
/// Returns the (possibly refreshed) validation so the orchestrator can
/// update its cache.
pub async fn bind(
    api: &dyn OnboardingApi,
    device: &DeviceFields,
    profile: &ProfileFields,
    cached: Option<&ValidatedDevice>,
) -> Result<ValidatedDevice, DeviceError> {
    let serial = device.serial_number.trim();
    let validated = ensure_validated(api, serial, cached).await?;

    if device.allow_song_request == SongRequestChoice::Unset {
        return Err(DeviceError::SongChoiceRequired);
    }

    check_not_owned(api, serial).await?;

    let req = RegisterDeviceRequest {
        serial: serial.to_string(),
        nickname: device.nickname.clone(),
        allow_song_request: device.allow_song_request == SongRequestChoice::Yes,
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        display_name: profile.display_name.clone(),
        email: profile.email.clone(),
    };
    let ack = api.register_device(&req).await?;
    if let Err(message) = ack.into_result() {
        warn!(serial = %serial, error = %message, "Device registration refused");
        if is_already_registered(&message) {
            return Err(DeviceError::AlreadyRegistered {
                message,
                owner: None,
                registered_at: None,
            });
        }
        return Err(DeviceError::Rejected(message));
    }

    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_registered_matches_backend_convention() {
        assert!(is_already_registered("device already exists"));
        assert!(is_already_registered("Device Already Exists for this account"));
        assert!(!is_already_registered("internal server error"));
        assert!(!is_already_registered("device not found"));
    }
}
