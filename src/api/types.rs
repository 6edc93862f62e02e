//! Wire types for the backend endpoints. Field names are camelCase on the
//! wire; response structs admit every documented shape and leave
//! classification to the calling component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic `{ok}` / `{error}` acknowledgment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl AckResponse {
    /// Collapse into a result, treating a missing `ok` with no error as a
    /// refusal (the backend always sets one of the two).
    pub fn into_result(self) -> Result<(), String> {
        if self.ok {
            Ok(())
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "Request was not accepted".to_string()))
        }
    }
}

/// `POST /profile` body. Transient: built at the single create call site
/// and dropped immediately after; never stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email: String,
    pub phone: String,
    pub bio: String,
    pub password: String,
}

/// Owner detail attached to a positive `GET /device/exists` result, used
/// to render an actionable conflict message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceOwner {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub registered_at: Option<DateTime<Utc>>,
}

/// `GET /device/exists` response (ownership check).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceExistsResponse {
    pub exists: bool,
    #[serde(default)]
    pub owner: Option<DeviceOwner>,
}

/// `GET /device/detected` response (detection-registry check).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetectedResponse {
    pub exists: bool,
    #[serde(default)]
    pub canonical_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /device/register` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub serial: String,
    pub nickname: String,
    pub allow_song_request: bool,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email: String,
}

/// `POST /payments/account` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAccountRequest {
    pub device_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// `POST /payments/account` response. Exactly one of the three shapes is
/// legitimate: a continuation URL (immediate), `status: "processing"`
/// (deferred), or an error. Anything else is malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAccountResponse {
    #[serde(default)]
    pub continuation_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /payments/account/status` response. `status` is one of
/// `processing`, `timeout_error`, `network_error`, `creation_error`, or
/// absent when a continuation URL or error is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningStatusResponse {
    #[serde(default)]
    pub continuation_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
