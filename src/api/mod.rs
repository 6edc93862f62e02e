//! Backend collaborator interface.
//!
//! The orchestrator talks to the platform backend only through the
//! [`OnboardingApi`] trait; [`HttpApi`] is the production reqwest
//! implementation, and tests substitute scripted stubs.

mod client;
mod types;

pub use client::HttpApi;
pub use types::{
    AckResponse, CreateProfileRequest, DeviceDetectedResponse, DeviceExistsResponse, DeviceOwner,
    PaymentAccountRequest, PaymentAccountResponse, ProvisioningStatusResponse,
    RegisterDeviceRequest,
};

use async_trait::async_trait;

use crate::error::ApiError;

/// Every call the onboarding core issues to the backend.
///
/// All methods return `Result<_, ApiError>`; transport failures are
/// converted at the seam and never panic across it.
#[async_trait]
pub trait OnboardingApi: Send + Sync {
    /// `POST /profile` — create the account record and set credentials.
    async fn create_profile(&self, req: &CreateProfileRequest) -> Result<AckResponse, ApiError>;

    /// `POST /verification/send` — issue (or re-issue) a one-time code.
    async fn send_code(&self, email: &str) -> Result<AckResponse, ApiError>;

    /// `POST /verification/check` — check a one-time code.
    async fn check_code(&self, email: &str, code: &str) -> Result<AckResponse, ApiError>;

    /// `GET /device/exists` — ownership check: is the serial already
    /// bound to an account?
    async fn device_exists(&self, serial: &str) -> Result<DeviceExistsResponse, ApiError>;

    /// `GET /device/detected` — detection check: is the serial in the
    /// device registry?
    async fn device_detected(&self, serial: &str) -> Result<DeviceDetectedResponse, ApiError>;

    /// `POST /device/register` — bind the device to the account.
    async fn register_device(&self, req: &RegisterDeviceRequest) -> Result<AckResponse, ApiError>;

    /// `POST /payments/account` — request a payment-processor sub-account.
    async fn create_payment_account(
        &self,
        req: &PaymentAccountRequest,
    ) -> Result<PaymentAccountResponse, ApiError>;

    /// `GET /payments/account/status` — poll deferred provisioning.
    async fn provisioning_status(
        &self,
        device_id: &str,
    ) -> Result<ProvisioningStatusResponse, ApiError>;
}
