//! Production `OnboardingApi` implementation over HTTP.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

use super::types::{
    AckResponse, CreateProfileRequest, DeviceDetectedResponse, DeviceExistsResponse,
    PaymentAccountRequest, PaymentAccountResponse, ProvisioningStatusResponse,
    RegisterDeviceRequest,
};
use super::OnboardingApi;

/// HTTP client for the onboarding backend.
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Http {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;
        Self::decode(path, resp).await
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let resp = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Http {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;
        Self::decode(path, resp).await
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>().await.map_err(|e| ApiError::Decode {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl OnboardingApi for HttpApi {
    async fn create_profile(&self, req: &CreateProfileRequest) -> Result<AckResponse, ApiError> {
        self.post_json("/profile", req).await
    }

    async fn send_code(&self, email: &str) -> Result<AckResponse, ApiError> {
        self.post_json(
            "/verification/send",
            &serde_json::json!({ "email": email }),
        )
        .await
    }

    async fn check_code(&self, email: &str, code: &str) -> Result<AckResponse, ApiError> {
        self.post_json(
            "/verification/check",
            &serde_json::json!({ "email": email, "code": code }),
        )
        .await
    }

    async fn device_exists(&self, serial: &str) -> Result<DeviceExistsResponse, ApiError> {
        self.get_json("/device/exists", &[("serial", serial)]).await
    }

    async fn device_detected(&self, serial: &str) -> Result<DeviceDetectedResponse, ApiError> {
        self.get_json("/device/detected", &[("serial", serial)])
            .await
    }

    async fn register_device(&self, req: &RegisterDeviceRequest) -> Result<AckResponse, ApiError> {
        self.post_json("/device/register", req).await
    }

    async fn create_payment_account(
        &self,
        req: &PaymentAccountRequest,
    ) -> Result<PaymentAccountResponse, ApiError> {
        self.post_json("/payments/account", req).await
    }

    async fn provisioning_status(
        &self,
        device_id: &str,
    ) -> Result<ProvisioningStatusResponse, ApiError> {
        self.get_json("/payments/account/status", &[("deviceId", device_id)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let api = HttpApi::new("http://localhost:8080/");
        assert_eq!(api.url("/profile"), "http://localhost:8080/profile");

        let api = HttpApi::new("http://localhost:8080");
        assert_eq!(api.url("/profile"), "http://localhost:8080/profile");
    }
}
