//! Payment-account creation and response-shape classification.

use tracing::{debug, warn};

use crate::api::{OnboardingApi, PaymentAccountRequest, PaymentAccountResponse};
use crate::error::ProvisionError;
use crate::session::ProfileFields;

/// How the create call resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The backend returned a continuation URL immediately.
    Ready(String),
    /// The backend deferred with a processing token; poll for resolution.
    Deferred,
}

/// Request creation of the payment-processor sub-account.
///
/// Identity fields must be pre-validated by the caller
/// ([`crate::validate::kyc_identity`]); nothing incomplete is sent here.
/// Transport failures are network-class and therefore retryable.
pub async fn request_account(
    api: &dyn OnboardingApi,
    device_id: &str,
    profile: &ProfileFields,
) -> Result<ProvisionOutcome, ProvisionError> {
    let req = PaymentAccountRequest {
        device_id: device_id.to_string(),
        first_name: profile.first_name.trim().to_string(),
        last_name: profile.last_name.trim().to_string(),
        email: profile.email.trim().to_string(),
    };
    let resp = api
        .create_payment_account(&req)
        .await
        .map_err(|e| {
            warn!(error = %e, "Payment account create call failed");
            ProvisionError::Network
        })?;
    classify_create(resp)
}

/// Classify the create response. Exactly two shapes are legitimate:
/// immediate (continuation URL) and deferred (`status: "processing"`).
/// An explicit error is a rejection; anything else is malformed.
fn classify_create(resp: PaymentAccountResponse) -> Result<ProvisionOutcome, ProvisionError> {
    if let Some(url) = resp.continuation_url {
        debug!("Payment account ready immediately");
        return Ok(ProvisionOutcome::Ready(url));
    }
    if resp.status.as_deref() == Some("processing") {
        debug!("Payment account creation deferred");
        return Ok(ProvisionOutcome::Deferred);
    }
    if let Some(error) = resp.error {
        return Err(ProvisionError::Rejected(error));
    }
    Err(ProvisionError::Malformed(
        "response carried neither a continuation URL nor a processing status".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_url_is_ready() {
        let resp = PaymentAccountResponse {
            continuation_url: Some("https://pay/x".into()),
            ..Default::default()
        };
        assert_eq!(
            classify_create(resp).unwrap(),
            ProvisionOutcome::Ready("https://pay/x".into())
        );
    }

    #[test]
    fn processing_token_is_deferred() {
        let resp = PaymentAccountResponse {
            status: Some("processing".into()),
            ..Default::default()
        };
        assert_eq!(classify_create(resp).unwrap(), ProvisionOutcome::Deferred);
    }

    #[test]
    fn explicit_error_is_rejection() {
        let resp = PaymentAccountResponse {
            error: Some("identity mismatch".into()),
            ..Default::default()
        };
        match classify_create(resp) {
            Err(ProvisionError::Rejected(msg)) => assert_eq!(msg, "identity mismatch"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn empty_shape_is_malformed_and_fatal() {
        let err = classify_create(PaymentAccountResponse::default()).unwrap_err();
        assert!(matches!(err, ProvisionError::Malformed(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn url_wins_over_stray_status() {
        // A backend that sets both is still usable; the URL is the signal.
        let resp = PaymentAccountResponse {
            continuation_url: Some("https://pay/y".into()),
            status: Some("processing".into()),
            ..Default::default()
        };
        assert_eq!(
            classify_create(resp).unwrap(),
            ProvisionOutcome::Ready("https://pay/y".into())
        );
    }
}
