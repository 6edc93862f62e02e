//! Bounded provisioning-status poller.
//!
//! Classification of each status response is a pure function
//! ([`classify`]) producing a tagged [`PollTick`]; the async driver owns
//! the sleeps, the attempt budget, and cancellation. Every invocation of
//! [`ProvisioningPoller::run`] reaches exactly one terminal resolution and
//! issues no polls after it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::{OnboardingApi, ProvisioningStatusResponse};
use crate::config::OnboardingConfig;
use crate::error::ProvisionError;

/// Classification of a single status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTick {
    /// Still provisioning; wait the interval and poll again.
    Processing,
    /// Continuation URL available; stop polling.
    Ready(String),
    /// Transient failure reported by the remote system; keep polling
    /// unless the attempt budget is nearly spent.
    Retryable(ProvisionError),
    /// Explicit rejection or malformed response; stop polling.
    Fatal(ProvisionError),
}

/// Terminal outcome of a poll run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResolution {
    Ready(String),
    Failed(ProvisionError),
    /// The session was abandoned while polling; nothing further may touch
    /// its state.
    Cancelled,
}

/// Resolution plus the number of semantic attempts consumed, for the
/// orchestrator's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub resolution: PollResolution,
    pub attempts: u32,
}

/// Classify one status response into a [`PollTick`].
pub fn classify(resp: &ProvisioningStatusResponse) -> PollTick {
    if let Some(url) = &resp.continuation_url {
        return PollTick::Ready(url.clone());
    }
    match resp.status.as_deref() {
        Some("processing") => PollTick::Processing,
        Some("timeout_error") => PollTick::Retryable(ProvisionError::Timeout),
        Some("network_error") => PollTick::Retryable(ProvisionError::Network),
        Some("creation_error") => PollTick::Retryable(ProvisionError::Creation(
            "transient creation failure".to_string(),
        )),
        Some(other) => PollTick::Fatal(ProvisionError::Malformed(format!(
            "unknown provisioning status {other:?}"
        ))),
        None => match &resp.error {
            Some(error) => PollTick::Fatal(ProvisionError::Rejected(error.clone())),
            None => PollTick::Fatal(ProvisionError::Malformed(
                "status response carried neither a URL, a status, nor an error".to_string(),
            )),
        },
    }
}

/// Drives the bounded wait-then-poll loop.
pub struct ProvisioningPoller {
    interval: Duration,
    attempt_ceiling: u32,
    escalation_window: u32,
    transport_backoff: u32,
}

impl ProvisioningPoller {
    pub fn new(config: &OnboardingConfig) -> Self {
        Self {
            interval: config.poll_interval,
            attempt_ceiling: config.poll_attempt_ceiling,
            escalation_window: config.poll_escalation_window,
            transport_backoff: config.transport_backoff,
        }
    }

    /// Whether `attempt` (1-based) falls in the escalation window: close
    /// enough to the ceiling that retryable errors become fatal.
    fn near_ceiling(&self, attempt: u32) -> bool {
        attempt > self.attempt_ceiling.saturating_sub(self.escalation_window)
    }

    /// Poll until resolution, cancellation, or the attempt ceiling.
    ///
    /// Transport-level errors calling the status endpoint itself back off
    /// to `transport_backoff ×` the interval and retry without consuming
    /// the semantic attempt budget. Ceiling exhaustion resolves as
    /// [`ProvisionError::CeilingExceeded`] — a local give-up, not proof of
    /// remote failure.
    pub async fn run(
        &self,
        api: &dyn OnboardingApi,
        device_id: &str,
        cancel: &AtomicBool,
    ) -> PollReport {
        let mut attempts: u32 = 0;

        loop {
            if cancel.load(Ordering::Relaxed) {
                info!("Provisioning poll cancelled");
                return PollReport {
                    resolution: PollResolution::Cancelled,
                    attempts,
                };
            }
            if attempts >= self.attempt_ceiling {
                warn!(attempts, "Provisioning poll ceiling reached");
                return PollReport {
                    resolution: PollResolution::Failed(ProvisionError::CeilingExceeded),
                    attempts,
                };
            }

            let resp = match api.provisioning_status(device_id).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(error = %e, "Status endpoint unreachable, backing off");
                    tokio::time::sleep(self.interval * self.transport_backoff).await;
                    continue;
                }
            };
            attempts += 1;

            match classify(&resp) {
                PollTick::Ready(url) => {
                    info!(attempts, "Provisioning ready");
                    return PollReport {
                        resolution: PollResolution::Ready(url),
                        attempts,
                    };
                }
                PollTick::Processing => {
                    debug!(attempts, "Still provisioning");
                }
                PollTick::Retryable(e) if self.near_ceiling(attempts) => {
                    warn!(attempts, error = %e, "Retryable error near ceiling, escalating");
                    return PollReport {
                        resolution: PollResolution::Failed(e),
                        attempts,
                    };
                }
                PollTick::Retryable(e) => {
                    debug!(attempts, error = %e, "Transient provisioning error, retrying");
                }
                PollTick::Fatal(e) => {
                    warn!(attempts, error = %e, "Fatal provisioning error");
                    return PollReport {
                        resolution: PollResolution::Failed(e),
                        attempts,
                    };
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::api::{
        AckResponse, CreateProfileRequest, DeviceDetectedResponse, DeviceExistsResponse,
        PaymentAccountRequest, PaymentAccountResponse, RegisterDeviceRequest,
    };
    use crate::error::ApiError;

    use super::*;

    /// Stub api that serves a scripted sequence of status responses and
    /// repeats the final entry once the script runs out.
    struct ScriptedStatus {
        script: Mutex<VecDeque<Result<ProvisioningStatusResponse, ApiError>>>,
        last: Result<ProvisioningStatusResponse, ApiError>,
        polls: AtomicU32,
    }

    impl ScriptedStatus {
        fn new(script: Vec<Result<ProvisioningStatusResponse, ApiError>>) -> Self {
            let last = script
                .last()
                .cloned()
                .unwrap_or_else(|| Ok(processing()));
            Self {
                script: Mutex::new(script.into()),
                last,
                polls: AtomicU32::new(0),
            }
        }

        fn poll_count(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OnboardingApi for ScriptedStatus {
        async fn create_profile(
            &self,
            _req: &CreateProfileRequest,
        ) -> Result<AckResponse, ApiError> {
            unimplemented!("not used in poller tests")
        }
        async fn send_code(&self, _email: &str) -> Result<AckResponse, ApiError> {
            unimplemented!("not used in poller tests")
        }
        async fn check_code(&self, _email: &str, _code: &str) -> Result<AckResponse, ApiError> {
            unimplemented!("not used in poller tests")
        }
        async fn device_exists(&self, _serial: &str) -> Result<DeviceExistsResponse, ApiError> {
            unimplemented!("not used in poller tests")
        }
        async fn device_detected(&self, _serial: &str) -> Result<DeviceDetectedResponse, ApiError> {
            unimplemented!("not used in poller tests")
        }
        async fn register_device(
            &self,
            _req: &RegisterDeviceRequest,
        ) -> Result<AckResponse, ApiError> {
            unimplemented!("not used in poller tests")
        }
        async fn create_payment_account(
            &self,
            _req: &PaymentAccountRequest,
        ) -> Result<PaymentAccountResponse, ApiError> {
            unimplemented!("not used in poller tests")
        }
        async fn provisioning_status(
            &self,
            _device_id: &str,
        ) -> Result<ProvisioningStatusResponse, ApiError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.last.clone())
        }
    }

    fn processing() -> ProvisioningStatusResponse {
        ProvisioningStatusResponse {
            status: Some("processing".into()),
            ..Default::default()
        }
    }

    fn ready(url: &str) -> ProvisioningStatusResponse {
        ProvisioningStatusResponse {
            continuation_url: Some(url.into()),
            ..Default::default()
        }
    }

    fn status(s: &str) -> ProvisioningStatusResponse {
        ProvisioningStatusResponse {
            status: Some(s.into()),
            ..Default::default()
        }
    }

    fn fast_poller(ceiling: u32, window: u32) -> ProvisioningPoller {
        ProvisioningPoller::new(&OnboardingConfig {
            poll_interval: Duration::ZERO,
            poll_attempt_ceiling: ceiling,
            poll_escalation_window: window,
            ..Default::default()
        })
    }

    #[test]
    fn classify_all_shapes() {
        assert_eq!(
            classify(&ready("https://pay/x")),
            PollTick::Ready("https://pay/x".into())
        );
        assert_eq!(classify(&processing()), PollTick::Processing);
        assert_eq!(
            classify(&status("timeout_error")),
            PollTick::Retryable(ProvisionError::Timeout)
        );
        assert_eq!(
            classify(&status("network_error")),
            PollTick::Retryable(ProvisionError::Network)
        );
        assert!(matches!(
            classify(&status("creation_error")),
            PollTick::Retryable(ProvisionError::Creation(_))
        ));
        assert!(matches!(
            classify(&status("exploded")),
            PollTick::Fatal(ProvisionError::Malformed(_))
        ));
        let rejected = ProvisioningStatusResponse {
            error: Some("kyc refused".into()),
            ..Default::default()
        };
        assert!(matches!(
            classify(&rejected),
            PollTick::Fatal(ProvisionError::Rejected(_))
        ));
        assert!(matches!(
            classify(&ProvisioningStatusResponse::default()),
            PollTick::Fatal(ProvisionError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn resolves_ready_and_stops() {
        let api = ScriptedStatus::new(vec![
            Ok(processing()),
            Ok(processing()),
            Ok(ready("https://pay/x")),
        ]);
        let cancel = AtomicBool::new(false);
        let report = fast_poller(180, 10).run(&api, "uuid-1", &cancel).await;

        assert_eq!(
            report.resolution,
            PollResolution::Ready("https://pay/x".into())
        );
        assert_eq!(report.attempts, 3);
        // No poll after the terminal state.
        assert_eq!(api.poll_count(), 3);
    }

    #[tokio::test]
    async fn ceiling_is_exact() {
        let api = ScriptedStatus::new(vec![Ok(processing())]);
        let cancel = AtomicBool::new(false);
        let report = fast_poller(15, 5).run(&api, "uuid-1", &cancel).await;

        assert_eq!(
            report.resolution,
            PollResolution::Failed(ProvisionError::CeilingExceeded)
        );
        assert_eq!(report.attempts, 15);
        assert_eq!(api.poll_count(), 15);
    }

    #[tokio::test]
    async fn retryable_away_from_ceiling_keeps_polling() {
        let api = ScriptedStatus::new(vec![
            Ok(status("timeout_error")),
            Ok(status("network_error")),
            Ok(ready("https://pay/y")),
        ]);
        let cancel = AtomicBool::new(false);
        let report = fast_poller(180, 10).run(&api, "uuid-1", &cancel).await;

        assert_eq!(
            report.resolution,
            PollResolution::Ready("https://pay/y".into())
        );
        assert_eq!(report.attempts, 3);
    }

    #[tokio::test]
    async fn retryable_near_ceiling_escalates() {
        // Ceiling 5, window 5: every attempt is in the escalation window.
        let api = ScriptedStatus::new(vec![Ok(status("timeout_error"))]);
        let cancel = AtomicBool::new(false);
        let report = fast_poller(5, 5).run(&api, "uuid-1", &cancel).await;

        assert_eq!(
            report.resolution,
            PollResolution::Failed(ProvisionError::Timeout)
        );
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn fatal_rejection_stops_immediately() {
        let rejected = ProvisioningStatusResponse {
            error: Some("identity rejected".into()),
            ..Default::default()
        };
        let api = ScriptedStatus::new(vec![Ok(processing()), Ok(rejected)]);
        let cancel = AtomicBool::new(false);
        let report = fast_poller(180, 10).run(&api, "uuid-1", &cancel).await;

        match report.resolution {
            PollResolution::Failed(ProvisionError::Rejected(msg)) => {
                assert_eq!(msg, "identity rejected");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(api.poll_count(), 2);
    }

    #[tokio::test]
    async fn transport_errors_do_not_consume_budget() {
        let unreachable = ApiError::Http {
            endpoint: "/payments/account/status".into(),
            reason: "connection refused".into(),
        };
        let api = ScriptedStatus::new(vec![
            Err(unreachable.clone()),
            Err(unreachable),
            Ok(ready("https://pay/z")),
        ]);
        let cancel = AtomicBool::new(false);
        let report = fast_poller(180, 10).run(&api, "uuid-1", &cancel).await;

        assert_eq!(
            report.resolution,
            PollResolution::Ready("https://pay/z".into())
        );
        // Three calls went out, but only the one that answered counts.
        assert_eq!(report.attempts, 1);
        assert_eq!(api.poll_count(), 3);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let api = ScriptedStatus::new(vec![Ok(processing())]);
        let cancel = AtomicBool::new(true);
        let report = fast_poller(180, 10).run(&api, "uuid-1", &cancel).await;

        assert_eq!(report.resolution, PollResolution::Cancelled);
        assert_eq!(api.poll_count(), 0);
    }
}
