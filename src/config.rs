//! Configuration types.

use std::time::Duration;

/// Onboarding core configuration. The host application constructs this;
/// there is no file or environment loading here.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Base URL of the onboarding backend, without a trailing slash.
    pub base_url: String,
    /// Interval between provisioning status polls.
    pub poll_interval: Duration,
    /// Maximum number of status polls before giving up locally.
    pub poll_attempt_ceiling: u32,
    /// Retryable-class errors within this many attempts of the ceiling
    /// escalate to fatal instead of retrying.
    pub poll_escalation_window: u32,
    /// Backoff multiplier applied to the poll interval after a
    /// transport-level error calling the status endpoint.
    pub transport_backoff: u32,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            poll_interval: Duration::from_secs(1),
            poll_attempt_ceiling: 180, // ≈ 3 minutes at 1s
            poll_escalation_window: 10,
            transport_backoff: 2,
        }
    }
}
