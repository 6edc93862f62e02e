//! The step orchestrator — the top-level onboarding state machine.
//!
//! Owns the [`OnboardingSession`] exclusively: collaborators receive the
//! fields they need and return results; every state transition is applied
//! here, in order, so a step with several sequential side effects can
//! never leave the session partially mutated by someone else.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::account;
use crate::api::OnboardingApi;
use crate::config::OnboardingConfig;
use crate::device;
use crate::error::{AccountError, DeviceError};
use crate::navigator::{ClientPlatform, Handoff, HandoffStrategy};
use crate::payments::{PollResolution, ProvisionOutcome, ProvisioningPoller, provisioner};
use crate::session::{OnboardingSession, ProvisioningStatus, SongRequestChoice, Step};
use crate::validate;

/// Field-error key for errors that belong to the step rather than a
/// single input.
pub const FORM_ERROR: &str = "form";
/// Field-error key for provisioning failures on the KYC step.
pub const PROVISIONING_ERROR: &str = "provisioning";

/// Outcome of a user "Continue" action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Stayed on the current step; the session's error map says why.
    Stayed(Step),
    /// Advanced to the next step.
    Moved(Step),
    /// Provisioning resolved: one-way exit to hosted verification.
    Handoff(Handoff),
    /// A transition is already in flight; nothing was touched.
    Busy,
    /// The session was abandoned mid-step.
    Abandoned,
}

/// Drives the onboarding wizard: validation gate, ordered side effects,
/// and step transitions.
pub struct Orchestrator {
    api: Arc<dyn OnboardingApi>,
    config: OnboardingConfig,
    handoff_strategy: HandoffStrategy,
    session: OnboardingSession,
    cancel: Arc<AtomicBool>,
    in_flight: bool,
}

impl Orchestrator {
    /// Create an orchestrator for a fresh session. The navigation
    /// strategy is fixed here, once, from the platform probe.
    pub fn new(
        api: Arc<dyn OnboardingApi>,
        config: OnboardingConfig,
        platform: ClientPlatform,
    ) -> Self {
        Self {
            api,
            config,
            handoff_strategy: HandoffStrategy::for_platform(platform),
            session: OnboardingSession::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            in_flight: false,
        }
    }

    pub fn session(&self) -> &OnboardingSession {
        &self.session
    }

    pub fn current_step(&self) -> Step {
        self.session.current_step
    }

    /// Cancellation flag shared with any live poll loop. The host sets it
    /// (or calls [`abandon`](Self::abandon)) when the user navigates away.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Abandon the session: a live poller releases its timer and stops;
    /// the session is discarded, never resumed.
    pub fn abandon(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    // ── Field setters ───────────────────────────────────────────────
    //
    // All session writes go through here so the invalidation rules have
    // a single home.

    pub fn set_first_name(&mut self, value: &str) {
        self.session.profile.first_name = value.to_string();
        self.session.errors.remove("first_name");
    }

    pub fn set_last_name(&mut self, value: &str) {
        self.session.profile.last_name = value.to_string();
        self.session.errors.remove("last_name");
    }

    pub fn set_display_name(&mut self, value: &str) {
        self.session.profile.display_name = value.to_string();
        self.session.errors.remove("display_name");
    }

    pub fn set_phone(&mut self, value: &str) {
        self.session.profile.phone = value.to_string();
        self.session.errors.remove("phone");
    }

    pub fn set_bio(&mut self, value: &str) {
        self.session.profile.bio = value.to_string();
    }

    /// Changing the email after profile creation resets the
    /// `profile_created` guard: the account to verify has changed.
    pub fn set_email(&mut self, value: &str) {
        if self.session.profile.email != value {
            if self.session.profile_created {
                debug!("Email changed after profile creation; clearing guard");
                self.session.profile_created = false;
            }
            self.session.email_verified = false;
        }
        self.session.profile.email = value.to_string();
        self.session.errors.remove("email");
    }

    pub fn set_password(&mut self, value: &str) {
        self.session.credentials.password = value.to_string().into();
        self.session.errors.remove("password");
    }

    pub fn set_confirmation(&mut self, value: &str) {
        self.session.credentials.confirmation = value.to_string().into();
        self.session.errors.remove("confirmation");
    }

    pub fn set_verification_code(&mut self, value: &str) {
        self.session.verification_code = value.to_string();
        self.session.errors.remove("verification_code");
    }

    /// Changing the serial number invalidates the cached device
    /// validation immediately: a stale validation must never authorize a
    /// bind for a different identifier.
    pub fn set_serial_number(&mut self, value: &str) {
        if self.session.device.serial_number != value {
            self.session.validated_device = None;
        }
        self.session.device.serial_number = value.to_string();
        self.session.errors.remove("serial_number");
    }

    pub fn set_nickname(&mut self, value: &str) {
        self.session.device.nickname = value.to_string();
    }

    pub fn set_song_request(&mut self, choice: SongRequestChoice) {
        self.session.device.allow_song_request = choice;
        self.session.errors.remove("allow_song_request");
    }

    // ── Blur-time early feedback ────────────────────────────────────

    /// Detection + ownership check for the serial field, run on blur for
    /// early feedback. Network failures surface as a field-level error
    /// string, never as an abort. A positive detection is cached.
    pub async fn validate_serial_number(&mut self) -> bool {
        let serial = self.session.device.serial_number.trim().to_string();
        if serial.is_empty() {
            self.session
                .errors
                .insert("serial_number".into(), "Serial number is required".into());
            return false;
        }

        match device::check_detected(self.api.as_ref(), &serial).await {
            Ok(validated) => {
                self.session.validated_device = Some(validated);
            }
            Err(e) => {
                self.session.errors.insert("serial_number".into(), e.to_string());
                return false;
            }
        }

        if let Err(e) = device::check_not_owned(self.api.as_ref(), &serial).await {
            self.session.errors.insert("serial_number".into(), e.to_string());
            return false;
        }

        self.session.errors.remove("serial_number");
        true
    }

    /// Re-send the verification code. Re-enters the same branch as the
    /// Password step's side effect; the `profile_created` guard keeps the
    /// profile create from firing twice.
    pub async fn resend_code(&mut self) -> bool {
        self.ensure_profile_and_send_code().await.is_ok()
    }

    // ── Step transitions ────────────────────────────────────────────

    /// The user pressed "Continue". Runs the validation gate for the
    /// current step, then the step's side effects strictly in order,
    /// then the transition. At most one transition is in flight per
    /// session; re-entrant calls return [`Advance::Busy`] untouched.
    pub async fn advance(&mut self) -> Advance {
        if self.in_flight {
            return Advance::Busy;
        }
        self.in_flight = true;
        let outcome = self.advance_inner().await;
        self.in_flight = false;
        outcome
    }

    async fn advance_inner(&mut self) -> Advance {
        let step = self.session.current_step;
        match step {
            Step::PersonalInfo => {
                let errors = validate::personal_info(&self.session.profile);
                if !errors.is_empty() {
                    self.session.errors = errors;
                    return Advance::Stayed(step);
                }
                self.move_on(step)
            }
            Step::Password => {
                let errors = validate::password(&self.session.credentials);
                if !errors.is_empty() {
                    self.session.errors = errors;
                    return Advance::Stayed(step);
                }
                if self.ensure_profile_and_send_code().await.is_err() {
                    return Advance::Stayed(step);
                }
                self.move_on(step)
            }
            Step::EmailVerification => {
                let errors = validate::verification_code(&self.session.verification_code);
                if !errors.is_empty() {
                    self.session.errors = errors;
                    return Advance::Stayed(step);
                }
                let email = self.session.profile.email.clone();
                let code = self.session.verification_code.clone();
                match account::check_code(self.api.as_ref(), &email, &code).await {
                    Ok(()) => {
                        self.session.email_verified = true;
                        self.move_on(step)
                    }
                    Err(e) => {
                        let message = match e {
                            AccountError::Rejected(msg) => msg,
                            other => other.to_string(),
                        };
                        self.session
                            .errors
                            .insert("verification_code".into(), message);
                        Advance::Stayed(step)
                    }
                }
            }
            Step::DeviceSetup => {
                let errors = validate::device(&self.session.device);
                if !errors.is_empty() {
                    self.session.errors = errors;
                    return Advance::Stayed(step);
                }
                match device::bind(
                    self.api.as_ref(),
                    &self.session.device,
                    &self.session.profile,
                    self.session.validated_device.as_ref(),
                )
                .await
                {
                    Ok(validated) => {
                        self.session.validated_device = Some(validated);
                        self.move_on(step)
                    }
                    Err(e) => {
                        let key = match &e {
                            DeviceError::SongChoiceRequired => "allow_song_request",
                            _ => "serial_number",
                        };
                        self.session.errors.insert(key.into(), e.to_string());
                        Advance::Stayed(step)
                    }
                }
            }
            Step::KycVerification => self.run_kyc().await,
            Step::Complete => Advance::Stayed(step),
        }
    }

    /// "Back": move to the immediately prior step, clear step-local
    /// errors, re-run nothing. Disabled on the first step and once the
    /// flow has completed.
    pub fn back(&mut self) -> Option<Step> {
        if self.in_flight || self.session.current_step.is_terminal() {
            return None;
        }
        let prev = self.session.current_step.prev()?;
        self.session.errors.clear();
        self.session.current_step = prev;
        debug!(step = %prev, "Stepped back");
        Some(prev)
    }

    /// Explicit retry after a fatal provisioning failure: restarts the
    /// KYC step from the Payment Account Provisioner. Earlier steps are
    /// never reverted.
    pub async fn retry_provisioning(&mut self) -> Advance {
        if self.session.current_step != Step::KycVerification {
            return Advance::Stayed(self.session.current_step);
        }
        self.session.provisioning = Default::default();
        self.session.errors.remove(PROVISIONING_ERROR);
        self.advance().await
    }

    // ── Step side effects ───────────────────────────────────────────

    /// Password-step side effect, also re-entered by code resend: create
    /// the profile unless already created, then send the code. Errors
    /// land in the session's error map.
    async fn ensure_profile_and_send_code(&mut self) -> Result<(), ()> {
        if !self.session.profile_created {
            match account::create_profile(
                self.api.as_ref(),
                &self.session.profile,
                &self.session.credentials,
            )
            .await
            {
                Ok(()) => {
                    self.session.profile_created = true;
                }
                Err(AccountError::EmailInUse { email }) => {
                    self.session.errors.insert(
                        "email".into(),
                        format!("An account already exists for {email}"),
                    );
                    return Err(());
                }
                Err(e) => {
                    self.session.errors.insert(FORM_ERROR.into(), e.to_string());
                    return Err(());
                }
            }
        }

        let email = self.session.profile.email.clone();
        if let Err(e) = account::send_code(self.api.as_ref(), &email).await {
            self.session.errors.insert(FORM_ERROR.into(), e.to_string());
            return Err(());
        }
        Ok(())
    }

    /// KYC-step side effects: identity pre-validation, payment-account
    /// creation, the bounded poll when deferred, and the handoff plan.
    async fn run_kyc(&mut self) -> Advance {
        let step = Step::KycVerification;

        // A completed provisioning round never re-polls.
        if self.session.provisioning.status == ProvisioningStatus::Ready {
            if let Some(url) = self.session.provisioning.continuation_url.clone() {
                return self.complete_with_handoff(url);
            }
        }

        let errors = validate::kyc_identity(
            &self.session.device.serial_number,
            &self.session.profile,
        );
        if !errors.is_empty() {
            self.session.errors = errors;
            return Advance::Stayed(step);
        }

        let device_id = match self.device_identifier().await {
            Ok(id) => id,
            Err(e) => {
                self.session.errors.insert("serial_number".into(), e.to_string());
                return Advance::Stayed(step);
            }
        };

        self.session.provisioning.status = ProvisioningStatus::Requesting;
        match provisioner::request_account(self.api.as_ref(), &device_id, &self.session.profile)
            .await
        {
            Ok(ProvisionOutcome::Ready(url)) => {
                self.session.provisioning.resolve_ready(url.clone());
                self.complete_with_handoff(url)
            }
            Ok(ProvisionOutcome::Deferred) => {
                self.session.provisioning.status = ProvisioningStatus::Processing;
                info!("Provisioning deferred; starting status polls");
                let poller = ProvisioningPoller::new(&self.config);
                let report = poller.run(self.api.as_ref(), &device_id, &self.cancel).await;
                self.session.provisioning.attempt_count = report.attempts;
                match report.resolution {
                    PollResolution::Ready(url) => {
                        self.session.provisioning.resolve_ready(url.clone());
                        self.complete_with_handoff(url)
                    }
                    PollResolution::Failed(e) => {
                        warn!(error = %e, "Provisioning failed");
                        self.session.provisioning.resolve_failed(e.to_string());
                        self.session
                            .errors
                            .insert(PROVISIONING_ERROR.into(), e.to_string());
                        Advance::Stayed(step)
                    }
                    PollResolution::Cancelled => Advance::Abandoned,
                }
            }
            Err(e) => {
                self.session.provisioning.resolve_failed(e.to_string());
                self.session
                    .errors
                    .insert(PROVISIONING_ERROR.into(), e.to_string());
                Advance::Stayed(step)
            }
        }
    }

    /// The canonical device identifier for payment provisioning, from
    /// the validation cache or a fresh detection check.
    async fn device_identifier(&mut self) -> Result<String, DeviceError> {
        let serial = self.session.device.serial_number.trim().to_string();
        let validated = device::ensure_validated(
            self.api.as_ref(),
            &serial,
            self.session.validated_device.as_ref(),
        )
        .await?;
        let id = validated.canonical_uuid.clone();
        self.session.validated_device = Some(validated);
        Ok(id)
    }

    fn move_on(&mut self, from: Step) -> Advance {
        self.session.errors.clear();
        // Every non-terminal step has a successor.
        let next = from.next().unwrap_or(Step::Complete);
        self.session.current_step = next;
        info!(from = %from, to = %next, "Step advanced");
        Advance::Moved(next)
    }

    fn complete_with_handoff(&mut self, url: String) -> Advance {
        self.session.errors.clear();
        self.session.current_step = Step::Complete;
        Advance::Handoff(Handoff::plan(self.handoff_strategy, url))
    }
}
