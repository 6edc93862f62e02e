//! Tipflow — performer onboarding orchestration core.
//!
//! Sequences the onboarding wizard of a tipping platform: identity
//! collection, account creation, email verification, device binding, and
//! payment-processor sub-account provisioning (with bounded status
//! polling), plus the platform-aware handoff to hosted KYC verification.
//! Rendering, song-catalog management, and the backend internals live in
//! the surrounding application.

pub mod account;
pub mod api;
pub mod config;
pub mod device;
pub mod error;
pub mod navigator;
pub mod orchestrator;
pub mod payments;
pub mod session;
pub mod validate;
