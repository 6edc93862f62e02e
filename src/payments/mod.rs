//! Payment-processor sub-account provisioning.
//!
//! Creation is asynchronous on the backend side: the create call either
//! returns a continuation URL immediately or defers with a "processing"
//! token, in which case the bounded [`poller`] tracks it to resolution.

pub mod poller;
pub mod provisioner;

pub use poller::{PollReport, PollResolution, PollTick, ProvisioningPoller};
pub use provisioner::{request_account, ProvisionOutcome};
