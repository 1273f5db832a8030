//! Proportional distribution engine
//!
//! Given a token balance and a set of fractional shares, this component
//! computes integer transfer amounts that sum exactly to the distributed
//! balance, assembles them into a single all-or-nothing transaction, and
//! submits it with a bounded retry policy.
//!
//! The engine is split into focused modules:
//! - **errors**: error taxonomy with retryable/fatal classification
//! - **shares**: recipient share sets and exact-decimal validation
//! - **allocator**: integer minor-unit allocation with anchor residual
//! - **provisioning**: per-recipient token-account existence checks
//! - **builder**: pure transaction construction (no network access)
//! - **submit**: fixed-delay bounded retry submission
//! - **engine**: orchestration and the skip/complete outcome type
//!
//! State machine for one attempt:
//! `VALIDATING -> ALLOCATING -> (SKIPPED | BUILDING) -> SUBMITTING ->
//! (SUCCEEDED | FAILED)`. Only SUBMITTING loops, on its own retry bound.

pub mod errors;
pub use errors::DistributionError;

pub mod allocator;
pub mod builder;
pub mod engine;
pub mod provisioning;
pub mod shares;
pub mod submit;

pub use allocator::{allocate, Allocation};
pub use engine::{DistributionOutcome, DistributionRequest, Distributor};
pub use provisioning::TransferStep;
pub use shares::{validate_shares, Recipient};
pub use submit::RetryPolicy;
