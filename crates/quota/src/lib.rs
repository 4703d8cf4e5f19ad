//! Usage quota enforcement for DealDesk tenants.
//!
//! Every assistant turn is metered in fractional credits. A tenant has a
//! monthly base allowance (or none, for unlimited plans) plus extra credits,
//! and the counters roll over when the calendar month changes.
//!
//! The governor is an admission gate: `check` runs before any retrieval or
//! model work, `commit` runs only after the model call succeeded.

pub mod governor;

pub use governor::QuotaGovernor;
