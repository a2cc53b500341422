//! Emission order for generated infrastructure code.
//!
//! A fixed table ranks each resource type; lower ranks are emitted first so
//! referenced resources precede the resources that reference them.

pub mod ordering;
pub mod table;

pub use ordering::{TierViolation, TieredRecord, order_for_emission, tier_violations};
pub use table::{MAX_TIER, assign_tier};
