//! Deterministic identity abstraction.
//!
//! Real identifiers are replaced by `<type-prefix>-<hash8>` where the hash is
//! an HMAC-SHA256 keyed with the tenant's seed. The mapping is reproducible
//! from the seed, the original id and the collision table alone.

pub mod abstractor;
pub mod prefix;
pub mod redact;
pub mod seed;

pub use abstractor::{CollisionTable, IdentityAbstractor, abstract_id, keyed_hex};
pub use prefix::type_prefix;
pub use redact::{REDACTED, is_redacted, redact_properties};
pub use seed::{SeedStore, TenantSeed};
