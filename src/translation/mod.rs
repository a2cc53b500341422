//! Source to target identifier translation.

pub mod artifacts;
pub mod context;
pub mod naming;
pub mod translator;

pub use artifacts::{ArtifactRule, ArtifactTable};
pub use context::TenantContext;
pub use naming::{CharClass, NamingRule, global_rule};
pub use translator::NameTranslator;
