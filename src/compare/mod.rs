//! Classification of source resources against the validated target inventory.

pub mod comparator;
pub mod diff;
pub mod record;
pub mod summary;

pub use comparator::{Classification, ClassificationFailure, CompareOptions, ResourceComparator};
pub use diff::{ChangeKind, DiffOptions, PropertyChange, diff_properties};
pub use record::{ClassificationRecord, ClassificationState, Confidence};
pub use summary::{DEFAULT_SUSPICION_THRESHOLD, ReconciliationSummary};
