//! Target tenant enumeration and existence validation.

pub mod api;
pub mod arm;
pub mod file;
pub mod inventory;
pub mod retry;
#[allow(clippy::module_inception)]
pub mod scanner;

pub use api::{ApiError, TargetApi};
pub use arm::{ACCESS_TOKEN_ENV, ArmClient};
pub use file::FileTargetApi;
pub use inventory::ValidatedInventory;
pub use retry::RetryPolicy;
pub use scanner::{ScanOptions, ScanOutcome, ScanReport, TargetScanner};
