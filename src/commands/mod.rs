pub mod abstraction;
pub mod layer;
pub mod reconcile;
pub mod scan;
pub mod seed;
pub mod workspace;

pub use abstraction::AbstractCommand;
pub use layer::LayerCommand;
pub use reconcile::{ReconcileArgs, ReconcileCommand};
pub use scan::ScanCommand;
pub use seed::SeedCommand;
pub use workspace::{GlobalOptions, ScanArgs};
