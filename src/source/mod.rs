//! Resource model and discovery export ingestion.

pub mod export;
pub mod resource;

pub use export::{ExportDocument, ExportedResource};
pub use resource::{
    AbstractedResource, OriginalResource, PropertyBag, TargetInventoryEntry, resource_group,
    resource_name, same_type,
};
