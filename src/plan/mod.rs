//! Import plan handed to infrastructure code emitters.

pub mod emitter;
pub mod sink;

pub use emitter::{ImportAction, ImportPlan, ImportPlanEmitter, PlanEntry};
pub use sink::{FilePlanSink, PlanFormat, PlanSink};
