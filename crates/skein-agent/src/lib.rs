//! The programs built on the pipeline executor: email triage, the
//! tool-calling gala assistant, and the first-finished race used by chat.

pub mod assistant;
pub mod monitor;
pub mod triage;

pub use assistant::{Answer, Assistant, AssistantRoute};
pub use monitor::{race, race_op, RaceOp, ResourceMonitor, ResourceSample};
pub use triage::{build_triage_pipeline, Email, EmailRoute, EmailState, TriageDeps};
