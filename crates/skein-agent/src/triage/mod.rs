//! Email triage: classify incoming mail as spam or legitimate and draft a
//! reply for the legitimate ones.

pub mod classifier;
pub mod pipeline;
pub mod prompts;
pub mod state;

pub use classifier::{Classifier, KeywordClassifier, Verdict, KNOWN_CATEGORIES};
pub use pipeline::{build_triage_pipeline, route_email, EmailRoute, TriageDeps};
pub use prompts::{example_email, Persona};
pub use state::{Email, EmailState, EmailUpdate, LoggedMessage};
