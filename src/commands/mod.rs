pub mod chat;
pub mod gala;
pub mod triage;
