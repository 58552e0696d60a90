pub mod builtin;
pub mod guests;
pub mod registry;

pub use guests::{Guest, GuestIndex};
pub use registry::ToolRegistry;
