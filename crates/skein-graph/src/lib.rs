//! Pipeline executor: named steps connected by directed edges.
//!
//! A pipeline is a set of `Node`s, each holding an async handler that reads
//! the shared state and returns a partial update. Edges are either
//! unconditional or conditional: a conditional edge calls a routing
//! function against the current state and looks the returned label up in a
//! dispatch table.
//!
//! Topology is fixed by `PipelineBuilder::build`, which validates it once.
//! A built `Pipeline` is then invoked many times, each invocation owning a
//! fresh state that is merged into after every node.

pub mod builder;
pub mod edge;
pub mod executor;
pub mod node;
pub mod state;

pub use builder::PipelineBuilder;
pub use edge::{RouteLabel, END};
pub use executor::{NodeRecord, Pipeline, RunReport};
pub use node::{node_async, node_fn, NodeHandler};
pub use state::{PipelineState, State};
