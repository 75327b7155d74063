//! Node graph used by every audio path in the client.
//!
//! - [`Node`] - a processing unit (filter chain, gain, ...)
//! - [`Pushable`] / [`Pullable`] - object-safe endpoints of a graph
//! - [`GraphNode`] - wraps a [`Node`] so it can be wired at runtime
//!
//! Participant audio is pulled: the output device asks the mixer for a block,
//! the mixer pulls each wet track, and each wet track pulls its dry source.

pub mod dyn_traits;
pub mod graph_node;
pub mod traits;

pub use dyn_traits::{Pullable, Pushable};
pub use graph_node::GraphNode;
pub use traits::Node;
