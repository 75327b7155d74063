//! Core pipeline trait.
//!
//! For the graph endpoints see [`Pushable`](super::Pushable) and
//! [`Pullable`](super::Pullable).

/// A processing node that transforms input to output.
///
/// Nodes hold their parameters behind shared handles and their running state
/// (filter memories, oversampling history) behind interior mutability, so a
/// node can be processed through `&self` from the audio thread while a
/// control handle adjusts it from elsewhere.
///
/// Wrap a `Node` in [`GraphNode`](super::GraphNode) to connect it to other
/// nodes.
pub trait Node: Send + Sync {
    type Input;
    type Output;

    /// Process one block.
    ///
    /// Returns `None` when the node has nothing to emit for this block.
    fn process(&self, input: Self::Input) -> Option<Self::Output>;
}
