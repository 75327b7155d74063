//! Object-safe graph endpoints.
//!
//! - [`Pushable<T>`] - accepts blocks handed to it (track feeds, sinks)
//! - [`Pullable<T>`] - produces a block on request (tracks, effect chains, mixers)
//!
//! Use [`push_chain!`] and [`pull_chain!`] to wire nodes together:
//!
//! ```ignore
//! // Pull chain: the output device pulls, data flows source -> nodes.
//! let wet = pull_chain![
//!     dry_stream.clone() =>,
//!     RadioChain::new(params.clone()),
//!     Gain::new(volume.clone())
//! ];
//! let block = wet.pull(480);
//! ```

use std::sync::Arc;

/// Receives pushed blocks.
///
/// A [`GraphNode`](super::GraphNode) processes and forwards them; a track feed
/// queues them for whoever pulls the track.
pub trait Pushable<T>: Send + Sync {
    fn push(&self, input: T);
}

/// Produces a block when pulled.
///
/// `len` is the number of interleaved samples requested. Implementations may
/// return fewer, or `None` when they have nothing at all.
pub trait Pullable<T>: Send + Sync {
    fn pull(&self, len: usize) -> Option<T>;
}

impl<T: Send + Sync> Pushable<T> for Arc<dyn Pushable<T>> {
    fn push(&self, input: T) {
        (**self).push(input)
    }
}

impl<T: Send + Sync> Pullable<T> for Arc<dyn Pullable<T>> {
    fn pull(&self, len: usize) -> Option<T> {
        (**self).pull(len)
    }
}

/// Creates a push chain from nodes, connecting them via `GraphNode` wrappers.
/// Returns an `Arc<dyn Pushable<FirstNode::Input>>` pointing to the first node.
///
/// ```ignore
/// push_chain![node1, node2, ..., => sink]
/// ```
///
/// Data flows: input -> node1 -> node2 -> ... -> sink
#[macro_export]
macro_rules! push_chain {
    (=> $sink:expr) => {{
        let sink: std::sync::Arc<dyn $crate::pipeline::Pushable<_>> = $sink;
        sink
    }};

    ($node:expr, $($rest:tt)+) => {{
        let node = std::sync::Arc::new($crate::pipeline::GraphNode::new($node));
        let rest = $crate::push_chain!($($rest)+);
        node.add_output(rest);
        node as std::sync::Arc<dyn $crate::pipeline::Pushable<_>>
    }};
}

/// Creates a pull chain from a source through nodes, connecting them via
/// `GraphNode` wrappers. Returns an `Arc<dyn Pullable<LastNode::Output>>`
/// pointing to the last node.
///
/// ```ignore
/// pull_chain![source =>, node1, node2, ...]
/// ```
///
/// Data flows: source -> node1 -> node2 -> ... -> output
#[macro_export]
macro_rules! pull_chain {
    ($source:expr =>) => {{
        let source: std::sync::Arc<dyn $crate::pipeline::Pullable<_>> = $source;
        source
    }};

    ($source:expr =>, $node:expr $(, $($rest:tt)*)?) => {{
        let source: std::sync::Arc<dyn $crate::pipeline::Pullable<_>> = $source;
        let node = std::sync::Arc::new($crate::pipeline::GraphNode::new($node));
        node.set_input(source);
        $crate::pull_chain!(node as std::sync::Arc<dyn $crate::pipeline::Pullable<_>> => $(, $($rest)*)?)
    }};

    ($wrapped:expr => $(, $node:expr $(, $($rest:tt)*)?)?) => {{
        $(
            let next = std::sync::Arc::new($crate::pipeline::GraphNode::new($node));
            next.set_input($wrapped);
            $crate::pull_chain!(next as std::sync::Arc<dyn $crate::pipeline::Pullable<_>> => $(, $($rest)*)?)
        )?
        $wrapped
    }};
}
