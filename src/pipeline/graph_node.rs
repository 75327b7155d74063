//! Runtime-wirable wrapper around a [`Node`].
//!
//! ```ignore
//! let chain = Arc::new(GraphNode::new(RadioChain::new(params.clone())));
//! chain.set_input(dry_stream.clone());
//! let block = chain.pull(480);   // dry -> radio chain
//! chain.clear_input();          // disconnect the tap on teardown
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use super::dyn_traits::{Pullable, Pushable};
use super::traits::Node;

pub type OutputId = u64;

/// Wraps a [`Node`] to implement [`Pushable`] and [`Pullable`].
///
/// - outputs (`DashMap`): where processed blocks go on push
/// - input (`RwLock`): where blocks come from on pull
///
/// A node without an input yields `None` on every pull, which is how a torn
/// down effect stops consuming its source.
pub struct GraphNode<N: Node> {
    node: N,
    outputs: DashMap<OutputId, Arc<dyn Pushable<N::Output>>>,
    input: RwLock<Option<Arc<dyn Pullable<N::Input>>>>,
    next_output_id: AtomicU64,
}

impl<N: Node> GraphNode<N> {
    pub fn new(node: N) -> Self {
        Self {
            node,
            outputs: DashMap::new(),
            input: RwLock::new(None),
            next_output_id: AtomicU64::new(0),
        }
    }

    pub fn add_output(&self, dest: Arc<dyn Pushable<N::Output>>) -> OutputId {
        let id = self.next_output_id.fetch_add(1, Ordering::Relaxed);
        self.outputs.insert(id, dest);
        id
    }

    pub fn remove_output(&self, id: OutputId) -> Option<Arc<dyn Pushable<N::Output>>> {
        self.outputs.remove(&id).map(|(_, v)| v)
    }

    pub fn set_input(&self, source: Arc<dyn Pullable<N::Input>>) {
        let mut input = self.input.write().unwrap();
        *input = Some(source);
    }

    pub fn clear_input(&self) {
        let mut input = self.input.write().unwrap();
        *input = None;
    }

    pub fn has_input(&self) -> bool {
        self.input.read().unwrap().is_some()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

impl<N: Node> Pushable<N::Input> for GraphNode<N>
where
    N::Output: Clone,
{
    fn push(&self, input: N::Input) {
        if let Some(output) = self.node.process(input) {
            for entry in self.outputs.iter() {
                entry.value().push(output.clone());
            }
        }
    }
}

impl<N: Node> Pullable<N::Output> for GraphNode<N> {
    fn pull(&self, len: usize) -> Option<N::Output> {
        let input_source = self.input.read().unwrap();
        let input = input_source.as_ref()?.pull(len)?;
        self.node.process(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Double;

    impl Node for Double {
        type Input = i32;
        type Output = i32;

        fn process(&self, input: i32) -> Option<i32> {
            Some(input * 2)
        }
    }

    struct Constant(i32);

    impl Pullable<i32> for Constant {
        fn pull(&self, _len: usize) -> Option<i32> {
            Some(self.0)
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<i32>>);

    impl Pushable<i32> for Collect {
        fn push(&self, input: i32) {
            self.0.lock().unwrap().push(input);
        }
    }

    #[test]
    fn test_pull_without_input_yields_nothing() {
        let node = GraphNode::new(Double);
        assert!(!node.has_input());
        assert_eq!(node.pull(1), None);

        node.set_input(Arc::new(Constant(21)));
        assert_eq!(node.pull(1), Some(42));

        node.clear_input();
        assert_eq!(node.pull(1), None);
    }

    #[test]
    fn test_push_fans_out_to_all_outputs() {
        let node = GraphNode::new(Double);
        let a = Arc::new(Collect::default());
        let b = Arc::new(Collect::default());
        node.add_output(a.clone());
        let id = node.add_output(b.clone());

        node.push(1);
        node.remove_output(id);
        node.push(2);

        assert_eq!(*a.0.lock().unwrap(), vec![2, 4]);
        assert_eq!(*b.0.lock().unwrap(), vec![2]);
        assert_eq!(node.output_count(), 1);
    }

    #[test]
    fn test_pull_chain_macro_wires_in_order() {
        let source: Arc<dyn Pullable<i32>> = Arc::new(Constant(3));
        let chain = crate::pull_chain![source =>, Double, Double];
        assert_eq!(chain.pull(1), Some(12));
    }

    #[test]
    fn test_push_chain_macro_ends_in_sink() {
        let sink = Arc::new(Collect::default());
        let chain = crate::push_chain![Double, Double, => sink.clone()];
        chain.push(5);
        assert_eq!(*sink.0.lock().unwrap(), vec![20]);
    }
}
