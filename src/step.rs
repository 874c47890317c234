//! Timed step tree
//!
//! A [`StepNode`] is one named span inside a session. Children are stored in
//! the order they started, which is also their temporal order. The parent of
//! a node is not stored on the node: while a tree is being built the
//! recording context keeps the open ancestors on a stack, and a finished node
//! is moved into its parent's `children`.

use std::sync::Arc;

/// One timed step and the sub-steps it contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepNode {
    session: Arc<str>,
    name: String,
    start_ms: u64,
    end_ms: Option<u64>,
    children: Vec<StepNode>,
}

impl StepNode {
    /// Create an open step started at `start_ms`
    pub fn new(session: Arc<str>, name: impl Into<String>, start_ms: u64) -> Self {
        Self {
            session,
            name: name.into(),
            start_ms,
            end_ms: None,
            children: Vec::new(),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    /// End timestamp, `None` while the step is still open
    pub fn end_ms(&self) -> Option<u64> {
        self.end_ms
    }

    pub fn children(&self) -> &[StepNode] {
        &self.children
    }

    pub fn is_open(&self) -> bool {
        self.end_ms.is_none()
    }

    /// Close the step at `end_ms`
    pub fn finish(&mut self, end_ms: u64) {
        self.end_ms = Some(end_ms);
    }

    /// Append a child as the latest sub-step
    pub fn push_child(&mut self, child: StepNode) {
        self.children.push(child);
    }

    /// Total time spent in the step (0 while open or if the clock went backwards)
    pub fn duration_ms(&self) -> u64 {
        self.end_ms
            .map(|end| end.saturating_sub(self.start_ms))
            .unwrap_or(0)
    }

    /// Sum of the direct children's durations
    pub fn children_duration_ms(&self) -> u64 {
        self.children.iter().map(StepNode::duration_ms).sum()
    }

    /// Time attributed to the step's own code, excluding direct children
    ///
    /// Clamped at 0 when the children add up to more than the step itself.
    pub fn self_duration_ms(&self) -> u64 {
        self.duration_ms()
            .saturating_sub(self.children_duration_ms())
    }

    /// Number of nodes in the subtree rooted here
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Nodes of the subtree whose direct children outlast them
    pub fn overrun_steps(&self) -> Vec<&StepNode> {
        let mut overrun = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.children_duration_ms() > node.duration_ms() {
                overrun.push(node);
            }
            stack.extend(node.children.iter());
        }
        overrun
    }

    /// True if this node and every descendant has an end timestamp
    pub fn is_complete(&self) -> bool {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.is_open() {
                return false;
            }
            stack.extend(node.children.iter());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, start: u64, end: u64) -> StepNode {
        let mut n = StepNode::new(Arc::from("S"), name, start);
        n.finish(end);
        n
    }

    #[test]
    fn test_open_node_has_zero_duration() {
        let n = StepNode::new(Arc::from("S"), "open", 100);
        assert!(n.is_open());
        assert_eq!(n.duration_ms(), 0);
        assert!(!n.is_complete());
    }

    #[test]
    fn test_self_duration_excludes_children() {
        let mut outer = node("outer", 0, 500);
        outer.push_child(node("inner", 100, 150));
        outer.push_child(node("tail", 200, 260));

        assert_eq!(outer.duration_ms(), 500);
        assert_eq!(outer.children_duration_ms(), 110);
        assert_eq!(outer.self_duration_ms(), 390);
        assert_eq!(outer.node_count(), 3);
        assert!(outer.is_complete());
    }

    #[test]
    fn test_self_duration_only_counts_direct_children() {
        let mut child = node("child", 10, 90);
        child.push_child(node("grandchild", 20, 80));
        let mut root = node("root", 0, 100);
        root.push_child(child);

        assert_eq!(root.self_duration_ms(), 20);
        assert_eq!(root.children()[0].self_duration_ms(), 20);
    }

    #[test]
    fn test_backwards_clock_saturates() {
        let n = node("skewed", 500, 400);
        assert_eq!(n.duration_ms(), 0);
        assert_eq!(n.self_duration_ms(), 0);
    }

    #[test]
    fn test_overlapping_children_clamp_self_duration() {
        let mut parent = node("parent", 0, 100);
        parent.push_child(node("a", 0, 80));
        parent.push_child(node("b", 0, 80));
        assert_eq!(parent.self_duration_ms(), 0);

        let overrun: Vec<_> = parent.overrun_steps().into_iter().map(StepNode::name).collect();
        assert_eq!(overrun, vec!["parent"]);
    }

    #[test]
    fn test_well_nested_tree_has_no_overrun() {
        let mut outer = node("outer", 0, 500);
        outer.push_child(node("inner", 100, 150));
        assert!(outer.overrun_steps().is_empty());
    }
}
