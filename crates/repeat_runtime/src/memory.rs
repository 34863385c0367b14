//! In-memory retained list.
//!
//! A complete [`ViewHost`] over a plain vector of nodes. Useful for headless
//! rendering and as the reference container in tests.
//!
//! Node lookups start at the position of the previous lookup, so walking the
//! container front to back costs constant time per step. Moving a node still
//! shifts the vector, which is linear in its length.

use crate::host::{Cursor, Position, ViewHost, ViewNode};
use repeat_core::ViewContext;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

struct NodeData<T> {
    serial: u64,
    context: ViewContext<T>,
    visible: Cell<bool>,
}

/// Node handle of a [`MemoryHost`]
pub struct MemoryNode<T> {
    data: Rc<NodeData<T>>,
}

impl<T> MemoryNode<T> {
    /// Serial number assigned at materialization
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.data.serial
    }

    /// Check if the node is shown
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.data.visible.get()
    }
}

impl<T> Clone for MemoryNode<T> {
    fn clone(&self) -> Self {
        Self {
            data: Rc::clone(&self.data),
        }
    }
}

impl<T> PartialEq for MemoryNode<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl<T> Eq for MemoryNode<T> {}

impl<T> fmt::Debug for MemoryNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryNode#{}", self.data.serial)
    }
}

impl<T> ViewNode<T> for MemoryNode<T> {
    fn context(&self) -> &ViewContext<T> {
        &self.data.context
    }
}

/// Vector-backed container of rendered nodes
pub struct MemoryHost<T> {
    children: Vec<MemoryNode<T>>,
    hint: Cell<usize>,
    next_serial: u64,
    materialized: u64,
    disposed: u64,
}

impl<T> MemoryHost<T> {
    /// Create an empty container
    #[must_use]
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            hint: Cell::new(0),
            next_serial: 0,
            materialized: 0,
            disposed: 0,
        }
    }

    /// Attached nodes in container order, hidden ones included
    #[must_use]
    pub fn nodes(&self) -> &[MemoryNode<T>] {
        &self.children
    }

    /// Attached, visible nodes in container order
    pub fn visible_nodes(&self) -> impl Iterator<Item = &MemoryNode<T>> {
        self.children.iter().filter(|node| node.is_visible())
    }

    /// Number of attached nodes
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.children.len()
    }

    /// Total nodes built so far
    #[must_use]
    pub fn materialized_count(&self) -> u64 {
        self.materialized
    }

    /// Total nodes released so far
    #[must_use]
    pub fn disposed_count(&self) -> u64 {
        self.disposed
    }

    /// Container index of `node`
    #[must_use]
    pub fn position_of(&self, node: &MemoryNode<T>) -> Option<usize> {
        let hint = self.hint.get();
        let mut near = hint.saturating_sub(1)..self.children.len().min(hint + 2);
        let found = near
            .find(|&index| self.children[index] == *node)
            .or_else(|| self.children.iter().position(|child| child == node));
        if let Some(index) = found {
            self.hint.set(index);
        }
        found
    }

    /// Remove `node` behind the synchronizer's back
    ///
    /// Models an external mutation of the container. Returns whether the node
    /// was attached.
    pub fn detach(&mut self, node: &MemoryNode<T>) -> bool {
        match self.position_of(node) {
            Some(index) => {
                self.children.remove(index);
                true
            }
            None => false,
        }
    }
}

impl<T: Clone> MemoryHost<T> {
    /// Items of the visible nodes in container order
    #[must_use]
    pub fn visible_items(&self) -> Vec<T> {
        self.visible_nodes().map(|node| node.context().item()).collect()
    }

    /// `(item, index)` bindings of the visible nodes in container order
    #[must_use]
    pub fn bindings(&self) -> Vec<(T, usize)> {
        self.visible_nodes()
            .map(|node| (node.context().item(), node.context().index()))
            .collect()
    }
}

impl<T> Default for MemoryHost<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MemoryHost<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("children", &self.children)
            .field("materialized", &self.materialized)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl<T> ViewHost<T> for MemoryHost<T> {
    type Node = MemoryNode<T>;

    fn materialize(&mut self, context: ViewContext<T>) -> Self::Node {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.materialized += 1;
        MemoryNode {
            data: Rc::new(NodeData {
                serial,
                context,
                visible: Cell::new(true),
            }),
        }
    }

    fn dispose(&mut self, node: Self::Node) {
        self.detach(&node);
        self.disposed += 1;
    }

    fn next_sibling(&self, cursor: &Cursor<Self::Node>) -> Option<Self::Node> {
        match cursor {
            Cursor::Start => self.children.first().cloned(),
            Cursor::After(node) => self
                .position_of(node)
                .and_then(|index| self.children.get(index + 1))
                .cloned(),
        }
    }

    fn insert_before(&mut self, node: &Self::Node, position: Position<Self::Node>) {
        // Inserting a node before itself leaves it in place
        if let Position::Before(before) = &position {
            if before == node {
                return;
            }
        }
        self.detach(node);
        let index = match position {
            Position::Before(before) => self
                .position_of(&before)
                .unwrap_or(self.children.len()),
            Position::End => self.children.len(),
        };
        self.children.insert(index, node.clone());
    }

    fn set_visible(&mut self, node: &Self::Node, visible: bool) {
        node.data.visible.set(visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repeat_core::SlotNames;

    fn materialize(host: &mut MemoryHost<&'static str>, item: &'static str) -> MemoryNode<&'static str> {
        let node = host.materialize(ViewContext::new(item, 0, Rc::new(SlotNames::default())));
        host.insert_before(&node, Position::End);
        node
    }

    #[test]
    fn test_materialize_detached_until_inserted() {
        let mut host = MemoryHost::new();
        let node = host.materialize(ViewContext::new("a", 0, Rc::new(SlotNames::default())));
        assert_eq!(host.attached_count(), 0);
        assert!(node.is_visible());

        host.insert_before(&node, Position::End);
        assert_eq!(host.attached_count(), 1);
        assert_eq!(host.materialized_count(), 1);
    }

    #[test]
    fn test_next_sibling() {
        let mut host = MemoryHost::new();
        let a = materialize(&mut host, "a");
        let b = materialize(&mut host, "b");

        assert_eq!(host.next_sibling(&Cursor::Start), Some(a.clone()));
        assert_eq!(host.next_sibling(&Cursor::After(a)), Some(b.clone()));
        assert_eq!(host.next_sibling(&Cursor::After(b)), None);
    }

    #[test]
    fn test_insert_before_moves() {
        let mut host = MemoryHost::new();
        let a = materialize(&mut host, "a");
        let b = materialize(&mut host, "b");
        let c = materialize(&mut host, "c");

        host.insert_before(&c, Position::Before(a.clone()));
        assert_eq!(host.nodes(), &[c.clone(), a.clone(), b.clone()]);

        host.insert_before(&c, Position::End);
        assert_eq!(host.nodes(), &[a.clone(), b.clone(), c.clone()]);

        host.insert_before(&b, Position::Before(b.clone()));
        assert_eq!(host.nodes(), &[a, b, c]);
    }

    #[test]
    fn test_position_of_after_moves() {
        let mut host = MemoryHost::new();
        let nodes: Vec<_> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(|item| materialize(&mut host, item))
            .collect();

        assert_eq!(host.position_of(&nodes[3]), Some(3));
        host.insert_before(&nodes[4], Position::Before(nodes[0].clone()));
        host.detach(&nodes[2]);

        // e a b d
        assert_eq!(host.position_of(&nodes[3]), Some(3));
        assert_eq!(host.position_of(&nodes[4]), Some(0));
        assert_eq!(host.position_of(&nodes[1]), Some(2));
        assert_eq!(host.position_of(&nodes[2]), None);
        assert_eq!(host.next_sibling(&Cursor::After(nodes[0].clone())), Some(nodes[1].clone()));
    }

    #[test]
    fn test_walk_long_container() {
        let mut host = MemoryHost::new();
        for item in 0..20_000u32 {
            let node = host.materialize(ViewContext::new(item, 0, Rc::new(SlotNames::default())));
            host.insert_before(&node, Position::End);
        }

        let mut cursor = Cursor::Start;
        let mut walked = 0;
        while let Some(node) = host.next_sibling(&cursor) {
            assert_eq!(node.context().item(), walked);
            walked += 1;
            cursor = Cursor::After(node);
        }
        assert_eq!(walked, 20_000);
    }

    #[test]
    fn test_visibility_and_items() {
        let mut host = MemoryHost::new();
        let a = materialize(&mut host, "a");
        materialize(&mut host, "b");

        host.set_visible(&a, false);
        assert_eq!(host.visible_items(), vec!["b"]);
        assert_eq!(host.attached_count(), 2);
    }

    #[test]
    fn test_dispose_and_detach() {
        let mut host = MemoryHost::new();
        let a = materialize(&mut host, "a");
        let b = materialize(&mut host, "b");

        host.dispose(a);
        assert_eq!(host.attached_count(), 1);
        assert_eq!(host.disposed_count(), 1);

        assert!(host.detach(&b));
        assert!(!host.detach(&b));
        assert_eq!(host.attached_count(), 0);
    }

    #[test]
    fn test_node_identity_equality() {
        let mut host = MemoryHost::new();
        let a1 = materialize(&mut host, "same");
        let a2 = materialize(&mut host, "same");
        assert_ne!(a1, a2);
        assert_eq!(a1, a1.clone());
        assert_eq!(format!("{:?}", a1), "MemoryNode#0");
    }
}
