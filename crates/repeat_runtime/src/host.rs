//! Host capabilities consumed by the synchronizer.
//!
//! The host owns the item template and the retained container. The
//! synchronizer never builds or destroys nodes itself; it asks the host to.

use repeat_core::ViewContext;
use std::fmt;

/// A rendered node bound to a view context
///
/// Handles are compared by identity of the underlying node, not by content.
pub trait ViewNode<T>: Clone + PartialEq + fmt::Debug {
    /// The context this node was materialized with
    fn context(&self) -> &ViewContext<T>;
}

/// Position of the synchronizer's cursor inside the synchronized range
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor<N> {
    /// Just after the range's start boundary
    Start,
    /// Just after the given node
    After(N),
}

/// Insertion point inside the synchronized range
#[derive(Debug, Clone, PartialEq)]
pub enum Position<N> {
    /// Immediately before the given node
    Before(N),
    /// Just before the range's end boundary
    End,
}

/// Retained ordered container plus the view-binding mechanism
pub trait ViewHost<T> {
    /// Node handle type
    type Node: ViewNode<T>;

    /// Build a fresh node from the item template, bound to `context`
    ///
    /// The node is visible and not yet attached to the range.
    fn materialize(&mut self, context: ViewContext<T>) -> Self::Node;

    /// Detach `node` and release it; it is never used again
    fn dispose(&mut self, node: Self::Node);

    /// The node following `cursor`, `None` at the range's end boundary
    fn next_sibling(&self, cursor: &Cursor<Self::Node>) -> Option<Self::Node>;

    /// Attach (or move) `node` at `position`
    fn insert_before(&mut self, node: &Self::Node, position: Position<Self::Node>);

    /// Show or hide `node` without detaching it
    fn set_visible(&mut self, node: &Self::Node, visible: bool);
}
