//! View contexts.
//!
//! A view context is the two-slot record a rendered node is bound to: the item
//! it shows and the position it sits at. The node owns it; the synchronizer
//! mutates it in place when the node is reused.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Names under which the context slots are exposed to templates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotNames {
    /// Name of the item slot
    pub item: String,
    /// Name of the index slot
    pub index: String,
}

impl SlotNames {
    /// Check that both names are usable and distinct
    ///
    /// # Errors
    ///
    /// Returns `InvalidOption` for empty or clashing names
    pub fn validate(&self) -> CoreResult<()> {
        for (field, value) in [("itemVariableName", &self.item), ("indexVariableName", &self.index)] {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidOption {
                    field: field.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        if self.item == self.index {
            return Err(CoreError::InvalidOption {
                field: "indexVariableName".to_string(),
                reason: format!("clashes with item variable `{}`", self.item),
            });
        }
        Ok(())
    }
}

impl Default for SlotNames {
    fn default() -> Self {
        Self {
            item: "item".to_string(),
            index: "index".to_string(),
        }
    }
}

/// One of the two context slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The bound item
    Item,
    /// The bound position
    Index,
}

/// Change notification delivered to context subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotChange {
    /// Which slot changed
    pub slot: Slot,
    /// Revision after the change
    pub revision: u64,
}

type Subscriber = Box<dyn Fn(SlotChange)>;

struct Slots<T> {
    item: RefCell<T>,
    index: Cell<usize>,
    revision: Cell<u64>,
    names: Rc<SlotNames>,
    subscribers: RefCell<Vec<Subscriber>>,
}

/// Observable `{item, index}` record shared by a node and the synchronizer
///
/// Clones are handles to the same record.
pub struct ViewContext<T> {
    slots: Rc<Slots<T>>,
}

impl<T> ViewContext<T> {
    /// Create a context bound to `item` at `index`
    #[must_use]
    pub fn new(item: T, index: usize, names: Rc<SlotNames>) -> Self {
        Self {
            slots: Rc::new(Slots {
                item: RefCell::new(item),
                index: Cell::new(index),
                revision: Cell::new(0),
                names,
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Current position
    #[must_use]
    pub fn index(&self) -> usize {
        self.slots.index.get()
    }

    /// Move to a new position, notifying only on change
    pub fn set_index(&self, index: usize) {
        if self.slots.index.replace(index) != index {
            self.notify(Slot::Index);
        }
    }

    /// Borrow the current item
    pub fn with_item<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slots.item.borrow())
    }

    /// Rebind to a new item
    ///
    /// Items are not compared, so subscribers hear an `Item` change even when
    /// the new item equals the old one. Reconciliation rebinds every matched
    /// node this way on each pass.
    pub fn set_item(&self, item: T) {
        *self.slots.item.borrow_mut() = item;
        self.notify(Slot::Item);
    }

    /// Number of changes applied since creation
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.slots.revision.get()
    }

    /// Slot names this context exposes
    #[must_use]
    pub fn names(&self) -> &SlotNames {
        &self.slots.names
    }

    /// Resolve a template variable name to a slot
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Slot> {
        let names = &self.slots.names;
        if name == names.item {
            Some(Slot::Item)
        } else if name == names.index {
            Some(Slot::Index)
        } else {
            None
        }
    }

    /// Register a change callback for the lifetime of the context
    pub fn subscribe(&self, subscriber: impl Fn(SlotChange) + 'static) {
        self.slots.subscribers.borrow_mut().push(Box::new(subscriber));
    }

    /// Check whether two handles point at the same record
    #[must_use]
    pub fn same_record(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slots, &other.slots)
    }

    fn notify(&self, slot: Slot) {
        let revision = self.slots.revision.get() + 1;
        self.slots.revision.set(revision);
        let change = SlotChange { slot, revision };
        for subscriber in self.slots.subscribers.borrow().iter() {
            subscriber(change);
        }
    }
}

impl<T: Clone> ViewContext<T> {
    /// Clone of the current item
    #[must_use]
    pub fn item(&self) -> T {
        self.slots.item.borrow().clone()
    }
}

impl<T> Clone for ViewContext<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ViewContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewContext")
            .field(&self.slots.names.item, &*self.slots.item.borrow())
            .field(&self.slots.names.index, &self.slots.index.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(item: &'static str, index: usize) -> ViewContext<&'static str> {
        ViewContext::new(item, index, Rc::new(SlotNames::default()))
    }

    #[test]
    fn test_slot_names_validate() {
        assert!(SlotNames::default().validate().is_ok());

        let clash = SlotNames {
            item: "row".to_string(),
            index: "row".to_string(),
        };
        assert!(matches!(clash.validate(), Err(CoreError::InvalidOption { ref field, .. }) if field == "indexVariableName"));

        let empty = SlotNames {
            item: " ".to_string(),
            index: "i".to_string(),
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_context_slots() {
        let ctx = context("a", 2);
        assert_eq!(ctx.item(), "a");
        assert_eq!(ctx.index(), 2);
        assert_eq!(ctx.revision(), 0);
    }

    #[test]
    fn test_context_mutation_shared() {
        let ctx = context("a", 0);
        let handle = ctx.clone();

        handle.set_item("b");
        handle.set_index(4);

        assert_eq!(ctx.item(), "b");
        assert_eq!(ctx.index(), 4);
        assert!(ctx.same_record(&handle));
        assert_eq!(ctx.revision(), 2);
    }

    #[test]
    fn test_index_notifies_on_change_only() {
        let ctx = context("a", 1);
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        ctx.subscribe(move |change| {
            assert_eq!(change.slot, Slot::Index);
            counter.set(counter.get() + 1);
        });

        ctx.set_index(1);
        assert_eq!(seen.get(), 0);

        ctx.set_index(3);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_resolve_custom_names() {
        let names = SlotNames {
            item: "someItemVariableName".to_string(),
            index: "someIndexVariableName".to_string(),
        };
        let ctx = ViewContext::new(7u32, 0, Rc::new(names));

        assert_eq!(ctx.resolve("someItemVariableName"), Some(Slot::Item));
        assert_eq!(ctx.resolve("someIndexVariableName"), Some(Slot::Index));
        assert_eq!(ctx.resolve("item"), None);
    }

    #[test]
    fn test_with_item_borrows() {
        let ctx = ViewContext::new(String::from("long"), 0, Rc::new(SlotNames::default()));
        assert_eq!(ctx.with_item(|s| s.len()), 4);
    }

    #[test]
    fn test_debug_uses_slot_names() {
        let ctx = context("a", 0);
        let s = format!("{:?}", ctx);
        assert!(s.contains("item"));
        assert!(s.contains("index"));
    }
}
