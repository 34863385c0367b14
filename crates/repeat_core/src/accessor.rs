//! Item accessors.
//!
//! Normalizes the different shapes an item source can take into one
//! `{length(), get(i)}` capability. An accessor is a snapshot handle: build a
//! fresh one every time the source collection is read.

use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;

/// A list exposing a `length()` method and positional access
pub trait ItemList<T> {
    /// Number of items
    fn length(&self) -> usize;

    /// Item at `index`, `index < length()`
    fn get(&self, index: usize) -> T;
}

/// Shape of the source behind an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Native ordered sequence
    Sequence,
    /// Object carrying a numeric `length` attribute
    LengthProperty,
    /// Object carrying a `length()` method
    LengthMethod,
}

enum Source<T> {
    Sequence(Rc<[T]>),
    List(Rc<dyn ItemList<T>>),
}

/// Uniform indexing over an item source
pub struct ItemAccessor<T> {
    kind: SourceKind,
    source: Source<T>,
}

impl<T: Clone> ItemAccessor<T> {
    /// Accessor over a native sequence
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            kind: SourceKind::Sequence,
            source: Source::Sequence(items.into()),
        }
    }

    /// Accessor over a list with a `length()` method
    pub fn from_list(list: impl ItemList<T> + 'static) -> Self {
        Self {
            kind: SourceKind::LengthMethod,
            source: Source::List(Rc::new(list)),
        }
    }

    /// Number of items
    #[must_use]
    pub fn length(&self) -> usize {
        match &self.source {
            Source::Sequence(items) => items.len(),
            Source::List(list) => list.length(),
        }
    }

    /// Check if there are no items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Item at `index`, `None` past the end
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.length() {
            return None;
        }
        match &self.source {
            Source::Sequence(items) => items.get(index).cloned(),
            Source::List(list) => Some(list.get(index)),
        }
    }

    /// Shape of the underlying source
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Collect every item into a vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.length()).filter_map(|i| self.get(i)).collect()
    }
}

/// JSON object with a numeric `length` attribute and index-keyed elements
struct ArrayLikeObject {
    object: Map<String, Value>,
    length: usize,
}

impl ItemList<Value> for ArrayLikeObject {
    fn length(&self) -> usize {
        self.length
    }

    fn get(&self, index: usize) -> Value {
        self.object
            .get(&index.to_string())
            .cloned()
            .unwrap_or(Value::Null)
    }
}

impl ItemAccessor<Value> {
    /// Infer an accessor from a dynamic value
    ///
    /// Arrays are sequences; objects with a numeric `length` attribute are
    /// array-like, their elements stored under the keys `"0"`, `"1"`, ...
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInputKind` for every other shape
    pub fn infer(value: &Value) -> CoreResult<Self> {
        match value {
            Value::Array(items) => Ok(Self::from_vec(items.clone())),
            Value::Object(object) => {
                let length = object
                    .get("length")
                    .and_then(Value::as_u64)
                    .and_then(|length| usize::try_from(length).ok())
                    .ok_or_else(|| CoreError::UnsupportedInputKind {
                        kind: "object without numeric length".to_string(),
                    })?;
                Ok(Self {
                    kind: SourceKind::LengthProperty,
                    source: Source::List(Rc::new(ArrayLikeObject {
                        object: object.clone(),
                        length,
                    })),
                })
            }
            other => Err(CoreError::UnsupportedInputKind {
                kind: json_kind(other).to_string(),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<T> Clone for ItemAccessor<T> {
    fn clone(&self) -> Self {
        let source = match &self.source {
            Source::Sequence(items) => Source::Sequence(Rc::clone(items)),
            Source::List(list) => Source::List(Rc::clone(list)),
        };
        Self {
            kind: self.kind,
            source,
        }
    }
}

impl<T> fmt::Debug for ItemAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemAccessor")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<T: Clone> From<Vec<T>> for ItemAccessor<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: Clone> From<&[T]> for ItemAccessor<T> {
    fn from(items: &[T]) -> Self {
        Self::from_vec(items.to_vec())
    }
}
