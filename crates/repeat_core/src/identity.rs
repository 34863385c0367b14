//! Item identities and the selectors that compute them.
//!
//! An identity is the only key used to decide whether an item keeps the node
//! it was rendered with.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

/// Identity of an item - the key under which its node is tracked
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create an identity from anything string-like
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned string
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Items whose fields can be projected into an identity
pub trait FieldAccess {
    /// Read `field` as an identity, `None` when absent or not scalar
    fn field_identity(&self, field: &str) -> Option<Identity>;
}

impl FieldAccess for serde_json::Value {
    fn field_identity(&self, field: &str) -> Option<Identity> {
        match self.get(field)? {
            serde_json::Value::String(s) => Some(Identity::new(s.as_str())),
            serde_json::Value::Number(n) => Some(Identity::new(n.to_string())),
            serde_json::Value::Bool(b) => Some(Identity::new(b.to_string())),
            _ => None,
        }
    }
}

/// How a selector derives identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorSource {
    /// Projection of a named field
    Field(String),
    /// Arbitrary user function
    Function,
    /// The item's `Display` rendering
    Display,
}

/// Computes the identity of an item
///
/// Cheap to clone; the selection function is shared.
pub struct IdentitySelector<T> {
    source: SelectorSource,
    select: Rc<dyn Fn(&T) -> CoreResult<Identity>>,
}

impl<T: 'static> IdentitySelector<T> {
    /// Selector backed by an arbitrary function
    pub fn function<F, I>(f: F) -> Self
    where
        F: Fn(&T) -> I + 'static,
        I: Into<Identity>,
    {
        Self {
            source: SelectorSource::Function,
            select: Rc::new(move |item| Ok(f(item).into())),
        }
    }

    /// Selector projecting a named field
    pub fn field(name: impl Into<String>) -> Self
    where
        T: FieldAccess,
    {
        let name = name.into();
        let field = name.clone();
        Self {
            source: SelectorSource::Field(name),
            select: Rc::new(move |item: &T| {
                item.field_identity(&field)
                    .ok_or_else(|| CoreError::UnresolvableIdentity {
                        field: field.clone(),
                    })
            }),
        }
    }

    /// Selector using the item's `Display` output as identity
    pub fn display() -> Self
    where
        T: fmt::Display,
    {
        Self {
            source: SelectorSource::Display,
            select: Rc::new(|item: &T| Ok(Identity::new(item.to_string()))),
        }
    }
}

impl<T> IdentitySelector<T> {
    /// Compute the identity of `item`
    ///
    /// # Errors
    ///
    /// Returns `UnresolvableIdentity` if a field selector finds no value
    pub fn select(&self, item: &T) -> CoreResult<Identity> {
        (self.select)(item)
    }

    /// Get the selector source
    #[must_use]
    pub fn source(&self) -> &SelectorSource {
        &self.source
    }
}

impl<T> Clone for IdentitySelector<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            select: Rc::clone(&self.select),
        }
    }
}

impl<T> fmt::Debug for IdentitySelector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySelector")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
