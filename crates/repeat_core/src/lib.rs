//! indexed-repeat Core Types
//!
//! Pure types with no I/O: identities and their selectors, the identity
//! table, item accessors, view contexts, options and clocks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accessor;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod table;
pub mod time;

// Re-exports
pub use accessor::{ItemAccessor, ItemList, SourceKind};
pub use config::{RepeatOptions, SyncMode, DEFAULT_INITIAL_SLICE, DEFAULT_RESUME_SLICE};
pub use context::{Slot, SlotChange, SlotNames, ViewContext};
pub use error::{CoreError, CoreResult};
pub use identity::{FieldAccess, Identity, IdentitySelector, SelectorSource};
pub use table::IdentityTable;
pub use time::{Clock, ManualClock, SystemClock};
