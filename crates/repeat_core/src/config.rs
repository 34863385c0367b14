//! Repeat options.
//!
//! The serializable half of the configuration: everything except the identity
//! function and the callbacks. Option names follow the binding syntax; the
//! older spellings are accepted as aliases.

use crate::context::SlotNames;
use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default budget of the first incremental slice
pub const DEFAULT_INITIAL_SLICE: Duration = Duration::from_millis(15);

/// Default budget of every resumed incremental slice
pub const DEFAULT_RESUME_SLICE: Duration = Duration::from_millis(40);

/// How a synchronization pass is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Run to completion inside `synchronize`
    Immediate,
    /// Time-sliced across animation frames
    Incremental {
        /// Budget of the slice run inside `synchronize`
        initial_slice: Duration,
        /// Budget of each slice run on a later frame
        resume_slice: Duration,
    },
}

impl SyncMode {
    /// Incremental mode with the default budgets
    #[must_use]
    pub const fn incremental() -> Self {
        Self::Incremental {
            initial_slice: DEFAULT_INITIAL_SLICE,
            resume_slice: DEFAULT_RESUME_SLICE,
        }
    }

    /// Check if passes may span several frames
    #[must_use]
    pub const fn is_incremental(&self) -> bool {
        matches!(self, Self::Incremental { .. })
    }
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::Immediate
    }
}

/// Options map of an indexed repeat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepeatOptions {
    /// Field projected into the identity
    #[serde(alias = "indexedBy")]
    pub identity_selector: Option<String>,
    /// Template name of the item slot
    #[serde(alias = "as")]
    pub item_variable_name: String,
    /// Template name of the index slot
    #[serde(alias = "at")]
    pub index_variable_name: String,
    /// Reuse removed nodes for added items
    pub allow_element_recycling: bool,
    /// Spread passes across frames
    #[serde(alias = "allowDeviation")]
    pub allow_incremental: bool,
    /// First slice budget in milliseconds
    pub initial_slice_ms: u64,
    /// Resumed slice budget in milliseconds
    pub resume_slice_ms: u64,
}

impl Default for RepeatOptions {
    fn default() -> Self {
        let names = SlotNames::default();
        Self {
            identity_selector: None,
            item_variable_name: names.item,
            index_variable_name: names.index,
            allow_element_recycling: true,
            allow_incremental: false,
            initial_slice_ms: DEFAULT_INITIAL_SLICE.as_millis() as u64,
            resume_slice_ms: DEFAULT_RESUME_SLICE.as_millis() as u64,
        }
    }
}

impl RepeatOptions {
    /// Parse options from JSON
    ///
    /// # Errors
    ///
    /// Returns `InvalidOption` if the JSON is malformed or fails validation
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Check variable names
    ///
    /// # Errors
    ///
    /// Returns `InvalidOption` for empty or clashing names
    pub fn validate(&self) -> CoreResult<()> {
        self.slot_names().validate()
    }

    /// Slot names described by these options
    #[must_use]
    pub fn slot_names(&self) -> SlotNames {
        SlotNames {
            item: self.item_variable_name.clone(),
            index: self.index_variable_name.clone(),
        }
    }

    /// Execution mode described by these options
    #[must_use]
    pub fn sync_mode(&self) -> SyncMode {
        if self.allow_incremental {
            SyncMode::Incremental {
                initial_slice: Duration::from_millis(self.initial_slice_ms),
                resume_slice: Duration::from_millis(self.resume_slice_ms),
            }
        } else {
            SyncMode::Immediate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_options_default() {
        let options = RepeatOptions::default();
        assert_eq!(options.identity_selector, None);
        assert_eq!(options.item_variable_name, "item");
        assert_eq!(options.index_variable_name, "index");
        assert!(options.allow_element_recycling);
        assert!(!options.allow_incremental);
        assert_eq!(options.sync_mode(), SyncMode::Immediate);
    }

    #[test]
    fn test_options_from_json() {
        let options = RepeatOptions::from_json(
            r#"{"identitySelector": "id", "allowElementRecycling": false, "allowIncremental": true}"#,
        )
        .unwrap();
        assert_eq!(options.identity_selector.as_deref(), Some("id"));
        assert!(!options.allow_element_recycling);
        assert_eq!(options.sync_mode(), SyncMode::incremental());
    }

    #[test]
    fn test_options_aliases() {
        let options = RepeatOptions::from_json(
            r#"{"indexedBy": "key", "as": "row", "at": "position", "allowDeviation": true, "resumeSliceMs": 8}"#,
        )
        .unwrap();
        assert_eq!(options.identity_selector.as_deref(), Some("key"));
        assert_eq!(options.slot_names().item, "row");
        assert_eq!(options.slot_names().index, "position");
        assert_eq!(
            options.sync_mode(),
            SyncMode::Incremental {
                initial_slice: DEFAULT_INITIAL_SLICE,
                resume_slice: Duration::from_millis(8),
            }
        );
    }

    #[test]
    fn test_options_validation() {
        let err = RepeatOptions::from_json(r#"{"itemVariableName": ""}"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOption { ref field, .. } if field == "itemVariableName"));

        let err = RepeatOptions::from_json(r#"{"as": "x", "at": "x"}"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOption { ref field, .. } if field == "indexVariableName"));
    }

    #[test]
    fn test_options_malformed_json() {
        let err = RepeatOptions::from_json(r#"{"allowIncremental": "yes"}"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOption { .. }));
    }

    #[test]
    fn test_sync_mode_incremental() {
        assert!(SyncMode::incremental().is_incremental());
        assert!(!SyncMode::default().is_incremental());
    }
}
