//! Bulk selection model.
//!
//! A selection is either the exact set of chosen devices (`Explicit`) or "every
//! device of the source except these" (`Complement`, what "select all"
//! produces). Both are stored as one exception set; the mode decides how it is
//! read. A row's checked state always means "will be submitted", so the same
//! click mutates the exception set in opposite directions under the two modes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{DeviceId, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Explicit,
    Complement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSet {
    source: SourceId,
    mode: SelectionMode,
    exceptions: BTreeSet<DeviceId>,
}

impl SelectionSet {
    /// Empty explicit selection scoped to `source`.
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            mode: SelectionMode::Explicit,
            exceptions: BTreeSet::new(),
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// In `Explicit` mode the selection itself, in `Complement` mode the carve-outs.
    pub fn exceptions(&self) -> &BTreeSet<DeviceId> {
        &self.exceptions
    }

    pub fn reset_for_source(&mut self, source: SourceId) {
        self.source = source;
        self.mode = SelectionMode::Explicit;
        self.exceptions.clear();
    }

    /// Apply a row click that leaves the row `checked`.
    pub fn toggle(&mut self, id: &DeviceId, checked: bool) {
        let include_in_exceptions = match self.mode {
            SelectionMode::Explicit => checked,
            SelectionMode::Complement => !checked,
        };

        if include_in_exceptions {
            self.exceptions.insert(id.clone());
        } else {
            self.exceptions.remove(id);
        }
    }

    pub fn set_select_all(&mut self, enabled: bool) {
        self.mode = if enabled {
            SelectionMode::Complement
        } else {
            SelectionMode::Explicit
        };
        self.exceptions.clear();
    }

    /// Whether the row for `id` renders checked.
    ///
    /// The answer only depends on mode and exceptions; `_in_current_page` is
    /// accepted so rendering code can pass what it knows without caring.
    pub fn is_checked(&self, id: &DeviceId, _in_current_page: bool) -> bool {
        match self.mode {
            SelectionMode::Explicit => self.exceptions.contains(id),
            SelectionMode::Complement => !self.exceptions.contains(id),
        }
    }

    /// "Select all" is on but something has been carved out.
    pub fn is_indeterminate(&self) -> bool {
        self.mode == SelectionMode::Complement && !self.exceptions.is_empty()
    }

    /// "Select all" is on with nothing carved out.
    pub fn is_all_checked(&self) -> bool {
        self.mode == SelectionMode::Complement && self.exceptions.is_empty()
    }

    /// Resolve the selection into the ids to submit.
    ///
    /// `known` must hold every id observed for the source; complement mode can
    /// only resolve against what has been seen.
    pub fn materialize(
        &self,
        known: &BTreeSet<DeviceId>,
        already_joined: &BTreeSet<DeviceId>,
    ) -> BTreeSet<DeviceId> {
        match self.mode {
            SelectionMode::Explicit => self.exceptions.difference(already_joined).cloned().collect(),
            SelectionMode::Complement => known
                .iter()
                .filter(|id| !self.exceptions.contains(*id) && !already_joined.contains(*id))
                .cloned()
                .collect(),
        }
    }
}
