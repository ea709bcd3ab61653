//! Input events and their outcomes.
//!
//! Hosts decode their native input (keyboard, IME, pointer) into
//! [`EngineEvent`]s. Events are plain serde data so a headless script can
//! replay them from JSON.

use serde::{Deserialize, Serialize};
use tessel_grid::CellRef;

use crate::config::PickerKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Enter {
        #[serde(default)]
        shift: bool,
    },
    Escape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineEvent {
    /// Committed text from the keyboard or an input method. With `cursor`
    /// set, the caret moves there (clamped) before inserting.
    InsertText {
        text: String,
        #[serde(default)]
        cursor: Option<usize>,
    },
    Navigate(Direction),
    DeleteBackward,
    DeleteForward,
    Key(Key),
    Commit,
    Cancel,
    Click { x: f32, y: f32 },
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Nothing to act on (e.g. typing with no edit session).
    Ignored,
    Handled,
    EditStarted(CellRef),
    EditCommitted(CellRef),
    EditCancelled(CellRef),
    /// The host should show its picker for this cell.
    OpenPicker { cell: CellRef, kind: PickerKind },
}
