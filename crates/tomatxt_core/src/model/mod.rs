//! Domain records shared by the note store, the timer and the command surface.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId` that is never reused.
//! - Notes nest at most one level deep.

pub mod note;
pub mod timer;
