//! Use-case services over the repository layer.
//!
//! # Responsibility
//! - Turn repository records into the read models returned to callers.
//! - Validate inputs before they reach storage.

pub mod note_service;
