//! Presentation-client boundary for tomatxt.
//!
//! Every exported function is synchronous and returns a plain envelope; no
//! error crosses the boundary as a panic.

pub mod api;
