//! Browser DOM layer for retype.
//!
//! This crate binds retype sessions to contenteditable elements and provides
//! the `web-sys` implementation of the core's region trait. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `region`: Selection API handling, marker insertion and caret restoration
//! - `events`: keyboard event extraction
//! - `attach`: per-element sessions, listeners and the deferred settle turn
//! - `platform`: OS detection for the primary shortcut modifier
//!
//! # Re-exports
//!
//! This crate re-exports `retype-core` for convenience, so consumers
//! only need to depend on `retype-browser`.

// Re-export core crate
pub use retype_core;
pub use retype_core::*;

pub mod attach;
pub mod events;
pub mod platform;
pub mod region;

pub use attach::{AttachError, ID_ATTR, Retype, find, retype};
pub use events::{key_input_from_event, modifiers_from_event};
pub use platform::{Platform, platform};
pub use region::BrowserRegion;
