//! retype-core: caret-preserving rewrites for editable regions, without a browser.
//!
//! This crate provides:
//! - `RegionDom` trait abstracting the editable region and its selection
//! - `perform_rewrite` - runs a content rewrite and puts the caret back
//! - `History` - bounded linear undo/redo over serialized content
//! - `Session<R>` - keystroke coalescing, undo/redo shortcuts, rewrite on settle
//! - `Highlighter` - the built-in trigger-token rewrite
//! - `MemoryRegion` - an in-memory region for hosts and tests

pub mod config;
pub mod dom;
pub mod highlight;
pub mod history;
pub mod keys;
pub mod marker;
pub mod mutator;
pub mod platform;
pub mod registry;
pub mod session;
pub mod trigger;

pub use config::{ConfigError, DEFAULT_PLACEHOLDER, RetypeConfig};
pub use dom::{MemoryRegion, NodeId};
pub use highlight::{Highlighter, strip_highlighting};
pub use history::{DEFAULT_HISTORY_LIMIT, History, HistoryEntry};
pub use keys::{Action, Key, KeyBindings, KeyClass, KeyInput, KeydownResult, Modifiers};
pub use marker::MARKER;
pub use mutator::{RewriteOutcome, perform_rewrite};
pub use platform::{Caret, PlatformError, RegionDom};
pub use registry::Registry;
pub use session::Session;
pub use smol_str::SmolStr;
pub use trigger::{Rewrite, TriggerSpec};
