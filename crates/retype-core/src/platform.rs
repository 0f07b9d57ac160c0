//! Platform abstraction for the editable region.
//!
//! The core never touches a concrete DOM. A host (the browser layer, or the
//! in-memory [`MemoryRegion`](crate::dom::MemoryRegion) used natively and in
//! tests) implements [`RegionDom`] and the mutator and session work purely
//! through it.

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// A collapsed caret position inside the region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caret<N> {
    /// Before the region's first child.
    RegionStart,
    /// Inside a text node, at an offset in the host's unit.
    Text { node: N, offset: usize },
    /// Between children of an element, before child `index`.
    Element { node: N, index: usize },
}

/// The editable region as seen by the core.
///
/// Text offsets are in whatever unit the host's selection API uses;
/// [`measure`](RegionDom::measure) converts a string prefix into that unit.
pub trait RegionDom {
    /// Handle to a node in the region's tree.
    type Node: Clone + PartialEq + std::fmt::Debug;

    /// Serialized markup of the region's children.
    fn inner_html(&self) -> String;

    /// Replace the region's children by parsing `html`.
    fn set_inner_html(&mut self, html: &str);

    /// The caret, if a selection exists, is collapsed, and lies in the region.
    fn collapsed_caret(&self) -> Option<Caret<Self::Node>>;

    /// Insert a new text node holding `text` at the caret, splitting text as needed.
    fn insert_at_caret(&mut self, text: &str) -> Result<(), PlatformError>;

    /// Text nodes of the region in depth-first order.
    fn text_nodes(&self) -> Vec<Self::Node>;

    fn node_text(&self, node: &Self::Node) -> String;

    fn set_node_text(&mut self, node: &Self::Node, text: &str);

    fn remove_node(&mut self, node: &Self::Node);

    /// Whether `node` is the region's only child.
    fn is_sole_child(&self, node: &Self::Node) -> bool;

    /// Install a collapsed selection at `caret`.
    fn place_caret(&mut self, caret: Caret<Self::Node>) -> Result<(), PlatformError>;

    /// Length of `prefix` in the host's offset unit.
    fn measure(&self, prefix: &str) -> usize {
        prefix.chars().count()
    }

    /// Re-parse the region so text node boundaries settle.
    fn normalize(&mut self) {
        let html = self.inner_html();
        self.set_inner_html(&html);
    }
}
