//! Browser implementation of the region platform trait.
//!
//! Works through the DOM Selection API against a single contenteditable
//! element. Offsets are UTF-16 code units, the unit `Range` offsets use.

use web_sys::{HtmlElement, Node};

use retype_core::{Caret, PlatformError, RegionDom};

/// `NodeFilter.SHOW_TEXT`
const SHOW_TEXT: u32 = 0x4;

/// A contenteditable element seen as a [`RegionDom`].
#[derive(Debug, Clone)]
pub struct BrowserRegion {
    element: HtmlElement,
}

impl BrowserRegion {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &HtmlElement {
        &self.element
    }

    fn root(&self) -> &Node {
        &self.element
    }
}

fn document() -> Result<web_sys::Document, PlatformError> {
    let window = web_sys::window().ok_or("no window")?;
    Ok(window.document().ok_or("no document")?)
}

fn selection() -> Result<web_sys::Selection, PlatformError> {
    let window = web_sys::window().ok_or("no window")?;
    let selection = window
        .get_selection()
        .map_err(|e| format!("get_selection failed: {:?}", e))?
        .ok_or("no selection object")?;
    Ok(selection)
}

impl RegionDom for BrowserRegion {
    type Node = Node;

    fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    fn set_inner_html(&mut self, html: &str) {
        self.element.set_inner_html(html);
    }

    fn collapsed_caret(&self) -> Option<Caret<Node>> {
        // Selections outlive focus; a region that lost focus has no caret.
        let active = document().ok()?.active_element()?;
        if !self.root().contains(Some(active.as_ref())) {
            return None;
        }

        let selection = selection().ok()?;
        if selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?;
        if !range.collapsed() {
            return None;
        }

        let container = range.start_container().ok()?;
        if !self.root().contains(Some(&container)) {
            return None;
        }
        let offset = range.start_offset().ok()? as usize;

        if container.node_type() == Node::TEXT_NODE {
            Some(Caret::Text {
                node: container,
                offset,
            })
        } else if offset == 0 && container.is_same_node(Some(self.root())) {
            Some(Caret::RegionStart)
        } else {
            Some(Caret::Element {
                node: container,
                index: offset,
            })
        }
    }

    fn insert_at_caret(&mut self, text: &str) -> Result<(), PlatformError> {
        let range = selection()?
            .get_range_at(0)
            .map_err(|e| format!("get_range_at failed: {:?}", e))?;
        let node = document()?.create_text_node(text);
        range
            .insert_node(&node)
            .map_err(|e| format!("insert_node failed: {:?}", e))?;
        Ok(())
    }

    fn text_nodes(&self) -> Vec<Node> {
        let Ok(document) = document() else {
            return Vec::new();
        };
        let walker = match document.create_tree_walker_with_what_to_show(self.root(), SHOW_TEXT) {
            Ok(walker) => walker,
            Err(e) => {
                tracing::warn!(target: "retype::browser", error = ?e, "create_tree_walker failed");
                return Vec::new();
            }
        };

        let mut nodes = Vec::new();
        while let Ok(Some(node)) = walker.next_node() {
            nodes.push(node);
        }
        nodes
    }

    fn node_text(&self, node: &Node) -> String {
        node.text_content().unwrap_or_default()
    }

    fn set_node_text(&mut self, node: &Node, text: &str) {
        node.set_text_content(Some(text));
    }

    fn remove_node(&mut self, node: &Node) {
        if let Some(parent) = node.parent_node() {
            let _ = parent.remove_child(node);
        }
    }

    fn is_sole_child(&self, node: &Node) -> bool {
        let children = self.root().child_nodes();
        children.length() == 1
            && children
                .get(0)
                .is_some_and(|child| child.is_same_node(Some(node)))
    }

    fn place_caret(&mut self, caret: Caret<Node>) -> Result<(), PlatformError> {
        let range = document()?
            .create_range()
            .map_err(|e| format!("create_range failed: {:?}", e))?;

        match &caret {
            Caret::RegionStart => range.set_start(self.root(), 0),
            Caret::Text { node, offset } => range.set_start(node, *offset as u32),
            Caret::Element { node, index } => range.set_start(node, *index as u32),
        }
        .map_err(|e| format!("set_start failed: {:?}", e))?;
        range.collapse_with_to_start(true);

        let selection = selection()?;
        selection
            .remove_all_ranges()
            .map_err(|e| format!("remove_all_ranges failed: {:?}", e))?;
        selection
            .add_range(&range)
            .map_err(|e| format!("add_range failed: {:?}", e))?;
        Ok(())
    }

    fn measure(&self, prefix: &str) -> usize {
        prefix.encode_utf16().count()
    }
}
