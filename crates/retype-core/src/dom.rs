//! In-memory editable region.
//!
//! `MemoryRegion` is a small element/text tree with an HTML-ish serializer and
//! a selection, enough to drive the mutator and session without a browser.
//! It parses the subset of markup the highlighter and typical contenteditable
//! content produce: elements with raw attribute text, void elements, text with
//! the common character references. Comments and doctype are dropped.
//!
//! Offsets are counted in chars.

use std::fmt;

use pulldown_cmark_escape::{FmtWriter, escape_html_body_text};

use crate::platform::{Caret, PlatformError, RegionDom};

/// Handle to a node of a [`MemoryRegion`].
///
/// Every [`set_inner_html`](RegionDom::set_inner_html) recycles the arena and
/// starts a new generation. Handles from an older generation are stale: they
/// read as detached and are rejected as caret positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// The region element itself. It survives every generation.
const ROOT: NodeId = NodeId {
    index: 0,
    generation: 0,
};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone)]
enum NodeKind {
    Element { tag: String, attrs: String },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A point in the tree: an offset into a text node, or a child index of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Point {
    node: NodeId,
    offset: usize,
}

/// Editable region backed by an in-memory tree.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    nodes: Vec<NodeData>,
    generation: u32,
    focused: bool,
    selection: Option<(Point, Point)>,
}

impl Default for MemoryRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegion {
    /// An empty, unfocused region.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Element {
                    tag: "div".into(),
                    attrs: String::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
            generation: 0,
            focused: false,
            selection: None,
        }
    }

    pub fn from_html(html: &str) -> Self {
        let mut region = Self::new();
        region.replace_children(html);
        region
    }

    /// Give the region focus, putting the caret at its start if there is none.
    pub fn focus(&mut self) {
        self.focused = true;
        if self.selection.is_none() {
            let start = Point {
                node: ROOT,
                offset: 0,
            };
            self.selection = Some((start, start));
        }
    }

    /// Move focus elsewhere. The selection leaves the region with it.
    pub fn blur(&mut self) {
        self.focused = false;
        self.selection = None;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Concatenated text of the region.
    pub fn text_content(&self) -> String {
        self.text_nodes()
            .iter()
            .map(|&id| self.text_of(id))
            .collect()
    }

    /// Put a collapsed caret at char offset `offset` of the region's text.
    pub fn set_caret_offset(&mut self, offset: usize) {
        let point = self.point_at(offset);
        self.selection = Some((point, point));
    }

    /// Select chars `start..end` of the region's text.
    pub fn select_range(&mut self, start: usize, end: usize) {
        let anchor = self.point_at(start);
        let head = self.point_at(end);
        self.selection = Some((anchor, head));
    }

    /// Char offset of a collapsed caret within the region's text.
    pub fn caret_offset(&self) -> Option<usize> {
        let point = match self.collapsed_caret()? {
            Caret::RegionStart => return Some(0),
            Caret::Text { node, offset } => Point { node, offset },
            Caret::Element { node, index } => Point {
                node,
                offset: index,
            },
        };
        let mut count = 0;
        self.count_chars_before(ROOT, point, &mut count)
            .then_some(count)
    }

    /// Type `text` at the caret, the way a browser applies a key press.
    pub fn type_text(&mut self, text: &str) {
        let Some(point) = self.collapsed_text_point() else {
            return;
        };
        let node_text = self.text_of(point.node);
        let at = char_to_byte(&node_text, point.offset);
        let mut updated = node_text;
        updated.insert_str(at, text);
        self.set_text(point.node, updated);
        let caret = Point {
            node: point.node,
            offset: point.offset + text.chars().count(),
        };
        self.selection = Some((caret, caret));
    }

    /// Delete the char before the caret, the way Backspace does.
    pub fn delete_backward(&mut self) {
        let Some(point) = self.collapsed_text_point() else {
            return;
        };
        if point.offset == 0 {
            return;
        }
        let mut node_text = self.text_of(point.node);
        let at = char_to_byte(&node_text, point.offset - 1);
        node_text.remove(at);
        self.set_text(point.node, node_text);
        let caret = Point {
            node: point.node,
            offset: point.offset - 1,
        };
        self.selection = Some((caret, caret));
    }

    /// Move a collapsed caret by `delta` chars, clamped to the text.
    pub fn move_caret(&mut self, delta: isize) {
        let Some(current) = self.caret_offset() else {
            return;
        };
        let len = self.text_content().chars().count();
        let target = current.saturating_add_signed(delta).min(len);
        self.set_caret_offset(target);
    }

    /// The caret as a text point, creating a text node where there is none.
    fn collapsed_text_point(&mut self) -> Option<Point> {
        match self.collapsed_caret()? {
            Caret::Text { node, offset } => Some(Point { node, offset }),
            Caret::RegionStart => {
                let node = self
                    .first_text_node()
                    .unwrap_or_else(|| self.insert_text_child(ROOT, 0, String::new()));
                Some(Point { node, offset: 0 })
            }
            Caret::Element { node, index } => {
                let node = self.insert_text_child(node, index, String::new());
                Some(Point { node, offset: 0 })
            }
        }
    }

    fn insert_text_child(&mut self, parent: NodeId, index: usize, text: String) -> NodeId {
        let id = self.alloc(NodeKind::Text(text), Some(parent));
        self.nodes[parent.index].children.insert(index, id);
        id
    }

    /// Sum the text lengths before `target`, returning whether it was reached.
    fn count_chars_before(&self, id: NodeId, target: Point, count: &mut usize) -> bool {
        for (index, &child) in self.nodes[id.index].children.iter().enumerate() {
            if id == target.node && index == target.offset {
                return true;
            }
            match &self.nodes[child.index].kind {
                NodeKind::Text(_) if child == target.node => {
                    *count += target.offset;
                    return true;
                }
                NodeKind::Text(text) => *count += text.chars().count(),
                NodeKind::Element { .. } => {
                    if self.count_chars_before(child, target, count) {
                        return true;
                    }
                }
            }
        }
        id == target.node && target.offset == self.nodes[id.index].children.len()
    }

    fn point_at(&self, offset: usize) -> Point {
        let mut remaining = offset;
        let texts = self.text_nodes();
        for &id in &texts {
            let len = self.text_of(id).chars().count();
            if remaining <= len {
                return Point {
                    node: id,
                    offset: remaining,
                };
            }
            remaining -= len;
        }
        match texts.last() {
            Some(&id) => Point {
                node: id,
                offset: self.text_of(id).chars().count(),
            },
            None => Point {
                node: ROOT,
                offset: 0,
            },
        }
    }

    fn first_text_node(&self) -> Option<NodeId> {
        self.text_nodes().into_iter().next()
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId {
            index: self.nodes.len(),
            generation: self.generation,
        };
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    /// Whether `id` belongs to the current generation of the arena.
    fn is_live(&self, id: NodeId) -> bool {
        id == ROOT || (id.generation == self.generation && id.index < self.nodes.len())
    }

    fn text_of(&self, id: NodeId) -> String {
        if !self.is_live(id) {
            return String::new();
        }
        match &self.nodes[id.index].kind {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Element { .. } => String::new(),
        }
    }

    fn set_text(&mut self, id: NodeId, text: String) {
        if !self.is_live(id) {
            return;
        }
        if let NodeKind::Text(current) = &mut self.nodes[id.index].kind {
            *current = text;
        }
    }

    fn is_attached(&self, mut id: NodeId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        loop {
            if id == ROOT {
                return true;
            }
            match self.nodes[id.index].parent {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        if !self.is_live(id) {
            return;
        }
        if let Some(parent) = self.nodes[id.index].parent.take() {
            self.nodes[parent.index].children.retain(|&child| child != id);
        }
    }

    /// Drop every node but the root and parse `html` as its new children.
    fn replace_children(&mut self, html: &str) {
        self.nodes.truncate(1);
        self.nodes[ROOT.index].children.clear();
        self.generation = self.generation.wrapping_add(1);
        parse_into(self, html);
    }

    fn serialize_children(&self, id: NodeId, out: &mut String) -> fmt::Result {
        for &child in &self.nodes[id.index].children {
            match &self.nodes[child.index].kind {
                NodeKind::Text(text) => escape_text(text, out)?,
                NodeKind::Element { tag, attrs } => {
                    out.push('<');
                    out.push_str(tag);
                    if !attrs.is_empty() {
                        out.push(' ');
                        out.push_str(attrs);
                    }
                    out.push('>');
                    if !is_void(tag) {
                        self.serialize_children(child, out)?;
                        out.push_str("</");
                        out.push_str(tag);
                        out.push('>');
                    }
                }
            }
        }
        Ok(())
    }

    fn collect_text_nodes(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[id.index].children {
            match self.nodes[child.index].kind {
                NodeKind::Text(_) => out.push(child),
                NodeKind::Element { .. } => self.collect_text_nodes(child, out),
            }
        }
    }
}

impl RegionDom for MemoryRegion {
    type Node = NodeId;

    fn inner_html(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.serialize_children(ROOT, &mut out);
        out
    }

    fn set_inner_html(&mut self, html: &str) {
        self.replace_children(html);
        // Replaced nodes take the selection with them; it falls back to the region start.
        if self.selection.is_some() {
            let start = Point {
                node: ROOT,
                offset: 0,
            };
            self.selection = Some((start, start));
        }
    }

    fn collapsed_caret(&self) -> Option<Caret<NodeId>> {
        if !self.focused {
            return None;
        }
        let (anchor, head) = self.selection?;
        if anchor != head || !self.is_attached(anchor.node) {
            return None;
        }
        match self.nodes[anchor.node.index].kind {
            NodeKind::Text(_) => Some(Caret::Text {
                node: anchor.node,
                offset: anchor.offset,
            }),
            NodeKind::Element { .. } if anchor.node == ROOT && anchor.offset == 0 => {
                Some(Caret::RegionStart)
            }
            NodeKind::Element { .. } => Some(Caret::Element {
                node: anchor.node,
                index: anchor.offset,
            }),
        }
    }

    fn insert_at_caret(&mut self, text: &str) -> Result<(), PlatformError> {
        let caret = self
            .collapsed_caret()
            .ok_or("no collapsed caret in region")?;
        let inserted = self.alloc(NodeKind::Text(text.to_string()), None);

        match caret {
            Caret::RegionStart => {
                self.nodes[inserted.index].parent = Some(ROOT);
                self.nodes[ROOT.index].children.insert(0, inserted);
            }
            Caret::Element { node, index } => {
                let index = index.min(self.nodes[node.index].children.len());
                self.nodes[inserted.index].parent = Some(node);
                self.nodes[node.index].children.insert(index, inserted);
            }
            Caret::Text { node, offset } => {
                let parent = self.nodes[node.index]
                    .parent
                    .ok_or("caret node is detached")?;
                let full = self.text_of(node);
                let split = char_to_byte(&full, offset);
                let (before, after) = full.split_at(split);
                let after = after.to_string();
                self.set_text(node, before.to_string());

                let index = self.nodes[parent.index]
                    .children
                    .iter()
                    .position(|&c| c == node)
                    .ok_or("caret node missing from parent")?;
                self.nodes[inserted.index].parent = Some(parent);
                self.nodes[parent.index].children.insert(index + 1, inserted);
                if !after.is_empty() {
                    let tail = self.alloc(NodeKind::Text(after), Some(parent));
                    self.nodes[parent.index].children.insert(index + 2, tail);
                }
            }
        }
        Ok(())
    }

    fn text_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_text_nodes(ROOT, &mut out);
        out
    }

    fn node_text(&self, node: &NodeId) -> String {
        self.text_of(*node)
    }

    fn set_node_text(&mut self, node: &NodeId, text: &str) {
        self.set_text(*node, text.to_string());
    }

    fn remove_node(&mut self, node: &NodeId) {
        self.detach(*node);
    }

    fn is_sole_child(&self, node: &NodeId) -> bool {
        self.nodes[ROOT.index].children.as_slice() == [*node]
    }

    fn place_caret(&mut self, caret: Caret<NodeId>) -> Result<(), PlatformError> {
        let point = match caret {
            Caret::RegionStart => Point {
                node: ROOT,
                offset: 0,
            },
            Caret::Text { node, offset } => {
                if !self.is_attached(node) {
                    return Err("caret node is detached".into());
                }
                if offset > self.text_of(node).chars().count() {
                    return Err(format!("offset {offset} past end of text node").into());
                }
                Point { node, offset }
            }
            Caret::Element { node, index } => {
                if !self.is_attached(node) {
                    return Err("caret node is detached".into());
                }
                if index > self.nodes[node.index].children.len() {
                    return Err(format!("child index {index} out of range").into());
                }
                Point {
                    node,
                    offset: index,
                }
            }
        };
        self.selection = Some((point, point));
        Ok(())
    }
}

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Parse `html` into children of the region root.
fn parse_into(region: &mut MemoryRegion, html: &str) {
    let mut stack = vec![ROOT];
    let mut rest = html;

    while !rest.is_empty() {
        let parent = *stack.last().unwrap_or(&ROOT);

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }

        if rest.starts_with('<') {
            if let Some(end) = rest.find('>') {
                let inner = &rest[1..end];
                rest = &rest[end + 1..];

                if let Some(name) = inner.strip_prefix('/') {
                    let name = name.trim().to_ascii_lowercase();
                    let open = stack.iter().rposition(|&id| {
                        id != ROOT
                            && matches!(
                                &region.nodes[id.index].kind,
                                NodeKind::Element { tag, .. } if *tag == name
                            )
                    });
                    if let Some(pos) = open {
                        stack.truncate(pos);
                    }
                    continue;
                }
                if inner.starts_with('!') || inner.starts_with('?') {
                    continue;
                }

                let self_closing = inner.ends_with('/');
                let inner = inner.trim_end_matches('/').trim();
                let (tag, attrs) = match inner.find(char::is_whitespace) {
                    Some(i) => (&inner[..i], inner[i..].trim()),
                    None => (inner, ""),
                };
                let tag = tag.to_ascii_lowercase();
                let void = self_closing || is_void(&tag);
                let id = region.alloc(
                    NodeKind::Element {
                        tag,
                        attrs: attrs.to_string(),
                    },
                    Some(parent),
                );
                region.nodes[parent.index].children.push(id);
                if !void {
                    stack.push(id);
                }
                continue;
            }
        }

        // Text runs up to the next tag; a lone '<' without '>' is text.
        let first = rest.chars().next().map_or(0, char::len_utf8);
        let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
        let text = decode_entities(&rest[..end]);
        rest = &rest[end..];
        if text.is_empty() {
            continue;
        }
        match region.nodes[parent.index].children.last().copied() {
            Some(last) if matches!(region.nodes[last.index].kind, NodeKind::Text(_)) => {
                let mut merged = region.text_of(last);
                merged.push_str(&text);
                region.set_text(last, merged);
            }
            _ => {
                let id = region.alloc(NodeKind::Text(text), Some(parent));
                region.nodes[parent.index].children.push(id);
            }
        }
    }
}

fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let c = match &rest[1..semi] {
                "amp" => '&',
                "lt" => '<',
                "gt" => '>',
                "quot" => '"',
                "apos" | "#39" => '\'',
                "nbsp" => '\u{a0}',
                name => {
                    let hex = name.strip_prefix("#x").or(name.strip_prefix("#X"));
                    let code = match hex {
                        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                        None => name.strip_prefix('#')?.parse().ok()?,
                    };
                    char::from_u32(code)?
                }
            };
            Some((c, semi + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text the way `innerHTML` serializes it, `&nbsp;` included.
fn escape_text(text: &str, out: &mut String) -> fmt::Result {
    let mut pieces = text.split('\u{a0}');
    if let Some(first) = pieces.next() {
        escape_html_body_text(FmtWriter(&mut *out), first)?;
    }
    for piece in pieces {
        out.push_str("&nbsp;");
        escape_html_body_text(FmtWriter(&mut *out), piece)?;
    }
    Ok(())
}
