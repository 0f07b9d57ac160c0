//! Caret-preserving rewrites.
//!
//! A rewrite may regenerate the whole region, which destroys the text nodes
//! the selection points into. [`perform_rewrite`] drops a marker character at
//! the caret first, lets the callback do whatever it likes, then finds the
//! marker again in the result and puts the caret back in its place.
//!
//! Failure is never reported as an error: without a collapsed caret in the
//! region the rewrite is skipped, and if the callback loses the marker the
//! caret is simply left wherever the host put it.

use crate::marker::{self, MARKER};
use crate::platform::{Caret, RegionDom};

/// What happened to the caret during a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome<N> {
    /// No collapsed caret in the region; the callback was not invoked.
    Skipped,
    /// The callback ran but no marker survived it.
    MarkerLost,
    /// The caret was reinstalled at this position.
    Restored(Caret<N>),
}

impl<N> RewriteOutcome<N> {
    /// Whether the callback was invoked.
    pub fn ran(&self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

/// Run `rewrite` against `region` while keeping the caret at the same logical spot.
///
/// The callback sees the region with a marker text node at the caret. It must
/// keep the marker character if it keeps the surrounding text.
pub fn perform_rewrite<R, F>(region: &mut R, rewrite: F) -> RewriteOutcome<R::Node>
where
    R: RegionDom,
    F: FnOnce(&mut R),
{
    if region.collapsed_caret().is_none() {
        tracing::trace!(target: "retype::mutator", "no collapsed caret in region, skipping");
        return RewriteOutcome::Skipped;
    }

    let mut marker_buf = [0u8; 4];
    if let Err(e) = region.insert_at_caret(MARKER.encode_utf8(&mut marker_buf)) {
        tracing::warn!(target: "retype::mutator", error = %e, "failed to insert caret marker");
        return RewriteOutcome::Skipped;
    }

    rewrite(region);
    region.normalize();

    let Some((node, text)) = find_marker_node(region) else {
        tracing::debug!(target: "retype::mutator", "marker lost during rewrite");
        return RewriteOutcome::MarkerLost;
    };

    let caret = if region.is_sole_child(&node) && text.chars().all(|c| c == MARKER) {
        // Some engines draw the caret in the wrong place next to an orphaned
        // text node, so anchor it on the region itself.
        region.remove_node(&node);
        Caret::RegionStart
    } else {
        let index = marker::marker_index(&text).unwrap_or(0);
        let offset = region.measure(&text[..index]);
        region.set_node_text(&node, &marker::strip_markers(&text));
        Caret::Text { node, offset }
    };

    // Any other copies the callback left behind must go too.
    strip_stray_markers(region);

    if let Err(e) = region.place_caret(caret.clone()) {
        tracing::warn!(target: "retype::mutator", error = %e, "failed to restore caret");
        return RewriteOutcome::MarkerLost;
    }

    tracing::trace!(target: "retype::mutator", ?caret, "caret restored");
    RewriteOutcome::Restored(caret)
}

/// First text node, in depth-first order, containing the marker.
fn find_marker_node<R: RegionDom>(region: &R) -> Option<(R::Node, String)> {
    region.text_nodes().into_iter().find_map(|node| {
        let text = region.node_text(&node);
        marker::contains_marker(&text).then_some((node, text))
    })
}

fn strip_stray_markers<R: RegionDom>(region: &mut R) {
    for node in region.text_nodes() {
        let text = region.node_text(&node);
        if marker::contains_marker(&text) {
            region.set_node_text(&node, &marker::strip_markers(&text));
        }
    }
}
