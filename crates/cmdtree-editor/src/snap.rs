//! Snap resolver.
//!
//! Open connection points are scanned in a fixed order: live nodes in
//! creation order, then the receptacles, each node's points slot by slot.
//! The first point within range wins even when a later one is closer, so
//! drop behaviour depends only on that order.

use cmdtree_core::layout::LayoutCache;
use cmdtree_core::{Document, Entry, Locator, NodeIndex};
use kurbo::Point;

/// Where a drag position ends up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    /// The connection point, or the unchanged position when nothing matched.
    pub point: Point,
    pub target: Option<Locator>,
}

/// Resolve `pos` against every open connection point within `range`
/// (squared distance). Points inside `dragging`'s subtree are skipped.
pub fn snap(
    doc: &Document,
    cache: &mut LayoutCache,
    pos: Point,
    dragging: Option<NodeIndex>,
    range: f64,
) -> Snap {
    for &idx in doc.actives().iter().chain(doc.specials()) {
        if dragging.is_some_and(|d| doc.is_within(idx, d)) {
            continue;
        }
        let (Some(node), Some(geometry)) = (doc.node(idx), cache.node(doc, idx)) else {
            continue;
        };
        for c in &geometry.connections {
            let open = node
                .slots
                .get(c.slot)
                .and_then(|s| s.get(c.index))
                .is_some_and(Entry::is_empty);
            if !open {
                continue;
            }
            let point = node.position + c.offset;
            if (point - pos).hypot2() <= range {
                log::trace!("snap {pos:?} → {:?} slot {} [{}]", node.id, c.slot, c.index);
                return Snap {
                    point,
                    target: Some(Locator {
                        parent: idx,
                        slot: c.slot,
                        index: c.index,
                    }),
                };
            }
        }
    }
    Snap {
        point: pos,
        target: None,
    }
}
