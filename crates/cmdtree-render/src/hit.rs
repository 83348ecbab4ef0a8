//! Hit testing: point → node or template lookup.
//!
//! Live nodes are tested first, in creation order, then the palette: the
//! favourites, the current tray and finally the receptacles. The first
//! outline containing the point wins.

use crate::palette::PaletteLayout;
use cmdtree_core::layout::LayoutCache;
use cmdtree_core::{Document, NodeIndex, NodeKind, TemplateRef};
use kurbo::Point;

/// What a point landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Live(NodeIndex),
    Template(TemplateRef),
}

/// Find the first node or template under `pos` whose kind passes `filter`.
pub fn hit_test(
    doc: &Document,
    cache: &mut LayoutCache,
    palette: &PaletteLayout,
    pos: Point,
    filter: impl Fn(NodeKind) -> bool,
) -> Option<Hit> {
    for &idx in doc.actives() {
        if live_contains(doc, cache, idx, pos, &filter) {
            return Some(Hit::Live(idx));
        }
    }
    for (at, origin) in palette.templates() {
        let Some(template) = doc.template(at) else { continue };
        if filter(template.kind) && cache.template(template).contains((pos - origin).to_point()) {
            return Some(Hit::Template(at));
        }
    }
    doc.specials()
        .iter()
        .copied()
        .find(|&idx| live_contains(doc, cache, idx, pos, &filter))
        .map(Hit::Live)
}

/// Convenience: the first movable thing under `pos`. Fixed nodes never start
/// a drag.
pub fn hit_movable(doc: &Document, cache: &mut LayoutCache, palette: &PaletteLayout, pos: Point) -> Option<Hit> {
    hit_test(doc, cache, palette, pos, |kind| !kind.is_fixed())
}

fn live_contains(
    doc: &Document,
    cache: &mut LayoutCache,
    idx: NodeIndex,
    pos: Point,
    filter: &impl Fn(NodeKind) -> bool,
) -> bool {
    let Some(node) = doc.node(idx) else { return false };
    if !filter(node.kind) {
        return false;
    }
    let origin = node.position;
    cache
        .node(doc, idx)
        .is_some_and(|g| g.contains((pos - origin).to_point()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdtree_core::{Template, reflow};

    fn setup() -> (Document, LayoutCache, PaletteLayout) {
        let doc = Document::new();
        let mut cache = LayoutCache::new();
        let palette = PaletteLayout::compute(&doc, &mut cache, 800.0);
        (doc, cache, palette)
    }

    #[test]
    fn anchor_is_hit_but_not_movable() {
        let (doc, mut cache, palette) = setup();
        let pos = Point::new(100.0, 20.0);
        assert_eq!(hit_test(&doc, &mut cache, &palette, pos, |_| true), Some(Hit::Live(doc.anchor)));
        assert_eq!(hit_movable(&doc, &mut cache, &palette, pos), None);
    }

    #[test]
    fn attached_child_is_hit_before_background() {
        let (mut doc, mut cache, palette) = setup();
        let child = doc.spawn(&Template::new(NodeKind::Random), Point::ZERO);
        doc.attach(child, doc.anchor, "message", 0).unwrap();
        reflow(&mut doc, &mut cache);
        // Child origin is (20, 40).
        assert_eq!(hit_movable(&doc, &mut cache, &palette, Point::new(120.0, 50.0)), Some(Hit::Live(child)));
        assert_eq!(hit_movable(&doc, &mut cache, &palette, Point::new(15.0, 20.0)), None);
    }

    #[test]
    fn tray_templates_are_hit() {
        let (doc, mut cache, palette) = setup();
        // First Default tray item (text) at (570, 80).
        let hit = hit_movable(&doc, &mut cache, &palette, Point::new(650.0, 95.0));
        assert_eq!(hit, Some(Hit::Template(TemplateRef::Tray { tray: 0, item: 0 })));
        assert_eq!(hit_movable(&doc, &mut cache, &palette, Point::new(650.0, 25.0)), None);
    }
}
