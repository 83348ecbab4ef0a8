//! Document → flat display list.
//!
//! The editor core does not draw. It produces an ordered list of
//! [`PaintCmd`]s that a host (canvas 2D, vector renderer, test harness)
//! replays back to front: palette boxes and tabs, the receptacles, every
//! free-standing live tree, and finally the node being dragged.

use crate::palette::{PaletteBox, PaletteLayout, tab_outline};
use cmdtree_core::layout::{Geometry, LayoutCache};
use cmdtree_core::schema::labels;
use cmdtree_core::{Color, Document, Entry, NodeIndex, Template};
use kurbo::{BezPath, Point, Rect, Vec2};
use std::rc::Rc;

/// Longest label drawn, in characters.
pub const LABEL_CHARS: usize = 28;
pub const LABEL_X: f64 = 20.0;
pub const LABEL_MAX_WIDTH: f64 = 175.0;
/// Prefix marking a template node, nested children included.
pub const TEMPLATE_GLYPH: &str = "⯇ ";
/// Prefix marking a live node that can be dragged.
pub const HANDLE_GLYPH: &str = "⣿ ";

/// One drawing operation.
#[derive(Debug, Clone)]
pub enum PaintCmd {
    /// Fill a palette box and outline it.
    Panel { rect: Rect, fill: Color },
    /// Fill a tray tab and outline it.
    Tab { outline: BezPath, origin: Point, fill: Color },
    /// Fill a node outline and stroke it.
    Node { geometry: Rc<Geometry>, origin: Point, fill: Color },
    /// Left-aligned text, clipped to `max_width`.
    Label { text: String, at: Point, max_width: f64 },
}

/// Build the display list for the whole canvas.
pub fn paint_document(
    doc: &Document,
    cache: &mut LayoutCache,
    palette: &PaletteLayout,
    dragging: &[NodeIndex],
) -> Vec<PaintCmd> {
    let mut out = Vec::new();

    paint_box(&mut out, doc, cache, &palette.favorites);
    for tab in palette.tabs.iter().filter(|t| !t.current) {
        out.push(PaintCmd::Tab {
            outline: tab_outline(),
            origin: tab.origin,
            fill: tab.color,
        });
    }
    paint_box(&mut out, doc, cache, &palette.tray);
    // The current tab overlaps its neighbours.
    for tab in palette.tabs.iter().filter(|t| t.current) {
        out.push(PaintCmd::Tab {
            outline: tab_outline(),
            origin: tab.origin,
            fill: tab.color,
        });
    }

    for &idx in doc.specials() {
        paint_live(&mut out, doc, cache, idx);
    }
    for &idx in doc.actives() {
        if doc.parent(idx).is_none() && !dragging.contains(&idx) {
            paint_live(&mut out, doc, cache, idx);
        }
    }
    for &idx in dragging {
        paint_live(&mut out, doc, cache, idx);
    }

    log::trace!("paint: {} command(s)", out.len());
    out
}

fn paint_box(out: &mut Vec<PaintCmd>, doc: &Document, cache: &mut LayoutCache, panel: &PaletteBox) {
    out.push(PaintCmd::Panel {
        rect: panel.rect,
        fill: panel.color,
    });
    out.push(PaintCmd::Label {
        text: panel.caption.clone(),
        at: Point::new(panel.rect.x0 + 25.0, panel.rect.y0 + 19.0),
        max_width: LABEL_MAX_WIDTH,
    });
    for (at, origin) in &panel.items {
        if let Some(template) = doc.template(*at) {
            paint_template(out, cache, template, *origin);
        }
    }
}

fn paint_template(out: &mut Vec<PaintCmd>, cache: &mut LayoutCache, template: &Template, origin: Point) {
    let geometry = cache.template(template);
    let fill = template.color.unwrap_or(template.kind.descriptor().color);
    let mut text = labels(template.kind, &template.params, template.caption.as_deref());
    if let Some(first) = text.first_mut() {
        first.insert_str(0, TEMPLATE_GLYPH);
    }
    push_node(out, &geometry, origin, fill, &text);

    for (s, slot) in template.slots.iter().enumerate() {
        for (i, entry) in slot.iter().enumerate() {
            if let (Entry::Node(child), Some(c)) = (entry, geometry.connection(s, i)) {
                paint_template(out, cache, child, origin + c.offset);
            }
        }
    }
}

fn paint_live(out: &mut Vec<PaintCmd>, doc: &Document, cache: &mut LayoutCache, idx: NodeIndex) {
    let Some(node) = doc.node(idx) else { return };
    let Some(geometry) = cache.node(doc, idx) else { return };
    let mut text = labels(node.kind, &node.params, node.caption.as_deref());
    if !node.is_fixed()
        && let Some(first) = text.first_mut()
    {
        first.insert_str(0, HANDLE_GLYPH);
    }
    push_node(out, &geometry, node.position, node.color(), &text);

    for child in node.children() {
        paint_live(out, doc, cache, child);
    }
}

fn push_node(out: &mut Vec<PaintCmd>, geometry: &Rc<Geometry>, origin: Point, fill: Color, text: &[String]) {
    out.push(PaintCmd::Node {
        geometry: Rc::clone(geometry),
        origin,
        fill,
    });
    for (label, y) in text.iter().zip(&geometry.label_pos) {
        out.push(PaintCmd::Label {
            text: label.chars().take(LABEL_CHARS).collect(),
            at: origin + Vec2::new(LABEL_X, *y),
            max_width: LABEL_MAX_WIDTH,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdtree_core::{NodeKind, reflow};

    fn labels_of(cmds: &[PaintCmd]) -> Vec<String> {
        cmds.iter()
            .filter_map(|c| match c {
                PaintCmd::Label { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn glyphs_mark_templates_and_handles() {
        let mut doc = Document::new();
        let mut cache = LayoutCache::new();
        let t = Template::new(NodeKind::Delay).with("delay", "5");
        let idx = doc.spawn(&t, Point::new(100.0, 300.0));
        doc.attach(idx, doc.anchor, "message", 0).unwrap();
        reflow(&mut doc, &mut cache);
        let palette = PaletteLayout::compute(&doc, &mut cache, 800.0);
        let text = labels_of(&paint_document(&doc, &mut cache, &palette, &[]));
        assert!(text.contains(&"⯇ Delay 2 seconds".to_string()));
        assert!(text.contains(&"⣿ Delay 5 seconds".to_string()));
        assert!(text.contains(&"When !foo is typed...".to_string()));
    }

    #[test]
    fn nested_template_children_carry_the_glyph() {
        let mut doc = Document::new();
        let mut cache = LayoutCache::new();
        doc.add_favorite(
            Template::new(NodeKind::Delay)
                .with("delay", "3")
                .with_child("message", Template::new(NodeKind::Text).with("message", "soon")),
        );
        let palette = PaletteLayout::compute(&doc, &mut cache, 800.0);
        let text = labels_of(&paint_document(&doc, &mut cache, &palette, &[]));
        assert!(text.contains(&"⯇ Delay 3 seconds".to_string()));
        assert!(text.contains(&"⯇ soon".to_string()));
    }

    #[test]
    fn long_labels_are_truncated() {
        let mut doc = Document::new();
        let mut cache = LayoutCache::new();
        let t = Template::new(NodeKind::Text).with("message", "a".repeat(60));
        doc.spawn(&t, Point::new(100.0, 300.0));
        let palette = PaletteLayout::compute(&doc, &mut cache, 800.0);
        let text = labels_of(&paint_document(&doc, &mut cache, &palette, &[]));
        let long = text.iter().find(|l| l.starts_with(HANDLE_GLYPH)).unwrap();
        assert_eq!(long.chars().count(), LABEL_CHARS);
    }

    #[test]
    fn dragged_node_is_painted_last() {
        let mut doc = Document::new();
        let mut cache = LayoutCache::new();
        let a = doc.spawn(&Template::new(NodeKind::Random), Point::new(100.0, 300.0));
        let _b = doc.spawn(&Template::new(NodeKind::Random), Point::new(100.0, 400.0));
        let palette = PaletteLayout::compute(&doc, &mut cache, 800.0);
        let cmds = paint_document(&doc, &mut cache, &palette, &[a]);
        let last_node = cmds
            .iter()
            .rev()
            .find_map(|c| match c {
                PaintCmd::Node { origin, .. } => Some(*origin),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_node, Point::new(100.0, 300.0));
    }
}
