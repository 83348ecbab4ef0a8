//! Node geometry and the layout cache.
//!
//! Every node is a fixed-width block: a header, then for each child slot a
//! column of connection points (each as tall as whatever occupies it) and a
//! small gap, with a separator bar between slots. Geometry only depends on the
//! kind and on the heights of the children, so it is cached under a
//! structural fingerprint and shared between nodes that differ only in text
//! or colour. The cache is never evicted.

use crate::model::{Document, Entry};
use crate::schema::NodeKind;
use crate::template::Template;
use kurbo::{Arc, BezPath, Point, Shape, Vec2};
use petgraph::graph::NodeIndex;
use smallvec::{SmallVec, smallvec};
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt::Write as _;
use std::rc::Rc;

pub const NODE_WIDTH: f64 = 200.0;
pub const HEADER_HEIGHT: f64 = 30.0;
pub const SEPARATOR_HEIGHT: f64 = 20.0;
/// Height reserved for an open connection point.
pub const EMPTY_HEIGHT: f64 = 30.0;
/// Room left under the last entry of a slot.
pub const SLOT_GAP: f64 = 10.0;
/// Horizontal offset of child connection points.
pub const CONNECTOR_X: f64 = 10.0;
const TAB_RADIUS: f64 = 10.0;
const TOLERANCE: f64 = 0.1;

/// Heights of each entry, per slot.
pub type Profile = SmallVec<[Vec<f64>; 2]>;

/// A point where a child can attach, relative to the node's origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub slot: usize,
    pub index: usize,
    pub offset: Vec2,
}

/// Computed shape of one node.
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Outline in node-local coordinates.
    pub outline: BezPath,
    /// One per slot entry, slot by slot, in order.
    pub connections: Vec<Connection>,
    pub total_height: f64,
    /// Baseline of each slot's label.
    pub label_pos: SmallVec<[f64; 2]>,
}

impl Geometry {
    /// Build the outline for `kind` given the heights of its slot entries.
    pub fn build(kind: NodeKind, profile: &Profile) -> Self {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((NODE_WIDTH, 0.0));
        path.line_to((NODE_WIDTH, HEADER_HEIGHT));

        let mut y = HEADER_HEIGHT;
        let mut connections = Vec::new();
        let mut label_pos: SmallVec<[f64; 2]> = smallvec![20.0];

        for (slot, heights) in profile.iter().enumerate() {
            if slot > 0 {
                path.line_to((NODE_WIDTH, y));
                y += SEPARATOR_HEIGHT;
                path.line_to((NODE_WIDTH, y));
                label_pos.push(y - 5.0);
            }
            for (index, height) in heights.iter().enumerate() {
                connections.push(Connection {
                    slot,
                    index,
                    offset: Vec2::new(CONNECTOR_X, y),
                });
                path.line_to((CONNECTOR_X, y));
                path.line_to((CONNECTOR_X, y + 5.0));
                // Tab bulging into the body where the child's notch sits.
                let tab = Arc {
                    center: Point::new(CONNECTOR_X, y + 15.0),
                    radii: Vec2::new(TAB_RADIUS, TAB_RADIUS),
                    start_angle: 3.0 * FRAC_PI_2,
                    sweep_angle: PI,
                    x_rotation: 0.0,
                };
                path.extend(tab.append_iter(TOLERANCE));
                y += height;
                path.line_to((CONNECTOR_X, y));
            }
            y += SLOT_GAP;
            path.line_to((CONNECTOR_X, y));
        }

        path.line_to((0.0, y));
        path.line_to((0.0, HEADER_HEIGHT));
        if !kind.is_fixed() {
            path.line_to((0.0, 25.0));
            let notch = Arc {
                center: Point::new(0.0, 15.0),
                radii: Vec2::new(TAB_RADIUS, TAB_RADIUS),
                start_angle: FRAC_PI_2,
                sweep_angle: -PI,
                x_rotation: 0.0,
            };
            path.extend(notch.append_iter(TOLERANCE));
        }
        path.close_path();

        Self {
            outline: path,
            connections,
            total_height: y,
            label_pos,
        }
    }

    /// Hit test in node-local coordinates.
    pub fn contains(&self, local: Point) -> bool {
        self.outline.contains(local)
    }

    pub fn connection(&self, slot: usize, index: usize) -> Option<&Connection> {
        self.connections.iter().find(|c| c.slot == slot && c.index == index)
    }
}

/// Cache key: the kind name followed by `[h1,h2,...]` for each slot.
pub fn fingerprint(kind: NodeKind, profile: &Profile) -> String {
    let mut key = kind.name().to_string();
    for heights in profile {
        key.push('[');
        for (i, h) in heights.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            let _ = write!(key, "{h}");
        }
        key.push(']');
    }
    key
}

// ─── Cache ───────────────────────────────────────────────────────────────

/// Memoized geometry, keyed by structural fingerprint. Unbounded.
#[derive(Debug, Default)]
pub struct LayoutCache {
    entries: HashMap<String, Rc<Geometry>>,
}

impl LayoutCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Geometry for `kind` with the given entry heights.
    pub fn geometry(&mut self, kind: NodeKind, profile: Profile) -> Rc<Geometry> {
        let key = fingerprint(kind, &profile);
        if let Some(g) = self.entries.get(&key) {
            return Rc::clone(g);
        }
        log::trace!("layout cache miss: {key}");
        let g = Rc::new(Geometry::build(kind, &profile));
        self.entries.insert(key, Rc::clone(&g));
        g
    }

    /// Geometry of a live node (recursing into its children).
    pub fn node(&mut self, doc: &Document, idx: NodeIndex) -> Option<Rc<Geometry>> {
        let node = doc.node(idx)?;
        let profile = node
            .slots
            .iter()
            .map(|slot| {
                slot.iter()
                    .map(|entry| match entry {
                        Entry::Empty => EMPTY_HEIGHT,
                        Entry::Node(child) => self.node(doc, *child).map_or(EMPTY_HEIGHT, |g| g.total_height),
                    })
                    .collect()
            })
            .collect();
        Some(self.geometry(node.kind, profile))
    }

    /// Geometry of a template.
    pub fn template(&mut self, template: &Template) -> Rc<Geometry> {
        let profile = template
            .slots
            .iter()
            .map(|slot| {
                slot.iter()
                    .map(|entry| match entry {
                        Entry::Empty => EMPTY_HEIGHT,
                        Entry::Node(child) => self.template(child).total_height,
                    })
                    .collect()
            })
            .collect();
        self.geometry(template.kind, profile)
    }
}

// ─── Placement ───────────────────────────────────────────────────────────

/// Position every attached node at its parent's connection point. Free
/// roots (the anchor, receptacles, floating nodes) keep their position.
pub fn reflow(doc: &mut Document, cache: &mut LayoutCache) {
    let roots: Vec<NodeIndex> = doc
        .actives()
        .iter()
        .chain(doc.specials())
        .copied()
        .filter(|n| doc.parent(*n).is_none())
        .collect();
    for root in roots {
        place_children(doc, cache, root);
    }
}

fn place_children(doc: &mut Document, cache: &mut LayoutCache, idx: NodeIndex) {
    let Some(geometry) = cache.node(doc, idx) else {
        return;
    };
    let origin = doc.graph[idx].position;
    let placed: Vec<(Vec2, NodeIndex)> = geometry
        .connections
        .iter()
        .filter_map(|c| {
            let child = doc.graph[idx].slots.get(c.slot)?.get(c.index)?.get()?;
            Some((c.offset, child))
        })
        .collect();
    for (offset, child) in placed {
        doc.graph[child].position = origin + offset;
        place_children(doc, cache, child);
    }
}
