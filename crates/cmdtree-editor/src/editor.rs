//! Drag gesture controller.
//!
//! The [`Editor`] owns the document, the layout cache and the palette layout,
//! and turns pointer events into mutations. Each pointer runs its own
//! session:
//!
//! ```text
//! Idle ── down on template ──▶ Dragging (fresh copy)
//! Idle ── down on live node ─▶ Dragging (detached)
//! Dragging ── up ──▶ Attached | Favorited | Discarded | Trashed | Floating
//! ```
//!
//! Sessions refer to nodes by [`NodeId`], so a pointer whose node vanished
//! (imported over, discarded by another pointer) simply ends its gesture.

use crate::config::EditorConfig;
use crate::input::{InputEvent, PointerId};
use crate::props::{self, Field};
use crate::snap::{Snap, snap};
use crate::store::{Canonicalizer, MessageStore, StoreError};
use cmdtree_core::layout::{LayoutCache, reflow};
use cmdtree_core::{
    Document, EditError, Entry, ImportError, Locator, Message, NodeId, NodeIndex, decode, emit_document,
    emit_template,
};
use cmdtree_render::hit::{Hit, hit_movable, hit_test};
use cmdtree_render::paint::{PaintCmd, paint_document};
use cmdtree_render::palette::PaletteLayout;
use kurbo::{Point, Vec2};
use serde_json::Value;
use std::collections::HashMap;

/// One pointer's drag in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub node: NodeId,
    /// Pointer position relative to the node's origin when grabbed.
    pub grab: Vec2,
}

/// What a pointer-down did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    /// A drag started on this node (a fresh copy when a template was hit).
    Dragging(NodeIndex),
    TraySelected(usize),
    Nothing,
}

/// Where a dropped node ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Attached(Locator),
    /// Turned into a favourite; `added` is false for a duplicate.
    Favorited { added: bool },
    /// A fresh copy returned to the palette.
    Discarded,
    /// Put away in the trash receptacle.
    Trashed(Locator),
    /// Left unattached on the canvas.
    Floating,
}

pub struct Editor {
    pub doc: Document,
    pub cache: LayoutCache,
    pub config: EditorConfig,
    palette: PaletteLayout,
    drags: HashMap<PointerId, DragSession>,
}

impl Editor {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    pub fn with_document(doc: Document, config: EditorConfig) -> Self {
        let mut cache = LayoutCache::new();
        let palette = PaletteLayout::compute(&doc, &mut cache, config.canvas_width);
        let mut editor = Self {
            doc,
            cache,
            config,
            palette,
            drags: HashMap::new(),
        };
        editor.relayout();
        editor
    }

    pub fn palette(&self) -> &PaletteLayout {
        &self.palette
    }

    /// Recompute the palette, park the receptacles in it and reposition
    /// every attached node.
    pub fn relayout(&mut self) {
        self.palette = PaletteLayout::compute(&self.doc, &mut self.cache, self.config.canvas_width);
        let trash = self.doc.trash;
        if let Some(node) = self.doc.node_mut(trash) {
            node.position = self.palette.trash;
        }
        reflow(&mut self.doc, &mut self.cache);
    }

    /// Nodes currently held by some pointer.
    pub fn dragging(&self) -> Vec<NodeIndex> {
        self.drags.values().filter_map(|s| self.doc.index_of(s.node)).collect()
    }

    pub fn session(&self, pointer: PointerId) -> Option<&DragSession> {
        self.drags.get(&pointer)
    }

    // ─── Pointer events ──────────────────────────────────────────────────

    pub fn pointer_down(&mut self, pointer: PointerId, pos: Point) -> Result<Press, EditError> {
        if pos.x >= self.palette.tray_x {
            return Ok(match self.palette.tab_at(pos) {
                Some(tray) if self.select_tray(tray) => Press::TraySelected(tray),
                _ => Press::Nothing,
            });
        }
        if self.drags.contains_key(&pointer) {
            return Ok(Press::Nothing);
        }

        let idx = match hit_movable(&self.doc, &mut self.cache, &self.palette, pos) {
            None => return Ok(Press::Nothing),
            Some(Hit::Template(at)) => {
                let origin = self.palette.position_of(at).unwrap_or(pos);
                self.doc.spawn_template(at, origin)?
            }
            Some(Hit::Live(idx)) => {
                if self.dragging().contains(&idx) {
                    return Ok(Press::Nothing);
                }
                if self.doc.parent(idx).is_some() {
                    self.doc.detach(idx)?;
                }
                idx
            }
        };

        let node = self.doc.node(idx).ok_or(EditError::UnknownNode)?;
        let session = DragSession {
            node: node.id,
            grab: pos - node.position,
        };
        log::debug!("{pointer:?} grabbed {:?}", session.node);
        self.drags.insert(pointer, session);
        self.relayout();
        Ok(Press::Dragging(idx))
    }

    /// Move the held node, snapping onto nearby open connection points.
    pub fn pointer_move(&mut self, pointer: PointerId, pos: Point) -> Option<Snap> {
        let (idx, snapped) = self.resolve_drop(pointer, pos)?;
        self.doc.graph[idx].position = snapped.point;
        reflow(&mut self.doc, &mut self.cache);
        Some(snapped)
    }

    /// End the drag: favourite, discard, trash, attach or leave floating,
    /// depending on where the node is dropped.
    pub fn pointer_up(&mut self, pointer: PointerId, pos: Point) -> Result<Option<DropOutcome>, EditError> {
        let Some((idx, snapped)) = self.resolve_drop(pointer, pos) else {
            self.drags.remove(&pointer);
            return Ok(None);
        };
        self.drags.remove(&pointer);
        self.doc.graph[idx].position = snapped.point;
        let at = snapped.point;

        let outcome = if self.palette.in_band(at) {
            if self.palette.over_favorites(at) {
                let added = self.doc.favorite(idx)?;
                DropOutcome::Favorited { added }
            } else if self.doc.graph[idx].fresh {
                self.doc.discard(idx)?;
                DropOutcome::Discarded
            } else {
                match self.doc.first_open(self.doc.trash, 0) {
                    Some(slot) => {
                        self.doc.attach_at(idx, slot)?;
                        DropOutcome::Trashed(slot)
                    }
                    None => self.settle(idx),
                }
            }
        } else if let Some(target) = snapped.target {
            self.doc.attach_at(idx, target)?;
            DropOutcome::Attached(target)
        } else {
            self.settle(idx)
        };

        log::debug!("{pointer:?} dropped: {outcome:?}");
        self.relayout();
        Ok(Some(outcome))
    }

    /// The platform took the pointer away: a fresh copy is discarded, any
    /// other node stays where it is.
    pub fn pointer_cancel(&mut self, pointer: PointerId) -> Result<Option<DropOutcome>, EditError> {
        let Some(session) = self.drags.remove(&pointer) else {
            return Ok(None);
        };
        let Some(idx) = self.doc.index_of(session.node) else {
            return Ok(None);
        };
        let outcome = if self.doc.graph[idx].fresh {
            self.doc.discard(idx)?;
            DropOutcome::Discarded
        } else {
            self.settle(idx)
        };
        self.relayout();
        Ok(Some(outcome))
    }

    /// Dispatch one input event. Returns whether the canvas needs repainting.
    pub fn handle(&mut self, event: InputEvent) -> Result<bool, EditError> {
        match event {
            InputEvent::PointerDown { pointer, x, y } => {
                Ok(self.pointer_down(pointer, Point::new(x, y))? != Press::Nothing)
            }
            InputEvent::PointerMove { pointer, x, y } => Ok(self.pointer_move(pointer, Point::new(x, y)).is_some()),
            InputEvent::PointerUp { pointer, x, y } => Ok(self.pointer_up(pointer, Point::new(x, y))?.is_some()),
            InputEvent::PointerCancel { pointer } => Ok(self.pointer_cancel(pointer)?.is_some()),
        }
    }

    fn resolve_drop(&mut self, pointer: PointerId, pos: Point) -> Option<(NodeIndex, Snap)> {
        let session = *self.drags.get(&pointer)?;
        let idx = self.doc.index_of(session.node)?;
        let snapped = snap(
            &self.doc,
            &mut self.cache,
            pos - session.grab,
            Some(idx),
            self.config.snap_range,
        );
        Some((idx, snapped))
    }

    fn settle(&mut self, idx: NodeIndex) -> DropOutcome {
        self.doc.graph[idx].fresh = false;
        DropOutcome::Floating
    }

    // ─── Palette ─────────────────────────────────────────────────────────

    /// Show another tray. Returns false for an unknown or already shown tray.
    pub fn select_tray(&mut self, tray: usize) -> bool {
        if tray >= self.doc.trays.len() || tray == self.doc.current_tray {
            return false;
        }
        self.doc.current_tray = tray;
        self.relayout();
        true
    }

    // ─── Properties ──────────────────────────────────────────────────────

    /// The live node under `pos`, fixed ones included.
    pub fn node_at(&mut self, pos: Point) -> Option<NodeIndex> {
        match hit_test(&self.doc, &mut self.cache, &self.palette, pos, |_| true)? {
            Hit::Live(idx) => Some(idx),
            Hit::Template(_) => None,
        }
    }

    pub fn fields(&self, idx: NodeIndex) -> Option<Vec<Field>> {
        props::fields(&self.doc, idx)
    }

    pub fn apply(&mut self, idx: NodeIndex, values: &[(&str, Option<Value>)]) -> Result<(), EditError> {
        props::apply(&mut self.doc, idx, values)?;
        self.relayout();
        Ok(())
    }

    // ─── Painting ────────────────────────────────────────────────────────

    pub fn paint(&mut self) -> Vec<PaintCmd> {
        let dragging = self.dragging();
        paint_document(&self.doc, &mut self.cache, &self.palette, &dragging)
    }

    // ─── Import / export ─────────────────────────────────────────────────

    pub fn export(&self) -> Message {
        emit_document(&self.doc)
    }

    /// Rebuild the live tree from `msg`. Drags in progress are abandoned.
    pub fn import(&mut self, msg: &Message) {
        self.drags.clear();
        self.doc.import_message(msg);
        self.relayout();
    }

    /// Parse and import message text. Malformed text changes nothing.
    pub fn import_json(&mut self, text: &str) -> Result<(), ImportError> {
        let msg = cmdtree_core::parse_message(text)?;
        self.import(&msg);
        Ok(())
    }

    pub fn save_favorites(&self, store: &mut impl MessageStore) -> Result<(), StoreError> {
        let messages: Vec<Message> = self.doc.favorites.iter().map(emit_template).collect();
        store.save(&messages)
    }

    /// Add every stored favourite not already present. Returns how many
    /// were added.
    pub fn load_favorites(&mut self, store: &impl MessageStore) -> Result<usize, StoreError> {
        let messages = store.load()?;
        let registry = self.doc.registry_handle();
        let mut added = 0;
        for msg in &messages {
            if let Entry::Node(template) = decode(&registry, msg)
                && self.doc.add_favorite(template)
            {
                added += 1;
            }
        }
        self.relayout();
        Ok(added)
    }

    /// Export, canonicalize, and check that both encodings decode to
    /// equivalent trees.
    pub fn validate_with(&self, canonicalizer: &impl Canonicalizer, context: &str) -> Result<bool, StoreError> {
        let ours = self.export();
        let theirs = canonicalizer.canonicalize(&ours, context)?;

        let registry = self.doc.registry_handle();
        let mut a = Document::with_registry(registry.clone());
        a.import_message(&ours);
        let mut b = Document::with_registry(registry);
        b.import_message(&theirs);

        let same = match (a.demote(a.anchor), b.demote(b.anchor)) {
            (Some(x), Some(y)) => x.is_equivalent(&y),
            _ => false,
        };
        if !same {
            log::warn!("canonical form differs: {theirs}");
        }
        Ok(same)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
