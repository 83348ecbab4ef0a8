//! Mutation engine for the live document.
//!
//! Every slot always ends with an open entry, and no two open entries are
//! adjacent anywhere else. `attach` and `detach` keep both properties, along
//! with the child → parent locators, after every call. Precondition failures
//! are reported as [`EditError`] and leave the document untouched.

use crate::error::EditError;
use crate::model::{Document, Entry, Locator, Node, Slot};
use crate::schema::ValueDomain;
use crate::template::{Template, TemplateRef};
use kurbo::Point;
use petgraph::graph::NodeIndex;
use serde_json::Value;
use std::collections::HashSet;

/// Collapse runs of open entries and make sure exactly one trails the slot.
pub fn normalize_slot<T>(entries: impl IntoIterator<Item = Entry<T>>) -> Vec<Entry<T>> {
    let mut out: Vec<Entry<T>> = Vec::new();
    for entry in entries {
        if entry.is_empty() && out.last().is_some_and(Entry::is_empty) {
            continue;
        }
        out.push(entry);
    }
    if !out.last().is_some_and(Entry::is_empty) {
        out.push(Entry::Empty);
    }
    out
}

impl Document {
    /// Add a detached node to the arena, at the end of the creation order.
    pub(crate) fn insert(&mut self, node: Node) -> NodeIndex {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.actives.push(idx);
        idx
    }

    /// Replace slot `slot` of `parent` with `entries` (normalized) and point
    /// every occupant back at its position. Occupants must be detached.
    pub(crate) fn install_slot(
        &mut self,
        parent: NodeIndex,
        slot: usize,
        entries: impl IntoIterator<Item = Entry<NodeIndex>>,
    ) {
        let entries = normalize_slot(entries);
        for (index, entry) in entries.iter().enumerate() {
            if let Entry::Node(child) = *entry {
                self.graph[child].parent = Some(Locator { parent, slot, index });
                self.graph.add_edge(parent, child, slot);
            }
        }
        self.graph[parent].slots[slot] = entries;
    }

    /// Rewrite the locators of every occupant of a slot after a shift.
    fn reindex_slot(&mut self, parent: NodeIndex, slot: usize) {
        let occupants: Vec<(usize, NodeIndex)> = self.graph[parent].slots[slot]
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.get().map(|c| (i, c)))
            .collect();
        for (index, child) in occupants {
            self.graph[child].parent = Some(Locator { parent, slot, index });
        }
    }

    // ─── Spawn ───────────────────────────────────────────────────────────

    /// Deep-clone `template` into the live document as a fresh, unattached
    /// node at `at`.
    pub fn spawn(&mut self, template: &Template, at: Point) -> NodeIndex {
        let idx = self.instantiate(template);
        let node = &mut self.graph[idx];
        node.fresh = true;
        node.position = at;
        log::debug!("spawn {:?} ({})", node.id, node.kind);
        idx
    }

    /// Spawn a copy of a favourite or tray item.
    pub fn spawn_template(&mut self, source: TemplateRef, at: Point) -> Result<NodeIndex, EditError> {
        let template = self.template(source).cloned().ok_or(EditError::UnknownTemplate)?;
        Ok(self.spawn(&template, at))
    }

    pub(crate) fn instantiate(&mut self, template: &Template) -> NodeIndex {
        let mut node = Node::new(template.kind);
        node.params = template.params.clone();
        node.caption = template.caption.clone();
        node.color = template.color;
        node.raw = template.raw.clone();
        let slot_count = node.slots.len();
        let idx = self.insert(node);

        for (s, slot) in template.slots.iter().take(slot_count).enumerate() {
            let mut entries: Slot = Vec::with_capacity(slot.len());
            for entry in slot {
                match entry {
                    Entry::Empty => entries.push(Entry::Empty),
                    Entry::Node(child) => {
                        let c = self.instantiate(child);
                        entries.push(Entry::Node(c));
                    }
                }
            }
            self.install_slot(idx, s, entries);
        }
        idx
    }

    // ─── Detach / attach ─────────────────────────────────────────────────

    /// Take `idx` out of its parent's slot, leaving an open entry behind and
    /// collapsing any run of open entries that creates.
    ///
    /// Returns the number of merges performed (at most two).
    pub fn detach(&mut self, idx: NodeIndex) -> Result<usize, EditError> {
        let node = self.node(idx).ok_or(EditError::UnknownNode)?;
        if node.is_fixed() {
            return Err(EditError::Fixed(node.id));
        }
        let Some(loc) = node.parent else {
            return Err(EditError::NotAttached(node.id));
        };
        let id = node.id;

        if let Some(edge) = self.graph.find_edge(loc.parent, idx) {
            self.graph.remove_edge(edge);
        }
        self.graph[idx].parent = None;

        let slot = &mut self.graph[loc.parent].slots[loc.slot];
        let i = loc.index;
        slot[i] = Entry::Empty;
        let mut merges = 0;
        while i > 0 && slot[i - 1].is_empty() && slot.get(i).is_some_and(Entry::is_empty) {
            slot.remove(i);
            merges += 1;
        }
        if slot.get(i).is_some_and(Entry::is_empty) && slot.get(i + 1).is_some_and(Entry::is_empty) {
            slot.remove(i);
            merges += 1;
        }
        if merges > 0 {
            log::trace!("compacted slot {} of {:?}: {merges} merge(s)", loc.slot, loc.parent);
            self.reindex_slot(loc.parent, loc.slot);
        }
        log::debug!("detach {id:?}");
        Ok(merges)
    }

    /// Put a detached node into an open entry of `parent`'s slot named `slot`.
    pub fn attach(&mut self, idx: NodeIndex, parent: NodeIndex, slot: &str, index: usize) -> Result<(), EditError> {
        let target = self.node(parent).ok_or(EditError::UnknownNode)?;
        let s = target.descriptor().slot_index(slot).ok_or_else(|| EditError::NoSuchSlot {
            kind: target.kind,
            slot: slot.to_string(),
        })?;
        self.attach_at(idx, Locator { parent, slot: s, index })
    }

    /// [`Document::attach`] with the slot given by position.
    pub fn attach_at(&mut self, idx: NodeIndex, loc: Locator) -> Result<(), EditError> {
        let node = self.node(idx).ok_or(EditError::UnknownNode)?;
        if node.is_fixed() {
            return Err(EditError::Fixed(node.id));
        }
        if node.parent.is_some() {
            return Err(EditError::StillAttached(node.id));
        }
        let id = node.id;

        let target = self.node(loc.parent).ok_or(EditError::UnknownNode)?;
        let desc = target.descriptor();
        let Some(slot_name) = desc.slots.get(loc.slot) else {
            return Err(EditError::NoSuchSlot {
                kind: target.kind,
                slot: loc.slot.to_string(),
            });
        };
        let entries = &target.slots[loc.slot];
        match entries.get(loc.index) {
            None => {
                return Err(EditError::IndexOutOfRange {
                    slot: slot_name.to_string(),
                    index: loc.index,
                });
            }
            Some(Entry::Node(_)) => {
                return Err(EditError::Occupied {
                    slot: slot_name.to_string(),
                    index: loc.index,
                });
            }
            Some(Entry::Empty) => {}
        }
        let was_last = loc.index + 1 == entries.len();
        if self.is_within(loc.parent, idx) {
            return Err(EditError::Cycle(id));
        }

        self.graph[loc.parent].slots[loc.slot][loc.index] = Entry::Node(idx);
        if was_last {
            self.graph[loc.parent].slots[loc.slot].push(Entry::Empty);
        }
        self.graph.add_edge(loc.parent, idx, loc.slot);
        let node = &mut self.graph[idx];
        node.parent = Some(loc);
        node.fresh = false;
        log::debug!("attach {id:?} → {:?}[{slot_name}][{}]", loc.parent, loc.index);
        Ok(())
    }

    /// First open entry of `parent`'s slot `slot`.
    pub fn first_open(&self, parent: NodeIndex, slot: usize) -> Option<Locator> {
        let index = self.node(parent)?.slots.get(slot)?.iter().position(Entry::is_empty)?;
        Some(Locator { parent, slot, index })
    }

    // ─── Removal ─────────────────────────────────────────────────────────

    /// Remove a fresh, never-placed node (and its subtree) from the document.
    ///
    /// Resolved by identity, so several pointers may each hold a fresh node
    /// and drop them back in any order.
    pub fn discard(&mut self, idx: NodeIndex) -> Result<(), EditError> {
        let node = self.node(idx).ok_or(EditError::UnknownNode)?;
        if node.is_fixed() {
            return Err(EditError::Fixed(node.id));
        }
        if node.parent.is_some() {
            return Err(EditError::StillAttached(node.id));
        }
        if !node.fresh {
            return Err(EditError::NotFresh(node.id));
        }
        log::debug!("discard {:?}", node.id);
        self.remove_subtree(idx);
        Ok(())
    }

    /// Turn a detached node into a favourite template and drop it from the
    /// live document. The favourite keeps the node's kind and parameters;
    /// every child slot is blanked to a single open entry. Returns `false`
    /// when an equivalent favourite already existed (the node is still
    /// removed).
    pub fn favorite(&mut self, idx: NodeIndex) -> Result<bool, EditError> {
        let node = self.node(idx).ok_or(EditError::UnknownNode)?;
        if node.is_fixed() {
            return Err(EditError::Fixed(node.id));
        }
        if node.parent.is_some() {
            return Err(EditError::StillAttached(node.id));
        }
        let id = node.id;
        let mut template = self.demote(idx).ok_or(EditError::UnknownNode)?;
        for slot in template.slots.iter_mut() {
            *slot = vec![Entry::Empty];
        }
        self.remove_subtree(idx);
        let added = self.add_favorite(template);
        log::debug!("favorite {id:?} (added: {added})");
        Ok(added)
    }

    /// Remove `idx` and its descendants from the arena and creation order.
    pub(crate) fn remove_subtree(&mut self, idx: NodeIndex) {
        let doomed: HashSet<NodeIndex> = self.subtree(idx).into_iter().collect();
        for n in &doomed {
            if let Some(node) = self.graph.remove_node(*n) {
                self.id_index.remove(&node.id);
            }
        }
        self.actives.retain(|a| !doomed.contains(a));
    }

    /// Drop every live node except the anchor, and empty the anchor and the
    /// trash receptacle.
    pub fn truncate(&mut self) {
        let keep = [self.anchor, self.trash];
        let doomed: Vec<NodeIndex> = self.actives.iter().copied().filter(|n| !keep.contains(n)).collect();
        for n in doomed {
            if let Some(node) = self.graph.remove_node(n) {
                self.id_index.remove(&node.id);
            }
        }
        self.actives.retain(|a| keep.contains(a));
        for r in keep {
            for slot in self.graph[r].slots.iter_mut() {
                *slot = vec![Entry::Empty];
            }
        }
        log::debug!("truncate document");
    }

    // ─── Parameters ──────────────────────────────────────────────────────

    /// Write (or clear, with `None`) the value of an editable parameter.
    /// The value must be one the parameter's domain accepts, so the node
    /// still decodes as its own kind after export.
    pub fn set_param(&mut self, idx: NodeIndex, attr: &str, value: Option<Value>) -> Result<(), EditError> {
        let node = self.node_mut(idx).ok_or(EditError::UnknownNode)?;
        let desc = node.descriptor();
        let i = desc.param_index(attr).ok_or_else(|| EditError::NoSuchParam {
            kind: node.kind,
            attr: attr.to_string(),
        })?;
        if let ValueDomain::Fixed(_) = desc.params[i].domain {
            return Err(EditError::ReadOnlyParam {
                kind: node.kind,
                attr: attr.to_string(),
            });
        }
        if !desc.params[i].accepts(value.as_ref()) {
            return Err(EditError::InvalidValue {
                kind: node.kind,
                attr: attr.to_string(),
            });
        }
        node.params[i] = value;
        Ok(())
    }
}
