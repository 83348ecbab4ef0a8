//! Templates: detached, structural copies of nodes.
//!
//! Trays and favourites hold templates; dragging one out spawns a live copy.
//! Templates are also what the emitter and the equivalence checker operate on,
//! so live subtrees are demoted to a template first.

use crate::model::{Document, Entry, Message};
use crate::schema::{Color, NodeKind, ValueDomain};
use crate::tree::normalize_slot;
use petgraph::graph::NodeIndex;
use serde_json::Value;
use smallvec::SmallVec;

/// A node detached from any document. Slots own their children directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub kind: NodeKind,
    pub params: SmallVec<[Option<Value>; 3]>,
    pub slots: SmallVec<[Vec<Entry<Template>>; 2]>,
    pub caption: Option<String>,
    pub color: Option<Color>,
    pub raw: Option<Message>,
}

impl Template {
    /// A template of `kind` with constants filled in and empty slots.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        let desc = kind.descriptor();
        Self {
            kind,
            params: desc
                .params
                .iter()
                .map(|p| match p.domain {
                    ValueDomain::Fixed(c) => Some(Value::String(c.to_string())),
                    _ => None,
                })
                .collect(),
            slots: desc.slots.iter().map(|_| vec![Entry::Empty]).collect(),
            caption: None,
            color: None,
            raw: None,
        }
    }

    /// Set a declared parameter. Unknown names are ignored.
    #[must_use]
    pub fn with(mut self, attr: &str, value: impl Into<Value>) -> Self {
        if let Some(i) = self.kind.descriptor().param_index(attr) {
            self.params[i] = Some(value.into());
        }
        self
    }

    /// Append a child to the named slot, ahead of the trailing open entry.
    #[must_use]
    pub fn with_child(mut self, slot: &str, child: Template) -> Self {
        if let Some(i) = self.kind.descriptor().slot_index(slot) {
            let entries = std::mem::take(&mut self.slots[i]);
            let mut occupied: Vec<Entry<Template>> = entries.into_iter().filter(|e| !e.is_empty()).collect();
            occupied.push(Entry::Node(child));
            self.slots[i] = normalize_slot(occupied);
        }
        self
    }

    pub fn param(&self, attr: &str) -> Option<&Value> {
        let i = self.kind.descriptor().param_index(attr)?;
        self.params.get(i).and_then(Option::as_ref)
    }

    /// Occupied entries of slot `slot`, in order.
    pub fn occupants(&self, slot: usize) -> impl Iterator<Item = &Template> + '_ {
        self.slots
            .get(slot)
            .into_iter()
            .flat_map(|s| s.iter().filter_map(Entry::node))
    }

    /// A group holding one occupant or none. It encodes exactly like its
    /// occupant (or like nothing at all), so it is spliced away wherever
    /// trees are emitted or compared.
    pub fn is_degenerate_group(&self) -> bool {
        self.kind == NodeKind::Group && self.occupants(0).nth(1).is_none()
    }

    /// Occupants of slot `slot` with degenerate groups replaced by whatever
    /// they hold.
    pub fn spliced_occupants(&self, slot: usize) -> Vec<&Template> {
        let mut out = Vec::new();
        for t in self.occupants(slot) {
            t.splice_into(&mut out);
        }
        out
    }

    fn splice_into<'a>(&'a self, out: &mut Vec<&'a Template>) {
        if self.is_degenerate_group() {
            for t in self.occupants(0) {
                t.splice_into(out);
            }
        } else {
            out.push(self);
        }
    }

    fn unwrapped(&self) -> &Template {
        match self.occupants(0).next() {
            Some(only) if self.is_degenerate_group() => only.unwrapped(),
            _ => self,
        }
    }

    /// Structural equivalence: same kind, equal parameters, and pairwise
    /// equivalent occupants in every slot. Open entries, positions and
    /// colours are ignored, and degenerate groups count as their contents.
    pub fn is_equivalent(&self, other: &Template) -> bool {
        let (a, b) = (self.unwrapped(), other.unwrapped());
        if a.kind != b.kind || a.params != b.params {
            return false;
        }
        if a.kind == NodeKind::Unrecognized && a.raw != b.raw {
            return false;
        }
        (0..a.slots.len().max(b.slots.len())).all(|s| {
            let (xs, ys) = (a.spliced_occupants(s), b.spliced_occupants(s));
            xs.len() == ys.len() && xs.iter().zip(&ys).all(|(x, y)| x.is_equivalent(y))
        })
    }
}

/// Equivalence over slot entries: two open entries are equivalent, an open
/// entry never matches an occupant.
pub fn equivalent(a: &Entry<Template>, b: &Entry<Template>) -> bool {
    match (a, b) {
        (Entry::Empty, Entry::Empty) => true,
        (Entry::Node(x), Entry::Node(y)) => x.is_equivalent(y),
        _ => false,
    }
}

// ─── Trays ───────────────────────────────────────────────────────────────

/// A named group of templates shown in one palette tab.
#[derive(Debug, Clone, PartialEq)]
pub struct Tray {
    pub name: String,
    pub color: Color,
    pub items: Vec<Template>,
}

/// Points at a template in the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateRef {
    Favorite(usize),
    Tray { tray: usize, item: usize },
}

/// The trays every new document starts with.
pub fn default_trays() -> Vec<Tray> {
    vec![
        Tray {
            name: "Default".into(),
            color: Color::rgb(0xef, 0xdb, 0xb2),
            items: vec![
                Template::new(NodeKind::Text).with("message", "Sample text message"),
                Template::new(NodeKind::Delay).with("delay", "2"),
                Template::new(NodeKind::Random),
                Template::new(NodeKind::Cooldown).with("cdlength", "30").with("cdname", ""),
            ],
        },
        Tray {
            name: "Builtins".into(),
            color: Color::rgb(0xf7, 0xbb, 0xf7),
            items: vec![
                Template::new(NodeKind::BuiltinUptime),
                Template::new(NodeKind::BuiltinShoutout).with("builtin_param", "%s"),
                Template::new(NodeKind::BuiltinCalc).with("builtin_param", "1 + 2 + 3"),
            ],
        },
        Tray {
            name: "Conditionals".into(),
            color: Color::rgb(0xbb, 0xbb, 0xf7),
            items: vec![
                Template::new(NodeKind::ConditionalString)
                    .with("expr1", "%s")
                    .with("expr2", "demo"),
                Template::new(NodeKind::ConditionalContains)
                    .with("expr1", "/foo/bar/quux/")
                    .with("expr2", "/%s/"),
                Template::new(NodeKind::ConditionalNumber).with("expr1", "$deaths$ > 10"),
            ],
        },
    ]
}

impl Document {
    /// Structural copy of the live subtree at `idx`. Interior open entries
    /// are dropped; each slot keeps one trailing open entry.
    pub fn demote(&self, idx: NodeIndex) -> Option<Template> {
        let node = self.node(idx)?;
        let slots = node
            .slots
            .iter()
            .map(|slot| {
                let children = slot.iter().filter_map(Entry::get).filter_map(|c| self.demote(c));
                normalize_slot(children.map(Entry::Node))
            })
            .collect();
        Some(Template {
            kind: node.kind,
            params: node.params.clone(),
            slots,
            caption: node.caption.clone(),
            color: node.color,
            raw: node.raw.clone(),
        })
    }

    pub fn template(&self, at: TemplateRef) -> Option<&Template> {
        match at {
            TemplateRef::Favorite(i) => self.favorites.get(i),
            TemplateRef::Tray { tray, item } => self.trays.get(tray)?.items.get(item),
        }
    }

    /// Templates of the tray currently shown, in order.
    pub fn current_tray_items(&self) -> &[Template] {
        self.trays.get(self.current_tray).map_or(&[], |t| t.items.as_slice())
    }

    /// Add a favourite unless an equivalent one already exists.
    pub fn add_favorite(&mut self, template: Template) -> bool {
        if self.favorites.iter().any(|f| f.is_equivalent(&template)) {
            return false;
        }
        self.favorites.push(template);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn equivalence_ignores_open_entries_and_position() {
        let child = Template::new(NodeKind::Text).with("message", "hi");
        let a = Template::new(NodeKind::Random).with_child("message", child.clone());
        let mut b = a.clone();
        b.slots[0].insert(0, Entry::Empty);
        b.color = Some(Color::rgb(1, 2, 3));
        assert!(a.is_equivalent(&b));
        assert!(equivalent(&Entry::Node(a.clone()), &Entry::Node(b)));

        let c = Template::new(NodeKind::Random)
            .with_child("message", child.clone())
            .with_child("message", child);
        assert!(!a.is_equivalent(&c));
        assert!(!equivalent(&Entry::Empty, &Entry::Node(a)));
        assert!(equivalent(&Entry::Empty, &Entry::Empty));
    }

    #[test]
    fn equivalence_compares_params_and_kind() {
        let a = Template::new(NodeKind::Delay).with("delay", "2");
        assert!(!a.is_equivalent(&Template::new(NodeKind::Delay).with("delay", "3")));
        assert!(!a.is_equivalent(&Template::new(NodeKind::Random)));
    }

    #[test]
    fn degenerate_groups_count_as_their_contents() {
        let a = Template::new(NodeKind::Text).with("message", "a");
        let b = Template::new(NodeKind::Text).with("message", "b");
        let single = Template::new(NodeKind::Group).with_child("message", a.clone());
        assert!(single.is_degenerate_group());
        assert!(single.is_equivalent(&a));

        let wrapped = Template::new(NodeKind::Random).with_child("message", single);
        let plain = Template::new(NodeKind::Random).with_child("message", a.clone());
        assert!(wrapped.is_equivalent(&plain));

        let hollow = Template::new(NodeKind::Random).with_child("message", Template::new(NodeKind::Group));
        assert!(hollow.is_equivalent(&Template::new(NodeKind::Random)));

        let pair = Template::new(NodeKind::Group).with_child("message", a.clone()).with_child("message", b);
        assert!(!pair.is_degenerate_group());
        assert!(!pair.is_equivalent(&a));
    }

    #[test]
    fn with_child_keeps_one_trailing_open_entry() {
        let t = Template::new(NodeKind::Delay)
            .with_child("message", Template::new(NodeKind::Random))
            .with_child("message", Template::new(NodeKind::Random));
        assert_eq!(t.slots[0].len(), 3);
        assert!(t.slots[0][2].is_empty());
        assert_eq!(t.occupants(0).count(), 2);
    }

    #[test]
    fn demote_round_trips_through_spawn() {
        let mut doc = Document::new();
        let t = Template::new(NodeKind::Cooldown)
            .with("cdlength", "30")
            .with_child("otherwise", Template::new(NodeKind::Text).with("message", "slow down"));
        let idx = doc.spawn(&t, Point::new(5.0, 5.0));
        let back = doc.demote(idx).unwrap();
        assert!(back.is_equivalent(&t));
        assert_eq!(back.slots[1].len(), 2);
    }

    #[test]
    fn default_trays_are_addressable() {
        let doc = Document::new();
        assert_eq!(doc.trays.len(), 3);
        assert_eq!(doc.current_tray_items().len(), 4);
        let calc = doc.template(TemplateRef::Tray { tray: 1, item: 2 }).unwrap();
        assert_eq!(calc.param("builtin_param"), Some(&Value::from("1 + 2 + 3")));
        assert!(doc.template(TemplateRef::Favorite(0)).is_none());
    }
}
