//! Core document model.
//!
//! The live document is an arena of [`Node`]s (a `petgraph` stable graph)
//! reachable from a single fixed anchor. Each node owns its child slots: an
//! ordered list of [`Entry`] values per slot name declared by its type. Graph
//! edges mirror that ownership (parent → child, weighted by slot index) so
//! subtree walks can use `petgraph` traversals.
//!
//! A child also records where it sits through a non-owning [`Locator`]. For
//! every attached child `c`, `parent.slots[slot][index] == Entry::Node(c)` and
//! `c.parent == Some(Locator { parent, slot, index })`.

use crate::id::NodeId;
use crate::schema::{Color, NodeKind, Registry, TypeDescriptor, ValueDomain};
use crate::template::{Template, Tray, default_trays};
use kurbo::Point;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::Dfs;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A Message is the external JSON encoding of a node or subtree.
pub type Message = Value;

// ─── Slots ───────────────────────────────────────────────────────────────

/// One position in a child slot: an open connection point or an occupant.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<T> {
    Empty,
    Node(T),
}

impl<T> Entry<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Entry::Empty)
    }

    pub fn node(&self) -> Option<&T> {
        match self {
            Entry::Node(n) => Some(n),
            Entry::Empty => None,
        }
    }
}

impl<T: Copy> Entry<T> {
    pub fn get(&self) -> Option<T> {
        self.node().copied()
    }
}

pub type Slot = Vec<Entry<NodeIndex>>;

/// Where an attached node sits: `parent.slots[slot][index]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    pub parent: NodeIndex,
    pub slot: usize,
    pub index: usize,
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A typed element of the live document.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,

    /// Current parameter values, indexed like the descriptor's params.
    pub params: SmallVec<[Option<Value>; 3]>,

    /// Child slots, indexed like the descriptor's slots.
    pub slots: SmallVec<[Slot; 2]>,

    /// Set while attached.
    pub parent: Option<Locator>,

    /// Absolute canvas position of the node's top-left corner.
    pub position: Point,

    /// Overrides the kind's color.
    pub color: Option<Color>,

    /// Free-form text shown by anchors.
    pub caption: Option<String>,

    /// Original message kept by `unrecognized` placeholders.
    pub raw: Option<Message>,

    /// Spawned from a template and never dropped anywhere yet.
    pub fresh: bool,
}

impl Node {
    /// A node of `kind` with default parameter values and one open
    /// connection point per slot.
    pub fn new(kind: NodeKind) -> Self {
        let desc = kind.descriptor();
        Self {
            id: NodeId::fresh(desc.name),
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
            parent: None,
            position: Point::ZERO,
            color: None,
            caption: None,
            raw: None,
            fresh: false,
        }
    }

    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.kind.descriptor()
    }

    pub fn is_fixed(&self) -> bool {
        self.kind.is_fixed()
    }

    /// Current value of the parameter named `attr`.
    pub fn param(&self, attr: &str) -> Option<&Value> {
        let i = self.descriptor().param_index(attr)?;
        self.params.get(i).and_then(Option::as_ref)
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        let i = self.descriptor().slot_index(name)?;
        self.slots.get(i)
    }

    /// Occupied entries of slot `slot`, in order.
    pub fn occupants(&self, slot: usize) -> impl Iterator<Item = NodeIndex> + '_ {
        self.slots
            .get(slot)
            .into_iter()
            .flat_map(|s| s.iter().filter_map(Entry::get))
    }

    /// Every occupied entry of every slot, in slot order.
    pub fn children(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.slots.iter().flat_map(|s| s.iter().filter_map(Entry::get))
    }

    pub fn color(&self) -> Color {
        self.color.unwrap_or(self.descriptor().color)
    }
}

// ─── Document ────────────────────────────────────────────────────────────

/// The editable document: the live tree, the trash receptacle, favourites
/// and trays.
#[derive(Debug, Clone)]
pub struct Document {
    /// Arena of live nodes. Edges go parent → child, weighted by slot index.
    pub graph: StableDiGraph<Node, usize>,

    /// The root every exported message starts from.
    pub anchor: NodeIndex,

    /// Fixed receptacle for discarded subtrees. Never exported.
    pub trash: NodeIndex,

    /// Index from `NodeId` → `NodeIndex`.
    pub id_index: HashMap<NodeId, NodeIndex>,

    /// User favourites, deduplicated by structural equivalence.
    pub favorites: Vec<Template>,

    pub trays: Vec<Tray>,
    pub current_tray: usize,

    /// Live nodes in creation order; the anchor is first.
    pub(crate) actives: Vec<NodeIndex>,

    /// Fixed receptacles, scanned after the live nodes.
    pub(crate) specials: Vec<NodeIndex>,

    registry: Arc<Registry>,
}

pub const DEFAULT_CAPTION: &str = "When !foo is typed...";
pub const TRASH_CAPTION: &str = "Trash - drop here to discard";

impl Document {
    /// A document over the standard registry with the default trays.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Registry::standard())
    }

    #[must_use]
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        let mut graph = StableDiGraph::new();

        let mut anchor_node = Node::new(NodeKind::Anchor);
        anchor_node.caption = Some(DEFAULT_CAPTION.to_string());
        anchor_node.position = Point::new(10.0, 10.0);
        let anchor_id = anchor_node.id;
        let anchor = graph.add_node(anchor_node);

        let mut trash_node = Node::new(NodeKind::Anchor);
        trash_node.caption = Some(TRASH_CAPTION.to_string());
        trash_node.color = Some(Color::rgb(0x99, 0x99, 0x99));
        let trash_id = trash_node.id;
        let trash = graph.add_node(trash_node);

        let mut id_index = HashMap::new();
        id_index.insert(anchor_id, anchor);
        id_index.insert(trash_id, trash);

        Self {
            graph,
            anchor,
            trash,
            id_index,
            favorites: Vec::new(),
            trays: default_trays(),
            current_tray: 0,
            actives: vec![anchor],
            specials: vec![trash],
            registry,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_handle(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        self.graph.node_weight_mut(idx)
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.graph.contains_node(idx)
    }

    /// Live nodes in creation order (anchor first, attached or not).
    pub fn actives(&self) -> &[NodeIndex] {
        &self.actives
    }

    /// Fixed receptacles outside the exported tree.
    pub fn specials(&self) -> &[NodeIndex] {
        &self.specials
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<Locator> {
        self.node(idx).and_then(|n| n.parent)
    }

    /// `idx` and everything below it, depth first.
    pub fn subtree(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        if !self.contains(idx) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut dfs = Dfs::new(&self.graph, idx);
        while let Some(n) = dfs.next(&self.graph) {
            out.push(n);
        }
        out
    }

    /// Whether `idx` is `ancestor` or sits somewhere below it.
    pub fn is_within(&self, idx: NodeIndex, ancestor: NodeIndex) -> bool {
        let mut cur = Some(idx);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n).map(|loc| loc.parent);
        }
        false
    }

    /// Outermost ancestor of `idx` (itself when unattached).
    pub fn root_of(&self, idx: NodeIndex) -> NodeIndex {
        let mut cur = idx;
        while let Some(loc) = self.parent(cur) {
            cur = loc.parent;
        }
        cur
    }

    /// Substitution tokens visible to text inside `idx`: everything its
    /// ancestors (and itself) provide. Closer providers win on clashes.
    pub fn available_tokens(&self, idx: NodeIndex) -> BTreeMap<&'static str, &'static str> {
        let mut tokens = BTreeMap::new();
        let mut cur = Some(idx);
        while let Some(n) = cur {
            let Some(node) = self.node(n) else { break };
            for (token, desc) in node.descriptor().provides {
                tokens.entry(*token).or_insert(*desc);
            }
            cur = node.parent.map(|loc| loc.parent);
        }
        tokens
    }

    /// Number of live nodes (attached or floating), excluding receptacles.
    pub fn live_count(&self) -> usize {
        self.actives.len()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
