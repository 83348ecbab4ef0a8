//! Node type schema.
//!
//! Every node kind has exactly one static [`TypeDescriptor`] describing its
//! child slots, its parameters and the substitution tokens it offers to
//! descendants. Descriptors never change after startup.
//!
//! A [`Registry`] fixes the order in which kinds are tried when a message is
//! decoded. The first kind whose parameters all accept the message wins, so
//! specific kinds must be declared before the generic ones that would also
//! accept the same message (`builtin_other` after every named builtin).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::{SmallVec, smallvec};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

// ─── Colors ──────────────────────────────────────────────────────────────

/// Opaque RGB fill color used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`, lowercase.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ─── Node kinds ──────────────────────────────────────────────────────────

/// Every kind of node the editor knows about, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Anchor,
    Delay,
    BuiltinUptime,
    BuiltinShoutout,
    BuiltinCalc,
    BuiltinHypetrain,
    BuiltinGiveaway,
    BuiltinMpn,
    BuiltinPointsrewards,
    BuiltinTranscoding,
    BuiltinOther,
    ConditionalString,
    ConditionalContains,
    ConditionalRegexp,
    ConditionalNumber,
    Cooldown,
    Random,
    Text,
    Group,
    Unrecognized,
}

impl NodeKind {
    pub const ALL: [NodeKind; 20] = [
        NodeKind::Anchor,
        NodeKind::Delay,
        NodeKind::BuiltinUptime,
        NodeKind::BuiltinShoutout,
        NodeKind::BuiltinCalc,
        NodeKind::BuiltinHypetrain,
        NodeKind::BuiltinGiveaway,
        NodeKind::BuiltinMpn,
        NodeKind::BuiltinPointsrewards,
        NodeKind::BuiltinTranscoding,
        NodeKind::BuiltinOther,
        NodeKind::ConditionalString,
        NodeKind::ConditionalContains,
        NodeKind::ConditionalRegexp,
        NodeKind::ConditionalNumber,
        NodeKind::Cooldown,
        NodeKind::Random,
        NodeKind::Text,
        NodeKind::Group,
        NodeKind::Unrecognized,
    ];

    /// The static descriptor for this kind. O(1).
    pub fn descriptor(self) -> &'static TypeDescriptor {
        &DESCRIPTORS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn is_fixed(self) -> bool {
        self.descriptor().fixed
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Parameters ──────────────────────────────────────────────────────────

/// The set of values a parameter may hold.
#[derive(Debug, Clone, Copy)]
pub enum ValueDomain {
    /// Not editable; always this exact string.
    Fixed(&'static str),
    /// One of an enumerated set of strings.
    OneOf(&'static [&'static str]),
    /// A number in `[min, max]` on the `step` grid. Numeric strings count.
    Range { min: f64, max: f64, step: f64 },
    /// Any string.
    FreeText,
    /// Absent (off) or `"on"`.
    Flag,
    /// Custom validity test. Receives `None` when the field is absent.
    Predicate(fn(Option<&Value>) -> bool),
}

/// A named parameter of a node type.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    /// Message field the parameter is stored under.
    pub attr: &'static str,
    pub domain: ValueDomain,
    /// Label shown by the property editor. `None` for fixed constants.
    pub label: Option<&'static str>,
    /// Whether a message may omit the field and still match.
    pub optional: bool,
}

impl Param {
    pub const fn fixed(attr: &'static str, value: &'static str) -> Self {
        Self {
            attr,
            domain: ValueDomain::Fixed(value),
            label: None,
            optional: false,
        }
    }

    pub const fn text(attr: &'static str, label: &'static str) -> Self {
        Self {
            attr,
            domain: ValueDomain::FreeText,
            label: Some(label),
            optional: false,
        }
    }

    pub const fn range(attr: &'static str, label: &'static str, min: f64, max: f64, step: f64) -> Self {
        Self {
            attr,
            domain: ValueDomain::Range { min, max, step },
            label: Some(label),
            optional: false,
        }
    }

    pub const fn one_of(attr: &'static str, label: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            attr,
            domain: ValueDomain::OneOf(options),
            label: Some(label),
            optional: false,
        }
    }

    pub const fn flag(attr: &'static str, label: &'static str) -> Self {
        Self {
            attr,
            domain: ValueDomain::Flag,
            label: Some(label),
            optional: true,
        }
    }

    pub const fn check(attr: &'static str, label: &'static str, test: fn(Option<&Value>) -> bool) -> Self {
        Self {
            attr,
            domain: ValueDomain::Predicate(test),
            label: Some(label),
            optional: false,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    pub fn is_editable(&self) -> bool {
        !matches!(self.domain, ValueDomain::Fixed(_))
    }

    /// Whether a message field value is compatible with this parameter.
    pub fn accepts(&self, value: Option<&Value>) -> bool {
        match (&self.domain, value) {
            (ValueDomain::Fixed(expected), Some(Value::String(s))) => s.as_str() == *expected,
            (ValueDomain::Fixed(_), _) => false,
            (ValueDomain::Predicate(test), v) => test(v),
            (ValueDomain::Flag, None) => true,
            (ValueDomain::Flag, Some(Value::String(s))) => s == "on",
            (ValueDomain::Flag, Some(_)) => false,
            (_, None) => self.optional,
            (ValueDomain::OneOf(options), Some(Value::String(s))) => options.contains(&s.as_str()),
            (ValueDomain::OneOf(_), Some(_)) => false,
            (ValueDomain::FreeText, Some(v)) => v.is_string(),
            (ValueDomain::Range { min, max, step }, Some(v)) => match as_number(v) {
                Some(n) => n >= *min && n <= *max && on_grid(n - min, *step),
                None => false,
            },
        }
    }
}

/// Numbers and numeric strings both count as numbers.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn on_grid(offset: f64, step: f64) -> bool {
    if step <= 0.0 {
        return true;
    }
    let steps = offset / step;
    (steps - steps.round()).abs() < 1e-9
}

/// Cooldown tags are optional, and must not contain whitespace.
fn is_tag(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::String(s)) => !s.chars().any(char::is_whitespace),
        Some(_) => false,
    }
}

// ─── Type descriptors ────────────────────────────────────────────────────

/// Static shape of one node kind.
#[derive(Debug)]
pub struct TypeDescriptor {
    pub kind: NodeKind,
    pub name: &'static str,
    /// Fixed nodes can never be dragged or detached.
    pub fixed: bool,
    /// Child slot names, in order.
    pub slots: &'static [&'static str],
    pub params: &'static [Param],
    /// Substitution tokens made available to descendants' text.
    pub provides: &'static [(&'static str, &'static str)],
    pub color: Color,
    pub description: &'static str,
}

impl TypeDescriptor {
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| *s == name)
    }

    pub fn param_index(&self, attr: &str) -> Option<usize> {
        self.params.iter().position(|p| p.attr == attr)
    }

    /// Kinds without parameters (and fixed kinds) are never chosen when
    /// decoding a message; they would otherwise accept anything.
    pub fn is_matchable(&self) -> bool {
        !self.fixed && !self.params.is_empty()
    }

    /// Whether every declared parameter accepts the corresponding field.
    pub fn accepts(&self, fields: &serde_json::Map<String, Value>) -> bool {
        self.params.iter().all(|p| p.accepts(fields.get(p.attr)))
    }
}

const MESSAGE: &[&str] = &["message"];
const BRANCHES: &[&str] = &["message", "otherwise"];
const BUILTIN: Color = Color::rgb(0xee, 0x77, 0xee);
const CONDITIONAL: Color = Color::rgb(0x77, 0x77, 0xee);

const fn builtin(
    kind: NodeKind,
    name: &'static str,
    params: &'static [Param],
    provides: &'static [(&'static str, &'static str)],
    description: &'static str,
) -> TypeDescriptor {
    TypeDescriptor {
        kind,
        name,
        fixed: false,
        slots: MESSAGE,
        params,
        provides,
        color: BUILTIN,
        description,
    }
}

const fn conditional(
    kind: NodeKind,
    name: &'static str,
    params: &'static [Param],
    description: &'static str,
) -> TypeDescriptor {
    TypeDescriptor {
        kind,
        name,
        fixed: false,
        slots: BRANCHES,
        params,
        provides: &[],
        color: CONDITIONAL,
        description,
    }
}

/// Indexed by `NodeKind as usize`.
static DESCRIPTORS: [TypeDescriptor; 20] = [
    TypeDescriptor {
        kind: NodeKind::Anchor,
        name: "anchor",
        fixed: true,
        slots: MESSAGE,
        params: &[],
        provides: &[
            ("{param}", "Anything typed after the command name"),
            ("{username}", "Name of the user who triggered the command"),
        ],
        color: Color::rgb(0xff, 0xff, 0x00),
        description: "Where everything starts. It cannot be moved.",
    },
    TypeDescriptor {
        kind: NodeKind::Delay,
        name: "delay",
        fixed: false,
        slots: MESSAGE,
        params: &[Param::range("delay", "Delay (seconds)", 1.0, 7200.0, 1.0)],
        provides: &[],
        color: Color::rgb(0x77, 0xee, 0x77),
        description: "Wait a while before sending the children",
    },
    builtin(
        NodeKind::BuiltinUptime,
        "builtin_uptime",
        &[Param::fixed("builtin", "uptime")],
        &[("{uptime}", "How long the channel has been live"), ("{channel}", "Channel name")],
        "Look up the channel's uptime and name",
    ),
    builtin(
        NodeKind::BuiltinShoutout,
        "builtin_shoutout",
        &[Param::fixed("builtin", "shoutout"), Param::text("builtin_param", "Channel name")],
        &[
            ("{url}", "Link to the other channel"),
            ("{name}", "Display name of the other channel"),
            ("{catname}", "Category they last streamed in"),
            ("{title}", "Title of their last stream"),
        ],
        "Fetch information about another channel and what it streamed recently",
    ),
    builtin(
        NodeKind::BuiltinCalc,
        "builtin_calc",
        &[Param::fixed("builtin", "calc"), Param::text("builtin_param", "Expression")],
        &[("{result}", "Result of the calculation")],
        "Evaluate an arithmetic expression",
    ),
    builtin(
        NodeKind::BuiltinHypetrain,
        "builtin_hypetrain",
        &[Param::fixed("builtin", "hypetrain")],
        &[
            ("{state}", "Whether a hype train is active, over, or on cooldown"),
            ("{level}", "Current or final level"),
            ("{total}", "Points contributed so far"),
            ("{goal}", "Points needed for the next level"),
        ],
        "Report on a current or recent hype train",
    ),
    builtin(
        NodeKind::BuiltinGiveaway,
        "builtin_giveaway",
        &[
            Param::fixed("builtin", "giveaway"),
            Param::one_of("builtin_param", "Action", &["refund", "status"]),
        ],
        &[],
        "Manage giveaways run through channel point redemptions",
    ),
    builtin(
        NodeKind::BuiltinMpn,
        "builtin_mpn",
        &[Param::fixed("builtin", "mpn")],
        &[],
        "Manipulate multi-player notepad documents",
    ),
    builtin(
        NodeKind::BuiltinPointsrewards,
        "builtin_pointsrewards",
        &[Param::fixed("builtin", "pointsrewards")],
        &[],
        "Manipulate channel point rewards",
    ),
    builtin(
        NodeKind::BuiltinTranscoding,
        "builtin_transcoding",
        &[Param::fixed("builtin", "transcoding")],
        &[],
        "Check whether the channel has quality options",
    ),
    builtin(
        NodeKind::BuiltinOther,
        "builtin_other",
        &[Param::text("builtin", "Builtin name")],
        &[],
        "A builtin this editor has no dedicated block for",
    ),
    conditional(
        NodeKind::ConditionalString,
        "conditional_string",
        &[
            Param::fixed("conditional", "string"),
            Param::text("expr1", "Expression 1"),
            Param::text("expr2", "Expression 2"),
            Param::flag("casefold", "Ignore case"),
        ],
        "If one expression equals the other, do one thing, otherwise another",
    ),
    conditional(
        NodeKind::ConditionalContains,
        "conditional_contains",
        &[
            Param::fixed("conditional", "contains"),
            Param::text("expr1", "Needle"),
            Param::text("expr2", "Haystack"),
            Param::flag("casefold", "Ignore case"),
        ],
        "If the needle is in the haystack, do one thing, otherwise another",
    ),
    conditional(
        NodeKind::ConditionalRegexp,
        "conditional_regexp",
        &[
            Param::fixed("conditional", "regexp"),
            Param::text("expr1", "Reg Exp"),
            Param::text("expr2", "Compare against"),
        ],
        "If the regular expression matches, do one thing, otherwise another",
    ),
    conditional(
        NodeKind::ConditionalNumber,
        "conditional_number",
        &[Param::fixed("conditional", "number"), Param::text("expr1", "Expression")],
        "If the expression is nonzero, do one thing, otherwise another",
    ),
    TypeDescriptor {
        kind: NodeKind::Cooldown,
        name: "cooldown",
        fixed: false,
        slots: BRANCHES,
        params: &[
            Param::range("cdlength", "Delay (seconds)", 1.0, 7200.0, 1.0),
            Param::check("cdname", "Tag (optional)", is_tag).optional(),
        ],
        provides: &[("{cooldown}", "Seconds left on the cooldown")],
        color: Color::rgb(0xaa, 0xcc, 0x55),
        description: "Stop the command being used too often; the second branch runs while cooling down",
    },
    TypeDescriptor {
        kind: NodeKind::Random,
        name: "random",
        fixed: false,
        slots: MESSAGE,
        params: &[Param::fixed("mode", "random")],
        provides: &[],
        color: Color::rgb(0xee, 0x77, 0x77),
        description: "Pick one child at random",
    },
    TypeDescriptor {
        kind: NodeKind::Text,
        name: "text",
        fixed: false,
        slots: &[],
        params: &[Param::text("message", "Text")],
        provides: &[],
        color: Color::rgb(0x77, 0xee, 0xee),
        description: "A message to send to the channel",
    },
    TypeDescriptor {
        kind: NodeKind::Group,
        name: "group",
        fixed: false,
        slots: MESSAGE,
        params: &[],
        provides: &[],
        color: Color::rgb(0xcc, 0xcc, 0xcc),
        description: "Several messages sent together",
    },
    TypeDescriptor {
        kind: NodeKind::Unrecognized,
        name: "unrecognized",
        fixed: false,
        slots: &[],
        params: &[],
        provides: &[],
        color: Color::rgb(0xff, 0x00, 0x00),
        description: "A message this editor could not interpret; it is kept as-is",
    },
];

// ─── Labels ──────────────────────────────────────────────────────────────

/// Display text for a parameter value.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Labels for a node: one per child slot (at least one). `caption` is the
/// free-form text an anchor carries.
pub fn labels(kind: NodeKind, params: &[Option<Value>], caption: Option<&str>) -> SmallVec<[String; 2]> {
    let param = |i: usize| value_text(params.get(i).and_then(Option::as_ref));
    let one = |s: &str| -> SmallVec<[String; 2]> { smallvec![s.to_string()] };
    let branches = |s: String, other: &str| -> SmallVec<[String; 2]> { smallvec![s, other.to_string()] };
    match kind {
        NodeKind::Anchor => one(caption.unwrap_or("")),
        NodeKind::Delay => smallvec![format!("Delay {} seconds", param(0))],
        NodeKind::BuiltinUptime => one("Channel uptime"),
        NodeKind::BuiltinShoutout => one("Shoutout"),
        NodeKind::BuiltinCalc => one("Calculator"),
        NodeKind::BuiltinHypetrain => one("Hype train status"),
        NodeKind::BuiltinGiveaway => one("Giveaway tools"),
        NodeKind::BuiltinMpn => one("Multi-Player Notepad"),
        NodeKind::BuiltinPointsrewards => one("Points Rewards"),
        NodeKind::BuiltinTranscoding => one("Transcoding"),
        NodeKind::BuiltinOther => smallvec![format!("Unknown Builtin: {}", param(0))],
        NodeKind::ConditionalString => branches("String comparison".into(), "Otherwise:"),
        NodeKind::ConditionalContains => branches("String includes".into(), "Otherwise:"),
        NodeKind::ConditionalRegexp => branches("Regular expression".into(), "Otherwise:"),
        NodeKind::ConditionalNumber => branches("Numeric computation".into(), "Otherwise:"),
        NodeKind::Cooldown => branches(format!("{}-second cooldown", param(0)), "If on cooldown:"),
        NodeKind::Random => one("Randomize"),
        NodeKind::Text => smallvec![param(0)],
        NodeKind::Group => one("Group"),
        NodeKind::Unrecognized => one("Unrecognized message"),
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

static STANDARD: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::with_order(NodeKind::ALL)));

/// Ordered view over the type descriptors.
///
/// Iteration order is the decode priority. Kinds left out of the order can
/// still be looked up by name but are never chosen by the decoder.
#[derive(Debug, Clone)]
pub struct Registry {
    order: Vec<NodeKind>,
    by_name: HashMap<&'static str, NodeKind>,
}

impl Registry {
    /// The standard registry, in declaration order.
    pub fn standard() -> Arc<Registry> {
        Arc::clone(&STANDARD)
    }

    pub fn with_order(order: impl IntoIterator<Item = NodeKind>) -> Self {
        let mut seen = Vec::new();
        for kind in order {
            if !seen.contains(&kind) {
                seen.push(kind);
            }
        }
        let by_name = NodeKind::ALL.iter().map(|k| (k.name(), *k)).collect();
        Self { order: seen, by_name }
    }

    pub fn lookup(&self, name: &str) -> Option<NodeKind> {
        self.by_name.get(name).copied()
    }

    pub fn descriptor(&self, kind: NodeKind) -> &'static TypeDescriptor {
        kind.descriptor()
    }

    /// Kinds in priority order.
    pub fn iter(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.order.iter().copied()
    }

    /// Position of `kind` in the priority order.
    pub fn position(&self, kind: NodeKind) -> Option<usize> {
        self.order.iter().position(|k| *k == kind)
    }

    /// First kind, in priority order, whose parameters all accept `fields`.
    pub fn first_match(&self, fields: &serde_json::Map<String, Value>) -> Option<NodeKind> {
        self.iter().find(|kind| {
            let desc = kind.descriptor();
            desc.is_matchable() && desc.accepts(fields)
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_order(NodeKind::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> serde_json::Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn descriptor_table_matches_kind_order() {
        for (i, kind) in NodeKind::ALL.iter().enumerate() {
            assert_eq!(DESCRIPTORS[i].kind, *kind, "descriptor {i} out of place");
        }
    }

    #[test]
    fn lookup_by_name() {
        let reg = Registry::standard();
        assert_eq!(reg.lookup("conditional_regexp"), Some(NodeKind::ConditionalRegexp));
        assert_eq!(reg.lookup("nope"), None);
        assert_eq!(NodeKind::Cooldown.name(), "cooldown");
    }

    #[test]
    fn range_accepts_numbers_and_numeric_strings() {
        let p = Param::range("delay", "Delay", 1.0, 7200.0, 1.0);
        assert!(p.accepts(Some(&json!("2"))));
        assert!(p.accepts(Some(&json!(7200))));
        assert!(!p.accepts(Some(&json!("2.5"))));
        assert!(!p.accepts(Some(&json!(0))));
        assert!(!p.accepts(Some(&json!(7201))));
        assert!(!p.accepts(Some(&json!("soon"))));
        assert!(!p.accepts(None));
    }

    #[test]
    fn fixed_and_enumerated_domains() {
        let fixed = Param::fixed("builtin", "uptime");
        assert!(fixed.accepts(Some(&json!("uptime"))));
        assert!(!fixed.accepts(Some(&json!("calc"))));
        assert!(!fixed.accepts(None));

        let set = Param::one_of("builtin_param", "Action", &["refund", "status"]);
        assert!(set.accepts(Some(&json!("status"))));
        assert!(!set.accepts(Some(&json!("open"))));
    }

    #[test]
    fn free_text_requires_presence_unless_optional() {
        let p = Param::text("expr1", "Expression");
        assert!(p.accepts(Some(&json!(""))));
        assert!(!p.accepts(Some(&json!(3))));
        assert!(!p.accepts(None));
        assert!(p.optional().accepts(None));
    }

    #[test]
    fn flag_and_predicate_domains() {
        let flag = Param::flag("casefold", "Ignore case");
        assert!(flag.accepts(None));
        assert!(flag.accepts(Some(&json!("on"))));
        assert!(!flag.accepts(Some(&json!("off"))));

        let tag = Param::check("cdname", "Tag", is_tag);
        assert!(tag.accepts(None));
        assert!(tag.accepts(Some(&json!("shoutouts"))));
        assert!(!tag.accepts(Some(&json!("two words"))));
    }

    #[test]
    fn first_match_follows_registry_order() {
        let msg = fields(json!({"builtin": "uptime", "message": []}));
        let standard = Registry::standard();
        assert_eq!(standard.first_match(&msg), Some(NodeKind::BuiltinUptime));

        let mut order = NodeKind::ALL.to_vec();
        order.retain(|k| *k != NodeKind::BuiltinOther);
        order.insert(0, NodeKind::BuiltinOther);
        let swallowed = Registry::with_order(order);
        assert_eq!(swallowed.first_match(&msg), Some(NodeKind::BuiltinOther));
    }

    #[test]
    fn kinds_without_params_never_match() {
        let reg = Registry::standard();
        assert_eq!(reg.first_match(&fields(json!({"message": []}))), None);
        assert!(!NodeKind::Group.descriptor().is_matchable());
        assert!(!NodeKind::Anchor.descriptor().is_matchable());
    }

    #[test]
    fn labels_per_slot() {
        let params = [Some(json!("30")), Some(json!(""))];
        let l = labels(NodeKind::Cooldown, &params, None);
        assert_eq!(l.as_slice(), ["30-second cooldown", "If on cooldown:"]);
        let l = labels(NodeKind::Anchor, &[], Some("When !foo is typed..."));
        assert_eq!(l.as_slice(), ["When !foo is typed..."]);
    }
}
