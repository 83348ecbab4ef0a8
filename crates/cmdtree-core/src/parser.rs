//! Parser: JSON messages → templates and live nodes.
//!
//! Decoding is a greedy structural match against the [`Registry`]:
//!
//! 1. a bare string is a text node;
//! 2. a list decodes element by element. `[]` is an open entry, a single
//!    element collapses to itself, and several elements are wrapped in a
//!    `group` unless the caller takes a list;
//! 3. an object becomes the first kind, in registry order, whose parameters
//!    all accept its fields. Its slots decode from the same object;
//! 4. an object nothing accepts but that carries a `message` field decodes
//!    as that field;
//! 5. anything else becomes an `unrecognized` placeholder holding the
//!    original message.
//!
//! Decoding never fails. Only turning text into JSON can.

use crate::error::ImportError;
use crate::model::{Document, Entry, Message};
use crate::schema::{NodeKind, Registry, ValueDomain};
use crate::template::Template;
use crate::tree::normalize_slot;
use serde_json::Value;

/// Parse message text into JSON.
pub fn parse_message(text: &str) -> Result<Message, ImportError> {
    Ok(serde_json::from_str(text)?)
}

enum Decoded {
    Empty,
    One(Template),
    Many(Vec<Entry<Template>>),
}

impl Decoded {
    fn into_entries(self) -> Vec<Entry<Template>> {
        match self {
            Decoded::Empty => Vec::new(),
            Decoded::One(t) => vec![Entry::Node(t)],
            Decoded::Many(entries) => entries,
        }
    }
}

/// Decode a message where a single node (or nothing) is expected.
pub fn decode(registry: &Registry, msg: &Message) -> Entry<Template> {
    match decode_value(registry, msg, false) {
        Decoded::Empty => Entry::Empty,
        Decoded::One(t) => Entry::Node(t),
        // Lists are only spliced when the caller accepts them.
        Decoded::Many(entries) => Entry::Node(group(entries)),
    }
}

/// Decode a message into the contents of a slot, normalized.
pub fn decode_list(registry: &Registry, msg: &Message) -> Vec<Entry<Template>> {
    normalize_slot(decode_value(registry, msg, true).into_entries())
}

fn decode_value(registry: &Registry, msg: &Message, accept_list: bool) -> Decoded {
    match msg {
        Value::String(s) => Decoded::One(Template::new(NodeKind::Text).with("message", s.as_str())),
        Value::Array(items) => {
            let mut entries: Vec<Entry<Template>> = items.iter().map(|m| decode(registry, m)).collect();
            match entries.len() {
                0 => Decoded::Empty,
                1 => match entries.pop() {
                    Some(Entry::Node(t)) => Decoded::One(t),
                    _ => Decoded::Empty,
                },
                _ if accept_list => Decoded::Many(entries),
                _ => Decoded::One(group(entries)),
            }
        }
        Value::Object(fields) => {
            if let Some(kind) = registry.first_match(fields) {
                return Decoded::One(build(registry, kind, fields));
            }
            if let Some(inner) = fields.get("message") {
                return decode_value(registry, inner, accept_list);
            }
            Decoded::One(placeholder(msg))
        }
        _ => Decoded::One(placeholder(msg)),
    }
}

fn build(registry: &Registry, kind: NodeKind, fields: &serde_json::Map<String, Value>) -> Template {
    let desc = kind.descriptor();
    let mut template = Template::new(kind);
    for (i, param) in desc.params.iter().enumerate() {
        if !matches!(param.domain, ValueDomain::Fixed(_)) {
            template.params[i] = fields.get(param.attr).cloned();
        }
    }
    for (i, slot) in desc.slots.iter().enumerate() {
        template.slots[i] = match fields.get(*slot) {
            Some(v) => decode_list(registry, v),
            None => vec![Entry::Empty],
        };
    }
    template
}

fn group(entries: Vec<Entry<Template>>) -> Template {
    let mut g = Template::new(NodeKind::Group);
    g.slots[0] = normalize_slot(entries);
    g
}

fn placeholder(msg: &Message) -> Template {
    log::warn!("unrecognized message kept as-is: {msg}");
    let mut t = Template::new(NodeKind::Unrecognized);
    t.raw = Some(msg.clone());
    t
}

impl Document {
    /// Replace the live tree with the decoded `msg`: every live node except
    /// the anchor is dropped, the trash is emptied, and the anchor's slot is
    /// rebuilt from the message.
    pub fn import_message(&mut self, msg: &Message) {
        let entries = decode_list(self.registry(), msg);
        self.truncate();
        let mut slot = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Entry::Empty => slot.push(Entry::Empty),
                Entry::Node(t) => {
                    let idx = self.instantiate(&t);
                    slot.push(Entry::Node(idx));
                }
            }
        }
        let anchor = self.anchor;
        self.install_slot(anchor, 0, slot);
        log::debug!("import: {} live node(s)", self.live_count());
    }

    /// Parse and import message text. On malformed input the document is
    /// left untouched.
    pub fn import_json(&mut self, text: &str) -> Result<(), ImportError> {
        let msg = parse_message(text)?;
        self.import_message(&msg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::emit_template;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn one(msg: Value) -> Template {
        match decode(&Registry::standard(), &msg) {
            Entry::Node(t) => t,
            Entry::Empty => panic!("decoded to an open entry"),
        }
    }

    #[test]
    fn bare_object_text_round_trips() {
        let t = one(json!({"message": "Hello"}));
        assert_eq!(t.kind, NodeKind::Text);
        assert_eq!(t.param("message"), Some(&json!("Hello")));
        assert_eq!(emit_template(&t), json!({"message": "Hello"}));
    }

    #[test]
    fn delay_with_single_child() {
        let t = one(json!({"delay": "2", "message": ["Hi"]}));
        assert_eq!(t.kind, NodeKind::Delay);
        let children: Vec<_> = t.occupants(0).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].kind, NodeKind::Text);
        assert_eq!(children[0].param("message"), Some(&json!("Hi")));
        assert_eq!(
            emit_template(&t),
            json!({"delay": "2", "message": [{"message": "Hi"}]})
        );
    }

    #[test]
    fn lists_collapse_or_group() {
        let reg = Registry::standard();
        assert_eq!(decode(&reg, &json!([])), Entry::Empty);
        assert_eq!(one(json!(["solo"])).kind, NodeKind::Text);
        let g = one(json!(["a", "b"]));
        assert_eq!(g.kind, NodeKind::Group);
        assert_eq!(g.occupants(0).count(), 2);
        assert_eq!(decode_list(&reg, &json!(["a", "b"])).len(), 3);
    }

    #[test]
    fn specific_conditional_wins() {
        let t = one(json!({
            "conditional": "regexp", "expr1": "^h", "expr2": "{param}",
            "message": "match", "otherwise": []
        }));
        assert_eq!(t.kind, NodeKind::ConditionalRegexp);
        assert_eq!(t.occupants(0).count(), 1);
        assert_eq!(t.occupants(1).count(), 0);
        assert_eq!(t.slots[1], vec![Entry::Empty]);
    }

    #[test]
    fn specific_builtin_before_generic() {
        assert_eq!(one(json!({"builtin": "uptime", "message": []})).kind, NodeKind::BuiltinUptime);
        assert_eq!(one(json!({"builtin": "vipleaders", "message": []})).kind, NodeKind::BuiltinOther);
    }

    #[test]
    fn unmatched_with_message_recurses() {
        let t = one(json!({"voice": "1234", "message": [{"delay": "5", "message": "later"}]}));
        assert_eq!(t.kind, NodeKind::Delay);
    }

    #[test]
    fn unmatched_shapes_become_placeholders() {
        let t = one(json!({"dest": "/set", "target": "deaths"}));
        assert_eq!(t.kind, NodeKind::Unrecognized);
        assert_eq!(t.raw, Some(json!({"dest": "/set", "target": "deaths"})));
        assert_eq!(one(json!(42)).kind, NodeKind::Unrecognized);
        // Out-of-range delay matches nothing.
        assert_eq!(one(json!({"delay": "0"})).kind, NodeKind::Unrecognized);
    }

    #[test]
    fn import_replaces_live_tree() {
        let mut doc = Document::new();
        doc.import_json(r#"{"message": ["one", {"delay": "2", "message": "two"}]}"#).unwrap();
        let anchor = &doc.graph[doc.anchor];
        assert_eq!(anchor.slots[0].len(), 3);
        assert_eq!(doc.live_count(), 4);

        doc.import_json(r#"["three"]"#).unwrap();
        assert_eq!(doc.live_count(), 2);
        let only = doc.graph[doc.anchor].slots[0][0].get().unwrap();
        assert_eq!(doc.graph[only].param("message"), Some(&json!("three")));
        assert_eq!(doc.parent(only).map(|l| l.parent), Some(doc.anchor));
    }

    #[test]
    fn malformed_import_leaves_document_untouched() {
        let mut doc = Document::new();
        doc.import_json(r#"["keep me"]"#).unwrap();
        let before = doc.live_count();
        assert!(matches!(doc.import_json("{not json"), Err(ImportError::Malformed(_))));
        assert_eq!(doc.live_count(), before);
    }
}
