//! Emitter: templates and live subtrees → JSON messages.
//!
//! Each declared slot becomes a list of its occupants (open entries are
//! skipped, groups left holding one occupant or none are spliced) and each
//! declared parameter is written under its attribute name. Fixed constants
//! are always written as the constant itself.

use crate::model::{Document, Message};
use crate::schema::{NodeKind, ValueDomain};
use crate::template::Template;
use petgraph::graph::NodeIndex;
use serde_json::{Map, Value};

/// Serialize a template and everything below it.
#[must_use]
pub fn emit_template(template: &Template) -> Message {
    if template.kind == NodeKind::Unrecognized {
        return template.raw.clone().unwrap_or_else(|| Value::Object(Map::new()));
    }
    let desc = template.kind.descriptor();
    let mut out = Map::new();
    for (i, slot) in desc.slots.iter().enumerate() {
        let items = template.spliced_occupants(i).into_iter().map(emit_template).collect();
        out.insert((*slot).to_string(), Value::Array(items));
    }
    for (param, value) in desc.params.iter().zip(&template.params) {
        match (param.domain, value) {
            (ValueDomain::Fixed(constant), _) => {
                out.insert(param.attr.to_string(), Value::String(constant.to_string()));
            }
            (_, Some(v)) => {
                out.insert(param.attr.to_string(), v.clone());
            }
            (_, None) => {}
        }
    }
    Value::Object(out)
}

/// Serialize the live subtree rooted at `idx`.
pub fn emit_node(doc: &Document, idx: NodeIndex) -> Option<Message> {
    doc.demote(idx).map(|t| emit_template(&t))
}

/// Serialize the anchor: the whole exported command.
#[must_use]
pub fn emit_document(doc: &Document) -> Message {
    emit_node(doc, doc.anchor).unwrap_or_else(|| Value::Object(Map::new()))
}
