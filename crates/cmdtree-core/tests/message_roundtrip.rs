//! Integration tests: build → emit → import round-trip.
//!
//! A tree exported from one document and imported into another must be
//! structurally equivalent to the original (positions and colours aside).

use cmdtree_core::*;
use kurbo::Point;
use pretty_assertions::assert_eq;
use serde_json::json;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn assert_roundtrip(doc: &Document) {
    let exported = emit_document(doc);
    let mut copy = Document::new();
    copy.import_message(&exported);

    let before = doc.demote(doc.anchor).expect("anchor");
    let after = copy.demote(copy.anchor).expect("anchor");
    assert!(
        before.is_equivalent(&after),
        "round-trip changed the tree.\nExported: {exported}\nRe-emitted: {}",
        emit_document(&copy)
    );
    assert_eq!(emit_document(&copy), exported);
}

fn text(s: &str) -> Template {
    Template::new(NodeKind::Text).with("message", s)
}

// ─── Scenarios ───────────────────────────────────────────────────────────

#[test]
fn nested_command_round_trips() {
    let mut doc = Document::new();
    let cooldown = Template::new(NodeKind::Cooldown)
        .with("cdlength", "30")
        .with("cdname", "greeting")
        .with_child(
            "message",
            Template::new(NodeKind::ConditionalString)
                .with("expr1", "{param}")
                .with("expr2", "")
                .with("casefold", "on")
                .with_child("message", text("Hello, {username}!"))
                .with_child("otherwise", text("Hi {param}")),
        )
        .with_child("otherwise", text("Wait {cooldown} seconds"));
    let c = doc.spawn(&cooldown, Point::ZERO);
    doc.attach(c, doc.anchor, "message", 0).unwrap();

    let d = doc.spawn(
        &Template::new(NodeKind::Delay).with("delay", "10").with_child("message", text("later")),
        Point::ZERO,
    );
    doc.attach(d, doc.anchor, "message", 1).unwrap();
    assert_roundtrip(&doc);
}

#[test]
fn groups_and_placeholders_round_trip() {
    let mut doc = Document::new();
    doc.import_message(&json!({
        "message": [
            {"mode": "random", "message": [["a", "b"], "c"]},
            {"dest": "/set", "target": "deaths"},
            {"builtin": "calc", "builtin_param": "6 * 7", "message": "{result}"}
        ]
    }));
    let anchor = &doc.graph[doc.anchor];
    let kinds: Vec<NodeKind> = anchor.occupants(0).map(|n| doc.graph[n].kind).collect();
    assert_eq!(kinds, vec![NodeKind::Random, NodeKind::Unrecognized, NodeKind::BuiltinCalc]);
    assert_roundtrip(&doc);
}

#[test]
fn group_emptied_by_detaching_round_trips() {
    let mut doc = Document::new();
    doc.import_message(&json!({"mode": "random", "message": [["a", "b"]]}));
    let random = doc.graph[doc.anchor].occupants(0).next().unwrap();
    let group = doc.graph[random].occupants(0).next().unwrap();
    assert_eq!(doc.graph[group].kind, NodeKind::Group);
    let items: Vec<NodeIndex> = doc.graph[group].occupants(0).collect();

    doc.detach(items[1]).unwrap();
    assert_eq!(
        emit_document(&doc),
        json!({"message": [{"mode": "random", "message": [{"message": "a"}]}]})
    );
    assert_roundtrip(&doc);

    doc.detach(items[0]).unwrap();
    assert_eq!(emit_document(&doc), json!({"message": [{"mode": "random", "message": []}]}));
    assert_roundtrip(&doc);
}

#[test]
fn every_tray_item_round_trips() {
    let mut doc = Document::new();
    let templates: Vec<Template> = doc.trays.iter().flat_map(|t| t.items.clone()).collect();
    for (i, t) in templates.iter().enumerate() {
        let idx = doc.spawn(t, Point::ZERO);
        doc.attach(idx, doc.anchor, "message", i).unwrap();
    }
    assert_roundtrip(&doc);
}

#[test]
fn registry_order_changes_decoding() {
    let msg = json!({"builtin": "shoutout", "builtin_param": "someone", "message": []});

    let standard = Registry::standard();
    let Entry::Node(t) = decode(&standard, &msg) else {
        panic!("expected a node");
    };
    assert_eq!(t.kind, NodeKind::BuiltinShoutout);

    let mut order: Vec<NodeKind> = NodeKind::ALL.to_vec();
    order.retain(|k| *k != NodeKind::BuiltinOther);
    order.insert(1, NodeKind::BuiltinOther);
    let generic_first = Registry::with_order(order);
    let Entry::Node(t) = decode(&generic_first, &msg) else {
        panic!("expected a node");
    };
    assert_eq!(t.kind, NodeKind::BuiltinOther);
    // The swallowed parameter is lost on the way back out.
    assert_eq!(emit_template(&t), json!({"builtin": "shoutout", "message": []}));
}

#[test]
fn documents_share_registry_order() {
    let mut order: Vec<NodeKind> = NodeKind::ALL.to_vec();
    order.retain(|k| *k != NodeKind::BuiltinOther);
    order.insert(0, NodeKind::BuiltinOther);
    let mut doc = Document::with_registry(std::sync::Arc::new(Registry::with_order(order)));
    doc.import_message(&json!([{"builtin": "uptime", "message": "{uptime}"}]));
    let first = doc.graph[doc.anchor].occupants(0).next().unwrap();
    assert_eq!(doc.graph[first].kind, NodeKind::BuiltinOther);
}
