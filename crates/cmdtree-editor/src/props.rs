//! Property editing.
//!
//! Describes the edit controls a host should show for a node and writes the
//! values back. Fixed constants get no control.

use cmdtree_core::{Document, EditError, NodeIndex, NodeKind, ValueDomain};
use serde_json::Value;

/// Input widget for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Widget {
    Number { min: f64, max: f64, step: f64 },
    Select { options: &'static [&'static str] },
    Text,
    /// Checked means `"on"`, unchecked means absent.
    Checkbox,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Control {
    pub attr: &'static str,
    pub label: &'static str,
    pub widget: Widget,
}

/// A control together with the node's current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub control: Control,
    pub value: Option<Value>,
}

/// One control per editable parameter of `kind`, in declaration order.
pub fn controls(kind: NodeKind) -> Vec<Control> {
    kind.descriptor()
        .params
        .iter()
        .filter_map(|p| {
            let widget = match p.domain {
                ValueDomain::Fixed(_) => return None,
                ValueDomain::Range { min, max, step } => Widget::Number { min, max, step },
                ValueDomain::OneOf(options) => Widget::Select { options },
                ValueDomain::FreeText | ValueDomain::Predicate(_) => Widget::Text,
                ValueDomain::Flag => Widget::Checkbox,
            };
            Some(Control {
                attr: p.attr,
                label: p.label.unwrap_or(p.attr),
                widget,
            })
        })
        .collect()
}

/// Controls for a live node, filled with its current values.
pub fn fields(doc: &Document, idx: NodeIndex) -> Option<Vec<Field>> {
    let node = doc.node(idx)?;
    Some(
        controls(node.kind)
            .into_iter()
            .map(|control| Field {
                value: node.param(control.attr).cloned(),
                control,
            })
            .collect(),
    )
}

/// Write several parameter values at once. Every name and value is checked
/// before anything is written, so one bad entry leaves the node unchanged.
pub fn apply(doc: &mut Document, idx: NodeIndex, values: &[(&str, Option<Value>)]) -> Result<(), EditError> {
    let node = doc.node(idx).ok_or(EditError::UnknownNode)?;
    let kind = node.kind;
    let desc = kind.descriptor();
    for (attr, value) in values {
        let Some(i) = desc.param_index(attr) else {
            return Err(EditError::NoSuchParam {
                kind,
                attr: attr.to_string(),
            });
        };
        let param = &desc.params[i];
        if !param.is_editable() {
            return Err(EditError::ReadOnlyParam {
                kind,
                attr: attr.to_string(),
            });
        }
        if !param.accepts(value.as_ref()) {
            return Err(EditError::InvalidValue {
                kind,
                attr: attr.to_string(),
            });
        }
    }
    for (attr, value) in values {
        doc.set_param(idx, attr, value.clone())?;
    }
    log::debug!("edited {} param(s) on {:?}", values.len(), doc.node(idx).map(|n| n.id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdtree_core::Template;
    use kurbo::Point;
    use serde_json::json;

    #[test]
    fn controls_follow_domains() {
        let c = controls(NodeKind::Cooldown);
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].widget, Widget::Number { min: 1.0, max: 7200.0, step: 1.0 });
        assert_eq!(c[1].widget, Widget::Text);
        assert_eq!(c[1].label, "Tag (optional)");

        let c = controls(NodeKind::BuiltinGiveaway);
        assert_eq!(c.len(), 1);
        assert!(matches!(c[0].widget, Widget::Select { options } if options == ["refund", "status"]));

        assert!(controls(NodeKind::BuiltinUptime).is_empty());
        assert_eq!(controls(NodeKind::ConditionalString)[2].widget, Widget::Checkbox);
    }

    #[test]
    fn apply_checks_every_name_first() {
        let mut doc = Document::new();
        let idx = doc.spawn(&Template::new(NodeKind::ConditionalString), Point::ZERO);
        let err = apply(&mut doc, idx, &[("expr1", Some(json!("x"))), ("conditional", Some(json!("regexp")))]);
        assert!(matches!(err, Err(EditError::ReadOnlyParam { .. })));
        assert_eq!(doc.node(idx).unwrap().param("expr1"), None);

        apply(&mut doc, idx, &[("expr1", Some(json!("x"))), ("casefold", Some(json!("on")))]).unwrap();
        let f = fields(&doc, idx).unwrap();
        assert_eq!(f[0].value, Some(json!("x")));
        assert_eq!(f[2].value, Some(json!("on")));
    }

    #[test]
    fn apply_checks_every_value_first() {
        let mut doc = Document::new();
        let idx = doc.spawn(&Template::new(NodeKind::Cooldown).with("cdlength", "30"), Point::ZERO);
        let err = apply(&mut doc, idx, &[("cdname", Some(json!("slow"))), ("cdlength", Some(json!("0")))]);
        assert!(matches!(err, Err(EditError::InvalidValue { .. })));
        assert_eq!(doc.node(idx).unwrap().param("cdname"), None);
        assert_eq!(doc.node(idx).unwrap().param("cdlength"), Some(&json!("30")));

        // Clearing is only allowed for optional parameters.
        assert!(apply(&mut doc, idx, &[("cdlength", None)]).is_err());
        apply(&mut doc, idx, &[("cdname", None), ("cdlength", Some(json!("90")))]).unwrap();
        assert_eq!(doc.node(idx).unwrap().param("cdlength"), Some(&json!("90")));
    }
}
