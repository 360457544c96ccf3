//! Value-tree to AST reconciliation.
//!
//! Builds a fresh document for a (possibly mutated) value tree, pulling
//! comments across from the original AST wherever the tree still lines
//! up with it. Containers match through their `NodeId` back-reference; a
//! container the host rebuilt from scratch carries no reference and
//! serializes plain. The input AST is never modified.

use crate::ast::{
    Document, KeyValue, ListNode, NodeId, ObjectNode, Scalar, ScalarNode, ValueNode,
};
use crate::constants::MAX_DEPTH;
use crate::error::{Error, Position, Result};
use crate::value::Value;

pub fn reconcile(value: &Value, original: Option<&Document>) -> Result<Document> {
    let Value::Object(root) = value else {
        return Err(Error::serialize(format!(
            "document root must be an object, got {}",
            value.type_name()
        )));
    };

    let mut counter: NodeId = 1;
    let mut doc = Document::new();

    if let Some(orig) = original {
        doc.leading_comments = orig.leading_comments.clone();
        doc.inline_comment = orig.inline_comment.clone();
        doc.inner_doc_comments = orig.inner_doc_comments.clone();
        doc.trailing_leading_comments = orig.trailing_leading_comments.clone();
    }

    for (key, child) in root.iter() {
        let orig_kv = original.and_then(|o| o.items.get(key));
        let kv = build_kv(key, child, orig_kv, &mut counter, 1)?;
        doc.items.insert(key.clone(), kv);
    }

    // Keys present in the original but absent from the value tree drop
    // with their comments, which is exactly what not copying them does.
    Ok(doc)
}

fn build_kv(
    key: &str,
    value: &Value,
    orig: Option<&KeyValue>,
    counter: &mut NodeId,
    depth: usize,
) -> Result<KeyValue> {
    let value_node = build_value(value, orig.map(|kv| &kv.value), counter, depth)?;
    let key_is_quoted = orig.map(|kv| kv.key_is_quoted).unwrap_or(false);
    let pos = orig.map(|kv| kv.pos).unwrap_or_default();
    let mut kv = KeyValue::new(key.to_string(), key_is_quoted, value_node, pos);

    if let Some(orig) = orig {
        // A type change drops the entry's comments so a note written for
        // one shape of value cannot describe another.
        if same_kind(&orig.value, value) {
            kv.leading_comments = orig.leading_comments.clone();
            kv.outer_doc_comments = orig.outer_doc_comments.clone();
            kv.inline_comment = orig.inline_comment.clone();
        }
    }

    Ok(kv)
}

fn build_value(
    value: &Value,
    orig: Option<&ValueNode>,
    counter: &mut NodeId,
    depth: usize,
) -> Result<ValueNode> {
    if depth > MAX_DEPTH {
        return Err(Error::serialize("maximum nesting depth exceeded"));
    }

    match value {
        Value::Null => Ok(scalar_node(Scalar::Null, value, orig)),
        Value::Bool(b) => Ok(scalar_node(Scalar::Bool(*b), value, orig)),
        Value::Int(i) => Ok(scalar_node(Scalar::Int(*i), value, orig)),
        Value::Float(f) => Ok(scalar_node(Scalar::Float(*f), value, orig)),
        Value::String(s) => Ok(scalar_node(Scalar::Str(s.clone()), value, orig)),
        Value::Object(object) => {
            let matched = match orig {
                Some(ValueNode::Object(node)) if object.ast == Some(node.id) => Some(node),
                _ => None,
            };

            let id = next_id(counter);
            let mut node = ObjectNode::new(id, Position::default());
            if let Some(source) = matched {
                node.leading_comments = source.leading_comments.clone();
                node.inner_doc_comments = source.inner_doc_comments.clone();
                node.inline_comment = source.inline_comment.clone();
                node.inline_comment_end = source.inline_comment_end.clone();
                node.trailing_comment = source.trailing_comment.clone();
            }

            for (key, child) in object.iter() {
                let orig_kv = matched.and_then(|source| source.items.get(key));
                let kv = build_kv(key, child, orig_kv, counter, depth + 1)?;
                node.items.insert(key.clone(), kv);
            }
            Ok(ValueNode::Object(node))
        }
        Value::List(list) => {
            let matched = match orig {
                Some(ValueNode::List(node)) if list.ast == Some(node.id) => Some(node),
                _ => None,
            };

            let id = next_id(counter);
            let mut node = ListNode::new(id, Position::default());
            if let Some(source) = matched {
                node.leading_comments = source.leading_comments.clone();
                node.inner_doc_comments = source.inner_doc_comments.clone();
                node.inline_comment = source.inline_comment.clone();
                node.inline_comment_end = source.inline_comment_end.clone();
                node.trailing_comment = source.trailing_comment.clone();
            }

            for (i, child) in list.iter().enumerate() {
                let orig_elem = matched.and_then(|source| source.items.get(i));
                node.items
                    .push(build_value(child, orig_elem, counter, depth + 1)?);
            }
            Ok(ValueNode::List(node))
        }
    }
}

/// Scalars compare by value: an untouched list element keeps its own
/// comments, a rewritten one starts clean.
fn scalar_node(scalar: Scalar, value: &Value, orig: Option<&ValueNode>) -> ValueNode {
    let mut node = ScalarNode::new(scalar, Position::default());
    if let Some(ValueNode::Scalar(source)) = orig {
        if scalar_equals(&source.value, value) {
            node.leading_comments = source.leading_comments.clone();
            node.inline_comment = source.inline_comment.clone();
        }
    }
    ValueNode::Scalar(node)
}

fn scalar_equals(scalar: &Scalar, value: &Value) -> bool {
    match (scalar, value) {
        (Scalar::Null, Value::Null) => true,
        (Scalar::Bool(a), Value::Bool(b)) => a == b,
        (Scalar::Int(a), Value::Int(b)) => a == b,
        (Scalar::Float(a), Value::Float(b)) => a == b,
        (Scalar::Str(a), Value::String(b)) => a == b,
        _ => false,
    }
}

fn same_kind(node: &ValueNode, value: &Value) -> bool {
    match (node, value) {
        (ValueNode::Object(_), Value::Object(_)) => true,
        (ValueNode::List(_), Value::List(_)) => true,
        (ValueNode::Scalar(scalar), _) => scalar.value.type_name() == value.type_name(),
        _ => false,
    }
}

fn next_id(counter: &mut NodeId) -> NodeId {
    let id = *counter;
    *counter += 1;
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::parse::parse_document;

    fn load(input: &str) -> (Document, Value) {
        let doc = parse_document(input, &ParseOptions::default()).unwrap();
        let value = doc.to_value();
        (doc, value)
    }

    #[rstest::rstest]
    fn test_untouched_tree_keeps_all_comments() {
        let (doc, value) = load("// lead\na = 1  // inline\nb = { x = 2 }\n");
        let merged = reconcile(&value, Some(&doc)).unwrap();
        let a = merged.get("a").unwrap();
        assert_eq!(a.leading_comments, vec!["lead"]);
        assert_eq!(a.inline_comment.as_deref(), Some("inline"));
    }

    #[rstest::rstest]
    fn test_scalar_mutation_keeps_entry_comments() {
        let (doc, mut value) = load("version = \"1.0\"  // pinned\n");
        value["version"] = Value::from("1.1");
        let merged = reconcile(&value, Some(&doc)).unwrap();
        let kv = merged.get("version").unwrap();
        assert_eq!(kv.inline_comment.as_deref(), Some("pinned"));
        assert!(matches!(&kv.value, ValueNode::Scalar(s) if s.value == Scalar::Str("1.1".into())));
    }

    #[rstest::rstest]
    fn test_type_change_drops_entry_comments() {
        let (doc, mut value) = load("port = 8080  // tcp port\n");
        value["port"] = Value::from("eighty-eighty");
        let merged = reconcile(&value, Some(&doc)).unwrap();
        assert!(merged.get("port").unwrap().inline_comment.is_none());
    }

    #[rstest::rstest]
    fn test_new_key_is_bare() {
        let (doc, mut value) = load("a = 1\n");
        value.as_object_mut().unwrap().insert("b", 2i64);
        let merged = reconcile(&value, Some(&doc)).unwrap();
        assert!(!merged.get("b").unwrap().has_comments());
        let keys: Vec<_> = merged.items.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[rstest::rstest]
    fn test_removed_key_drops_with_comments() {
        let (doc, mut value) = load("a = 1\n// gone\nb = 2\n");
        value.as_object_mut().unwrap().remove("b");
        let merged = reconcile(&value, Some(&doc)).unwrap();
        assert!(merged.get("b").is_none());
        assert_eq!(merged.items.len(), 1);
    }

    #[rstest::rstest]
    fn test_matched_container_keeps_inner_comments() {
        let (doc, mut value) = load("o = {\n    //! inner\n    x = 1,  // x note\n}\n");
        value["o"]["x"] = Value::Int(5);
        let merged = reconcile(&value, Some(&doc)).unwrap();
        let obj = merged.get("o").unwrap().value.as_object().unwrap();
        assert_eq!(obj.inner_doc_comments, vec!["inner"]);
        assert_eq!(obj.items["x"].inline_comment.as_deref(), Some("x note"));
    }

    #[rstest::rstest]
    fn test_replaced_container_serializes_plain() {
        let (doc, mut value) = load("o = {\n    //! inner\n    x = 1,\n}\n");
        let mut fresh = crate::value::ObjectValue::new();
        fresh.insert("x", 1i64);
        value["o"] = Value::Object(fresh); // no back-reference
        let merged = reconcile(&value, Some(&doc)).unwrap();
        let obj = merged.get("o").unwrap().value.as_object().unwrap();
        assert!(obj.inner_doc_comments.is_empty());
        assert!(!obj.items["x"].has_comments());
    }

    #[rstest::rstest]
    fn test_no_original_builds_bare_document() {
        let mut object = crate::value::ObjectValue::new();
        object.insert("a", 1i64);
        let merged = reconcile(&Value::Object(object), None).unwrap();
        assert_eq!(merged.items.len(), 1);
        assert!(!merged.get("a").unwrap().has_comments());
    }

    #[rstest::rstest]
    fn test_non_object_root_rejected() {
        let err = reconcile(&Value::Int(1), None).unwrap_err();
        assert!(err.message.contains("document root must be an object"));
    }

    #[rstest::rstest]
    fn test_document_scope_comments_survive() {
        let (doc, value) = load("//! header\na = 1\n// trailing\n");
        let merged = reconcile(&value, Some(&doc)).unwrap();
        assert_eq!(merged.inner_doc_comments, vec!["header"]);
        assert_eq!(merged.trailing_leading_comments, vec!["trailing"]);
    }

    #[rstest::rstest]
    fn test_list_element_scalar_comments_follow_value_equality() {
        let (doc, mut value) = load("l = [\n    1,  // one\n    2,\n]\n");
        value["l"][1] = Value::Int(5);
        let merged = reconcile(&value, Some(&doc)).unwrap();
        let list = merged.get("l").unwrap().value.as_list().unwrap();
        assert_eq!(
            list.items[0].inline_comment().map(String::as_str),
            Some("one")
        );
        assert!(list.items[1].inline_comment().is_none());
    }
}
