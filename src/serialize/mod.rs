//! Deterministic serializer.
//!
//! Formatting favors round-trip stability over minimality: root entries
//! sit one per line with a blank line between them, containers that carry
//! comments (anywhere in their subtree) or exceed the inline threshold go
//! multiline with trailing commas, and every comment slot has exactly one
//! place it prints to.

pub mod reconcile;
pub mod writer;

use tracing::debug;

use crate::ast::{Document, KeyValue, ListNode, ObjectNode, Scalar, ValueNode};
use crate::constants::{is_reserved_word, RESERVED_KEYS};
use crate::error::{Error, Result};
use crate::options::SerializeOptions;
use crate::utils::string::is_valid_ident;
use crate::value::Value;
use writer::Writer;

/// Render a document back to text.
pub fn serialize_document(doc: &Document, options: &SerializeOptions) -> Result<String> {
    let mut serializer = Serializer {
        w: Writer::new(options.indent_spaces),
        threshold: options.inline_threshold,
    };
    serializer.document(doc)?;
    let out = serializer.w.finish();
    debug!(bytes = out.len(), "serialized document");
    Ok(out)
}

/// Reconcile a value tree with its original AST and render the result.
pub fn dump_value(
    value: &Value,
    original: Option<&Document>,
    options: &SerializeOptions,
) -> Result<String> {
    let doc = reconcile::reconcile(value, original)?;
    serialize_document(&doc, options)
}

struct Serializer {
    w: Writer,
    threshold: usize,
}

impl Serializer {
    fn document(&mut self, doc: &Document) -> Result<()> {
        for text in &doc.leading_comments {
            self.comment_line(0, "//", text)?;
        }
        for text in &doc.inner_doc_comments {
            self.comment_line(0, "//!", text)?;
        }

        // Reserved metadata keys lead, in their fixed order.
        let mut order: Vec<&String> = Vec::with_capacity(doc.items.len());
        for reserved in RESERVED_KEYS {
            if let Some((key, _)) = doc.items.get_key_value(*reserved) {
                order.push(key);
            }
        }
        for key in doc.items.keys() {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                order.push(key);
            }
        }

        let mut first = true;
        for key in &order {
            if !first {
                self.w.newline();
            }
            first = false;
            let kv = &doc.items[key.as_str()];
            self.entry(kv, 0, false)?;
        }

        if !doc.trailing_leading_comments.is_empty() {
            if !order.is_empty() {
                self.w.newline();
            }
            for text in &doc.trailing_leading_comments {
                self.comment_line(0, "//", text)?;
            }
        }
        Ok(())
    }

    fn entry(&mut self, kv: &KeyValue, depth: usize, comma: bool) -> Result<()> {
        for text in &kv.outer_doc_comments {
            self.comment_line(depth, "///", text)?;
        }
        for text in &kv.leading_comments {
            self.comment_line(depth, "//", text)?;
        }

        self.w.indent(depth);
        self.key(kv);
        self.w.push_str(" = ");
        self.value(&kv.value, depth)?;
        if comma {
            self.w.push_char(',');
        }
        if let Some(text) = &kv.inline_comment {
            self.inline_comment(text)?;
        }
        self.w.newline();
        Ok(())
    }

    fn key(&mut self, kv: &KeyValue) {
        if kv.key_is_quoted || !is_valid_ident(&kv.key) || is_reserved_word(&kv.key) {
            self.w.write_quoted(&kv.key);
        } else {
            self.w.push_str(&kv.key);
        }
    }

    fn value(&mut self, node: &ValueNode, depth: usize) -> Result<()> {
        match node {
            ValueNode::Scalar(scalar) => self.scalar(&scalar.value),
            // Leading and trailing comments print in the enclosing scope,
            // so only interior comments push a container multiline.
            ValueNode::Object(object) => {
                if self.object_fits_inline(object) && !object.has_interior_comments() {
                    self.object_inline(object)
                } else {
                    self.object_multiline(object, depth)
                }
            }
            ValueNode::List(list) => {
                if self.list_fits_inline(list) && !list.has_interior_comments() {
                    self.list_inline(list, depth)
                } else {
                    self.list_multiline(list, depth)
                }
            }
        }
    }

    fn scalar(&mut self, scalar: &Scalar) -> Result<()> {
        match scalar {
            Scalar::Str(s) => {
                self.w.write_quoted(s);
                Ok(())
            }
            Scalar::Int(i) => {
                self.w.write_int(*i);
                Ok(())
            }
            Scalar::Float(f) => self.w.write_float(*f),
            Scalar::Bool(true) => {
                self.w.push_str("true");
                Ok(())
            }
            Scalar::Bool(false) => {
                self.w.push_str("false");
                Ok(())
            }
            Scalar::Null => {
                self.w.push_str("null");
                Ok(())
            }
        }
    }

    fn node_fits_inline(&self, node: &ValueNode) -> bool {
        match node {
            ValueNode::Scalar(_) => true,
            ValueNode::Object(object) => self.object_fits_inline(object),
            ValueNode::List(list) => self.list_fits_inline(list),
        }
    }

    fn object_fits_inline(&self, object: &ObjectNode) -> bool {
        object.items.len() <= self.threshold
            && object
                .items
                .values()
                .all(|kv| self.node_fits_inline(&kv.value))
    }

    fn list_fits_inline(&self, list: &ListNode) -> bool {
        list.items.len() <= self.threshold
            && list.items.iter().all(|item| self.node_fits_inline(item))
    }

    fn object_inline(&mut self, object: &ObjectNode) -> Result<()> {
        if object.items.is_empty() {
            self.w.push_str("{}");
            return Ok(());
        }
        self.w.push_str("{ ");
        for (i, kv) in object.items.values().enumerate() {
            if i > 0 {
                self.w.push_str(", ");
            }
            self.key(kv);
            self.w.push_str(" = ");
            self.value(&kv.value, 0)?;
        }
        self.w.push_str(" }");
        Ok(())
    }

    fn list_inline(&mut self, list: &ListNode, depth: usize) -> Result<()> {
        if list.items.is_empty() {
            self.w.push_str("[]");
            return Ok(());
        }
        self.w.push_str("[ ");
        for (i, item) in list.items.iter().enumerate() {
            if i > 0 {
                self.w.push_str(", ");
            }
            self.value(item, depth)?;
        }
        self.w.push_str(" ]");
        Ok(())
    }

    fn object_multiline(&mut self, object: &ObjectNode, depth: usize) -> Result<()> {
        self.w.push_char('{');
        if let Some(text) = &object.inline_comment {
            self.inline_comment(text)?;
        }
        self.w.newline();
        for text in &object.inner_doc_comments {
            self.comment_line(depth + 1, "//!", text)?;
        }
        for kv in object.items.values() {
            self.entry(kv, depth + 1, true)?;
        }
        for text in &object.inline_comment_end {
            self.comment_line(depth + 1, "//", text)?;
        }
        self.w.indent(depth);
        self.w.push_char('}');
        Ok(())
    }

    fn list_multiline(&mut self, list: &ListNode, depth: usize) -> Result<()> {
        self.w.push_char('[');
        if let Some(text) = &list.inline_comment {
            self.inline_comment(text)?;
        }
        self.w.newline();
        for text in &list.inner_doc_comments {
            self.comment_line(depth + 1, "//!", text)?;
        }
        for item in &list.items {
            let leading = match item {
                ValueNode::Scalar(s) => &s.leading_comments,
                ValueNode::Object(o) => &o.leading_comments,
                ValueNode::List(l) => &l.leading_comments,
            };
            for text in leading {
                self.comment_line(depth + 1, "//", text)?;
            }

            self.w.indent(depth + 1);
            self.value(item, depth + 1)?;
            self.w.push_char(',');
            // Scalars put their inline comment here; containers put the
            // comment that trailed their closer (the opener-line comment
            // already printed inside the container).
            if let Some(text) = item.element_trailing_comment() {
                self.inline_comment(text)?;
            }
            self.w.newline();
        }
        for text in &list.inline_comment_end {
            self.comment_line(depth + 1, "//", text)?;
        }
        self.w.indent(depth);
        self.w.push_char(']');
        Ok(())
    }

    fn comment_line(&mut self, depth: usize, marker: &str, text: &str) -> Result<()> {
        check_comment(text)?;
        self.w.indent(depth);
        self.w.push_str(marker);
        if !text.is_empty() {
            self.w.push_char(' ');
            self.w.push_str(text);
        }
        self.w.newline();
        Ok(())
    }

    fn inline_comment(&mut self, text: &str) -> Result<()> {
        check_comment(text)?;
        self.w.push_str("  //");
        if !text.is_empty() {
            self.w.push_char(' ');
            self.w.push_str(text);
        }
        Ok(())
    }
}

fn check_comment(text: &str) -> Result<()> {
    if text.contains('\n') {
        return Err(Error::serialize("comment contains a newline"));
    }
    Ok(())
}
