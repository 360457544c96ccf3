//! Second-pass comment attachment.
//!
//! The structural parser ignores comment tokens entirely; this pass walks
//! the same token stream again, next to the finished AST, and binds every
//! comment to a slot. Keeping the passes apart means the attacher can be
//! tested on its own and the parser never has to reason about comment
//! placement mid-production.
//!
//! Attachment rules, applied deterministically:
//! - `//!` runs before the first element of a scope go to that scope's
//!   `inner_doc_comments` (the document counts as a scope).
//! - `///` runs bind to the next key-value in the scope; a blank line
//!   inside the run demotes the earlier part to plain comments, and a run
//!   with no following key-value demotes entirely.
//! - `//` lines bind to the next element as `leading_comments`.
//! - A comment on the same line as an element's last token trails that
//!   element: key-values and scalars take it as their `inline_comment`,
//!   containers sitting directly in a list as their `trailing_comment`
//!   (their `inline_comment` is reserved for the opener's line). Each
//!   slot holds one comment; a second is a parse error.
//! - Comments after the last element of a scope lead the closing
//!   delimiter (`inline_comment_end`), or `trailing_leading_comments` at
//!   document scope.
//! - In an empty document everything collects in `leading_comments`.

use smallvec::SmallVec;

use crate::ast::{Document, KeyValue, ListNode, ObjectNode, ValueNode};
use crate::error::{Error, Position, Result};
use crate::lex::{Spanned, Token};

pub fn attach_comments(doc: &mut Document, tokens: &[Spanned]) -> Result<()> {
    Attacher { tokens, pos: 0 }.walk_document(doc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Line,
    OuterDoc,
}

#[derive(Debug)]
struct Pending {
    kind: PendingKind,
    text: String,
}

type PendingRun = SmallVec<[Pending; 8]>;

struct Attacher<'t> {
    tokens: &'t [Spanned],
    pos: usize,
}

impl<'t> Attacher<'t> {
    fn peek(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Spanned {
        let spanned = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        spanned
    }

    fn walk_document(&mut self, doc: &mut Document) -> Result<()> {
        if doc.items.is_empty() {
            // Empty document: every comment is a leading comment.
            loop {
                let spanned = self.bump();
                match spanned.token {
                    Token::Comment(text) | Token::OuterDoc(text) | Token::InnerDoc(text) => {
                        doc.leading_comments.push(text);
                    }
                    Token::Eof => return Ok(()),
                    _ => {}
                }
            }
        }

        let mut pending = PendingRun::new();
        let mut index = 0usize;
        let mut last_end: Option<usize> = None;
        let mut newline_run = 0usize;

        loop {
            let spanned = self.peek().clone();
            match spanned.token {
                Token::Whitespace => {
                    self.bump();
                }
                Token::Newline => {
                    newline_run += 1;
                    self.bump();
                }
                Token::Comment(text) => {
                    self.bump();
                    if last_end == Some(spanned.pos.line) {
                        let (_, kv) = doc.items.get_index_mut(index - 1).expect("bound element");
                        set_kv_inline(kv, text, spanned.pos)?;
                    } else {
                        push_pending(&mut pending, PendingKind::Line, text, newline_run);
                    }
                    newline_run = 0;
                }
                Token::OuterDoc(text) => {
                    self.bump();
                    if last_end == Some(spanned.pos.line) {
                        let (_, kv) = doc.items.get_index_mut(index - 1).expect("bound element");
                        set_kv_inline(kv, text, spanned.pos)?;
                    } else {
                        push_pending(&mut pending, PendingKind::OuterDoc, text, newline_run);
                    }
                    newline_run = 0;
                }
                Token::InnerDoc(text) => {
                    self.bump();
                    if last_end == Some(spanned.pos.line) {
                        let (_, kv) = doc.items.get_index_mut(index - 1).expect("bound element");
                        set_kv_inline(kv, text, spanned.pos)?;
                    } else if index == 0 {
                        doc.inner_doc_comments.push(text);
                    } else {
                        push_pending(&mut pending, PendingKind::Line, text, newline_run);
                    }
                    newline_run = 0;
                }
                Token::Eof => {
                    for p in pending.drain(..) {
                        doc.trailing_leading_comments.push(p.text);
                    }
                    return Ok(());
                }
                _ => {
                    newline_run = 0;
                    let (_, kv) = doc.items.get_index_mut(index).expect("entry for token");
                    flush_to_kv(&mut pending, kv);
                    let end_line = self.walk_entry(kv)?;
                    last_end = Some(end_line);
                    index += 1;
                }
            }
        }
    }

    /// Consume one `key = value` entry; the cursor sits on the key token.
    /// Returns the line the entry's value ends on.
    fn walk_entry(&mut self, kv: &mut KeyValue) -> Result<usize> {
        self.bump(); // key

        // Up to and past the '='.
        loop {
            let spanned = self.bump();
            match spanned.token {
                Token::Equal => break,
                Token::Comment(text) | Token::OuterDoc(text) | Token::InnerDoc(text) => {
                    kv.leading_comments.push(text);
                }
                Token::Whitespace | Token::Newline => {}
                Token::Eof => return Ok(spanned.pos.line),
                _ => {}
            }
        }

        // Up to the value's first token.
        loop {
            match self.peek().token {
                Token::Whitespace | Token::Newline => {
                    self.bump();
                }
                Token::Comment(_) | Token::OuterDoc(_) | Token::InnerDoc(_) => {
                    let spanned = self.bump();
                    if let Token::Comment(text)
                    | Token::OuterDoc(text)
                    | Token::InnerDoc(text) = spanned.token
                    {
                        kv.leading_comments.push(text);
                    }
                }
                _ => break,
            }
        }

        self.walk_value(&mut kv.value)
    }

    fn walk_value(&mut self, node: &mut ValueNode) -> Result<usize> {
        match node {
            ValueNode::Scalar(_) => {
                let spanned = self.bump();
                Ok(spanned.pos.line)
            }
            ValueNode::Object(obj) => self.walk_object(obj),
            ValueNode::List(list) => self.walk_list(list),
        }
    }

    fn walk_object(&mut self, obj: &mut ObjectNode) -> Result<usize> {
        let open_line = self.bump().pos.line; // '{'

        let mut pending = PendingRun::new();
        let mut index = 0usize;
        let mut last_end: Option<usize> = None;
        let mut newline_run = 0usize;

        loop {
            let spanned = self.peek().clone();
            match spanned.token {
                Token::Whitespace => {
                    self.bump();
                }
                Token::Newline => {
                    newline_run += 1;
                    self.bump();
                }
                Token::Comma => {
                    newline_run = 0;
                    self.bump();
                }
                Token::Comment(_) | Token::OuterDoc(_) | Token::InnerDoc(_) => {
                    self.bump();
                    let (is_inner, is_outer, text) = split_comment(spanned.token);
                    if last_end == Some(spanned.pos.line) {
                        let (_, kv) = obj.items.get_index_mut(index - 1).expect("bound element");
                        set_kv_inline(kv, text, spanned.pos)?;
                    } else if last_end.is_none() && index == 0 && spanned.pos.line == open_line {
                        set_container_inline(&mut obj.inline_comment, text, spanned.pos)?;
                    } else if is_inner && index == 0 {
                        obj.inner_doc_comments.push(text);
                    } else {
                        let kind = if is_outer {
                            PendingKind::OuterDoc
                        } else {
                            PendingKind::Line
                        };
                        push_pending(&mut pending, kind, text, newline_run);
                    }
                    newline_run = 0;
                }
                Token::RBrace => {
                    let close = self.bump();
                    for p in pending.drain(..) {
                        obj.inline_comment_end.push(p.text);
                    }
                    return Ok(close.pos.line);
                }
                Token::Eof => {
                    return Ok(spanned.pos.line);
                }
                _ => {
                    newline_run = 0;
                    let (_, kv) = obj.items.get_index_mut(index).expect("entry for token");
                    flush_to_kv(&mut pending, kv);
                    let end_line = self.walk_entry(kv)?;
                    last_end = Some(end_line);
                    index += 1;
                }
            }
        }
    }

    fn walk_list(&mut self, list: &mut ListNode) -> Result<usize> {
        let open_line = self.bump().pos.line; // '['

        let mut pending = PendingRun::new();
        let mut index = 0usize;
        let mut last_end: Option<usize> = None;
        let mut newline_run = 0usize;

        loop {
            let spanned = self.peek().clone();
            match spanned.token {
                Token::Whitespace => {
                    self.bump();
                }
                Token::Newline => {
                    newline_run += 1;
                    self.bump();
                }
                Token::Comma => {
                    newline_run = 0;
                    self.bump();
                }
                Token::Comment(_) | Token::OuterDoc(_) | Token::InnerDoc(_) => {
                    self.bump();
                    let (is_inner, is_outer, text) = split_comment(spanned.token);
                    if last_end == Some(spanned.pos.line) {
                        let element = list.items.get_mut(index - 1).expect("bound element");
                        set_element_inline(element, text, spanned.pos)?;
                    } else if last_end.is_none() && index == 0 && spanned.pos.line == open_line {
                        set_container_inline(&mut list.inline_comment, text, spanned.pos)?;
                    } else if is_inner && index == 0 {
                        list.inner_doc_comments.push(text);
                    } else {
                        // Outer docs never bind to list elements (only
                        // key-values take them), so they ride along as
                        // orphans.
                        let kind = if is_outer {
                            PendingKind::OuterDoc
                        } else {
                            PendingKind::Line
                        };
                        push_pending(&mut pending, kind, text, newline_run);
                    }
                    newline_run = 0;
                }
                Token::RBracket => {
                    let close = self.bump();
                    for p in pending.drain(..) {
                        list.inline_comment_end.push(p.text);
                    }
                    return Ok(close.pos.line);
                }
                Token::Eof => {
                    return Ok(spanned.pos.line);
                }
                _ => {
                    newline_run = 0;
                    let element = list.items.get_mut(index).expect("element for token");
                    // Plain comments lead the element; outer docs only bind
                    // to key-values, so they stay pending and end up leading
                    // the closer.
                    let mut kept = PendingRun::new();
                    for p in pending.drain(..) {
                        match p.kind {
                            PendingKind::Line => element.leading_comments_mut().push(p.text),
                            PendingKind::OuterDoc => kept.push(p),
                        }
                    }
                    pending = kept;
                    let end_line = self.walk_value(element)?;
                    last_end = Some(end_line);
                    index += 1;
                }
            }
        }
    }
}

/// A blank line splits an outer-doc run: the earlier part demotes to
/// plain comments.
fn push_pending(pending: &mut PendingRun, kind: PendingKind, text: String, newline_run: usize) {
    if kind == PendingKind::OuterDoc && newline_run >= 2 {
        for p in pending.iter_mut() {
            if p.kind == PendingKind::OuterDoc {
                p.kind = PendingKind::Line;
            }
        }
    }
    pending.push(Pending { kind, text });
}

fn flush_to_kv(pending: &mut PendingRun, kv: &mut KeyValue) {
    for p in pending.drain(..) {
        match p.kind {
            PendingKind::Line => kv.leading_comments.push(p.text),
            PendingKind::OuterDoc => kv.outer_doc_comments.push(p.text),
        }
    }
}

/// Take a comment token apart into (is_inner_doc, is_outer_doc, text).
fn split_comment(token: Token) -> (bool, bool, String) {
    match token {
        Token::Comment(text) => (false, false, text),
        Token::OuterDoc(text) => (false, true, text),
        Token::InnerDoc(text) => (true, false, text),
        other => unreachable!("not a comment token: {other:?}"),
    }
}

fn set_kv_inline(kv: &mut KeyValue, text: String, pos: Position) -> Result<()> {
    if kv.inline_comment.is_some() {
        return Err(Error::parse(
            pos,
            format!("element '{}' already has an inline comment", kv.key),
        ));
    }
    kv.inline_comment = Some(text);
    Ok(())
}

/// Bind a same-line comment to a list element. For containers the
/// comment follows the closing token, so it lands in the trailing slot
/// and leaves the opener-line slot alone.
fn set_element_inline(node: &mut ValueNode, text: String, pos: Position) -> Result<()> {
    let slot = match node {
        ValueNode::Scalar(scalar) => &mut scalar.inline_comment,
        ValueNode::Object(object) => &mut object.trailing_comment,
        ValueNode::List(list) => &mut list.trailing_comment,
    };
    if slot.is_some() {
        return Err(Error::parse(pos, "element already has an inline comment"));
    }
    *slot = Some(text);
    Ok(())
}

fn set_container_inline(slot: &mut Option<String>, text: String, pos: Position) -> Result<()> {
    if slot.is_some() {
        return Err(Error::parse(pos, "container already has an inline comment"));
    }
    *slot = Some(text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Tokenizer;
    use crate::parse::parser::Parser;

    fn parse_attached(input: &str) -> Document {
        let tokens = Tokenizer::new(input).tokenize().unwrap();
        let mut doc = Parser::new(&tokens).parse_document().unwrap();
        attach_comments(&mut doc, &tokens).unwrap();
        doc
    }

    #[rstest::rstest]
    fn test_document_inner_docs() {
        let doc = parse_attached("//! title\n//! subtitle\na = 1\n");
        assert_eq!(doc.inner_doc_comments, vec!["title", "subtitle"]);
    }

    #[rstest::rstest]
    fn test_leading_and_inline() {
        let doc = parse_attached("// lead\nname = \"App\"  // inline\n");
        let kv = doc.get("name").unwrap();
        assert_eq!(kv.leading_comments, vec!["lead"]);
        assert_eq!(kv.inline_comment.as_deref(), Some("inline"));
    }

    #[rstest::rstest]
    fn test_outer_docs_bind_to_next_entry() {
        let doc = parse_attached("/// docs line one\n/// docs line two\nport = 80\n");
        let kv = doc.get("port").unwrap();
        assert_eq!(kv.outer_doc_comments, vec!["docs line one", "docs line two"]);
        assert!(kv.leading_comments.is_empty());
    }

    #[rstest::rstest]
    fn test_outer_docs_allow_gap_before_entry() {
        let doc = parse_attached("/// docs\n\n\nport = 80\n");
        assert_eq!(doc.get("port").unwrap().outer_doc_comments, vec!["docs"]);
    }

    #[rstest::rstest]
    fn test_blank_line_splits_outer_doc_run() {
        let doc = parse_attached("/// early\n\n/// late\nport = 80\n");
        let kv = doc.get("port").unwrap();
        assert_eq!(kv.outer_doc_comments, vec!["late"]);
        assert_eq!(kv.leading_comments, vec!["early"]);
    }

    #[rstest::rstest]
    fn test_trailing_comments_at_document_scope() {
        let doc = parse_attached("a = 1\n// left behind\n/// dangling doc\n");
        assert_eq!(
            doc.trailing_leading_comments,
            vec!["left behind", "dangling doc"]
        );
    }

    #[rstest::rstest]
    fn test_empty_document_collects_everything() {
        let doc = parse_attached("// one\n//! two\n/// three\n");
        assert_eq!(doc.leading_comments, vec!["one", "two", "three"]);
        assert!(doc.inner_doc_comments.is_empty());
    }

    #[rstest::rstest]
    fn test_container_inner_docs() {
        let doc = parse_attached("o = {\n    //! about o\n    a = 1,\n}\n");
        let obj = doc.get("o").unwrap().value.as_object().unwrap();
        assert_eq!(obj.inner_doc_comments, vec!["about o"]);
    }

    #[rstest::rstest]
    fn test_object_member_comments() {
        let doc = parse_attached(
            "o = {\n    // about a\n    a = 1,  // inline a\n    b = 2,\n}\n",
        );
        let obj = doc.get("o").unwrap().value.as_object().unwrap();
        let a = &obj.items["a"];
        assert_eq!(a.leading_comments, vec!["about a"]);
        assert_eq!(a.inline_comment.as_deref(), Some("inline a"));
        assert!(!obj.items["b"].has_comments());
    }

    #[rstest::rstest]
    fn test_end_comments_lead_the_closer() {
        let doc = parse_attached("o = {\n    a = 1,\n    // last words\n}\n");
        let obj = doc.get("o").unwrap().value.as_object().unwrap();
        assert_eq!(obj.inline_comment_end, vec!["last words"]);
    }

    #[rstest::rstest]
    fn test_opener_line_comment() {
        let doc = parse_attached("o = {  // right here\n    a = 1,\n}\n");
        let obj = doc.get("o").unwrap().value.as_object().unwrap();
        assert_eq!(obj.inline_comment.as_deref(), Some("right here"));
    }

    #[rstest::rstest]
    fn test_multiline_container_closer_inline_binds_to_entry() {
        let doc = parse_attached("o = {\n    a = 1,\n}  // after close\n");
        let kv = doc.get("o").unwrap();
        assert_eq!(kv.inline_comment.as_deref(), Some("after close"));
    }

    #[rstest::rstest]
    fn test_list_element_comments() {
        let doc = parse_attached(
            "l = [\n    // first\n    1,  // one\n    2,\n    // done\n]\n",
        );
        let list = doc.get("l").unwrap().value.as_list().unwrap();
        match &list.items[0] {
            ValueNode::Scalar(s) => {
                assert_eq!(s.leading_comments, vec!["first"]);
                assert_eq!(s.inline_comment.as_deref(), Some("one"));
            }
            other => panic!("expected scalar, got {other:?}"),
        }
        assert_eq!(list.inline_comment_end, vec!["done"]);
    }

    #[rstest::rstest]
    fn test_inner_docs_after_elements_demote() {
        let doc = parse_attached("a = 1\n//! not a header\nb = 2\n");
        assert!(doc.inner_doc_comments.is_empty());
        assert_eq!(doc.get("b").unwrap().leading_comments, vec!["not a header"]);
    }

    #[rstest::rstest]
    fn test_preserve_comments_off_leaves_ast_untouched() {
        let input = "// lead\na = 1  // inline\n";
        let tokens = Tokenizer::new(input).tokenize().unwrap();
        let doc = Parser::new(&tokens).parse_document().unwrap();
        // No attachment pass: the skeleton has no comments at all.
        assert!(!doc.get("a").unwrap().has_comments());
    }

    #[rstest::rstest]
    fn test_mixed_lead_and_docs_keep_their_slots() {
        let doc = parse_attached("// plain\n/// doc\nkey = 1\n");
        let kv = doc.get("key").unwrap();
        assert_eq!(kv.leading_comments, vec!["plain"]);
        assert_eq!(kv.outer_doc_comments, vec!["doc"]);
    }
}
