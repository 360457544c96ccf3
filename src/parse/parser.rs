//! Structural document parser.
//!
//! First of the two passes: builds the AST skeleton and ignores comments
//! entirely (the attacher owns those). On an error the parser
//! re-synchronizes — to the next newline at root, to the next comma or
//! closing delimiter inside a container — so one pass reports every
//! problem it can reach.

use indexmap::IndexMap;

use crate::ast::{
    Document, KeyValue, ListNode, NodeId, ObjectNode, Scalar, ScalarNode, ValueNode, ROOT_NODE_ID,
};
use crate::constants::{is_reserved_key, is_reserved_word, MAX_DEPTH};
use crate::error::{Error, Position, Result};
use crate::lex::{Spanned, Token};

pub struct Parser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
    next_node_id: NodeId,
    errors: Vec<Error>,
}

enum Resync {
    Separator,
    Closed,
    Eof,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Spanned]) -> Self {
        Self {
            tokens,
            pos: 0,
            next_node_id: ROOT_NODE_ID + 1,
            errors: Vec::new(),
        }
    }

    pub fn parse_document(mut self) -> Result<Document> {
        let mut doc = Document::new();

        loop {
            self.skip_all();
            if matches!(self.peek().token, Token::Eof) {
                break;
            }
            if let Err(error) = self.parse_root_entry(&mut doc) {
                self.errors.push(error);
                self.recover_to_root_newline();
            }
        }

        match self.errors.is_empty() {
            true => Ok(doc),
            false => {
                let mut errors = std::mem::take(&mut self.errors);
                let first = errors.remove(0);
                Err(first.with_related(errors))
            }
        }
    }

    fn next_id(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }

    fn peek(&self) -> &'t Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> &'t Spanned {
        let spanned = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        spanned
    }

    /// Skip whitespace and comments, staying on the current line.
    fn skip_ws(&mut self) {
        while self.peek().token.is_trivia() {
            self.bump();
        }
    }

    /// Skip whitespace, comments, and newlines.
    fn skip_all(&mut self) {
        while matches!(self.peek().token, Token::Newline) || self.peek().token.is_trivia() {
            self.bump();
        }
    }

    fn parse_root_entry(&mut self, doc: &mut Document) -> Result<()> {
        let (key, key_is_quoted, key_pos) = self.parse_key()?;
        self.skip_ws();
        self.expect_equal(&key)?;
        self.skip_ws();
        let value = self.parse_value(1)?;

        if is_reserved_key(&key) && !is_string_scalar(&value) {
            return Err(Error::parse(
                key_pos,
                format!("reserved key '{key}' must have a string value"),
            ));
        }

        self.skip_ws();
        match self.peek().token {
            Token::Newline | Token::Eof => {}
            ref other => {
                let pos = self.peek().pos;
                let got = other.describe();
                self.errors.push(Error::parse(
                    pos,
                    format!("expected newline after root entry, got {got}"),
                ));
                self.recover_to_root_newline();
            }
        }

        if doc.items.contains_key(&key) {
            return Err(Error::parse(key_pos, format!("duplicate key '{key}'")));
        }
        doc.items
            .insert(key.clone(), KeyValue::new(key, key_is_quoted, value, key_pos));
        Ok(())
    }

    fn parse_key(&mut self) -> Result<(String, bool, Position)> {
        let spanned = self.peek().clone();
        match spanned.token {
            Token::Ident(ref name) => {
                if is_reserved_word(name) {
                    return Err(Error::parse(
                        spanned.pos,
                        format!("reserved word '{name}' cannot be an unquoted key"),
                    ));
                }
                self.bump();
                Ok((name.clone(), false, spanned.pos))
            }
            Token::Str(ref key) | Token::SingleStr(ref key) => {
                self.bump();
                Ok((key.clone(), true, spanned.pos))
            }
            Token::Bool(_) | Token::Null => {
                let word = match spanned.token {
                    Token::Bool(true) => "true",
                    Token::Bool(false) => "false",
                    _ => "null",
                };
                Err(Error::parse(
                    spanned.pos,
                    format!("reserved word '{word}' cannot be an unquoted key"),
                ))
            }
            ref other => Err(Error::parse(
                spanned.pos,
                format!("expected key, got {}", other.describe()),
            )),
        }
    }

    fn expect_equal(&mut self, key: &str) -> Result<()> {
        let spanned = self.peek();
        if matches!(spanned.token, Token::Equal) {
            self.bump();
            Ok(())
        } else {
            Err(Error::parse(
                spanned.pos,
                format!(
                    "expected '=' after key '{key}', got {}",
                    spanned.token.describe()
                ),
            ))
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<ValueNode> {
        if depth > MAX_DEPTH {
            return Err(Error::parse(
                self.peek().pos,
                "maximum nesting depth exceeded",
            ));
        }

        let spanned = self.peek().clone();
        let scalar = match spanned.token {
            Token::Str(ref s) => Scalar::Str(s.clone()),
            Token::SingleStr(ref s) => Scalar::Str(s.clone()),
            Token::Int(i) => Scalar::Int(i),
            Token::Float(f) => Scalar::Float(f),
            Token::Bool(b) => Scalar::Bool(b),
            Token::Null => Scalar::Null,
            Token::LBrace => return self.parse_object(depth),
            Token::LBracket => return self.parse_list(depth),
            Token::Ident(ref word) => {
                return Err(Error::parse(
                    spanned.pos,
                    format!("unexpected identifier '{word}'; strings must be quoted"),
                ))
            }
            ref other => {
                return Err(Error::parse(
                    spanned.pos,
                    format!("expected value, got {}", other.describe()),
                ))
            }
        };
        self.bump();
        Ok(ValueNode::Scalar(ScalarNode::new(scalar, spanned.pos)))
    }

    fn parse_object(&mut self, depth: usize) -> Result<ValueNode> {
        let open_pos = self.peek().pos;
        self.bump();
        let mut node = ObjectNode::new(self.next_id(), open_pos);
        let mut items: IndexMap<String, KeyValue> = IndexMap::new();

        loop {
            self.skip_all();
            match self.peek().token {
                Token::RBrace => {
                    self.bump();
                    break;
                }
                Token::Eof => {
                    return Err(Error::parse(open_pos, "unterminated object"));
                }
                _ => {}
            }

            match self.parse_pair(depth) {
                Ok(kv) => {
                    if items.contains_key(&kv.key) {
                        self.errors
                            .push(Error::parse(kv.pos, format!("duplicate key '{}'", kv.key)));
                    } else {
                        items.insert(kv.key.clone(), kv);
                    }
                }
                Err(error) => {
                    self.errors.push(error);
                    match self.resync_container() {
                        Resync::Separator => continue,
                        Resync::Closed => break,
                        Resync::Eof => {
                            return Err(Error::parse(open_pos, "unterminated object"))
                        }
                    }
                }
            }

            self.skip_all();
            match self.peek().token {
                Token::Comma => {
                    self.bump();
                }
                Token::RBrace => {
                    self.bump();
                    break;
                }
                Token::Eof => return Err(Error::parse(open_pos, "unterminated object")),
                ref other => {
                    let pos = self.peek().pos;
                    let got = other.describe();
                    self.errors.push(Error::parse(
                        pos,
                        format!("expected ',' or '}}' between object entries, got {got}"),
                    ));
                    match self.resync_container() {
                        Resync::Separator => continue,
                        Resync::Closed => break,
                        Resync::Eof => {
                            return Err(Error::parse(open_pos, "unterminated object"))
                        }
                    }
                }
            }
        }

        node.items = items;
        Ok(ValueNode::Object(node))
    }

    fn parse_pair(&mut self, depth: usize) -> Result<KeyValue> {
        let (key, key_is_quoted, key_pos) = self.parse_key()?;
        self.skip_ws();
        self.expect_equal(&key)?;
        self.skip_all();
        let value = self.parse_value(depth + 1)?;
        Ok(KeyValue::new(key, key_is_quoted, value, key_pos))
    }

    fn parse_list(&mut self, depth: usize) -> Result<ValueNode> {
        let open_pos = self.peek().pos;
        self.bump();
        let mut node = ListNode::new(self.next_id(), open_pos);

        loop {
            self.skip_all();
            match self.peek().token {
                Token::RBracket => {
                    self.bump();
                    break;
                }
                Token::Eof => return Err(Error::parse(open_pos, "unterminated list")),
                _ => {}
            }

            match self.parse_value(depth + 1) {
                Ok(value) => node.items.push(value),
                Err(error) => {
                    self.errors.push(error);
                    match self.resync_container() {
                        Resync::Separator => continue,
                        Resync::Closed => break,
                        Resync::Eof => return Err(Error::parse(open_pos, "unterminated list")),
                    }
                }
            }

            self.skip_all();
            match self.peek().token {
                Token::Comma => {
                    self.bump();
                }
                Token::RBracket => {
                    self.bump();
                    break;
                }
                Token::Eof => return Err(Error::parse(open_pos, "unterminated list")),
                ref other => {
                    let pos = self.peek().pos;
                    let got = other.describe();
                    self.errors.push(Error::parse(
                        pos,
                        format!("expected ',' or ']' between list elements, got {got}"),
                    ));
                    match self.resync_container() {
                        Resync::Separator => continue,
                        Resync::Closed => break,
                        Resync::Eof => return Err(Error::parse(open_pos, "unterminated list")),
                    }
                }
            }
        }

        Ok(ValueNode::List(node))
    }

    /// Skip forward to the next separator or closer at this nesting level,
    /// then consume it. Keeps a count of unclosed openers so a broken
    /// nested container does not make us pop out too far.
    fn resync_container(&mut self) -> Resync {
        let mut depth = 0usize;
        loop {
            match self.peek().token {
                Token::Eof => return Resync::Eof,
                Token::LBrace | Token::LBracket => {
                    depth += 1;
                    self.bump();
                }
                Token::RBrace | Token::RBracket => {
                    if depth == 0 {
                        self.bump();
                        return Resync::Closed;
                    }
                    depth -= 1;
                    self.bump();
                }
                Token::Comma if depth == 0 => {
                    self.bump();
                    return Resync::Separator;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Skip forward to the next root-level newline.
    fn recover_to_root_newline(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek().token {
                Token::Eof => return,
                Token::Newline if depth == 0 => return,
                Token::LBrace | Token::LBracket => {
                    depth += 1;
                    self.bump();
                }
                Token::RBrace | Token::RBracket => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                }
                _ => {
                    self.bump();
                }
            }
        }
    }
}

fn is_string_scalar(value: &ValueNode) -> bool {
    matches!(
        value,
        ValueNode::Scalar(ScalarNode {
            value: Scalar::Str(_),
            ..
        })
    )
}
