//! Syntax tree for FTML documents.
//!
//! The parser builds the structural skeleton; the comment attacher fills
//! the comment slots in a second pass. Containers carry a `NodeId` so a
//! value tree handed to the host can point back at the node it came from
//! without owning it.

use indexmap::IndexMap;

use crate::constants::{RESERVED_KEY_ENCODING, RESERVED_KEY_VERSION};
use crate::error::Position;
use crate::utils::encoding::Encoding;

/// Identity of a container node, stable for the document's lifetime.
pub type NodeId = u32;

/// Id of the root [`Document`].
pub const ROOT_NODE_ID: NodeId = 0;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Str(_) => "str",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "bool",
            Scalar::Null => "null",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarNode {
    pub value: Scalar,
    pub leading_comments: Vec<String>,
    pub inline_comment: Option<String>,
    pub pos: Position,
}

impl ScalarNode {
    pub fn new(value: Scalar, pos: Position) -> Self {
        Self {
            value,
            leading_comments: Vec::new(),
            inline_comment: None,
            pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    pub id: NodeId,
    pub items: IndexMap<String, KeyValue>,
    pub leading_comments: Vec<String>,
    /// `//!` comments right after the opening brace.
    pub inner_doc_comments: Vec<String>,
    /// Comment on the opener's line (`key = {  // here`).
    pub inline_comment: Option<String>,
    /// Own-line comments that lead the closing brace.
    pub inline_comment_end: Vec<String>,
    /// Comment after the closing token when this object is a list
    /// element (`{ a = 1 },  // here`). Key-value-wrapped objects put
    /// that comment on the [`KeyValue`] instead.
    pub trailing_comment: Option<String>,
    pub pos: Position,
}

impl ObjectNode {
    pub fn new(id: NodeId, pos: Position) -> Self {
        Self {
            id,
            items: IndexMap::new(),
            leading_comments: Vec::new(),
            inner_doc_comments: Vec::new(),
            inline_comment: None,
            inline_comment_end: Vec::new(),
            trailing_comment: None,
            pos,
        }
    }

    pub fn has_comments(&self) -> bool {
        !self.leading_comments.is_empty()
            || self.trailing_comment.is_some()
            || self.has_interior_comments()
    }

    /// Comments that print inside the braces or on the opener's line;
    /// only these force the multiline form. Leading and trailing
    /// comments print in the enclosing scope.
    pub fn has_interior_comments(&self) -> bool {
        !self.inner_doc_comments.is_empty()
            || self.inline_comment.is_some()
            || !self.inline_comment_end.is_empty()
            || self.items.values().any(KeyValue::has_comments)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    pub id: NodeId,
    pub items: Vec<ValueNode>,
    pub leading_comments: Vec<String>,
    pub inner_doc_comments: Vec<String>,
    /// Comment on the opener's line.
    pub inline_comment: Option<String>,
    pub inline_comment_end: Vec<String>,
    /// Comment after the closing token when this list is itself a list
    /// element.
    pub trailing_comment: Option<String>,
    pub pos: Position,
}

impl ListNode {
    pub fn new(id: NodeId, pos: Position) -> Self {
        Self {
            id,
            items: Vec::new(),
            leading_comments: Vec::new(),
            inner_doc_comments: Vec::new(),
            inline_comment: None,
            inline_comment_end: Vec::new(),
            trailing_comment: None,
            pos,
        }
    }

    pub fn has_comments(&self) -> bool {
        !self.leading_comments.is_empty()
            || self.trailing_comment.is_some()
            || self.has_interior_comments()
    }

    /// See [`ObjectNode::has_interior_comments`].
    pub fn has_interior_comments(&self) -> bool {
        !self.inner_doc_comments.is_empty()
            || self.inline_comment.is_some()
            || !self.inline_comment_end.is_empty()
            || self.items.iter().any(ValueNode::has_comments)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Scalar(ScalarNode),
    Object(ObjectNode),
    List(ListNode),
}

impl ValueNode {
    pub fn pos(&self) -> Position {
        match self {
            ValueNode::Scalar(node) => node.pos,
            ValueNode::Object(node) => node.pos,
            ValueNode::List(node) => node.pos,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            ValueNode::Object(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            ValueNode::List(node) => Some(node),
            _ => None,
        }
    }

    pub fn leading_comments_mut(&mut self) -> &mut Vec<String> {
        match self {
            ValueNode::Scalar(node) => &mut node.leading_comments,
            ValueNode::Object(node) => &mut node.leading_comments,
            ValueNode::List(node) => &mut node.leading_comments,
        }
    }

    pub fn inline_comment(&self) -> Option<&String> {
        match self {
            ValueNode::Scalar(node) => node.inline_comment.as_ref(),
            ValueNode::Object(node) => node.inline_comment.as_ref(),
            ValueNode::List(node) => node.inline_comment.as_ref(),
        }
    }

    /// The comment that prints after this element's comma when it sits
    /// in a multiline list. For containers that is the slot for the
    /// comment trailing the closer, not the opener-line one.
    pub fn element_trailing_comment(&self) -> Option<&String> {
        match self {
            ValueNode::Scalar(node) => node.inline_comment.as_ref(),
            ValueNode::Object(node) => node.trailing_comment.as_ref(),
            ValueNode::List(node) => node.trailing_comment.as_ref(),
        }
    }

    /// Whether this subtree carries any comment anywhere. Drives the
    /// serializer's inline/multiline decision.
    pub fn has_comments(&self) -> bool {
        match self {
            ValueNode::Scalar(node) => {
                !node.leading_comments.is_empty() || node.inline_comment.is_some()
            }
            ValueNode::Object(node) => node.has_comments(),
            ValueNode::List(node) => node.has_comments(),
        }
    }
}

/// One `key = value` entry at the document root or inside an object.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub key_is_quoted: bool,
    pub value: ValueNode,
    pub leading_comments: Vec<String>,
    /// `///` run above the entry.
    pub outer_doc_comments: Vec<String>,
    pub inline_comment: Option<String>,
    pub pos: Position,
}

impl KeyValue {
    pub fn new(key: String, key_is_quoted: bool, value: ValueNode, pos: Position) -> Self {
        Self {
            key,
            key_is_quoted,
            value,
            leading_comments: Vec::new(),
            outer_doc_comments: Vec::new(),
            inline_comment: None,
            pos,
        }
    }

    pub fn has_comments(&self) -> bool {
        !self.leading_comments.is_empty()
            || !self.outer_doc_comments.is_empty()
            || self.inline_comment.is_some()
            || self.value.has_comments()
    }
}

/// Root of a parsed FTML document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: NodeId,
    pub items: IndexMap<String, KeyValue>,
    /// Only populated for documents with no entries (every comment lands
    /// here then).
    pub leading_comments: Vec<String>,
    pub inline_comment: Option<String>,
    /// `//!` run at the top of the file.
    pub inner_doc_comments: Vec<String>,
    /// Own-line comments after the last entry.
    pub trailing_leading_comments: Vec<String>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            id: ROOT_NODE_ID,
            items: IndexMap::new(),
            leading_comments: Vec::new(),
            inline_comment: None,
            inner_doc_comments: Vec::new(),
            trailing_leading_comments: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&KeyValue> {
        self.items.get(key)
    }

    /// The declared `ftml_version` string, if the document carries one.
    pub fn declared_version(&self) -> Option<&str> {
        self.reserved_string(RESERVED_KEY_VERSION)
    }

    /// The normalized `ftml_encoding` declaration.
    ///
    /// `Ok(None)` means no declaration; an unknown label is an error the
    /// embedding reader is expected to surface.
    pub fn declared_encoding(&self) -> Result<Option<Encoding>, String> {
        let Some(label) = self.reserved_string(RESERVED_KEY_ENCODING) else {
            return Ok(None);
        };
        Encoding::parse(label)
            .map(Some)
            .ok_or_else(|| format!("unknown encoding label '{label}'"))
    }

    fn reserved_string(&self, key: &str) -> Option<&str> {
        match self.items.get(key).map(|kv| &kv.value) {
            Some(ValueNode::Scalar(ScalarNode {
                value: Scalar::Str(s),
                ..
            })) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
