use crate::constants::{DEFAULT_INDENT, DEFAULT_INLINE_THRESHOLD};
use crate::utils::encoding::Encoding;

/// Options for the load path (tokenize, version gate, parse, comment attach).
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Run the comment-attachment pass and populate comment slots.
    pub preserve_comments: bool,
    /// Check `ftml_version` against this parser before structural parsing.
    pub check_version: bool,
    /// Encoding the reader decoded the input with, if it knows.
    pub declared_encoding: Option<Encoding>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preserve_comments(mut self, preserve_comments: bool) -> Self {
        self.preserve_comments = preserve_comments;
        self
    }

    pub fn with_check_version(mut self, check_version: bool) -> Self {
        self.check_version = check_version;
        self
    }

    pub fn with_declared_encoding(mut self, encoding: Encoding) -> Self {
        self.declared_encoding = Some(encoding);
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            preserve_comments: true,
            check_version: true,
            declared_encoding: None,
        }
    }
}

/// Options for validation against a schema.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Unknown fields in enumerated objects are errors.
    pub strict: bool,
    /// Inject field defaults into the value tree.
    pub apply_defaults: bool,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_apply_defaults(mut self, apply_defaults: bool) -> Self {
        self.apply_defaults = apply_defaults;
        self
    }
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            strict: true,
            apply_defaults: true,
        }
    }
}

/// Options for the dump path (reconcile + serialize).
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    pub indent_spaces: usize,
    /// Containers with more children than this go multiline.
    pub inline_threshold: usize,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent_spaces(mut self, indent_spaces: usize) -> Self {
        self.indent_spaces = indent_spaces;
        self
    }

    pub fn with_inline_threshold(mut self, inline_threshold: usize) -> Self {
        self.inline_threshold = inline_threshold;
        self
    }
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent_spaces: DEFAULT_INDENT,
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
        }
    }
}
