use std::fmt;

/// 1-based line/column pair attached to every token and AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
    Schema,
    Version,
    Serialize,
}

/// Error for the lexing, parsing, schema, version, and serialize stages.
///
/// Validation problems accumulate separately as
/// [`ValidationError`](crate::validate::ValidationError)s; this type covers
/// everything that halts a stage. `related` carries additional diagnostics
/// recovered in the same pass (the parser keeps going after an error where
/// it can re-synchronize).
#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub position: Option<Position>,
    pub related: Vec<Error>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
            related: Vec::new(),
        }
    }

    pub fn lex(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lex, message, Some(position))
    }

    pub fn parse(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message, Some(position))
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message, None)
    }

    pub fn schema_at(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message, Some(position))
    }

    pub fn version(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Version, message, None)
    }

    pub fn serialize(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialize, message, None)
    }

    pub fn with_related(mut self, related: Vec<Error>) -> Self {
        self.related = related;
        self
    }

    /// The diagnostics from this pass, primary error first.
    pub fn all(&self) -> impl Iterator<Item = &Error> {
        std::iter::once(self).chain(self.related.iter())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} at {}", self.message, pos),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
