/// Version advertised by this parser, checked against `ftml_version`.
pub const FTML_VERSION: &str = "1.0";

pub const RESERVED_KEY_VERSION: &str = "ftml_version";
pub const RESERVED_KEY_ENCODING: &str = "ftml_encoding";

/// Root keys that carry parser metadata rather than document data.
pub const RESERVED_KEYS: &[&str] = &[RESERVED_KEY_VERSION, RESERVED_KEY_ENCODING];

/// Bare identifiers that may not be used as unquoted keys.
pub const RESERVED_WORDS: &[&str] = &["null", "true", "false", "int", "float", "str", "bool"];

/// Scalar type names the schema language recognizes out of the box.
pub const BUILTIN_SCALAR_NAMES: &[&str] = &[
    "str",
    "int",
    "float",
    "bool",
    "null",
    "any",
    "date",
    "time",
    "datetime",
    "timestamp",
];

pub const DEFAULT_INDENT: usize = 4;

/// Containers with more children than this are formatted multiline.
pub const DEFAULT_INLINE_THRESHOLD: usize = 4;

pub const MAX_DEPTH: usize = 128;

#[inline]
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

#[inline]
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}
