//! FTML: a comment-preserving configuration language.
//!
//! The pipeline is tokenizer → structural parser → comment attacher on
//! the way in, and reconciler → serializer on the way out. A separate
//! schema language parses into type descriptors that drive validation
//! with path-qualified errors and default injection.
//!
//! # Examples
//!
//! Load, mutate, dump — sibling comments survive:
//!
//! ```rust
//! let input = "//! service config\nname = \"App\"  // display name\nversion = \"1.0\"\n";
//!
//! let doc = ftml::parse(input)?;
//! let mut value = doc.to_value();
//! value["version"] = ftml::Value::from("1.1");
//!
//! let output = ftml::dump(&value, Some(&doc))?;
//! assert_eq!(
//!     output,
//!     "//! service config\nname = \"App\"  // display name\n\nversion = \"1.1\"\n"
//! );
//! # Ok::<(), ftml::Error>(())
//! ```
//!
//! Validate against a schema, with defaults applied:
//!
//! ```rust
//! use ftml::{Schema, Value};
//!
//! let schema = Schema::parse("port: int<min=1024, max=65535> = 8080\nname: str\n")?;
//! let mut value = ftml::load("name = \"api\"\n")?;
//!
//! let errors = schema.validate(&mut value);
//! assert!(errors.is_empty());
//! assert_eq!(value["port"].as_int(), Some(8080));
//! # Ok::<(), ftml::Error>(())
//! ```
//!
//! Structured validation errors carry paths:
//!
//! ```rust
//! use ftml::Schema;
//!
//! let schema = Schema::parse("user: { name: str }\n")?;
//! let mut value = ftml::load("user = { name = \"A\", role = \"admin\" }\n")?;
//!
//! let errors = schema.validate(&mut value);
//! assert_eq!(errors[0].path, "user.role");
//! # Ok::<(), ftml::Error>(())
//! ```

pub mod ast;
pub mod constants;
pub mod error;
pub mod lex;
pub mod options;
pub mod parse;
pub mod schema;
pub mod serialize;
pub mod utils;
pub mod validate;
pub mod value;

pub use ast::{Document, KeyValue, ListNode, NodeId, ObjectNode, Scalar, ScalarNode, ValueNode};
pub use error::{Error, ErrorKind, Position, Result};
pub use options::{ParseOptions, SerializeOptions, ValidateOptions};
pub use parse::version::Version;
pub use schema::registry::{ConstraintSpec, ScalarKindSpec, TypeRegistry};
pub use schema::types::{
    ConstraintMap, ListType, ObjectShape, ObjectType, ScalarType, TypeDescriptor, UnionType,
};
pub use schema::Schema;
pub use utils::encoding::Encoding;
pub use validate::{validate_document, ValidationError, ValidationErrorKind};
pub use value::{ListValue, ObjectValue, Value};

/// Parse FTML text into its comment-bearing syntax tree.
pub fn parse(input: &str) -> Result<Document> {
    parse_with_options(input, &ParseOptions::default())
}

pub fn parse_with_options(input: &str, options: &ParseOptions) -> Result<Document> {
    parse::parse_document(input, options)
}

/// Parse FTML text straight to the host value tree (reserved metadata
/// keys excluded). Keep the [`Document`] from [`parse`] instead when you
/// plan to dump with comments later.
pub fn load(input: &str) -> Result<Value> {
    load_with_options(input, &ParseOptions::default())
}

pub fn load_with_options(input: &str, options: &ParseOptions) -> Result<Value> {
    Ok(parse_with_options(input, options)?.to_value())
}

/// Render a syntax tree back to text.
pub fn serialize(doc: &Document) -> Result<String> {
    serialize_with_options(doc, &SerializeOptions::default())
}

pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> Result<String> {
    serialize::serialize_document(doc, options)
}

/// Render a value tree, merging comments from `original` where the tree
/// still matches it.
pub fn dump(value: &Value, original: Option<&Document>) -> Result<String> {
    dump_with_options(value, original, &SerializeOptions::default())
}

pub fn dump_with_options(
    value: &Value,
    original: Option<&Document>,
    options: &SerializeOptions,
) -> Result<String> {
    serialize::dump_value(value, original, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_load_excludes_reserved_keys() {
        let value = load("ftml_version = \"1.0\"\na = 1\n").unwrap();
        assert!(value.get("ftml_version").is_none());
        assert_eq!(value.get("a").and_then(Value::as_int), Some(1));

        let doc = parse("ftml_version = \"1.0\"\na = 1\n").unwrap();
        let with_meta = doc.to_value_with_reserved();
        assert!(with_meta.get("ftml_version").is_some());
    }

    #[rstest::rstest]
    fn test_dump_without_original() {
        let mut object = ObjectValue::new();
        object.insert("b", 2i64);
        object.insert("a", 1i64);
        let out = dump(&Value::Object(object), None).unwrap();
        assert_eq!(out, "b = 2\n\na = 1\n");
    }

    #[rstest::rstest]
    fn test_int_and_float_stay_apart_through_load() {
        let value = load("i = 3\nf = 3.0\n").unwrap();
        assert_eq!(value["i"], Value::Int(3));
        assert_eq!(value["f"], Value::Float(3.0));
    }
}
