//! Schema language: parser, type model, registry, temporal formats.

pub mod parser;
pub mod registry;
pub mod temporal;
pub mod types;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::options::ValidateOptions;
use crate::validate::{validate_document, ValidationError};
use crate::value::Value;

use registry::TypeRegistry;
use types::TypeDescriptor;

/// A parsed schema: the root is an enumerated object over these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub fields: IndexMap<String, TypeDescriptor>,
}

impl Schema {
    /// Parse schema text with the built-in scalar kinds.
    pub fn parse(text: &str) -> Result<Schema> {
        Self::parse_with_registry(text, &TypeRegistry::with_builtins())
    }

    /// Parse schema text against a registry that may carry extra kinds or
    /// constraints.
    pub fn parse_with_registry(text: &str, registry: &TypeRegistry) -> Result<Schema> {
        let schema = parser::parse_schema(text, registry)?;
        debug!(fields = schema.fields.len(), "parsed schema");
        Ok(schema)
    }

    /// Validate (and, by default, inject defaults into) a value tree.
    pub fn validate(&self, value: &mut Value) -> Vec<ValidationError> {
        self.validate_with(
            value,
            &TypeRegistry::with_builtins(),
            &ValidateOptions::default(),
        )
    }

    pub fn validate_with(
        &self,
        value: &mut Value,
        registry: &TypeRegistry,
        options: &ValidateOptions,
    ) -> Vec<ValidationError> {
        validate_document(value, self, registry, options)
    }
}
