//! Schema validation.
//!
//! Walks a value tree against a type tree depth-first, accumulating
//! path-qualified errors. Nothing short-circuits except a type mismatch
//! on a single node, where running that node's constraints would be
//! meaningless. Defaults inject in place when `apply_defaults` is set.

pub mod constraints;

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::options::ValidateOptions;
use crate::schema::registry::{TypeRegistry, LIST_KIND, OBJECT_KIND};
use crate::schema::types::{ListType, ObjectShape, ObjectType, ScalarType, TypeDescriptor, UnionType};
use crate::schema::Schema;
use crate::utils::string::{index_path, join_path};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    TypeMismatch,
    UnknownField,
    MissingRequiredField,
    ConstraintViolation(String),
    UnionNoMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted/bracketed location (`users[1].zip`); empty at the root.
    pub path: String,
    pub kind: ValidationErrorKind,
    pub message: String,
    /// For [`ValidationErrorKind::UnionNoMatch`], the errors of the last
    /// alternative tried.
    pub nested: Vec<ValidationError>,
}

impl ValidationError {
    fn new(path: &str, kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            kind,
            message: message.into(),
            nested: Vec::new(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validate a value tree against a schema. Returns every problem found,
/// in walk order; an empty vec means the document conforms.
pub fn validate_document(
    value: &mut Value,
    schema: &Schema,
    registry: &TypeRegistry,
    options: &ValidateOptions,
) -> Vec<ValidationError> {
    let mut validator = Validator {
        registry,
        options,
        errors: Vec::new(),
    };
    validator.validate_root(value, schema);
    debug!(errors = validator.errors.len(), "validation finished");
    validator.errors
}

/// Validate one value against one descriptor (used for schema defaults).
pub(crate) fn validate_single(
    value: &mut Value,
    ty: &TypeDescriptor,
    registry: &TypeRegistry,
    options: &ValidateOptions,
    path: &str,
) -> Vec<ValidationError> {
    let mut validator = Validator {
        registry,
        options,
        errors: Vec::new(),
    };
    validator.validate_value(value, ty, path);
    validator.errors
}

struct Validator<'a> {
    registry: &'a TypeRegistry,
    options: &'a ValidateOptions,
    errors: Vec<ValidationError>,
}

impl<'a> Validator<'a> {
    fn validate_root(&mut self, value: &mut Value, schema: &Schema) {
        let Some(object) = value.as_object_mut() else {
            self.errors.push(ValidationError::new(
                "",
                ValidationErrorKind::TypeMismatch,
                format!("expected object at document root, got {}", value.type_name()),
            ));
            return;
        };

        self.validate_field_table(object, &schema.fields, "");
        if self.options.strict {
            self.report_unknown_fields(object, &schema.fields, "");
        }
    }

    fn validate_field_table(
        &mut self,
        object: &mut crate::value::ObjectValue,
        fields: &IndexMap<String, TypeDescriptor>,
        path: &str,
    ) {
        for (name, ty) in fields {
            let child_path = join_path(path, name);
            if object.contains_key(name) {
                let child = object.get_mut(name).expect("key checked above");
                self.validate_value(child, ty, &child_path);
            } else if let Some(default) = ty.default() {
                if self.options.apply_defaults {
                    let mut injected = default.clone();
                    self.validate_value(&mut injected, ty, &child_path);
                    object.insert(name.clone(), injected);
                }
            } else if !ty.optional() {
                self.errors.push(ValidationError::new(
                    &child_path,
                    ValidationErrorKind::MissingRequiredField,
                    format!("missing required field '{name}'"),
                ));
            }
        }
    }

    fn report_unknown_fields(
        &mut self,
        object: &crate::value::ObjectValue,
        fields: &IndexMap<String, TypeDescriptor>,
        path: &str,
    ) {
        for key in object.keys() {
            if !fields.contains_key(key) {
                self.errors.push(ValidationError::new(
                    &join_path(path, key),
                    ValidationErrorKind::UnknownField,
                    format!("unknown field '{key}'"),
                ));
            }
        }
    }

    fn validate_value(&mut self, value: &mut Value, ty: &TypeDescriptor, path: &str) {
        match ty {
            TypeDescriptor::Scalar(scalar) => self.validate_scalar(value, scalar, path),
            TypeDescriptor::Union(union) => self.validate_union(value, union, path),
            TypeDescriptor::List(list) => self.validate_list(value, list, path),
            TypeDescriptor::Object(object) => self.validate_object(value, object, path),
        }
    }

    fn validate_scalar(&mut self, value: &mut Value, ty: &ScalarType, path: &str) {
        if let Err(message) = self.registry.kind_matches(&ty.kind, value, &ty.constraints) {
            self.errors.push(ValidationError::new(
                path,
                ValidationErrorKind::TypeMismatch,
                message,
            ));
            return;
        }

        if let Some(coerced) = self.registry.coerce(&ty.kind, value, &ty.constraints) {
            *value = coerced;
        }

        // Collect every constraint violation on this node before
        // returning to the parent.
        for (name, arg) in &ty.constraints {
            if let Err(message) =
                self.registry
                    .validate_constraint(&ty.kind, name, value, arg, &ty.constraints)
            {
                self.errors.push(ValidationError::new(
                    path,
                    ValidationErrorKind::ConstraintViolation(name.clone()),
                    message,
                ));
            }
        }
    }

    fn validate_union(&mut self, value: &mut Value, ty: &UnionType, path: &str) {
        let mut last_errors = Vec::new();
        for alt in &ty.alts {
            // Alternatives are tried on a copy so a failed attempt cannot
            // leave injected defaults behind.
            let mut candidate = value.clone();
            let mut sub = Validator {
                registry: self.registry,
                options: self.options,
                errors: Vec::new(),
            };
            sub.validate_value(&mut candidate, alt, path);
            if sub.errors.is_empty() {
                *value = candidate;
                return;
            }
            last_errors = sub.errors;
        }

        let described: Vec<_> = ty.alts.iter().map(TypeDescriptor::describe).collect();
        self.errors.push(ValidationError {
            path: path.to_string(),
            kind: ValidationErrorKind::UnionNoMatch,
            message: format!("no alternative of {} matched", described.join(" | ")),
            nested: last_errors,
        });
    }

    fn validate_list(&mut self, value: &mut Value, ty: &ListType, path: &str) {
        {
            let Some(list) = value.as_list_mut() else {
                self.errors.push(ValidationError::new(
                    path,
                    ValidationErrorKind::TypeMismatch,
                    format!("expected list, got {}", value.type_name()),
                ));
                return;
            };

            if let Some(item_ty) = &ty.item {
                for (i, item) in list.iter_mut().enumerate() {
                    let item_path = index_path(path, i);
                    self.validate_value(item, item_ty, &item_path);
                }
            }
        }

        for (name, arg) in &ty.constraints {
            if let Err(message) =
                self.registry
                    .validate_constraint(LIST_KIND, name, value, arg, &ty.constraints)
            {
                self.errors.push(ValidationError::new(
                    path,
                    ValidationErrorKind::ConstraintViolation(name.clone()),
                    message,
                ));
            }
        }
    }

    fn validate_object(&mut self, value: &mut Value, ty: &ObjectType, path: &str) {
        if !value.is_object() {
            self.errors.push(ValidationError::new(
                path,
                ValidationErrorKind::TypeMismatch,
                format!("expected object, got {}", value.type_name()),
            ));
            return;
        }

        match &ty.shape {
            ObjectShape::Any => {}
            ObjectShape::Fields(fields) => {
                // `ext=true` admits unknown keys at this object only.
                let ext = ty
                    .constraints
                    .get("ext")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let object = value.as_object_mut().expect("checked object above");
                self.validate_field_table(object, fields, path);
                if self.options.strict && !ext {
                    self.report_unknown_fields(object, fields, path);
                }
            }
            ObjectShape::Pattern(inner) => {
                let object = value.as_object_mut().expect("checked object above");
                let keys: Vec<String> = object.keys().cloned().collect();
                for key in keys {
                    let child_path = join_path(path, &key);
                    let child = object.get_mut(&key).expect("key just listed");
                    self.validate_value(child, inner, &child_path);
                }
            }
        }

        for (name, arg) in &ty.constraints {
            if name == "ext" {
                continue;
            }
            if let Err(message) =
                self.registry
                    .validate_constraint(OBJECT_KIND, name, value, arg, &ty.constraints)
            {
                self.errors.push(ValidationError::new(
                    path,
                    ValidationErrorKind::ConstraintViolation(name.clone()),
                    message,
                ));
            }
        }
    }
}
