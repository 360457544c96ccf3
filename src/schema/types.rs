//! Parsed schema type descriptors.
//!
//! Built once per schema parse and immutable afterwards. `ScalarType.kind`
//! is an open string so registry extensions work; the built-in names live
//! in [`crate::constants::BUILTIN_SCALAR_NAMES`].

use indexmap::IndexMap;

use crate::value::Value;

pub type ConstraintMap = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarType {
    pub kind: String,
    pub constraints: ConstraintMap,
    pub default: Option<Value>,
    pub optional: bool,
}

impl ScalarType {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            constraints: ConstraintMap::new(),
            default: None,
            optional: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    /// Alternatives in source order; the first match wins.
    pub alts: Vec<TypeDescriptor>,
    pub default: Option<Value>,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListType {
    /// `None` for the unconstrained `[]`.
    pub item: Option<Box<TypeDescriptor>>,
    pub constraints: ConstraintMap,
    pub default: Option<Value>,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// `{}` — anything object-shaped passes.
    Any,
    /// `{ name: type, ... }`
    Fields(IndexMap<String, TypeDescriptor>),
    /// `{ type }` — every member value matches one inner type.
    Pattern(Box<TypeDescriptor>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub shape: ObjectShape,
    pub constraints: ConstraintMap,
    pub default: Option<Value>,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Scalar(ScalarType),
    Union(UnionType),
    List(ListType),
    Object(ObjectType),
}

impl TypeDescriptor {
    pub fn optional(&self) -> bool {
        match self {
            TypeDescriptor::Scalar(t) => t.optional,
            TypeDescriptor::Union(t) => t.optional,
            TypeDescriptor::List(t) => t.optional,
            TypeDescriptor::Object(t) => t.optional,
        }
    }

    pub fn set_optional(&mut self, optional: bool) {
        match self {
            TypeDescriptor::Scalar(t) => t.optional = optional,
            TypeDescriptor::Union(t) => t.optional = optional,
            TypeDescriptor::List(t) => t.optional = optional,
            TypeDescriptor::Object(t) => t.optional = optional,
        }
    }

    pub fn default(&self) -> Option<&Value> {
        match self {
            TypeDescriptor::Scalar(t) => t.default.as_ref(),
            TypeDescriptor::Union(t) => t.default.as_ref(),
            TypeDescriptor::List(t) => t.default.as_ref(),
            TypeDescriptor::Object(t) => t.default.as_ref(),
        }
    }

    pub fn set_default(&mut self, default: Value) {
        match self {
            TypeDescriptor::Scalar(t) => t.default = Some(default),
            TypeDescriptor::Union(t) => t.default = Some(default),
            TypeDescriptor::List(t) => t.default = Some(default),
            TypeDescriptor::Object(t) => t.default = Some(default),
        }
    }

    /// Human name used in mismatch messages.
    pub fn describe(&self) -> String {
        match self {
            TypeDescriptor::Scalar(t) => t.kind.clone(),
            TypeDescriptor::Union(t) => {
                let names: Vec<_> = t.alts.iter().map(TypeDescriptor::describe).collect();
                names.join(" | ")
            }
            TypeDescriptor::List(t) => match &t.item {
                Some(item) => format!("[{}]", item.describe()),
                None => "[]".to_string(),
            },
            TypeDescriptor::Object(t) => match &t.shape {
                ObjectShape::Any => "{}".to_string(),
                ObjectShape::Fields(_) => "object".to_string(),
                ObjectShape::Pattern(inner) => format!("{{{}}}", inner.describe()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_optional_and_default_reach_every_variant() {
        let mut descriptors = vec![
            TypeDescriptor::Scalar(ScalarType::new("int")),
            TypeDescriptor::Union(UnionType {
                alts: vec![TypeDescriptor::Scalar(ScalarType::new("str"))],
                default: None,
                optional: false,
            }),
            TypeDescriptor::List(ListType {
                item: None,
                constraints: ConstraintMap::new(),
                default: None,
                optional: false,
            }),
            TypeDescriptor::Object(ObjectType {
                shape: ObjectShape::Any,
                constraints: ConstraintMap::new(),
                default: None,
                optional: false,
            }),
        ];

        for descriptor in &mut descriptors {
            assert!(!descriptor.optional());
            descriptor.set_optional(true);
            assert!(descriptor.optional());

            assert!(descriptor.default().is_none());
            descriptor.set_default(Value::Null);
            assert_eq!(descriptor.default(), Some(&Value::Null));
        }
    }

    #[rstest::rstest]
    fn test_describe() {
        let union = TypeDescriptor::Union(UnionType {
            alts: vec![
                TypeDescriptor::Scalar(ScalarType::new("str")),
                TypeDescriptor::Scalar(ScalarType::new("int")),
            ],
            default: None,
            optional: false,
        });
        assert_eq!(union.describe(), "str | int");

        let list = TypeDescriptor::List(ListType {
            item: Some(Box::new(TypeDescriptor::Scalar(ScalarType::new("int")))),
            constraints: ConstraintMap::new(),
            default: None,
            optional: false,
        });
        assert_eq!(list.describe(), "[int]");
    }
}
