//! Host-facing value tree.
//!
//! `Value` keeps integers and floats apart (there is no implicit coercion
//! anywhere in the pipeline) and preserves insertion order for object
//! members. Containers remember the AST node they were extracted from via
//! a plain [`NodeId`], never an owning pointer, so the tree can be cloned
//! or discarded without touching the AST.

use std::fmt;
use std::ops::{Index, IndexMut};

use indexmap::IndexMap;
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ast::{Document, ListNode, NodeId, ObjectNode, Scalar, ValueNode};
use crate::constants::is_reserved_key;

/// Ordered string-keyed mapping with an optional AST back-reference.
#[derive(Debug, Clone, Default)]
pub struct ObjectValue {
    pub entries: IndexMap<String, Value>,
    pub ast: Option<NodeId>,
}

impl ObjectValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ast(id: NodeId) -> Self {
        Self {
            entries: IndexMap::new(),
            ast: Some(id),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.entries.iter_mut()
    }
}

// Equality is structural; where a tree came from does not matter.
impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl From<IndexMap<String, Value>> for ObjectValue {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self { entries, ast: None }
    }
}

/// Ordered sequence with an optional AST back-reference.
#[derive(Debug, Clone, Default)]
pub struct ListValue {
    pub items: Vec<Value>,
    pub ast: Option<NodeId>,
}

impl ListValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ast(id: NodeId) -> Self {
        Self {
            items: Vec::new(),
            ast: Some(id),
        }
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.items.iter_mut()
    }
}

impl PartialEq for ListValue {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl From<Vec<Value>> for ListValue {
    fn from(items: Vec<Value>) -> Self {
        Self { items, ast: None }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(ListValue),
    Object(ObjectValue),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub const fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ListValue> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectValue> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|object| object.get(key))
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.as_list().and_then(|list| list.get(index))
    }

    pub fn take(&mut self) -> Value {
        std::mem::take(self)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    /// Back-reference of a container value, if it still carries one.
    pub fn ast(&self) -> Option<NodeId> {
        match self {
            Value::List(list) => list.ast,
            Value::Object(object) => object.ast,
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::String(s) => write!(f, "\"{s}\""),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(object) => {
                write!(f, "{{")?;
                for (i, (key, value)) in object.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(ListValue::from(items))
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::Object(ObjectValue::from(entries))
    }
}

impl Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Self::Output {
        self.get(key)
            .unwrap_or_else(|| panic!("key '{key}' not found in {}", self.type_name()))
    }
}

impl IndexMut<&str> for Value {
    fn index_mut(&mut self, key: &str) -> &mut Self::Output {
        let type_name = self.type_name();
        self.as_object_mut()
            .and_then(|object| object.get_mut(key))
            .unwrap_or_else(|| panic!("key '{key}' not found in {type_name}"))
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        self.get_index(index)
            .unwrap_or_else(|| panic!("index {index} out of bounds in {}", self.type_name()))
    }
}

impl IndexMut<usize> for Value {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        let type_name = self.type_name();
        self.as_list_mut()
            .and_then(|list| list.items.get_mut(index))
            .unwrap_or_else(|| panic!("index {index} out of bounds in {type_name}"))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for item in list.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (key, value) in object.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an FTML value")
            }

            fn visit_unit<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
                Deserialize::deserialize(deserializer)
            }

            fn visit_bool<E>(self, b: bool) -> Result<Value, E> {
                Ok(Value::Bool(b))
            }

            fn visit_i64<E>(self, i: i64) -> Result<Value, E> {
                Ok(Value::Int(i))
            }

            fn visit_u64<E: serde::de::Error>(self, u: u64) -> Result<Value, E> {
                i64::try_from(u)
                    .map(Value::Int)
                    .map_err(|_| E::custom("integer out of range"))
            }

            fn visit_f64<E>(self, f: f64) -> Result<Value, E> {
                Ok(Value::Float(f))
            }

            fn visit_str<E>(self, s: &str) -> Result<Value, E> {
                Ok(Value::String(s.to_string()))
            }

            fn visit_string<E>(self, s: String) -> Result<Value, E> {
                Ok(Value::String(s))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::from(items))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
                let mut entries = IndexMap::new();
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    entries.insert(key, value);
                }
                Ok(Value::from(entries))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::from(items.into_iter().map(Value::from).collect::<Vec<_>>())
            }
            serde_json::Value::Object(map) => {
                let mut entries = IndexMap::new();
                for (key, value) in map {
                    entries.insert(key, Value::from(value));
                }
                Value::from(entries)
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(list) => {
                serde_json::Value::Array(list.items.into_iter().map(Into::into).collect())
            }
            Value::Object(object) => {
                let mut map = serde_json::Map::new();
                for (key, value) in object.entries {
                    map.insert(key, value.into());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

impl Document {
    /// Extract the host value tree, skipping the reserved metadata keys.
    pub fn to_value(&self) -> Value {
        self.extract(false)
    }

    /// Extract the value tree with `ftml_version`/`ftml_encoding` included.
    pub fn to_value_with_reserved(&self) -> Value {
        self.extract(true)
    }

    fn extract(&self, include_reserved: bool) -> Value {
        let mut object = ObjectValue::with_ast(self.id);
        for (key, kv) in &self.items {
            if !include_reserved && is_reserved_key(key) {
                continue;
            }
            object.insert(key.clone(), node_to_value(&kv.value));
        }
        Value::Object(object)
    }
}

fn node_to_value(node: &ValueNode) -> Value {
    match node {
        ValueNode::Scalar(scalar) => match &scalar.value {
            Scalar::Str(s) => Value::String(s.clone()),
            Scalar::Int(i) => Value::Int(*i),
            Scalar::Float(f) => Value::Float(*f),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Null => Value::Null,
        },
        ValueNode::Object(object) => Value::Object(object_to_value(object)),
        ValueNode::List(list) => Value::List(list_to_value(list)),
    }
}

pub(crate) fn object_to_value(node: &ObjectNode) -> ObjectValue {
    let mut object = ObjectValue::with_ast(node.id);
    for (key, kv) in &node.items {
        object.insert(key.clone(), node_to_value(&kv.value));
    }
    object
}

pub(crate) fn list_to_value(node: &ListNode) -> ListValue {
    let mut list = ListValue::with_ast(node.id);
    for item in &node.items {
        list.push(node_to_value(item));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[rstest::rstest]
    fn test_no_cross_type_equality() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Null, Value::Bool(false));
        assert_ne!(Value::String("1".into()), Value::Int(1));
    }

    #[rstest::rstest]
    fn test_structural_equality_ignores_ast() {
        let mut left = ObjectValue::with_ast(7);
        left.insert("a", 1i64);
        let mut right = ObjectValue::new();
        right.insert("a", 1i64);
        assert_eq!(left, right);

        let tagged = ListValue {
            items: vec![Value::Int(1)],
            ast: Some(3),
        };
        let plain = ListValue::from(vec![Value::Int(1)]);
        assert_eq!(tagged, plain);
    }

    #[rstest::rstest]
    fn test_accessors() {
        let mut object = ObjectValue::new();
        object.insert("name", "app");
        object.insert("port", 8080i64);
        let value = Value::Object(object);

        assert_eq!(value.get("name").and_then(Value::as_str), Some("app"));
        assert_eq!(value.get("port").and_then(Value::as_int), Some(8080));
        assert_eq!(value["name"].as_str(), Some("app"));
        assert!(value.get("missing").is_none());
    }

    #[rstest::rstest]
    fn test_insertion_order_preserved() {
        let mut object = ObjectValue::new();
        object.insert("z", 1i64);
        object.insert("a", 2i64);
        object.insert("m", 3i64);
        let keys: Vec<_> = object.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);

        object.remove("a");
        let keys: Vec<_> = object.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "m"]);
    }

    #[rstest::rstest]
    fn test_json_round_trip() {
        let json = json!({"a": [1, 2.5], "b": {"c": true, "d": null}});
        let value = Value::from(json.clone());
        assert!(value["a"][0].is_int());
        assert!(value["a"][1].is_float());

        let back: serde_json::Value = value.into();
        assert_eq!(back, json);
    }

    #[rstest::rstest]
    fn test_serde_deserialize_keeps_int_float_split() {
        let value: Value = serde_json::from_str(r#"{"i": 3, "f": 3.0}"#).unwrap();
        assert_eq!(value["i"], Value::Int(3));
        assert_eq!(value["f"], Value::Float(3.0));
    }

    #[rstest::rstest]
    fn test_display() {
        let mut object = ObjectValue::new();
        object.insert("a", 1i64);
        object.insert("b", Value::from(vec![Value::Float(1.0), Value::Null]));
        assert_eq!(
            Value::Object(object).to_string(),
            "{a = 1, b = [1.0, null]}"
        );
    }
}
