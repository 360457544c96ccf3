//! Scalar-kind registry.
//!
//! Maps a kind name to its shape predicate, an optional refinement (used
//! by the temporal kinds to check string formats), an optional coercion
//! hook, and a table of named constraints. The validator consults the
//! registry for everything — list and object constraint tables live here
//! too, under internal entries that schema text cannot name as types.
//!
//! Build the registry once, extend it during setup if needed, and treat
//! it as read-only afterwards; it is threaded by reference through schema
//! parsing and validation.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::schema::types::ConstraintMap;
use crate::value::Value;

pub type MatchFn = Box<dyn Fn(&Value) -> bool + Send + Sync>;
pub type RefineFn = Box<dyn Fn(&Value, &ConstraintMap) -> Result<(), String> + Send + Sync>;
pub type CoerceFn = Box<dyn Fn(&Value, &ConstraintMap) -> Option<Value> + Send + Sync>;
pub type ArgCheckFn = Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;
pub type ConstraintFn = Box<dyn Fn(&Value, &Value, &ConstraintMap) -> Result<(), String> + Send + Sync>;

/// Internal kind names carrying the list/object constraint tables.
pub const LIST_KIND: &str = "list";
pub const OBJECT_KIND: &str = "object";

pub struct ConstraintSpec {
    check_arg: ArgCheckFn,
    validate: ConstraintFn,
}

impl ConstraintSpec {
    pub fn new(
        check_arg: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
        validate: impl Fn(&Value, &Value, &ConstraintMap) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            check_arg: Box::new(check_arg),
            validate: Box::new(validate),
        }
    }
}

pub struct ScalarKindSpec {
    matches: MatchFn,
    refine: Option<RefineFn>,
    coerce: Option<CoerceFn>,
    constraints: IndexMap<String, ConstraintSpec>,
    aliases: HashMap<String, String>,
    internal: bool,
}

impl ScalarKindSpec {
    pub fn new(matches: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self {
            matches: Box::new(matches),
            refine: None,
            coerce: None,
            constraints: IndexMap::new(),
            aliases: HashMap::new(),
            internal: false,
        }
    }

    /// Kinds that only exist to hold constraint tables (list, object);
    /// schema text cannot reference them as scalar type names.
    pub fn mark_internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn with_refine(
        mut self,
        refine: impl Fn(&Value, &ConstraintMap) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.refine = Some(Box::new(refine));
        self
    }

    pub fn with_coerce(
        mut self,
        coerce: impl Fn(&Value, &ConstraintMap) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.coerce = Some(Box::new(coerce));
        self
    }

    pub fn with_constraint(mut self, name: &str, spec: ConstraintSpec) -> Self {
        self.constraints.insert(name.to_string(), spec);
        self
    }

    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases.insert(alias.to_string(), canonical.to_string());
        self
    }
}

#[derive(Default)]
pub struct TypeRegistry {
    kinds: IndexMap<String, ScalarKindSpec>,
}

impl TypeRegistry {
    /// An empty registry; use [`TypeRegistry::with_builtins`] for the
    /// standard kinds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::validate::constraints::install_builtins(&mut registry);
        registry
    }

    pub fn register_kind(&mut self, name: &str, spec: ScalarKindSpec) {
        self.kinds.insert(name.to_string(), spec);
    }

    /// Add one constraint to an already registered kind.
    pub fn register_constraint(
        &mut self,
        kind: &str,
        name: &str,
        spec: ConstraintSpec,
    ) -> Result<(), String> {
        let entry = self
            .kinds
            .get_mut(kind)
            .ok_or_else(|| format!("unknown kind '{kind}'"))?;
        entry.constraints.insert(name.to_string(), spec);
        Ok(())
    }

    pub fn register_alias(&mut self, kind: &str, alias: &str, canonical: &str) -> Result<(), String> {
        let entry = self
            .kinds
            .get_mut(kind)
            .ok_or_else(|| format!("unknown kind '{kind}'"))?;
        entry.aliases.insert(alias.to_string(), canonical.to_string());
        Ok(())
    }

    /// Whether `name` can appear in a schema as a scalar type.
    pub fn has_scalar_kind(&self, name: &str) -> bool {
        self.kinds.get(name).is_some_and(|spec| !spec.internal)
    }

    /// Resolve a constraint name (possibly an alias) to its canonical
    /// form for the given kind.
    pub fn canonical_constraint(&self, kind: &str, name: &str) -> Option<String> {
        let spec = self.kinds.get(kind)?;
        if spec.constraints.contains_key(name) {
            return Some(name.to_string());
        }
        spec.aliases
            .get(name)
            .filter(|canonical| spec.constraints.contains_key(*canonical))
            .cloned()
    }

    /// Schema-time well-formedness check of one constraint argument.
    pub fn check_constraint_arg(&self, kind: &str, name: &str, arg: &Value) -> Result<(), String> {
        let spec = self
            .kinds
            .get(kind)
            .ok_or_else(|| format!("unknown kind '{kind}'"))?;
        let constraint = spec
            .constraints
            .get(name)
            .ok_or_else(|| format!("unknown constraint '{name}' for {kind}"))?;
        (constraint.check_arg)(arg)
    }

    /// Type match: shape predicate plus the kind's refinement, which sees
    /// the node's constraints (temporal kinds read `format` there).
    pub fn kind_matches(
        &self,
        kind: &str,
        value: &Value,
        constraints: &ConstraintMap,
    ) -> Result<(), String> {
        let spec = self
            .kinds
            .get(kind)
            .ok_or_else(|| format!("unknown kind '{kind}'"))?;
        if !(spec.matches)(value) {
            return Err(format!("expected {kind}, got {}", value.type_name()));
        }
        if let Some(refine) = &spec.refine {
            refine(value, constraints)?;
        }
        Ok(())
    }

    pub fn coerce(&self, kind: &str, value: &Value, constraints: &ConstraintMap) -> Option<Value> {
        self.kinds
            .get(kind)
            .and_then(|spec| spec.coerce.as_ref())
            .and_then(|coerce| coerce(value, constraints))
    }

    /// Run one constraint validator. `all` is the node's full constraint
    /// map, for validators whose meaning depends on a sibling constraint.
    pub fn validate_constraint(
        &self,
        kind: &str,
        name: &str,
        value: &Value,
        arg: &Value,
        all: &ConstraintMap,
    ) -> Result<(), String> {
        let spec = self
            .kinds
            .get(kind)
            .ok_or_else(|| format!("unknown kind '{kind}'"))?;
        let constraint = spec
            .constraints
            .get(name)
            .ok_or_else(|| format!("unknown constraint '{name}' for {kind}"))?;
        (constraint.validate)(value, arg, all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_builtins_present() {
        let registry = TypeRegistry::with_builtins();
        for name in crate::constants::BUILTIN_SCALAR_NAMES {
            assert!(registry.has_scalar_kind(name), "missing kind {name}");
        }
    }

    #[rstest::rstest]
    fn test_internal_kinds_not_addressable() {
        let registry = TypeRegistry::with_builtins();
        assert!(!registry.has_scalar_kind(LIST_KIND));
        assert!(!registry.has_scalar_kind(OBJECT_KIND));
    }

    #[rstest::rstest]
    fn test_alias_resolution() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(
            registry.canonical_constraint("str", "min").as_deref(),
            Some("min_length")
        );
        assert_eq!(
            registry.canonical_constraint("str", "min_length").as_deref(),
            Some("min_length")
        );
        assert_eq!(
            registry.canonical_constraint(LIST_KIND, "max").as_deref(),
            Some("max_items")
        );
        assert!(registry.canonical_constraint("str", "bogus").is_none());
    }

    #[rstest::rstest]
    fn test_custom_kind_registration() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register_kind(
            "port",
            ScalarKindSpec::new(|v| matches!(v, Value::Int(p) if (1..=65535).contains(p))),
        );
        assert!(registry.has_scalar_kind("port"));
        assert!(registry
            .kind_matches("port", &Value::Int(8080), &ConstraintMap::new())
            .is_ok());
        assert!(registry
            .kind_matches("port", &Value::Int(0), &ConstraintMap::new())
            .is_err());
    }

    #[rstest::rstest]
    fn test_custom_constraint_registration() {
        let mut registry = TypeRegistry::with_builtins();
        registry
            .register_constraint(
                "str",
                "starts_with",
                ConstraintSpec::new(
                    |arg| match arg {
                        Value::String(_) => Ok(()),
                        other => Err(format!("expected string, got {}", other.type_name())),
                    },
                    |value, arg, _| {
                        let (Some(s), Some(prefix)) = (value.as_str(), arg.as_str()) else {
                            return Ok(());
                        };
                        if s.starts_with(prefix) {
                            Ok(())
                        } else {
                            Err(format!("'{s}' does not start with '{prefix}'"))
                        }
                    },
                ),
            )
            .unwrap();

        let constraints = ConstraintMap::new();
        assert!(registry
            .validate_constraint(
                "str",
                "starts_with",
                &Value::from("ab"),
                &Value::from("a"),
                &constraints
            )
            .is_ok());
        assert!(registry
            .validate_constraint(
                "str",
                "starts_with",
                &Value::from("ba"),
                &Value::from("a"),
                &constraints
            )
            .is_err());
    }
}
