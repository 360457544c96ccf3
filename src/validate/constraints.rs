//! Built-in scalar kinds and their constraint validators.
//!
//! Everything the validator can check lives behind the registry: each
//! kind installs a shape predicate and a table of named constraints with
//! schema-time argument checks. The list and object tables sit under
//! internal kind entries so container checks go through the same path.

use std::sync::OnceLock;

use regex::Regex;

use crate::schema::registry::{
    ConstraintSpec, ScalarKindSpec, TypeRegistry, LIST_KIND, OBJECT_KIND,
};
use crate::schema::temporal::{self, TemporalKind};
use crate::schema::types::ConstraintMap;
use crate::value::Value;

pub fn install_builtins(registry: &mut TypeRegistry) {
    registry.register_kind("str", str_kind());
    registry.register_kind("int", int_kind());
    registry.register_kind("float", float_kind());
    registry.register_kind("bool", bool_kind());
    registry.register_kind("null", ScalarKindSpec::new(Value::is_null));
    registry.register_kind("any", ScalarKindSpec::new(|_| true));
    registry.register_kind("date", temporal_kind(TemporalKind::Date));
    registry.register_kind("time", temporal_kind(TemporalKind::Time));
    registry.register_kind("datetime", temporal_kind(TemporalKind::DateTime));
    registry.register_kind("timestamp", timestamp_kind());
    registry.register_kind(LIST_KIND, list_kind());
    registry.register_kind(OBJECT_KIND, object_kind());
}

// --- argument shape checks ---------------------------------------------

fn int_arg(arg: &Value) -> Result<(), String> {
    match arg {
        Value::Int(_) => Ok(()),
        other => Err(format!("expected an integer, got {}", other.type_name())),
    }
}

fn size_arg(arg: &Value) -> Result<(), String> {
    match arg {
        Value::Int(n) if *n >= 0 => Ok(()),
        Value::Int(n) => Err(format!("expected a non-negative integer, got {n}")),
        other => Err(format!("expected an integer, got {}", other.type_name())),
    }
}

fn number_arg(arg: &Value) -> Result<(), String> {
    match arg {
        Value::Int(_) | Value::Float(_) => Ok(()),
        other => Err(format!("expected a number, got {}", other.type_name())),
    }
}

fn string_arg(arg: &Value) -> Result<(), String> {
    match arg {
        Value::String(_) => Ok(()),
        other => Err(format!("expected a string, got {}", other.type_name())),
    }
}

fn bool_arg(arg: &Value) -> Result<(), String> {
    match arg {
        Value::Bool(_) => Ok(()),
        other => Err(format!("expected a boolean, got {}", other.type_name())),
    }
}

fn list_arg(arg: &Value, element: fn(&Value) -> Result<(), String>) -> Result<(), String> {
    match arg {
        Value::List(items) => {
            if items.is_empty() {
                return Err("list argument must not be empty".to_string());
            }
            items.iter().try_for_each(element)
        }
        other => Err(format!("expected a list, got {}", other.type_name())),
    }
}

// --- shared validators -------------------------------------------------

fn enum_check(value: &Value, arg: &Value) -> Result<(), String> {
    let Value::List(allowed) = arg else {
        return Ok(());
    };
    if allowed.iter().any(|candidate| candidate == value) {
        Ok(())
    } else {
        Err(format!("{value} is not one of the allowed values"))
    }
}

fn number_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn numeric_min(value: &Value, arg: &Value) -> Result<(), String> {
    if let (Value::Int(v), Value::Int(m)) = (value, arg) {
        return if v < m {
            Err(format!("{v} is below the minimum {m}"))
        } else {
            Ok(())
        };
    }
    match (number_as_f64(value), number_as_f64(arg)) {
        (Some(v), Some(m)) if v < m => Err(format!("{v} is below the minimum {m}")),
        _ => Ok(()),
    }
}

fn numeric_max(value: &Value, arg: &Value) -> Result<(), String> {
    if let (Value::Int(v), Value::Int(m)) = (value, arg) {
        return if v > m {
            Err(format!("{v} is above the maximum {m}"))
        } else {
            Ok(())
        };
    }
    match (number_as_f64(value), number_as_f64(arg)) {
        (Some(v), Some(m)) if v > m => Err(format!("{v} is above the maximum {m}")),
        _ => Ok(()),
    }
}

// --- str ---------------------------------------------------------------

fn str_kind() -> ScalarKindSpec {
    ScalarKindSpec::new(Value::is_string)
        .with_constraint(
            "min_length",
            ConstraintSpec::new(size_arg, |value, arg, _| {
                let (Some(s), Some(min)) = (value.as_str(), arg.as_int()) else {
                    return Ok(());
                };
                let len = s.chars().count();
                if (len as i64) < min {
                    Err(format!("length {len} is below the minimum {min}"))
                } else {
                    Ok(())
                }
            }),
        )
        .with_alias("min", "min_length")
        .with_constraint(
            "max_length",
            ConstraintSpec::new(size_arg, |value, arg, _| {
                let (Some(s), Some(max)) = (value.as_str(), arg.as_int()) else {
                    return Ok(());
                };
                let len = s.chars().count();
                if (len as i64) > max {
                    Err(format!("length {len} is above the maximum {max}"))
                } else {
                    Ok(())
                }
            }),
        )
        .with_alias("max", "max_length")
        .with_constraint(
            "pattern",
            ConstraintSpec::new(
                |arg| {
                    let Value::String(pattern) = arg else {
                        return Err(format!("expected a string, got {}", arg.type_name()));
                    };
                    Regex::new(pattern)
                        .map(|_| ())
                        .map_err(|err| format!("invalid pattern: {err}"))
                },
                |value, arg, _| {
                    let (Some(s), Some(pattern)) = (value.as_str(), arg.as_str()) else {
                        return Ok(());
                    };
                    let regex =
                        Regex::new(pattern).map_err(|err| format!("invalid pattern: {err}"))?;
                    if regex.is_match(s) {
                        Ok(())
                    } else {
                        Err(format!("'{s}' does not match pattern '{pattern}'"))
                    }
                },
            ),
        )
        .with_constraint(
            "enum",
            ConstraintSpec::new(|arg| list_arg(arg, string_arg), |value, arg, _| {
                enum_check(value, arg)
            }),
        )
        .with_constraint(
            "format",
            ConstraintSpec::new(
                |arg| {
                    let Value::String(name) = arg else {
                        return Err(format!("expected a string, got {}", arg.type_name()));
                    };
                    match name.as_str() {
                        "email" | "uri" => Ok(()),
                        other => Err(format!("unknown string format '{other}'")),
                    }
                },
                |value, arg, _| {
                    let (Some(s), Some(format)) = (value.as_str(), arg.as_str()) else {
                        return Ok(());
                    };
                    let ok = match format {
                        "email" => email_regex().is_match(s),
                        "uri" => uri_regex().is_match(s),
                        _ => true,
                    };
                    if ok {
                        Ok(())
                    } else {
                        Err(format!("'{s}' is not a valid {format}"))
                    }
                },
            ),
        )
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"))
}

fn uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:\S+$").expect("uri pattern is valid")
    })
}

// --- numbers -----------------------------------------------------------

fn int_kind() -> ScalarKindSpec {
    ScalarKindSpec::new(Value::is_int)
        .with_constraint(
            "min",
            ConstraintSpec::new(number_arg, |value, arg, _| numeric_min(value, arg)),
        )
        .with_constraint(
            "max",
            ConstraintSpec::new(number_arg, |value, arg, _| numeric_max(value, arg)),
        )
        .with_constraint(
            "enum",
            ConstraintSpec::new(|arg| list_arg(arg, int_arg), |value, arg, _| {
                enum_check(value, arg)
            }),
        )
}

fn float_kind() -> ScalarKindSpec {
    ScalarKindSpec::new(Value::is_float)
        .with_constraint(
            "min",
            ConstraintSpec::new(number_arg, |value, arg, _| numeric_min(value, arg)),
        )
        .with_constraint(
            "max",
            ConstraintSpec::new(number_arg, |value, arg, _| numeric_max(value, arg)),
        )
        .with_constraint(
            "enum",
            ConstraintSpec::new(
                |arg| {
                    list_arg(arg, |item| match item {
                        Value::Float(_) => Ok(()),
                        other => Err(format!("expected a float, got {}", other.type_name())),
                    })
                },
                |value, arg, _| enum_check(value, arg),
            ),
        )
        .with_constraint(
            "precision",
            ConstraintSpec::new(size_arg, |value, arg, _| {
                let (Some(f), Some(max_digits)) = (value.as_float(), arg.as_int()) else {
                    return Ok(());
                };
                let digits = fraction_digits(f);
                if (digits as i64) > max_digits {
                    Err(format!(
                        "{f} has {digits} fractional digits, more than the allowed {max_digits}"
                    ))
                } else {
                    Ok(())
                }
            }),
        )
}

/// Count of decimal digits after the point in the shortest round-trip
/// rendering of `f`.
fn fraction_digits(f: f64) -> usize {
    let rendered = format!("{f}");
    match rendered.find('.') {
        Some(dot) => rendered.len() - dot - 1,
        None => 0,
    }
}

fn bool_kind() -> ScalarKindSpec {
    ScalarKindSpec::new(Value::is_bool).with_constraint(
        "enum",
        ConstraintSpec::new(|arg| list_arg(arg, bool_arg), |value, arg, _| {
            enum_check(value, arg)
        }),
    )
}

// --- temporal ----------------------------------------------------------

fn format_of(constraints: &ConstraintMap) -> Option<&str> {
    constraints.get("format").and_then(Value::as_str)
}

fn temporal_kind(kind: TemporalKind) -> ScalarKindSpec {
    ScalarKindSpec::new(Value::is_string)
        .with_refine(move |value, constraints| {
            let Some(s) = value.as_str() else {
                return Ok(());
            };
            temporal::parse(kind, s, format_of(constraints)).map(|_| ())
        })
        .with_constraint(
            "format",
            ConstraintSpec::new(
                |arg| {
                    let Value::String(pattern) = arg else {
                        return Err(format!("expected a string, got {}", arg.type_name()));
                    };
                    temporal::check_format_pattern(pattern)
                },
                // The format itself participates in the type match; by the
                // time constraints run the value already conforms.
                |_, _, _| Ok(()),
            ),
        )
        .with_constraint(
            "min",
            ConstraintSpec::new(string_arg, move |value, arg, all| {
                temporal_bound(kind, value, arg, all, true)
            }),
        )
        .with_constraint(
            "max",
            ConstraintSpec::new(string_arg, move |value, arg, all| {
                temporal_bound(kind, value, arg, all, false)
            }),
        )
}

fn temporal_bound(
    kind: TemporalKind,
    value: &Value,
    arg: &Value,
    all: &ConstraintMap,
    is_min: bool,
) -> Result<(), String> {
    let (Some(s), Some(bound_text)) = (value.as_str(), arg.as_str()) else {
        return Ok(());
    };
    let format = format_of(all);
    let parsed = temporal::parse(kind, s, format)?;
    let bound = temporal::parse(kind, bound_text, format).map_err(|_| {
        let which = if is_min { "min" } else { "max" };
        format!("{which} bound '{bound_text}' is not a valid {}", kind.name())
    })?;

    let ok = if is_min { parsed >= bound } else { parsed <= bound };
    if ok {
        Ok(())
    } else if is_min {
        Err(format!("'{s}' is before the minimum '{bound_text}'"))
    } else {
        Err(format!("'{s}' is after the maximum '{bound_text}'"))
    }
}

fn timestamp_kind() -> ScalarKindSpec {
    ScalarKindSpec::new(Value::is_int)
        .with_constraint(
            "min",
            ConstraintSpec::new(int_arg, |value, arg, _| numeric_min(value, arg)),
        )
        .with_constraint(
            "max",
            ConstraintSpec::new(int_arg, |value, arg, _| numeric_max(value, arg)),
        )
        .with_constraint(
            "precision",
            ConstraintSpec::new(
                |arg| {
                    let Value::String(label) = arg else {
                        return Err(format!("expected a string, got {}", arg.type_name()));
                    };
                    temporal::precision_digits(label)
                        .map(|_| ())
                        .ok_or_else(|| format!("unknown timestamp precision '{label}'"))
                },
                |value, arg, _| {
                    let (Some(ts), Some(label)) = (value.as_int(), arg.as_str()) else {
                        return Ok(());
                    };
                    let Some(expected) = temporal::precision_digits(label) else {
                        return Ok(());
                    };
                    let digits = temporal::digit_count(ts);
                    if digits == expected {
                        Ok(())
                    } else {
                        Err(format!(
                            "{ts} has {digits} digits, expected {expected} for {label} precision"
                        ))
                    }
                },
            ),
        )
}

// --- containers --------------------------------------------------------

fn list_kind() -> ScalarKindSpec {
    ScalarKindSpec::new(Value::is_list)
        .mark_internal()
        .with_constraint(
            "min_items",
            ConstraintSpec::new(size_arg, |value, arg, _| {
                let (Some(list), Some(min)) = (value.as_list(), arg.as_int()) else {
                    return Ok(());
                };
                if (list.len() as i64) < min {
                    Err(format!("{} elements, fewer than the minimum {min}", list.len()))
                } else {
                    Ok(())
                }
            }),
        )
        .with_alias("min", "min_items")
        .with_constraint(
            "max_items",
            ConstraintSpec::new(size_arg, |value, arg, _| {
                let (Some(list), Some(max)) = (value.as_list(), arg.as_int()) else {
                    return Ok(());
                };
                if (list.len() as i64) > max {
                    Err(format!("{} elements, more than the maximum {max}", list.len()))
                } else {
                    Ok(())
                }
            }),
        )
        .with_alias("max", "max_items")
        .with_constraint(
            "unique",
            ConstraintSpec::new(bool_arg, |value, arg, _| {
                if arg.as_bool() != Some(true) {
                    return Ok(());
                }
                let Some(list) = value.as_list() else {
                    return Ok(());
                };
                // Structural equality, quadratic; lists in config files
                // are small.
                for (i, left) in list.iter().enumerate() {
                    for right in list.items.iter().skip(i + 1) {
                        if left == right {
                            return Err(format!("duplicate element {left}"));
                        }
                    }
                }
                Ok(())
            }),
        )
}

fn object_kind() -> ScalarKindSpec {
    ScalarKindSpec::new(Value::is_object)
        .mark_internal()
        .with_constraint(
            "min_properties",
            ConstraintSpec::new(size_arg, |value, arg, _| {
                let (Some(object), Some(min)) = (value.as_object(), arg.as_int()) else {
                    return Ok(());
                };
                if (object.len() as i64) < min {
                    Err(format!(
                        "{} members, fewer than the minimum {min}",
                        object.len()
                    ))
                } else {
                    Ok(())
                }
            }),
        )
        .with_alias("min", "min_properties")
        .with_constraint(
            "max_properties",
            ConstraintSpec::new(size_arg, |value, arg, _| {
                let (Some(object), Some(max)) = (value.as_object(), arg.as_int()) else {
                    return Ok(());
                };
                if (object.len() as i64) > max {
                    Err(format!(
                        "{} members, more than the maximum {max}",
                        object.len()
                    ))
                } else {
                    Ok(())
                }
            }),
        )
        .with_alias("max", "max_properties")
        .with_constraint(
            "required_keys",
            ConstraintSpec::new(|arg| list_arg(arg, string_arg), |value, arg, _| {
                let (Some(object), Some(required)) = (value.as_object(), arg.as_list()) else {
                    return Ok(());
                };
                let missing: Vec<_> = required
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|key| !object.contains_key(key))
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(format!("missing required keys: {}", missing.join(", ")))
                }
            }),
        )
        .with_constraint(
            "ext",
            // Consumed by the validator's strict-mode logic, nothing to
            // re-check per value.
            ConstraintSpec::new(bool_arg, |_, _, _| Ok(())),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::with_builtins()
    }

    fn run(kind: &str, name: &str, value: Value, arg: Value) -> Result<(), String> {
        registry().validate_constraint(kind, name, &value, &arg, &ConstraintMap::new())
    }

    #[rstest::rstest]
    fn test_str_lengths() {
        assert!(run("str", "min_length", Value::from("abc"), Value::Int(3)).is_ok());
        assert!(run("str", "min_length", Value::from("ab"), Value::Int(3)).is_err());
        assert!(run("str", "max_length", Value::from("abc"), Value::Int(3)).is_ok());
        assert!(run("str", "max_length", Value::from("abcd"), Value::Int(3)).is_err());
    }

    #[rstest::rstest]
    fn test_str_pattern() {
        assert!(run("str", "pattern", Value::from("ab12"), Value::from(r"^[a-z]+\d+$")).is_ok());
        assert!(run("str", "pattern", Value::from("12ab"), Value::from(r"^[a-z]+\d+$")).is_err());
    }

    #[rstest::rstest]
    fn test_str_enum() {
        let allowed = Value::from(vec![Value::from("on"), Value::from("off")]);
        assert!(run("str", "enum", Value::from("on"), allowed.clone()).is_ok());
        assert!(run("str", "enum", Value::from("auto"), allowed).is_err());
    }

    #[rstest::rstest]
    fn test_str_formats() {
        assert!(run("str", "format", Value::from("a@b.example"), Value::from("email")).is_ok());
        assert!(run("str", "format", Value::from("not-an-email"), Value::from("email")).is_err());
        assert!(run("str", "format", Value::from("https://example.org/x"), Value::from("uri"))
            .is_ok());
        assert!(run("str", "format", Value::from("no scheme"), Value::from("uri")).is_err());
    }

    #[rstest::rstest]
    fn test_int_bounds() {
        assert!(run("int", "min", Value::Int(1024), Value::Int(1024)).is_ok());
        assert!(run("int", "min", Value::Int(1023), Value::Int(1024)).is_err());
        assert!(run("int", "max", Value::Int(65535), Value::Int(65535)).is_ok());
        assert!(run("int", "max", Value::Int(65536), Value::Int(65535)).is_err());
    }

    #[rstest::rstest]
    fn test_float_precision() {
        assert!(run("float", "precision", Value::Float(1.25), Value::Int(2)).is_ok());
        assert!(run("float", "precision", Value::Float(1.125), Value::Int(2)).is_err());
        assert!(run("float", "precision", Value::Float(3.0), Value::Int(0)).is_ok());
    }

    #[rstest::rstest]
    fn test_list_unique() {
        let dup = Value::from(vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
        assert!(run(LIST_KIND, "unique", dup, Value::Bool(true)).is_err());

        let ok = Value::from(vec![Value::Int(1), Value::Int(2)]);
        assert!(run(LIST_KIND, "unique", ok, Value::Bool(true)).is_ok());

        // int 1 and float 1.0 are different values
        let mixed = Value::from(vec![Value::Int(1), Value::Float(1.0)]);
        assert!(run(LIST_KIND, "unique", mixed, Value::Bool(true)).is_ok());
    }

    #[rstest::rstest]
    fn test_unique_structural_on_objects() {
        let mut a = crate::value::ObjectValue::new();
        a.insert("x", 1i64);
        let mut b = crate::value::ObjectValue::with_ast(42);
        b.insert("x", 1i64);
        let list = Value::from(vec![Value::Object(a), Value::Object(b)]);
        assert!(run(LIST_KIND, "unique", list, Value::Bool(true)).is_err());
    }

    #[rstest::rstest]
    fn test_required_keys() {
        let mut object = crate::value::ObjectValue::new();
        object.insert("host", "h");
        let required = Value::from(vec![Value::from("host"), Value::from("port")]);
        let err = run(OBJECT_KIND, "required_keys", Value::Object(object), required).unwrap_err();
        assert!(err.contains("port"));
    }

    #[rstest::rstest]
    fn test_timestamp_precision() {
        assert!(run(
            "timestamp",
            "precision",
            Value::Int(1_700_000_000),
            Value::from("seconds")
        )
        .is_ok());
        assert!(run(
            "timestamp",
            "precision",
            Value::Int(1_700_000_000_000),
            Value::from("seconds")
        )
        .is_err());
        assert!(run(
            "timestamp",
            "precision",
            Value::Int(1_700_000_000_000),
            Value::from("milliseconds")
        )
        .is_ok());
    }

    #[rstest::rstest]
    fn test_temporal_bounds() {
        assert!(run(
            "date",
            "min",
            Value::from("2024-06-01"),
            Value::from("2024-01-01")
        )
        .is_ok());
        assert!(run(
            "date",
            "min",
            Value::from("2023-06-01"),
            Value::from("2024-01-01")
        )
        .is_err());
        assert!(run(
            "date",
            "max",
            Value::from("2024-06-01"),
            Value::from("2024-12-31")
        )
        .is_ok());
    }

    #[rstest::rstest]
    fn test_temporal_refine_with_custom_format() {
        let registry = registry();
        let mut constraints = ConstraintMap::new();
        constraints.insert("format".to_string(), Value::from("%d/%m/%Y"));
        assert!(registry
            .kind_matches("date", &Value::from("31/12/2024"), &constraints)
            .is_ok());
        assert!(registry
            .kind_matches("date", &Value::from("2024-12-31"), &constraints)
            .is_err());
        assert!(registry
            .kind_matches("date", &Value::from("2024-12-31"), &ConstraintMap::new())
            .is_ok());
    }

    #[rstest::rstest]
    fn test_arg_checks() {
        let registry = registry();
        assert!(registry
            .check_constraint_arg("str", "pattern", &Value::from("["))
            .is_err());
        assert!(registry
            .check_constraint_arg("str", "min_length", &Value::Int(-1))
            .is_err());
        assert!(registry
            .check_constraint_arg("timestamp", "precision", &Value::from("decades"))
            .is_err());
        assert!(registry
            .check_constraint_arg("date", "format", &Value::from("%q"))
            .is_err());
        assert!(registry
            .check_constraint_arg("str", "nope", &Value::Null)
            .is_err());
    }
}
