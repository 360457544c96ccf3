//! Schema text parser.
//!
//! Shares the document tokenizer (comments are simply dropped) and builds
//! the immutable type-descriptor tree. Union pipes and constraint commas
//! only split at nesting depth zero with respect to `{} [] <>`, which the
//! recursive descent gives us for free. Schema errors are fatal: no
//! partial type tree ever escapes.

use indexmap::IndexMap;

use crate::constants::{is_reserved_word, MAX_DEPTH};
use crate::error::{Error, Result};
use crate::lex::{Spanned, Token, Tokenizer};
use crate::options::ValidateOptions;
use crate::schema::registry::{TypeRegistry, LIST_KIND, OBJECT_KIND};
use crate::schema::types::{
    ConstraintMap, ListType, ObjectShape, ObjectType, ScalarType, TypeDescriptor, UnionType,
};
use crate::schema::Schema;
use crate::validate::validate_single;
use crate::value::{ListValue, ObjectValue, Value};

pub fn parse_schema(text: &str, registry: &TypeRegistry) -> Result<Schema> {
    let tokens: Vec<Spanned> = Tokenizer::new(text)
        .tokenize()?
        .into_iter()
        .filter(|s| !s.token.is_comment())
        .collect();
    SchemaParser {
        tokens: &tokens,
        pos: 0,
        registry,
    }
    .parse()
}

struct SchemaParser<'t, 'r> {
    tokens: &'t [Spanned],
    pos: usize,
    registry: &'r TypeRegistry,
}

impl<'t, 'r> SchemaParser<'t, 'r> {
    fn peek(&self) -> &'t Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> &'t Spanned {
        let spanned = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        spanned
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek().token, Token::Whitespace) {
            self.bump();
        }
    }

    fn skip_all(&mut self) {
        while matches!(self.peek().token, Token::Whitespace | Token::Newline) {
            self.bump();
        }
    }

    fn parse(mut self) -> Result<Schema> {
        let mut fields = IndexMap::new();

        loop {
            self.skip_all();
            if matches!(self.peek().token, Token::Eof) {
                break;
            }

            let (name, name_pos) = self.parse_field_name()?;
            if fields.contains_key(&name) {
                return Err(Error::schema_at(
                    name_pos,
                    format!("duplicate field '{name}'"),
                ));
            }

            let ty = self.parse_field_body(&name, 0)?;
            fields.insert(name, ty);

            self.skip_ws();
            match self.peek().token {
                Token::Newline | Token::Eof => {}
                ref other => {
                    return Err(Error::schema_at(
                        self.peek().pos,
                        format!("expected newline after field, got {}", other.describe()),
                    ))
                }
            }
        }

        Ok(Schema { fields })
    }

    /// `Optional? ':' TypeExpr Default?` — everything after the field name.
    fn parse_field_body(&mut self, name: &str, depth: usize) -> Result<TypeDescriptor> {
        self.skip_ws();
        let optional = if matches!(self.peek().token, Token::Question) {
            self.bump();
            true
        } else {
            false
        };

        self.skip_ws();
        if !matches!(self.peek().token, Token::Colon) {
            return Err(Error::schema_at(
                self.peek().pos,
                format!(
                    "expected ':' after field '{name}', got {}",
                    self.peek().token.describe()
                ),
            ));
        }
        self.bump();
        self.skip_all();

        let mut ty = self.parse_type_expr(depth)?;
        ty.set_optional(optional);

        self.skip_ws();
        if matches!(self.peek().token, Token::Equal) {
            let eq_pos = self.peek().pos;
            self.bump();
            self.skip_all();
            let default = self.parse_value_literal(0)?;

            // A default must satisfy its own field type, checked right
            // here so a broken schema never loads.
            let mut probe = default.clone();
            let options = ValidateOptions::new()
                .with_strict(true)
                .with_apply_defaults(false);
            let errors = validate_single(&mut probe, &ty, self.registry, &options, name);
            if let Some(first) = errors.first() {
                return Err(Error::schema_at(
                    eq_pos,
                    format!("default for field '{name}' does not match its type: {first}"),
                ));
            }
            ty.set_default(default);
        }

        Ok(ty)
    }

    fn parse_field_name(&mut self) -> Result<(String, crate::error::Position)> {
        let spanned = self.peek().clone();
        match spanned.token {
            Token::Ident(ref name) => {
                if is_reserved_word(name) {
                    return Err(Error::schema_at(
                        spanned.pos,
                        format!("reserved word '{name}' cannot be an unquoted field name"),
                    ));
                }
                self.bump();
                Ok((name.clone(), spanned.pos))
            }
            Token::Str(ref name) | Token::SingleStr(ref name) => {
                self.bump();
                Ok((name.clone(), spanned.pos))
            }
            ref other => Err(Error::schema_at(
                spanned.pos,
                format!("expected field name, got {}", other.describe()),
            )),
        }
    }

    fn parse_type_expr(&mut self, depth: usize) -> Result<TypeDescriptor> {
        if depth > MAX_DEPTH {
            return Err(Error::schema_at(
                self.peek().pos,
                "maximum nesting depth exceeded",
            ));
        }

        let first = self.parse_atom(depth)?;
        let mut alts = vec![first];

        loop {
            if depth == 0 {
                self.skip_ws();
            } else {
                self.skip_all();
            }
            if matches!(self.peek().token, Token::Pipe) {
                self.bump();
                self.skip_all();
                alts.push(self.parse_atom(depth)?);
            } else {
                break;
            }
        }

        if alts.len() == 1 {
            Ok(alts.pop().expect("one alternative"))
        } else {
            Ok(TypeDescriptor::Union(UnionType {
                alts,
                default: None,
                optional: false,
            }))
        }
    }

    fn parse_atom(&mut self, depth: usize) -> Result<TypeDescriptor> {
        let spanned = self.peek().clone();
        let mut atom = match spanned.token {
            Token::Ident(ref name) => {
                if !self.registry.has_scalar_kind(name) {
                    return Err(Error::schema_at(
                        spanned.pos,
                        format!("unknown type name '{name}'"),
                    ));
                }
                self.bump();
                TypeDescriptor::Scalar(ScalarType::new(name.clone()))
            }
            // `null` lexes as a keyword, not an identifier.
            Token::Null => {
                self.bump();
                TypeDescriptor::Scalar(ScalarType::new("null"))
            }
            Token::LBracket => {
                self.bump();
                self.skip_all();
                if matches!(self.peek().token, Token::RBracket) {
                    self.bump();
                    TypeDescriptor::List(ListType {
                        item: None,
                        constraints: ConstraintMap::new(),
                        default: None,
                        optional: false,
                    })
                } else {
                    let item = self.parse_type_expr(depth + 1)?;
                    self.skip_all();
                    if !matches!(self.peek().token, Token::RBracket) {
                        return Err(Error::schema_at(
                            self.peek().pos,
                            format!(
                                "expected ']' to close list type, got {}",
                                self.peek().token.describe()
                            ),
                        ));
                    }
                    self.bump();
                    TypeDescriptor::List(ListType {
                        item: Some(Box::new(item)),
                        constraints: ConstraintMap::new(),
                        default: None,
                        optional: false,
                    })
                }
            }
            Token::LBrace => self.parse_object_type(depth)?,
            ref other => {
                return Err(Error::schema_at(
                    spanned.pos,
                    format!("expected a type, got {}", other.describe()),
                ))
            }
        };

        self.skip_ws();
        if matches!(self.peek().token, Token::LAngle) {
            let kind = match &atom {
                TypeDescriptor::Scalar(scalar) => scalar.kind.clone(),
                TypeDescriptor::List(_) => LIST_KIND.to_string(),
                TypeDescriptor::Object(_) => OBJECT_KIND.to_string(),
                TypeDescriptor::Union(_) => unreachable!("atoms are never unions"),
            };
            let constraints = self.parse_constraints(&kind)?;
            match &mut atom {
                TypeDescriptor::Scalar(scalar) => scalar.constraints = constraints,
                TypeDescriptor::List(list) => list.constraints = constraints,
                TypeDescriptor::Object(object) => object.constraints = constraints,
                TypeDescriptor::Union(_) => unreachable!("atoms are never unions"),
            }
        }

        Ok(atom)
    }

    fn parse_object_type(&mut self, depth: usize) -> Result<TypeDescriptor> {
        let open_pos = self.peek().pos;
        self.bump(); // '{'
        self.skip_all();

        if matches!(self.peek().token, Token::RBrace) {
            self.bump();
            return Ok(TypeDescriptor::Object(ObjectType {
                shape: ObjectShape::Any,
                constraints: ConstraintMap::new(),
                default: None,
                optional: false,
            }));
        }

        let shape = if self.looks_enumerated() {
            let mut fields = IndexMap::new();
            loop {
                self.skip_all();
                if matches!(self.peek().token, Token::RBrace) {
                    self.bump();
                    break;
                }
                if matches!(self.peek().token, Token::Eof) {
                    return Err(Error::schema_at(open_pos, "unterminated object type"));
                }

                let (name, name_pos) = self.parse_field_name()?;
                if fields.contains_key(&name) {
                    return Err(Error::schema_at(
                        name_pos,
                        format!("duplicate field '{name}'"),
                    ));
                }
                let ty = self.parse_field_body(&name, depth + 1)?;
                fields.insert(name, ty);

                self.skip_all();
                match self.peek().token {
                    Token::Comma => {
                        self.bump();
                    }
                    Token::RBrace => {
                        self.bump();
                        break;
                    }
                    Token::Eof => {
                        return Err(Error::schema_at(open_pos, "unterminated object type"))
                    }
                    ref other => {
                        return Err(Error::schema_at(
                            self.peek().pos,
                            format!("expected ',' or '}}', got {}", other.describe()),
                        ))
                    }
                }
            }
            ObjectShape::Fields(fields)
        } else {
            let inner = self.parse_type_expr(depth + 1)?;
            self.skip_all();
            if !matches!(self.peek().token, Token::RBrace) {
                return Err(Error::schema_at(
                    self.peek().pos,
                    format!(
                        "expected '}}' to close object type, got {}",
                        self.peek().token.describe()
                    ),
                ));
            }
            self.bump();
            ObjectShape::Pattern(Box::new(inner))
        };

        Ok(TypeDescriptor::Object(ObjectType {
            shape,
            constraints: ConstraintMap::new(),
            default: None,
            optional: false,
        }))
    }

    /// Disambiguate `{ name: type }` from `{ type }` without consuming:
    /// a leading name followed by `:` (or `?:`) means enumerated fields.
    fn looks_enumerated(&self) -> bool {
        let mut iter = self
            .tokens
            .iter()
            .skip(self.pos)
            .filter(|s| !matches!(s.token, Token::Whitespace | Token::Newline));
        let Some(first) = iter.next() else {
            return false;
        };
        if !matches!(
            first.token,
            Token::Ident(_) | Token::Str(_) | Token::SingleStr(_)
        ) {
            return false;
        }
        match iter.next().map(|s| &s.token) {
            Some(Token::Colon) | Some(Token::Question) => true,
            _ => false,
        }
    }

    fn parse_constraints(&mut self, kind: &str) -> Result<ConstraintMap> {
        let open_pos = self.peek().pos;
        self.bump(); // '<'
        let mut map = ConstraintMap::new();

        loop {
            self.skip_all();
            match self.peek().token {
                Token::RAngle => {
                    self.bump();
                    break;
                }
                Token::Eof => {
                    return Err(Error::schema_at(
                        open_pos,
                        "missing closing '>' after constraints",
                    ))
                }
                _ => {}
            }

            let name_pos = self.peek().pos;
            let name = match self.peek().token.clone() {
                Token::Ident(name) => {
                    self.bump();
                    name
                }
                ref other => {
                    return Err(Error::schema_at(
                        name_pos,
                        format!("expected constraint name, got {}", other.describe()),
                    ))
                }
            };

            self.skip_all();
            if !matches!(self.peek().token, Token::Equal) {
                return Err(Error::schema_at(
                    self.peek().pos,
                    format!(
                        "expected '=' after constraint '{name}', got {}",
                        self.peek().token.describe()
                    ),
                ));
            }
            self.bump();
            self.skip_all();
            let value = self.parse_constraint_value()?;

            let canonical = self
                .registry
                .canonical_constraint(kind, &name)
                .ok_or_else(|| {
                    Error::schema_at(
                        name_pos,
                        format!("unknown constraint '{name}' for {kind}"),
                    )
                })?;
            self.registry
                .check_constraint_arg(kind, &canonical, &value)
                .map_err(|message| {
                    Error::schema_at(
                        name_pos,
                        format!("invalid '{canonical}' constraint: {message}"),
                    )
                })?;
            if map.contains_key(&canonical) {
                return Err(Error::schema_at(
                    name_pos,
                    format!("duplicate constraint '{canonical}'"),
                ));
            }
            map.insert(canonical, value);

            self.skip_all();
            match self.peek().token {
                Token::Comma => {
                    self.bump();
                }
                Token::RAngle => {
                    self.bump();
                    break;
                }
                Token::Eof => {
                    return Err(Error::schema_at(
                        open_pos,
                        "missing closing '>' after constraints",
                    ))
                }
                ref other => {
                    return Err(Error::schema_at(
                        self.peek().pos,
                        format!("expected ',' or '>', got {}", other.describe()),
                    ))
                }
            }
        }

        Ok(map)
    }

    fn parse_constraint_value(&mut self) -> Result<Value> {
        let spanned = self.peek().clone();
        let value = match spanned.token {
            Token::Str(ref s) | Token::SingleStr(ref s) => Value::String(s.clone()),
            Token::Int(i) => Value::Int(i),
            Token::Float(f) => Value::Float(f),
            Token::Bool(b) => Value::Bool(b),
            Token::Null => Value::Null,
            Token::LBracket => {
                self.bump();
                let mut items = ListValue::new();
                loop {
                    self.skip_all();
                    if matches!(self.peek().token, Token::RBracket) {
                        self.bump();
                        break;
                    }
                    items.push(self.parse_constraint_value()?);
                    self.skip_all();
                    match self.peek().token {
                        Token::Comma => {
                            self.bump();
                        }
                        Token::RBracket => {
                            self.bump();
                            break;
                        }
                        ref other => {
                            return Err(Error::schema_at(
                                self.peek().pos,
                                format!("expected ',' or ']', got {}", other.describe()),
                            ))
                        }
                    }
                }
                return Ok(Value::List(items));
            }
            ref other => {
                return Err(Error::schema_at(
                    spanned.pos,
                    format!("expected constraint value, got {}", other.describe()),
                ))
            }
        };
        self.bump();
        Ok(value)
    }

    /// A data-grammar value used as a default.
    fn parse_value_literal(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(Error::schema_at(
                self.peek().pos,
                "maximum nesting depth exceeded",
            ));
        }

        let spanned = self.peek().clone();
        let value = match spanned.token {
            Token::Str(ref s) | Token::SingleStr(ref s) => Value::String(s.clone()),
            Token::Int(i) => Value::Int(i),
            Token::Float(f) => Value::Float(f),
            Token::Bool(b) => Value::Bool(b),
            Token::Null => Value::Null,
            Token::LBrace => {
                self.bump();
                let mut object = ObjectValue::new();
                loop {
                    self.skip_all();
                    if matches!(self.peek().token, Token::RBrace) {
                        self.bump();
                        break;
                    }
                    let (key, key_pos) = self.parse_field_name()?;
                    if object.contains_key(&key) {
                        return Err(Error::schema_at(
                            key_pos,
                            format!("duplicate key '{key}'"),
                        ));
                    }
                    self.skip_all();
                    if !matches!(self.peek().token, Token::Equal) {
                        return Err(Error::schema_at(
                            self.peek().pos,
                            format!(
                                "expected '=' after key '{key}', got {}",
                                self.peek().token.describe()
                            ),
                        ));
                    }
                    self.bump();
                    self.skip_all();
                    let value = self.parse_value_literal(depth + 1)?;
                    object.insert(key, value);
                    self.skip_all();
                    match self.peek().token {
                        Token::Comma => {
                            self.bump();
                        }
                        Token::RBrace => {
                            self.bump();
                            break;
                        }
                        ref other => {
                            return Err(Error::schema_at(
                                self.peek().pos,
                                format!("expected ',' or '}}', got {}", other.describe()),
                            ))
                        }
                    }
                }
                return Ok(Value::Object(object));
            }
            Token::LBracket => {
                self.bump();
                let mut list = ListValue::new();
                loop {
                    self.skip_all();
                    if matches!(self.peek().token, Token::RBracket) {
                        self.bump();
                        break;
                    }
                    list.push(self.parse_value_literal(depth + 1)?);
                    self.skip_all();
                    match self.peek().token {
                        Token::Comma => {
                            self.bump();
                        }
                        Token::RBracket => {
                            self.bump();
                            break;
                        }
                        ref other => {
                            return Err(Error::schema_at(
                                self.peek().pos,
                                format!("expected ',' or ']', got {}", other.describe()),
                            ))
                        }
                    }
                }
                return Ok(Value::List(list));
            }
            ref other => {
                return Err(Error::schema_at(
                    spanned.pos,
                    format!("expected default value, got {}", other.describe()),
                ))
            }
        };
        self.bump();
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Schema> {
        parse_schema(text, &TypeRegistry::with_builtins())
    }

    fn scalar(ty: &TypeDescriptor) -> &ScalarType {
        match ty {
            TypeDescriptor::Scalar(scalar) => scalar,
            other => panic!("expected scalar type, got {other:?}"),
        }
    }

    #[rstest::rstest]
    fn test_simple_fields() {
        let schema = parse("name: str\nport: int\nratio: float\n").unwrap();
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(scalar(&schema.fields["name"]).kind, "str");
        assert_eq!(scalar(&schema.fields["port"]).kind, "int");
    }

    #[rstest::rstest]
    fn test_optional_marker() {
        let schema = parse("nickname?: str\n").unwrap();
        assert!(schema.fields["nickname"].optional());
    }

    #[rstest::rstest]
    fn test_constraints_and_aliases() {
        let schema = parse("port: int<min=1024, max=65535>\ntag: str<min=2>\n").unwrap();
        let port = scalar(&schema.fields["port"]);
        assert_eq!(port.constraints.get("min"), Some(&Value::Int(1024)));
        assert_eq!(port.constraints.get("max"), Some(&Value::Int(65535)));

        // str alias min -> min_length canonicalizes before storage
        let tag = scalar(&schema.fields["tag"]);
        assert_eq!(tag.constraints.get("min_length"), Some(&Value::Int(2)));
        assert!(tag.constraints.get("min").is_none());
    }

    #[rstest::rstest]
    fn test_union_order_preserved() {
        let schema = parse("id: str<enum=[\"unknown\"]> | int<min=1> | null\n").unwrap();
        let TypeDescriptor::Union(union) = &schema.fields["id"] else {
            panic!("expected union");
        };
        assert_eq!(union.alts.len(), 3);
        assert_eq!(scalar(&union.alts[0]).kind, "str");
        assert_eq!(scalar(&union.alts[1]).kind, "int");
        assert_eq!(scalar(&union.alts[2]).kind, "null");
    }

    #[rstest::rstest]
    fn test_list_types() {
        let schema = parse("ids: [int]<unique=true>\nanything: []\nmatrix: [[float]]\n").unwrap();
        let TypeDescriptor::List(ids) = &schema.fields["ids"] else {
            panic!("expected list");
        };
        assert!(ids.item.is_some());
        assert_eq!(ids.constraints.get("unique"), Some(&Value::Bool(true)));

        let TypeDescriptor::List(anything) = &schema.fields["anything"] else {
            panic!("expected list");
        };
        assert!(anything.item.is_none());
    }

    #[rstest::rstest]
    fn test_enumerated_vs_pattern_objects() {
        let schema = parse("user: { name: str, age?: int }\nscores: { int }\nfree: {}\n").unwrap();

        let TypeDescriptor::Object(user) = &schema.fields["user"] else {
            panic!("expected object");
        };
        let ObjectShape::Fields(fields) = &user.shape else {
            panic!("expected enumerated object");
        };
        assert_eq!(fields.len(), 2);
        assert!(fields["age"].optional());

        let TypeDescriptor::Object(scores) = &schema.fields["scores"] else {
            panic!("expected object");
        };
        assert!(matches!(scores.shape, ObjectShape::Pattern(_)));

        let TypeDescriptor::Object(free) = &schema.fields["free"] else {
            panic!("expected object");
        };
        assert!(matches!(free.shape, ObjectShape::Any));
    }

    #[rstest::rstest]
    fn test_union_splits_only_at_depth_zero() {
        let schema = parse("field: { inner: str | int } | null\n").unwrap();
        let TypeDescriptor::Union(union) = &schema.fields["field"] else {
            panic!("expected union");
        };
        assert_eq!(union.alts.len(), 2);
        let TypeDescriptor::Object(object) = &union.alts[0] else {
            panic!("expected object alternative");
        };
        let ObjectShape::Fields(fields) = &object.shape else {
            panic!("expected enumerated object");
        };
        assert!(matches!(fields["inner"], TypeDescriptor::Union(_)));
    }

    #[rstest::rstest]
    fn test_defaults() {
        let schema = parse("port: int<min=1024> = 8080\nlabels: [str] = [\"a\"]\n").unwrap();
        assert_eq!(schema.fields["port"].default(), Some(&Value::Int(8080)));
        assert_eq!(
            schema.fields["labels"].default(),
            Some(&Value::from(vec![Value::from("a")]))
        );
    }

    #[rstest::rstest]
    fn test_default_object_uses_data_grammar() {
        let schema = parse("server: { host: str, port: int } = { host = \"a\", port = 1 }\n")
            .unwrap();
        let default = schema.fields["server"].default().unwrap();
        assert_eq!(default.get("host").and_then(Value::as_str), Some("a"));
    }

    #[rstest::rstest]
    fn test_default_must_match_type() {
        let err = parse("port: int<min=1024> = 80\n").unwrap_err();
        assert!(err.message.contains("default for field 'port'"));

        let err = parse("name: str = 5\n").unwrap_err();
        assert!(err.message.contains("default for field 'name'"));
    }

    #[rstest::rstest]
    fn test_null_default_is_a_default() {
        let schema = parse("note: str | null = null\n").unwrap();
        assert_eq!(schema.fields["note"].default(), Some(&Value::Null));
    }

    #[rstest::rstest]
    fn test_unknown_type_name() {
        let err = parse("x: integer\n").unwrap_err();
        assert!(err.message.contains("unknown type name 'integer'"));
    }

    #[rstest::rstest]
    fn test_unknown_constraint() {
        let err = parse("x: int<scale=2>\n").unwrap_err();
        assert!(err.message.contains("unknown constraint 'scale'"));
    }

    #[rstest::rstest]
    fn test_malformed_constraint_argument() {
        let err = parse("x: str<pattern=\"[\">\n").unwrap_err();
        assert!(err.message.contains("invalid 'pattern' constraint"));
    }

    #[rstest::rstest]
    fn test_missing_closing_angle() {
        let err = parse("x: int<min=1\n").unwrap_err();
        assert!(err.message.contains("missing closing '>'"));
    }

    #[rstest::rstest]
    fn test_duplicate_field() {
        let err = parse("x: int\nx: str\n").unwrap_err();
        assert!(err.message.contains("duplicate field 'x'"));
    }

    #[rstest::rstest]
    fn test_registered_kind_is_usable() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register_kind(
            "port",
            crate::schema::registry::ScalarKindSpec::new(|v| {
                matches!(v, Value::Int(p) if (1..=65535).contains(p))
            }),
        );
        let schema = parse_schema("listen: port\n", &registry).unwrap();
        assert_eq!(scalar(&schema.fields["listen"]).kind, "port");
    }

    #[rstest::rstest]
    fn test_temporal_fields() {
        let schema = parse(
            "born: date\nwake: time\nlast_seen: datetime<format=\"iso8601\">\nstamp: timestamp<precision=\"seconds\">\n",
        )
        .unwrap();
        assert_eq!(schema.fields.len(), 4);
        assert_eq!(scalar(&schema.fields["born"]).kind, "date");
    }

    #[rstest::rstest]
    fn test_comments_discarded_in_schemas() {
        let schema = parse("// header\nname: str  // trailing\n").unwrap();
        assert_eq!(schema.fields.len(), 1);
    }
}
