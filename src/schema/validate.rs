//! Structural validation of a JSON instance against a materialized [`Schema`].
//!
//! Validation accumulates: every violation found in a single depth-first pass is
//! reported, in the order the schema structure is walked (required names, then
//! declared properties, then additional properties; array items by index).

use super::model::{AdditionalProperties, Schema, SchemaType};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid uuid regex")
});
static HOSTNAME_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("valid hostname regex")
});

/// Category of a single violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    TypeMismatch,
    MissingRequired,
    FormatMismatch,
    ConstraintViolation,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::TypeMismatch => "TypeMismatch",
            ViolationKind::MissingRequired => "MissingRequired",
            ViolationKind::FormatMismatch => "FormatMismatch",
            ViolationKind::ConstraintViolation => "ConstraintViolation",
        };
        f.write_str(s)
    }
}

/// One step into an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Location of a value inside an instance. Renders as `/`-joined segments; the
/// instance root renders as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstancePath(Vec<PathSegment>);

impl InstancePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathSegment::Key(key.into()));
        self
    }

    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl Serialize for InstancePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single violation found by [`validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub path: InstancePath,
    pub kind: ViolationKind,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.segments().is_empty() {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
        }
    }
}

/// Validate `instance` against `schema`, returning every violation found.
///
/// An empty list means the instance conforms. Neither argument is modified and the
/// call cannot fail: schemas outside the supported subset are rejected earlier, when
/// they are materialized.
#[must_use]
pub fn validate(schema: &Schema, instance: &Value) -> Vec<ValidationError> {
    let mut v = Validator {
        path: Vec::new(),
        errors: Vec::new(),
    };
    v.check(schema, instance);
    v.errors
}

struct Validator {
    path: Vec<PathSegment>,
    errors: Vec<ValidationError>,
}

impl Validator {
    fn report(&mut self, kind: ViolationKind, message: String) {
        self.errors.push(ValidationError {
            path: InstancePath(self.path.clone()),
            kind,
            message,
        });
    }

    fn report_at(&mut self, segment: PathSegment, kind: ViolationKind, message: String) {
        self.path.push(segment);
        self.report(kind, message);
        self.path.pop();
    }

    fn check(&mut self, schema: &Schema, value: &Value) {
        if let Some(ty) = schema.schema_type {
            if !type_matches(ty, value) {
                self.report(
                    ViolationKind::TypeMismatch,
                    format!("expected {ty}, found {}", kind_of(value)),
                );
                return;
            }
        }

        match value {
            Value::Object(map) => self.check_object(schema, map),
            Value::Array(items) => self.check_array(schema, items),
            Value::String(s) => self.check_string(schema, s),
            Value::Number(n) => self.check_number(schema, n),
            Value::Bool(_) | Value::Null => {}
        }

        if let Some(allowed) = &schema.enum_values {
            if !allowed.iter().any(|a| json_eq(a, value)) {
                self.report(
                    ViolationKind::ConstraintViolation,
                    format!("value {value} is not one of the allowed values {}", Value::Array(allowed.clone())),
                );
            }
        }
    }

    fn check_object(&mut self, schema: &Schema, map: &Map<String, Value>) {
        for name in &schema.required {
            if !map.contains_key(name) {
                self.report_at(
                    PathSegment::Key(name.clone()),
                    ViolationKind::MissingRequired,
                    format!("required property '{name}' is missing"),
                );
            }
        }

        for (name, sub) in schema.properties.iter() {
            if let Some(v) = map.get(name) {
                self.path.push(PathSegment::Key(name.to_string()));
                self.check(sub, v);
                self.path.pop();
            }
        }

        for (key, v) in map {
            if schema.properties.contains(key) {
                continue;
            }
            match &schema.additional_properties {
                AdditionalProperties::Allowed(true) => {}
                AdditionalProperties::Allowed(false) => self.report_at(
                    PathSegment::Key(key.clone()),
                    ViolationKind::ConstraintViolation,
                    format!("additional property '{key}' is not allowed"),
                ),
                AdditionalProperties::Schema(extra) => {
                    self.path.push(PathSegment::Key(key.clone()));
                    self.check(extra, v);
                    self.path.pop();
                }
            }
        }
    }

    fn check_array(&mut self, schema: &Schema, items: &[Value]) {
        let len = items.len() as u64;
        if let Some(min) = schema.min_items {
            if len < min {
                self.report(
                    ViolationKind::ConstraintViolation,
                    format!("array has {len} items, fewer than minItems {min}"),
                );
            }
        }
        if let Some(max) = schema.max_items {
            if len > max {
                self.report(
                    ViolationKind::ConstraintViolation,
                    format!("array has {len} items, more than maxItems {max}"),
                );
            }
        }
        if schema.unique_items {
            let duplicate = items
                .iter()
                .enumerate()
                .any(|(i, a)| items[..i].iter().any(|b| json_eq(a, b)));
            if duplicate {
                self.report(
                    ViolationKind::ConstraintViolation,
                    "array items are not unique".to_string(),
                );
            }
        }
        if let Some(item_schema) = &schema.items {
            for (i, item) in items.iter().enumerate() {
                self.path.push(PathSegment::Index(i));
                self.check(item_schema, item);
                self.path.pop();
            }
        }
    }

    fn check_string(&mut self, schema: &Schema, s: &str) {
        if let Some(format) = &schema.format {
            if !string_format_ok(format, s) {
                self.report(
                    ViolationKind::FormatMismatch,
                    format!("'{s}' is not a valid {format}"),
                );
            }
        }
        let len = s.chars().count() as u64;
        if let Some(min) = schema.min_length {
            if len < min {
                self.report(
                    ViolationKind::ConstraintViolation,
                    format!("string length {len} is shorter than minLength {min}"),
                );
            }
        }
        if let Some(max) = schema.max_length {
            if len > max {
                self.report(
                    ViolationKind::ConstraintViolation,
                    format!("string length {len} is longer than maxLength {max}"),
                );
            }
        }
        if let Some(pattern) = &schema.pattern {
            if !pattern.is_match(s) {
                self.report(
                    ViolationKind::ConstraintViolation,
                    format!("'{s}' does not match pattern '{pattern}'"),
                );
            }
        }
    }

    fn check_number(&mut self, schema: &Schema, n: &Number) {
        if let Some(format) = &schema.format {
            if !number_format_ok(format, n) {
                self.report(
                    ViolationKind::FormatMismatch,
                    format!("{n} does not fit format {format}"),
                );
            }
        }
        let Some(x) = n.as_f64() else {
            return;
        };
        if let Some(min) = schema.minimum {
            let below = if schema.exclusive_minimum { x <= min } else { x < min };
            if below {
                let op = if schema.exclusive_minimum { "greater than" } else { "at least" };
                self.report(
                    ViolationKind::ConstraintViolation,
                    format!("{n} must be {op} {min}"),
                );
            }
        }
        if let Some(max) = schema.maximum {
            let above = if schema.exclusive_maximum { x >= max } else { x > max };
            if above {
                let op = if schema.exclusive_maximum { "less than" } else { "at most" };
                self.report(
                    ViolationKind::ConstraintViolation,
                    format!("{n} must be {op} {max}"),
                );
            }
        }
        if let Some(m) = schema.multiple_of {
            let q = x / m;
            if (q - q.round()).abs() > 1e-9 {
                self.report(
                    ViolationKind::ConstraintViolation,
                    format!("{n} is not a multiple of {m}"),
                );
            }
        }
    }
}

fn type_matches(ty: SchemaType, value: &Value) -> bool {
    match ty {
        SchemaType::String => value.is_string(),
        SchemaType::Number => value.is_number(),
        SchemaType::Integer => value.as_number().is_some_and(is_integer),
        SchemaType::Boolean => value.is_boolean(),
        SchemaType::Object => value.is_object(),
        SchemaType::Array => value.is_array(),
        SchemaType::Null => value.is_null(),
    }
}

fn is_integer(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if is_integer(n) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Equality that treats `1` and `1.0` as the same number.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx == fy,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

/// Swagger 2.0 string formats. Unknown formats are accepted.
fn string_format_ok(format: &str, s: &str) -> bool {
    match format {
        "date" => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        "date-time" => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        "byte" => base64::engine::general_purpose::STANDARD.decode(s).is_ok(),
        "email" => EMAIL.is_match(s),
        "uuid" => UUID.is_match(s),
        "ipv4" => s.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => s.parse::<Ipv6Addr>().is_ok(),
        "hostname" => {
            !s.is_empty() && s.len() <= 253 && s.split('.').all(|label| HOSTNAME_LABEL.is_match(label))
        }
        "uri" => url::Url::parse(s).is_ok(),
        _ => true,
    }
}

/// Swagger 2.0 numeric formats. `float`/`double` and unknown formats are accepted.
fn number_format_ok(format: &str, n: &Number) -> bool {
    let fits = |lo: f64, hi: f64| match (n.as_i64(), n.as_u64(), n.as_f64()) {
        (Some(i), _, _) => (lo..=hi).contains(&(i as f64)),
        (None, Some(u), _) => (u as f64) <= hi,
        (None, None, Some(f)) => f.fract() == 0.0 && (lo..=hi).contains(&f),
        _ => false,
    };
    match format {
        "int32" => match n.as_i64() {
            Some(i) => i32::try_from(i).is_ok(),
            None => fits(f64::from(i32::MIN), f64::from(i32::MAX)),
        },
        "int64" => n.is_i64() || fits(i64::MIN as f64, i64::MAX as f64) && !n.is_u64(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(v: Value) -> Schema {
        Schema::from_value(&v).unwrap()
    }

    #[test]
    fn test_instance_path_display() {
        let p = InstancePath::root().key("users").index(2).key("id");
        assert_eq!(p.to_string(), "users/2/id");
        assert_eq!(InstancePath::root().to_string(), "");
    }

    #[test]
    fn test_integer_is_number() {
        let s = schema(json!({"type": "number"}));
        assert!(validate(&s, &json!(3)).is_empty());
        let s = schema(json!({"type": "integer"}));
        assert!(validate(&s, &json!(3.0)).is_empty());
        assert_eq!(validate(&s, &json!(3.5))[0].kind, ViolationKind::TypeMismatch);
    }

    #[test]
    fn test_int_formats() {
        let s = schema(json!({"type": "integer", "format": "int32"}));
        assert!(validate(&s, &json!(2147483647)).is_empty());
        let errs = validate(&s, &json!(2147483648u64));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ViolationKind::FormatMismatch);

        let s = schema(json!({"type": "integer", "format": "int64"}));
        assert!(validate(&s, &json!(-9)).is_empty());
        assert_eq!(validate(&s, &json!(u64::MAX))[0].kind, ViolationKind::FormatMismatch);
    }

    #[test]
    fn test_string_formats() {
        let cases = [
            ("date", "2024-02-29", "2023-02-29"),
            ("date-time", "2024-01-01T10:00:00Z", "2024-01-01 10:00"),
            ("email", "user1@example.com", "user1"),
            ("uuid", "0b5d6a3e-1c2f-4e8a-9d7b-3f1e2a4c5b6d", "0b5d6a3e"),
            ("ipv4", "10.0.0.1", "10.0.0.256"),
            ("ipv6", "::1", "::g"),
            ("byte", "aGVsbG8=", "###"),
            ("hostname", "api.example.com", "-bad-.com"),
            ("uri", "http://localhost:8080/v2", "not a uri"),
        ];
        for (format, good, bad) in cases {
            let s = schema(json!({"type": "string", "format": format}));
            assert!(validate(&s, &json!(good)).is_empty(), "{format} should accept {good}");
            let errs = validate(&s, &json!(bad));
            assert_eq!(errs.len(), 1, "{format} should reject {bad}");
            assert_eq!(errs[0].kind, ViolationKind::FormatMismatch);
        }
        let s = schema(json!({"type": "string", "format": "password"}));
        assert!(validate(&s, &json!("anything")).is_empty());
    }

    #[test]
    fn test_numeric_bounds() {
        let s = schema(json!({"type": "number", "minimum": 1, "maximum": 10, "exclusiveMaximum": true}));
        assert!(validate(&s, &json!(1)).is_empty());
        assert_eq!(validate(&s, &json!(0)).len(), 1);
        assert_eq!(validate(&s, &json!(10)).len(), 1);
        assert!(validate(&s, &json!(9.99)).is_empty());

        let s = schema(json!({"type": "number", "multipleOf": 0.5}));
        assert!(validate(&s, &json!(2.5)).is_empty());
        assert_eq!(validate(&s, &json!(2.25))[0].kind, ViolationKind::ConstraintViolation);
    }

    #[test]
    fn test_string_bounds_count_chars() {
        let s = schema(json!({"type": "string", "minLength": 2, "maxLength": 3, "pattern": "^[a-zé]+$"}));
        assert!(validate(&s, &json!("éé")).is_empty());
        assert_eq!(validate(&s, &json!("a")).len(), 1);
        assert_eq!(validate(&s, &json!("abcd")).len(), 1);
        let errs = validate(&s, &json!("A1"));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("pattern"));
    }

    #[test]
    fn test_pattern_is_compiled_with_the_schema() {
        let s = schema(json!({"type": "string", "pattern": "[0-9]{3}"}));
        let pattern = s.pattern.as_ref().unwrap();
        assert_eq!(pattern.as_str(), "[0-9]{3}");
        assert!(pattern.is_match("ab123cd"));
        assert_eq!(s.to_value(), json!({"type": "string", "pattern": "[0-9]{3}"}));

        assert!(validate(&s, &json!("x555")).is_empty());
        let errs = validate(&s, &json!("12"));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "'12' does not match pattern '[0-9]{3}'");
    }

    #[test]
    fn test_enum_compares_numbers_by_value() {
        let s = schema(json!({"enum": [1, "two"]}));
        assert!(validate(&s, &json!(1.0)).is_empty());
        assert!(validate(&s, &json!("two")).is_empty());
        assert_eq!(validate(&s, &json!(3))[0].kind, ViolationKind::ConstraintViolation);
    }

    #[test]
    fn test_array_constraints_then_items() {
        let s = schema(json!({
            "type": "array",
            "minItems": 1,
            "maxItems": 3,
            "uniqueItems": true,
            "items": {"type": "integer"}
        }));
        let errs = validate(&s, &json!([1, 1, "x", 4]));
        let kinds: Vec<_> = errs.iter().map(|e| (e.kind, e.path.to_string())).collect();
        assert_eq!(
            kinds,
            vec![
                (ViolationKind::ConstraintViolation, String::new()),
                (ViolationKind::ConstraintViolation, String::new()),
                (ViolationKind::TypeMismatch, "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_additional_properties_policies() {
        let closed = schema(json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}},
            "additionalProperties": false
        }));
        let errs = validate(&closed, &json!({"id": 1, "a": 1, "b": 2}));
        let paths: Vec<_> = errs.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["a", "b"]);

        let typed = schema(json!({
            "type": "object",
            "additionalProperties": {"type": "string"}
        }));
        let errs = validate(&typed, &json!({"a": "x", "b": 2}));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path.to_string(), "b");
        assert_eq!(errs[0].kind, ViolationKind::TypeMismatch);
    }

    #[test]
    fn test_untyped_schema_still_checks_matching_kind() {
        let s = schema(json!({"properties": {"n": {"type": "integer"}}, "required": ["n"]}));
        assert!(validate(&s, &json!("not an object")).is_empty());
        assert_eq!(validate(&s, &json!({}))[0].kind, ViolationKind::MissingRequired);
    }

    #[test]
    fn test_nested_paths() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "users": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["username"],
                        "properties": {"id": {"type": "integer"}}
                    }
                }
            }
        }));
        let errs = validate(&s, &json!({"users": [{"username": "a"}, {"id": "x"}]}));
        let got: Vec<_> = errs.iter().map(|e| (e.kind, e.path.to_string())).collect();
        assert_eq!(
            got,
            vec![
                (ViolationKind::MissingRequired, "users/1/username".to_string()),
                (ViolationKind::TypeMismatch, "users/1/id".to_string()),
            ]
        );
    }

    #[test]
    fn test_error_serializes_as_report_triple() {
        let s = schema(json!({"type": "object", "required": ["id"]}));
        let errs = validate(&s, &json!({}));
        assert_eq!(
            serde_json::to_value(&errs).unwrap(),
            json!([{"path": "id", "kind": "MissingRequired", "message": "required property 'id' is missing"}])
        );
    }
}
