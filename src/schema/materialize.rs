//! Turn a resolved document node into a standalone [`Schema`].
//!
//! Every `$ref` met on the way is resolved against the same document and expanded in
//! place, so the result never points back into the document. References currently
//! being expanded are tracked on a stack; meeting one of them again is a
//! [`SchemaError::CyclicReference`].

use super::error::SchemaError;
use super::model::{AdditionalProperties, Pattern, Properties, Schema, SchemaType};
use super::pointer::{resolve_value, NodeKind, Reference, ResolvedNode};
use crate::spec::Document;
use serde_json::{Map, Value};
use tracing::debug;

/// Keywords that only make sense on a Swagger 2.0 parameter, not on its value schema.
const PARAMETER_ONLY_KEYWORDS: [&str; 6] = [
    "name",
    "in",
    "required",
    "description",
    "allowEmptyValue",
    "collectionFormat",
];

/// Materialize the schema behind `node`.
///
/// * Response nodes yield their `schema` ([`SchemaError::NoSchemaOnResponse`] when
///   there is none).
/// * Body parameters yield their `schema`; other parameters are schema-shaped
///   themselves and are read directly.
/// * Anything else is read as a schema.
pub fn materialize(doc: &Document, node: &ResolvedNode<'_>) -> Result<Schema, SchemaError> {
    let mut m = Materializer::new(Some(doc.root()));
    m.active.push(node.reference.as_str().to_string());
    let schema = match node.kind {
        NodeKind::Response => m.response_schema(node.value, &node.reference),
        NodeKind::Parameter => m.parameter_schema(node.value, &node.reference),
        NodeKind::Schema | NodeKind::Other => m.parse(node.value, &node.reference),
    }?;
    debug!(
        reference = %node.reference,
        kind = %node.kind,
        "Schema materialized"
    );
    Ok(schema)
}

/// Resolve `reference` in `doc` and materialize the result.
pub fn materialize_ref(doc: &Document, reference: &Reference) -> Result<Schema, SchemaError> {
    let node = super::pointer::resolve(doc, reference)?;
    materialize(doc, &node)
}

impl Schema {
    /// Read a schema that contains no `$ref`.
    ///
    /// A `$ref` anywhere in schema position is reported as
    /// [`SchemaError::UnsupportedSchemaConstruct`]; use [`materialize`] for schemas
    /// that live inside a document.
    pub fn from_value(value: &Value) -> Result<Schema, SchemaError> {
        Materializer::new(None).parse(value, &Reference::root())
    }
}

struct Materializer<'a> {
    root: Option<&'a Value>,
    active: Vec<String>,
}

impl<'a> Materializer<'a> {
    fn new(root: Option<&'a Value>) -> Self {
        Self {
            root,
            active: Vec::new(),
        }
    }

    /// Follow a chain of `$ref` objects until reaching a concrete node.
    ///
    /// Returns the node, its location and how many references were pushed onto the
    /// active stack; the caller pops them with [`Self::unwind`] once done.
    fn follow<'v>(
        &mut self,
        value: &'v Value,
        location: &Reference,
    ) -> Result<(&'v Value, Reference, usize), SchemaError>
    where
        'a: 'v,
    {
        let mut value = value;
        let mut location = location.clone();
        let mut pushed = 0;
        while let Some(target) = ref_target(value, &location)? {
            let Some(root) = self.root else {
                return Err(SchemaError::unsupported(
                    location.as_str(),
                    format!("unresolved $ref '{target}'"),
                ));
            };
            if self.active.iter().any(|r| r == target.as_str()) {
                return Err(SchemaError::CyclicReference {
                    reference: target.as_str().to_string(),
                    chain: self.active.clone(),
                });
            }
            self.active.push(target.as_str().to_string());
            pushed += 1;
            value = resolve_value(root, &target)?;
            location = target;
        }
        Ok((value, location, pushed))
    }

    fn unwind(&mut self, pushed: usize) {
        let keep = self.active.len().saturating_sub(pushed);
        self.active.truncate(keep);
    }

    fn response_schema<'v>(&mut self, value: &'v Value, location: &Reference) -> Result<Schema, SchemaError>
    where
        'a: 'v,
    {
        let (response, at, pushed) = self.follow(value, location)?;
        let result = match response.get("schema") {
            Some(schema) => self.parse(schema, &at.child("schema")),
            None => Err(SchemaError::NoSchemaOnResponse {
                reference: at.as_str().to_string(),
            }),
        };
        self.unwind(pushed);
        result
    }

    fn parameter_schema<'v>(&mut self, value: &'v Value, location: &Reference) -> Result<Schema, SchemaError>
    where
        'a: 'v,
    {
        let (param, at, pushed) = self.follow(value, location)?;
        let result = if param.get("in").and_then(Value::as_str) == Some("body") {
            match param.get("schema") {
                Some(schema) => self.parse(schema, &at.child("schema")),
                None => Err(SchemaError::unsupported(
                    at.as_str(),
                    "body parameter without a schema",
                )),
            }
        } else {
            match param {
                Value::Object(map) => {
                    let stripped: Map<String, Value> = map
                        .iter()
                        .filter(|(k, _)| !PARAMETER_ONLY_KEYWORDS.contains(&k.as_str()))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    self.parse_object(&stripped, &at)
                }
                _ => Err(SchemaError::unsupported(at.as_str(), "parameter must be an object")),
            }
        };
        self.unwind(pushed);
        result
    }

    fn parse<'v>(&mut self, value: &'v Value, location: &Reference) -> Result<Schema, SchemaError>
    where
        'a: 'v,
    {
        let (value, at, pushed) = self.follow(value, location)?;
        let result = match value {
            Value::Object(map) => self.parse_object(map, &at),
            _ => Err(SchemaError::unsupported(at.as_str(), "schema must be an object")),
        };
        self.unwind(pushed);
        result
    }

    fn parse_object<'v>(&mut self, map: &'v Map<String, Value>, at: &Reference) -> Result<Schema, SchemaError>
    where
        'a: 'v,
    {
        let mut schema = Schema::default();

        for (key, value) in map {
            let here = at.child(key);
            match key.as_str() {
                "type" => {
                    let name = value.as_str().ok_or_else(|| {
                        SchemaError::unsupported(here.as_str(), "type must be a single type name")
                    })?;
                    let ty = SchemaType::parse(name).ok_or_else(|| {
                        SchemaError::unsupported(here.as_str(), format!("unknown type '{name}'"))
                    })?;
                    schema.schema_type = Some(ty);
                }
                "format" => schema.format = Some(string(value, &here)?.to_string()),
                "properties" => {
                    let props = value.as_object().ok_or_else(|| {
                        SchemaError::unsupported(here.as_str(), "properties must be a mapping")
                    })?;
                    let mut out = Properties::new();
                    for (name, sub) in props {
                        out.insert(name.clone(), self.parse(sub, &here.child(name))?);
                    }
                    schema.properties = out;
                }
                "required" => {
                    let names = value.as_array().ok_or_else(|| {
                        SchemaError::unsupported(here.as_str(), "required must be a list of names")
                    })?;
                    schema.required = names
                        .iter()
                        .map(|n| string(n, &here).map(str::to_string))
                        .collect::<Result<_, _>>()?;
                }
                "additionalProperties" => {
                    schema.additional_properties = match value {
                        Value::Bool(b) => AdditionalProperties::Allowed(*b),
                        Value::Object(_) => {
                            AdditionalProperties::Schema(Box::new(self.parse(value, &here)?))
                        }
                        _ => {
                            return Err(SchemaError::unsupported(
                                here.as_str(),
                                "additionalProperties must be a boolean or a schema",
                            ))
                        }
                    };
                }
                "items" => match value {
                    Value::Object(_) => schema.items = Some(Box::new(self.parse(value, &here)?)),
                    _ => {
                        return Err(SchemaError::unsupported(
                            here.as_str(),
                            "items must be a single schema",
                        ))
                    }
                },
                "enum" => {
                    let values = value
                        .as_array()
                        .ok_or_else(|| SchemaError::unsupported(here.as_str(), "enum must be a list"))?;
                    schema.enum_values = Some(values.clone());
                }
                "minimum" => schema.minimum = Some(number(value, &here)?),
                "maximum" => schema.maximum = Some(number(value, &here)?),
                "multipleOf" => {
                    let n = number(value, &here)?;
                    if n <= 0.0 {
                        return Err(SchemaError::unsupported(here.as_str(), "multipleOf must be positive"));
                    }
                    schema.multiple_of = Some(n);
                }
                "exclusiveMinimum" => schema.exclusive_minimum = boolean(value, &here)?,
                "exclusiveMaximum" => schema.exclusive_maximum = boolean(value, &here)?,
                "uniqueItems" => schema.unique_items = boolean(value, &here)?,
                "minLength" => schema.min_length = Some(count(value, &here)?),
                "maxLength" => schema.max_length = Some(count(value, &here)?),
                "minItems" => schema.min_items = Some(count(value, &here)?),
                "maxItems" => schema.max_items = Some(count(value, &here)?),
                "pattern" => {
                    let p = string(value, &here)?;
                    let compiled = Pattern::new(p).map_err(|e| {
                        SchemaError::unsupported(here.as_str(), format!("invalid pattern: {e}"))
                    })?;
                    schema.pattern = Some(compiled);
                }
                "allOf" | "anyOf" | "oneOf" | "not" => {
                    return Err(SchemaError::unsupported(
                        here.as_str(),
                        format!("'{key}' composition is not supported"),
                    ))
                }
                _ => {
                    schema.annotations.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(schema)
    }
}

/// The `$ref` target of `value`, if it is a reference object.
fn ref_target(value: &Value, location: &Reference) -> Result<Option<Reference>, SchemaError> {
    match value.get("$ref") {
        None => Ok(None),
        Some(Value::String(s)) => Reference::parse(s).map(Some),
        Some(_) => Err(SchemaError::unsupported(
            location.child("$ref").as_str(),
            "$ref must be a string",
        )),
    }
}

fn string<'v>(value: &'v Value, at: &Reference) -> Result<&'v str, SchemaError> {
    value
        .as_str()
        .ok_or_else(|| SchemaError::unsupported(at.as_str(), "expected a string"))
}

fn number(value: &Value, at: &Reference) -> Result<f64, SchemaError> {
    value
        .as_f64()
        .ok_or_else(|| SchemaError::unsupported(at.as_str(), "expected a number"))
}

fn count(value: &Value, at: &Reference) -> Result<u64, SchemaError> {
    value
        .as_u64()
        .ok_or_else(|| SchemaError::unsupported(at.as_str(), "expected a non-negative integer"))
}

fn boolean(value: &Value, at: &Reference) -> Result<bool, SchemaError> {
    value
        .as_bool()
        .ok_or_else(|| SchemaError::unsupported(at.as_str(), "expected a boolean"))
}
