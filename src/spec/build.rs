use super::types::{Document, ParameterLocation, ParameterMeta, RouteMeta};
use crate::schema::Reference;
use http::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

const METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

/// A problem found while deriving routes from a document.
#[derive(Debug, Clone)]
pub struct DocumentIssue {
    pub location: String,
    pub kind: &'static str,
    pub message: String,
}

impl DocumentIssue {
    fn new(location: impl Into<String>, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DocumentIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Reference to the response declared for `status` on `method template`.
///
/// ```
/// use userspec::spec::response_reference;
///
/// let r = response_reference("/user/{username}", "GET", "200");
/// assert_eq!(r.as_str(), "#/paths/~1user~1{username}/get/responses/200");
/// ```
pub fn response_reference(template: &str, method: &str, status: &str) -> Reference {
    let method = method.to_ascii_lowercase();
    Reference::from_tokens(["paths", template, method.as_str(), "responses", status])
}

/// `x-handler*` extension if present, otherwise `operationId`.
fn resolve_handler_name(
    operation: &Map<String, Value>,
    location: &str,
    issues: &mut Vec<DocumentIssue>,
) -> Option<String> {
    operation
        .iter()
        .find_map(|(key, val)| match val {
            Value::String(s) if key.starts_with("x-handler") => Some(s.clone()),
            _ => None,
        })
        .or_else(|| {
            operation
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or_else(|| {
            issues.push(DocumentIssue::new(
                location,
                "MissingHandler",
                "Missing operationId or x-handler-* extension",
            ));
            None
        })
}

/// Collect parameters declared at `base`, following `#/parameters/...` references.
fn extract_parameters(
    doc: &Document,
    params: Option<&Value>,
    base: &Reference,
    location: &str,
    issues: &mut Vec<DocumentIssue>,
) -> Vec<ParameterMeta> {
    let Some(Value::Array(items)) = params else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let declared = base.child(&idx.to_string());
        let (param, reference) = match item.get("$ref").and_then(Value::as_str) {
            Some(target) => match Reference::parse(target).and_then(|r| {
                crate::schema::resolve(doc, &r).map(|node| (node.value, r.clone()))
            }) {
                Ok(found) => found,
                Err(e) => {
                    issues.push(DocumentIssue::new(location, "BadParameterRef", e.to_string()));
                    continue;
                }
            },
            None => (item, declared),
        };

        let name = param.get("name").and_then(Value::as_str);
        let loc = param
            .get("in")
            .and_then(Value::as_str)
            .and_then(ParameterLocation::parse);
        match (name, loc) {
            (Some(name), Some(location_kind)) => out.push(ParameterMeta {
                name: name.to_string(),
                location: location_kind,
                required: location_kind == ParameterLocation::Path
                    || param.get("required").and_then(Value::as_bool).unwrap_or(false),
                reference,
            }),
            _ => issues.push(DocumentIssue::new(
                location,
                "InvalidParameter",
                format!("parameter {idx} needs a name and a valid 'in'"),
            )),
        }
    }
    out
}

/// Operation parameters override path-level ones with the same name and location.
fn merge_parameters(path_level: Vec<ParameterMeta>, op_level: Vec<ParameterMeta>) -> Vec<ParameterMeta> {
    let mut merged: Vec<ParameterMeta> = path_level
        .into_iter()
        .filter(|p| {
            !op_level
                .iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .collect();
    merged.extend(op_level);
    merged
}

fn extract_responses(
    operation: &Map<String, Value>,
    template: &str,
    method: &str,
    location: &str,
    issues: &mut Vec<DocumentIssue>,
) -> (Vec<(u16, Reference)>, Option<Reference>) {
    let mut responses = Vec::new();
    let mut default = None;
    let Some(Value::Object(map)) = operation.get("responses") else {
        issues.push(DocumentIssue::new(location, "MissingResponses", "operation declares no responses"));
        return (responses, default);
    };
    for status in map.keys() {
        let reference = response_reference(template, method, status);
        if status == "default" {
            default = Some(reference);
        } else if let Ok(code) = status.parse::<u16>() {
            responses.push((code, reference));
        } else if !status.starts_with("x-") {
            issues.push(DocumentIssue::new(
                location,
                "InvalidStatus",
                format!("'{status}' is not a status code"),
            ));
        }
    }
    responses.sort_by_key(|(code, _)| *code);
    (responses, default)
}

/// Derive route metadata for every operation under `paths`.
///
/// All problems are collected first and reported together.
pub fn build_routes(doc: &Document) -> anyhow::Result<Vec<RouteMeta>> {
    let mut routes = Vec::new();
    let mut issues = Vec::new();
    let base_path = doc.base_path();

    let Some(Value::Object(paths)) = doc.root().get("paths") else {
        return Ok(routes);
    };

    for (template, item) in paths {
        let Value::Object(item) = item else {
            issues.push(DocumentIssue::new(template.as_str(), "InvalidPathItem", "path item must be a mapping"));
            continue;
        };
        let path_ref = Reference::from_tokens(["paths", template.as_str()]);
        let path_params = extract_parameters(
            doc,
            item.get("parameters"),
            &path_ref.child("parameters"),
            template,
            &mut issues,
        );

        for (method_str, operation) in item {
            if !METHODS.contains(&method_str.as_str()) {
                continue;
            }
            let location = format!("{template} → {method_str}");
            let Value::Object(operation) = operation else {
                issues.push(DocumentIssue::new(location, "InvalidOperation", "operation must be a mapping"));
                continue;
            };
            let Ok(method) = Method::from_bytes(method_str.to_ascii_uppercase().as_bytes()) else {
                continue;
            };

            let handler_name = match resolve_handler_name(operation, &location, &mut issues) {
                Some(name) => name,
                None => continue,
            };

            let op_ref = path_ref.child(method_str);
            let op_params = extract_parameters(
                doc,
                operation.get("parameters"),
                &op_ref.child("parameters"),
                &location,
                &mut issues,
            );
            let parameters = merge_parameters(path_params.clone(), op_params);

            let body = parameters
                .iter()
                .find(|p| p.location == ParameterLocation::Body);
            let request_body = body.map(|p| p.reference.clone());
            let request_body_required = body.is_some_and(|p| p.required);

            let (responses, default_response) =
                extract_responses(operation, template, method_str, &location, &mut issues);

            debug!(
                method = %method,
                path = %template,
                handler = %handler_name,
                parameters = parameters.len(),
                responses = responses.len(),
                "Route derived"
            );

            routes.push(RouteMeta {
                method,
                path_pattern: Arc::from(template.as_str()),
                base_path: base_path.clone(),
                handler_name: Arc::from(handler_name.as_str()),
                parameters,
                request_body,
                request_body_required,
                responses,
                default_response,
            });
        }
    }

    if !issues.is_empty() {
        let report: Vec<String> = issues.iter().map(ToString::to_string).collect();
        anyhow::bail!(
            "document validation failed, {} issue(s) found:\n{}",
            issues.len(),
            report.join("\n")
        );
    }
    Ok(routes)
}
