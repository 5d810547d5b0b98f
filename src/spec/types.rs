use crate::schema::Reference;
use http::Method;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Identity of one loaded document.
///
/// `version` increases with every document built in this process; `hash` is the
/// first 16 hex characters of the SHA-256 of the document content. Together they
/// key the [`SchemaCache`](crate::schema::SchemaCache).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecVersion {
    pub version: u64,
    pub hash: String,
}

impl SpecVersion {
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        let hash = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
        Self {
            version: NEXT_VERSION.fetch_add(1, Ordering::Relaxed),
            hash,
        }
    }

    pub fn to_key(&self) -> String {
        format!("v{}:{}", self.version, self.hash)
    }
}

/// A parsed Swagger 2.0 document.
///
/// The tree mirrors the source file exactly, key order included. It is never
/// mutated after construction; share it behind `Arc`.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
    version: SpecVersion,
}

impl Document {
    pub fn from_value(root: Value) -> Self {
        let content = serde_json::to_vec(&root).unwrap_or_default();
        Self {
            version: SpecVersion::from_content(&content),
            root,
        }
    }

    pub(crate) fn with_version(root: Value, version: SpecVersion) -> Self {
        Self { root, version }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn version(&self) -> &SpecVersion {
        &self.version
    }

    /// The `swagger` field, `"2.0"` for supported documents.
    pub fn swagger_version(&self) -> Option<&str> {
        self.root.get("swagger").and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.root
            .get("info")
            .and_then(|i| i.get("title"))
            .and_then(Value::as_str)
    }

    /// `basePath` without a trailing slash; empty when absent or `/`.
    pub fn base_path(&self) -> String {
        let raw = self
            .root
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    FormData,
}

impl ParameterLocation {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "path" => ParameterLocation::Path,
            "query" => ParameterLocation::Query,
            "header" => ParameterLocation::Header,
            "body" => ParameterLocation::Body,
            "formData" => ParameterLocation::FormData,
            _ => return None,
        })
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Body => write!(f, "body"),
            ParameterLocation::FormData => write!(f, "formData"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// Where the parameter is declared, e.g. `#/paths/~1user/post/parameters/0`.
    pub reference: Reference,
}

#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    /// Template as written under `paths`, without the base path.
    pub path_pattern: Arc<str>,
    pub base_path: String,
    pub handler_name: Arc<str>,
    pub parameters: Vec<ParameterMeta>,
    /// The `in: body` parameter, if the operation takes one.
    pub request_body: Option<Reference>,
    pub request_body_required: bool,
    /// Response references by status code, ascending.
    pub responses: Vec<(u16, Reference)>,
    pub default_response: Option<Reference>,
}

impl RouteMeta {
    /// Base path and template joined; this is what the router matches.
    pub fn full_path(&self) -> String {
        format!("{}{}", self.base_path, self.path_pattern)
    }

    /// The declared response for `status`, falling back to `default`.
    pub fn response_for(&self, status: u16) -> Option<&Reference> {
        self.responses
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, r)| r)
            .or(self.default_response.as_ref())
    }
}
