//! `#`-rooted JSON pointer references and their resolution against a [`Document`].
//!
//! A reference such as `#/paths/~1user~1{username}/get/responses/200` is split into
//! unescaped tokens (`paths`, `/user/{username}`, `get`, `responses`, `200`) which are
//! then followed one by one through the document tree. Resolution never copies or
//! mutates the document; the returned [`ResolvedNode`] borrows from it.

use super::error::SchemaError;
use crate::spec::Document;
use serde_json::Value;
use std::fmt;

/// A parsed `#/a/b/0` style reference.
///
/// Keeps the wire form (`raw`) for error messages and cache keys, and the unescaped
/// tokens for walking the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    raw: String,
    tokens: Vec<String>,
}

impl Reference {
    /// Parse a reference string.
    ///
    /// Only references into the current document are accepted: the string must start
    /// with `#`, and the fragment after it must be empty or start with `/`. Anything
    /// else (a file path, a URL, a named anchor) is [`SchemaError::UnsupportedReference`].
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        let unsupported = || SchemaError::UnsupportedReference {
            reference: raw.to_string(),
        };

        let fragment = raw.strip_prefix('#').ok_or_else(unsupported)?;
        if fragment.is_empty() {
            return Ok(Self {
                raw: raw.to_string(),
                tokens: Vec::new(),
            });
        }
        let rest = fragment.strip_prefix('/').ok_or_else(unsupported)?;
        let tokens = rest.split('/').map(unescape_token).collect();
        Ok(Self {
            raw: raw.to_string(),
            tokens,
        })
    }

    /// Build a reference from unescaped tokens, producing the escaped wire form.
    ///
    /// ```
    /// use userspec::schema::Reference;
    ///
    /// let r = Reference::from_tokens(["paths", "/user/{username}", "get"]);
    /// assert_eq!(r.as_str(), "#/paths/~1user~1{username}/get");
    /// ```
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut raw = String::from("#");
        for token in &tokens {
            raw.push('/');
            raw.push_str(&escape_token(token));
        }
        Self { raw, tokens }
    }

    /// The root reference `#`.
    pub fn root() -> Self {
        Self {
            raw: "#".to_string(),
            tokens: Vec::new(),
        }
    }

    /// Extend this reference by one unescaped token.
    #[must_use]
    pub fn child(&self, token: &str) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.to_string());
        let mut raw = self.raw.clone();
        raw.push('/');
        raw.push_str(&escape_token(token));
        Self { raw, tokens }
    }

    /// The escaped wire form.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The unescaped tokens, in order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Kind of node this reference points at, judged from its position in the
    /// document tree.
    ///
    /// Responses and parameters only exist at the top level, under a path item or
    /// under an operation. Below a schema every node is schema-positioned, so a
    /// property that happens to be named `responses` or `parameters` stays a schema.
    pub fn kind(&self) -> NodeKind {
        self.tokens
            .iter()
            .fold(Position::Root, |pos, token| pos.step(token))
            .kind()
    }
}

/// Where a walk from the root currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Root,
    Paths,
    PathItem,
    Operation,
    Parameters,
    Parameter,
    Responses,
    Response,
    Schema,
    SchemaMap,
    Other,
}

const OPERATION_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

impl Position {
    fn step(self, token: &str) -> Self {
        match (self, token) {
            (Position::Root, "paths") => Position::Paths,
            (Position::Root, "definitions") => Position::SchemaMap,
            (Position::Root | Position::PathItem | Position::Operation, "parameters") => {
                Position::Parameters
            }
            (Position::Root | Position::Operation, "responses") => Position::Responses,
            (Position::Paths, _) => Position::PathItem,
            (Position::PathItem, method) if OPERATION_METHODS.contains(&method) => Position::Operation,
            (Position::Parameters, _) => Position::Parameter,
            (Position::Responses, _) => Position::Response,
            (Position::Parameter, "schema" | "items") => Position::Schema,
            (Position::Response, "schema") => Position::Schema,
            (Position::Schema, "properties" | "definitions") => Position::SchemaMap,
            (Position::Schema, "items" | "additionalProperties" | "not") => Position::Schema,
            (Position::SchemaMap, _) => Position::Schema,
            _ => Position::Other,
        }
    }

    fn kind(self) -> NodeKind {
        match self {
            Position::Schema => NodeKind::Schema,
            Position::Response => NodeKind::Response,
            Position::Parameter => NodeKind::Parameter,
            _ => NodeKind::Other,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for Reference {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reference::parse(s)
    }
}

fn unescape_token(token: &str) -> String {
    // `~1` first, so that `~01` decodes to `~1` and not `/`
    token.replace("~1", "/").replace("~0", "~")
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// What a resolved node represents in a Swagger 2.0 document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Schema,
    Response,
    Parameter,
    Other,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Schema => "schema",
            NodeKind::Response => "response",
            NodeKind::Parameter => "parameter",
            NodeKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// A node found by following a [`Reference`], borrowed from the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNode<'a> {
    pub value: &'a Value,
    pub kind: NodeKind,
    pub reference: Reference,
}

/// Follow `reference` through `doc`.
///
/// Mapping steps are literal key lookups; sequence steps require a canonical
/// non-negative decimal index (`0`, `12`, never `01` or `-1`).
pub fn resolve<'a>(doc: &'a Document, reference: &Reference) -> Result<ResolvedNode<'a>, SchemaError> {
    let value = resolve_value(doc.root(), reference)?;
    Ok(ResolvedNode {
        value,
        kind: reference.kind(),
        reference: reference.clone(),
    })
}

/// Parse and resolve in one step.
pub fn resolve_str<'a>(doc: &'a Document, reference: &str) -> Result<ResolvedNode<'a>, SchemaError> {
    resolve(doc, &Reference::parse(reference)?)
}

pub(crate) fn resolve_value<'a>(root: &'a Value, reference: &Reference) -> Result<&'a Value, SchemaError> {
    let mut current = root;
    for token in reference.tokens() {
        current = match current {
            Value::Object(map) => map.get(token).ok_or_else(|| not_found(reference, token))?,
            Value::Array(items) => parse_index(token)
                .and_then(|i| items.get(i))
                .ok_or_else(|| not_found(reference, token))?,
            _ => {
                return Err(SchemaError::ReferenceTypeMismatch {
                    reference: reference.as_str().to_string(),
                    token: token.clone(),
                })
            }
        };
    }
    Ok(current)
}

fn not_found(reference: &Reference, token: &str) -> SchemaError {
    SchemaError::ReferenceNotFound {
        reference: reference.as_str().to_string(),
        token: token.to_string(),
    }
}

fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}
