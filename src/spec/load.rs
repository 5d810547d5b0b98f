use super::build::build_routes;
use super::types::{Document, RouteMeta, SpecVersion};
use anyhow::{anyhow, Context};
use serde_json::{Map, Number, Value};
use std::path::Path;
use tracing::info;

impl Document {
    /// Parse a YAML document. Non-string mapping keys (`200:`) become strings.
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(content).context("document is not valid YAML")?;
        let root = yaml_to_json(yaml)?;
        Ok(Self::with_version(root, SpecVersion::from_content(content.as_bytes())))
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        let root: Value = serde_json::from_str(content).context("document is not valid JSON")?;
        Ok(Self::with_version(root, SpecVersion::from_content(content.as_bytes())))
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Read a Swagger 2.0 document from disk; `.yaml`/`.yml` as YAML, anything else as JSON.
pub fn load_document(path: impl AsRef<Path>) -> anyhow::Result<Document> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let doc = if is_yaml(path) {
        Document::from_yaml_str(&content)
    } else {
        Document::from_json_str(&content)
    }
    .with_context(|| format!("failed to parse {}", path.display()))?;

    match doc.swagger_version() {
        Some("2.0") => {}
        Some(other) => anyhow::bail!("{}: unsupported swagger version '{other}'", path.display()),
        None => anyhow::bail!("{}: missing 'swagger: \"2.0\"' field", path.display()),
    }

    info!(
        path = %path.display(),
        title = doc.title().unwrap_or_default(),
        spec_version = %doc.version().to_key(),
        "Document loaded"
    );
    Ok(doc)
}

/// Load a document and derive its routes.
pub fn load_spec(path: impl AsRef<Path>) -> anyhow::Result<(Document, Vec<RouteMeta>)> {
    let doc = load_document(path)?;
    let routes = build_routes(&doc)?;
    Ok((doc, routes))
}

fn yaml_to_json(value: serde_yaml::Value) -> anyhow::Result<Value> {
    use serde_yaml::Value as Y;
    Ok(match value {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| anyhow!("non-finite number {f} is not representable in JSON"))?
            }
        }
        Y::String(s) => Value::String(s),
        Y::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<anyhow::Result<_>>()?,
        ),
        Y::Mapping(mapping) => {
            let mut out = Map::with_capacity(mapping.len());
            for (k, v) in mapping {
                let key = match k {
                    Y::String(s) => s,
                    Y::Number(n) => n.to_string(),
                    Y::Bool(b) => b.to_string(),
                    other => anyhow::bail!("unsupported mapping key {other:?}"),
                };
                out.insert(key, yaml_to_json(v)?);
            }
            Value::Object(out)
        }
        Y::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}
