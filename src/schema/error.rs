use thiserror::Error;

/// Structural errors raised while resolving or materializing a schema.
///
/// Every variant carries the reference (or location) that failed so a malformed
/// document can be diagnosed from the message alone. None of these are transient:
/// they describe the document, not the environment, and retrying will not help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A key or index named by the reference does not exist.
    #[error("reference '{reference}' not found: no entry for token '{token}'")]
    ReferenceNotFound {
        /// The reference being resolved.
        reference: String,
        /// The (unescaped) token that could not be found.
        token: String,
    },

    /// The reference tried to step into a scalar value.
    #[error("reference '{reference}' cannot descend into a scalar at token '{token}'")]
    ReferenceTypeMismatch {
        /// The reference being resolved.
        reference: String,
        /// The (unescaped) token that required a mapping or sequence.
        token: String,
    },

    /// The reference is not rooted at `#` in the current document.
    #[error("unsupported reference '{reference}': only '#/...' references into the loaded document are resolved")]
    UnsupportedReference {
        /// The rejected reference.
        reference: String,
    },

    /// Expanding the reference leads back to itself.
    #[error("cyclic reference '{reference}' (expansion path: {})", .chain.join(" -> "))]
    CyclicReference {
        /// The reference that closed the cycle.
        reference: String,
        /// References on the active expansion path, outermost first.
        chain: Vec<String>,
    },

    /// A response object declares no `schema`.
    #[error("response at '{reference}' has no schema")]
    NoSchemaOnResponse {
        /// Reference of the response node.
        reference: String,
    },

    /// The schema uses a keyword or value shape outside the supported subset.
    #[error("unsupported schema construct at '{location}': {detail}")]
    UnsupportedSchemaConstruct {
        /// Reference (plus keyword path) of the offending schema node.
        location: String,
        /// What was wrong.
        detail: String,
    },
}

impl SchemaError {
    pub(crate) fn unsupported(location: impl Into<String>, detail: impl Into<String>) -> Self {
        SchemaError::UnsupportedSchemaConstruct {
            location: location.into(),
            detail: detail.into(),
        }
    }
}
