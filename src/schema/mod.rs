//! # Schema Module
//!
//! Reference resolution, materialization and validation of Swagger 2.0 schemas.
//!
//! The three stages are independent and connected only by plain values:
//!
//! 1. **[`pointer`]** follows a `#/...` [`Reference`] through a loaded
//!    [`Document`](crate::spec::Document) and returns a borrowed [`ResolvedNode`]
//!    tagged with its [`NodeKind`].
//! 2. **[`materialize`]** turns that node into a standalone [`Schema`], expanding
//!    nested `$ref`s and rejecting cycles.
//! 3. **[`validate`]** checks any JSON instance against a [`Schema`] and returns
//!    every [`ValidationError`] found.
//!
//! ```
//! use userspec::schema::{materialize, resolve_str, validate, ViolationKind};
//! use userspec::spec::Document;
//! use serde_json::json;
//!
//! let doc = Document::from_value(json!({
//!     "definitions": {
//!         "User": {
//!             "type": "object",
//!             "required": ["id", "username"],
//!             "properties": {
//!                 "id": { "type": "integer" },
//!                 "username": { "type": "string" }
//!             }
//!         }
//!     }
//! }));
//!
//! let node = resolve_str(&doc, "#/definitions/User").unwrap();
//! let schema = materialize(&doc, &node).unwrap();
//! let errors = validate(&schema, &json!({"id": 123, "username1": "User1 Lastname"}));
//!
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors[0].kind, ViolationKind::MissingRequired);
//! assert_eq!(errors[0].path.to_string(), "username");
//! ```

mod cache;
mod error;
mod materialize;
mod model;
mod pointer;
mod validate;

pub use cache::SchemaCache;
pub use error::SchemaError;
pub use materialize::{materialize, materialize_ref};
pub use model::{AdditionalProperties, Pattern, Properties, Schema, SchemaType};
pub use pointer::{resolve, resolve_str, NodeKind, Reference, ResolvedNode};
pub use validate::{validate, InstancePath, PathSegment, ValidationError, ViolationKind};
