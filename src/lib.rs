//! # userspec
//!
//! A user API whose contract is a [Swagger 2.0](https://swagger.io/specification/v2/)
//! document, built around an engine that finds schemas inside that document by
//! reference, turns them into standalone values, and validates JSON against them.
//!
//! ## Architecture
//!
//! - **[`schema`]** - the core: reference resolution ([`schema::resolve`]),
//!   materialization ([`schema::materialize`]), validation ([`schema::validate`]) and a
//!   per-document cache of materialized schemas
//! - **[`spec`]** - loading YAML/JSON documents and deriving route metadata
//! - **[`router`]** - regex-based path template matching
//! - **[`dispatcher`]** - handler registry and invocation
//! - **[`handlers`]** - the eight `user` operations over a lock-guarded store
//! - **[`server`]** - the `may_minihttp` service tying the above together
//! - **[`config`]**, **[`logging`]**, **[`cli`]** - runtime settings, tracing setup
//!   and the command line
//!
//! ### Request flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as server::AppService
//!     participant Router as router::Router
//!     participant Cache as schema::SchemaCache
//!     participant Dispatcher as dispatcher::Dispatcher
//!     participant Handler as handlers
//!
//!     Client->>Service: PUT /v2/user/user1
//!     Service->>Router: route(PUT, "/v2/user/user1")
//!     Router-->>Service: RouteMatch { username = "user1" }
//!     Service->>Cache: body parameter schema
//!     Cache-->>Service: Arc<Schema>
//!     Service->>Service: validate(body)
//!     Service->>Dispatcher: dispatch(route_match, body)
//!     Dispatcher->>Handler: updateUser(request)
//!     Handler-->>Dispatcher: HandlerResponse
//!     Dispatcher-->>Service: HandlerResponse
//!     Service->>Cache: response schema for status
//!     Service->>Service: validate(response body)
//!     Service-->>Client: 200 OK
//! ```
//!
//! ## Quick start
//!
//! ```bash
//! cargo run -- serve --spec api/swagger.yaml --addr 127.0.0.1:8080
//! curl http://127.0.0.1:8080/v2/user/user1
//! ```
//!
//! ## Using the schema engine directly
//!
//! ```
//! use userspec::schema::{materialize, resolve_str, validate};
//! use userspec::spec::Document;
//! use serde_json::json;
//!
//! let doc = Document::from_value(json!({
//!     "swagger": "2.0",
//!     "definitions": {
//!         "User": {
//!             "type": "object",
//!             "required": ["id", "username"],
//!             "properties": {
//!                 "id": { "type": "integer", "format": "int64" },
//!                 "username": { "type": "string" }
//!             }
//!         }
//!     },
//!     "paths": {
//!         "/user/{username}": { "get": { "responses": {
//!             "200": { "description": "ok", "schema": { "$ref": "#/definitions/User" } }
//!         } } }
//!     }
//! }));
//!
//! let node = resolve_str(&doc, "#/paths/~1user~1{username}/get/responses/200").unwrap();
//! let schema = materialize(&doc, &node).unwrap();
//! assert!(validate(&schema, &json!({"id": 123, "username": "User1 Lastname"})).is_empty());
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod logging;
pub mod router;
pub mod schema;
pub mod server;
pub mod spec;

pub use spec::{load_document, load_spec, Document, RouteMeta};
