//! # Dispatcher Module
//!
//! Maps handler names to handler functions and invokes them for matched routes.
//!
//! The [`Router`](crate::router::Router) decides *which* operation a request is
//! for; the dispatcher owns *what runs*. Handlers are plain functions from
//! [`HandlerRequest`] to [`HandlerResponse`] registered at startup:
//!
//! ```
//! use userspec::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register_handler("logoutUser", |_req: HandlerRequest| HandlerResponse::empty(200));
//! assert!(dispatcher.has_handler("logoutUser"));
//! ```

mod core;

pub use core::{
    Dispatcher, Handler, HandlerRequest, HandlerResponse, HeaderVec, RequestId, JSON_CONTENT_TYPE,
    MAX_INLINE_HEADERS,
};
