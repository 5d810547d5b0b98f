//! # Router Module
//!
//! Matches an HTTP method and path against the path templates of the loaded document
//! and extracts the template variables.
//!
//! Templates are compiled once at startup into anchored regexes: literal segments
//! match exactly, each `{name}` segment matches one non-empty path segment. A path
//! with a different segment count never matches.

mod core;
#[cfg(test)]
mod tests;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
