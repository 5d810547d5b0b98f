//! # CLI Module
//!
//! ```bash
//! # Serve the API on :8080
//! userspec serve --spec api/swagger.yaml
//!
//! # Show the routing table
//! userspec routes --spec api/swagger.yaml
//!
//! # Print a standalone schema, or validate a sample against it
//! userspec check --reference '#/definitions/User'
//! userspec check --reference '#/paths/~1user~1{username}/get/responses/200' \
//!     --instance '{"id":123,"username":"User1 Lastname"}'
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, Cli, Commands};
