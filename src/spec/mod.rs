//! Swagger 2.0 document loading and route derivation.
mod build;
mod load;
mod types;

pub use build::*;
pub use load::*;
pub use types::*;
