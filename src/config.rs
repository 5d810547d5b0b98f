//! # Service Configuration
//!
//! Runtime settings read from the environment at startup.
//!
//! ### `USERAPI_STACK_SIZE`
//!
//! Stack size of the `may` coroutines that serve connections. Decimal (`32768`) or
//! hexadecimal (`0x8000`). Default `0x8000` (32 KB).
//!
//! ### `USERAPI_RESPONSE_VALIDATION`
//!
//! What to do when a handler's JSON body does not match the declared response
//! schema:
//! - `off`: skip the check
//! - `warn` (default): log the violations and send the response anyway
//! - `enforce`: replace the response with a 500 carrying the violations
//!
//! ### `USERAPI_SCHEMA_CACHE`
//!
//! `off`, `false` or `0` disables the materialized schema cache.

use std::fmt;

pub const DEFAULT_STACK_SIZE: usize = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseValidation {
    Off,
    #[default]
    Warn,
    Enforce,
}

impl ResponseValidation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "false" => Some(ResponseValidation::Off),
            "warn" => Some(ResponseValidation::Warn),
            "enforce" | "strict" => Some(ResponseValidation::Enforce),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseValidation::Off => "off",
            ResponseValidation::Warn => "warn",
            ResponseValidation::Enforce => "enforce",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub stack_size: usize,
    pub response_validation: ResponseValidation,
    pub schema_cache: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            response_validation: ResponseValidation::default(),
            schema_cache: true,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables. Unparseable values fall back
    /// to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            stack_size: lookup("USERAPI_STACK_SIZE")
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.stack_size),
            response_validation: lookup("USERAPI_RESPONSE_VALIDATION")
                .and_then(|v| ResponseValidation::parse(&v))
                .unwrap_or(defaults.response_validation),
            schema_cache: lookup("USERAPI_SCHEMA_CACHE")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "off" | "false" | "0"))
                .unwrap_or(defaults.schema_cache),
        }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}
