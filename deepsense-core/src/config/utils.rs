//! Configuration utility functions
//!
//! This module provides helper functions for reading configuration
//! overrides from environment variables.

use std::path::PathBuf;

/// Get an optional string value from an environment variable. Empty values
/// count as unset.
pub fn get_env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|val| !val.trim().is_empty())
}

/// Get an optional path value from an environment variable
pub fn get_env_path(key: &str) -> Option<PathBuf> {
    get_env_string(key).map(PathBuf::from)
}

/// Get a boolean value from an environment variable or use the default
pub fn get_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => val.to_lowercase() == "true" || val == "1",
        Err(_) => default,
    }
}

/// Get a u32 value from an environment variable or use the default
pub fn get_env_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a u64 value from an environment variable, if present and valid
pub fn get_env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|val| val.parse().ok())
}

/// Get a usize value from an environment variable or use the default
pub fn get_env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}
