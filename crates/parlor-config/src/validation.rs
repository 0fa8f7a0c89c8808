// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. A failing validation aborts the boot; background workers never
//! see a half-valid configuration.

use crate::diagnostic::ConfigError;
use crate::model::ParlorConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParlorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.sites.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.sites must name at least one site".to_string(),
        });
    }

    for site in &config.server.sites {
        if site.trim().is_empty() || site.contains(|c: char| c.is_whitespace() || c == '/') {
            errors.push(ConfigError::Validation {
                message: format!("site id `{site}` must be non-empty and contain no spaces or `/`"),
            });
        }
    }

    // The static admin store signs tokens and hashes IPs with this secret.
    if config.admin.kind == "static" && config.auth.secret.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "auth.secret must be set when admin.kind = \"static\"".to_string(),
        });
    }

    if config.admin.kind == "rpc" && config.admin.rpc_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "admin.rpc_url must be set when admin.kind = \"rpc\"".to_string(),
        });
    }

    if !matches!(config.admin.kind.as_str(), "static" | "rpc") {
        errors.push(ConfigError::Validation {
            message: format!("admin.kind must be `static` or `rpc`, got `{}`", config.admin.kind),
        });
    }

    if config.store.kind != "sqlite" {
        errors.push(ConfigError::Validation {
            message: format!("store.kind must be `sqlite`, got `{}`", config.store.kind),
        });
    }

    if config.store.path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "store.path must not be empty".to_string(),
        });
    }

    if !matches!(config.cache.kind.as_str(), "mem" | "none") {
        errors.push(ConfigError::Validation {
            message: format!("cache.kind must be `mem` or `none`, got `{}`", config.cache.kind),
        });
    }

    if config.cache.kind == "mem" {
        if config.cache.max_items == 0 || config.cache.max_size == 0 {
            errors.push(ConfigError::Validation {
                message: "cache.max_items and cache.max_size must be positive".to_string(),
            });
        }
        if config.cache.max_value > config.cache.max_size {
            errors.push(ConfigError::Validation {
                message: "cache.max_value cannot exceed cache.max_size".to_string(),
            });
        }
    }

    if !matches!(config.image.kind.as_str(), "fs" | "sqlite") {
        errors.push(ConfigError::Validation {
            message: format!("image.kind must be `fs` or `sqlite`, got `{}`", config.image.kind),
        });
    }

    if !matches!(config.avatar.kind.as_str(), "fs" | "sqlite") {
        errors.push(ConfigError::Validation {
            message: format!("avatar.kind must be `fs` or `sqlite`, got `{}`", config.avatar.kind),
        });
    }

    if config.limits.edit_time_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "limits.edit_time_secs must be positive".to_string(),
        });
    }

    if config.stream.refresh_secs == 0 || config.stream.max_active == 0 {
        errors.push(ConfigError::Validation {
            message: "stream.refresh_secs and stream.max_active must be positive".to_string(),
        });
    }

    if config.backup.max_files == 0 {
        errors.push(ConfigError::Validation {
            message: "backup.max_files must be positive".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
