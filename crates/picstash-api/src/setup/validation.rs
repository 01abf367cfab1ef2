//! Configuration validation
//!
//! Validates critical configuration values at startup to catch
//! misconfigurations early.

use anyhow::Result;
use picstash_core::Config;

/// Validate critical configuration values
///
/// Fails fast on values that would cause security problems or runtime
/// errors once traffic arrives.
pub fn validate_config(config: &Config) -> Result<()> {
    // Validate production mode detection
    let is_production = config.is_production();
    let env_var = std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .ok();

    if is_production && env_var.is_none() {
        tracing::warn!(
            "Production mode detected but ENVIRONMENT/APP_ENV not set - error details may leak"
        );
    }

    // Validate CORS configuration in production
    if is_production {
        let cors_origins = config.cors_origins();
        if cors_origins.contains(&"*".to_string()) {
            return Err(anyhow::anyhow!(
                "CORS configured to allow all origins (*) in production - this is a security risk. \
                Please set specific allowed origins via CORS_ORIGINS environment variable."
            ));
        }
    }

    if config.db_max_connections() == 0 {
        return Err(anyhow::anyhow!(
            "DB_MAX_CONNECTIONS must be at least 1 (got 0)"
        ));
    }

    if config.db_timeout_seconds() == 0 {
        return Err(anyhow::anyhow!(
            "DB_TIMEOUT_SECONDS must be at least 1 (got 0)"
        ));
    }

    if config.task_queue_max_workers() == 0 {
        return Err(anyhow::anyhow!(
            "WORKER_CONCURRENCY must be at least 1 (got 0)"
        ));
    }

    if config.allowed_content_types().is_empty() {
        return Err(anyhow::anyhow!(
            "ALLOWED_CONTENT_TYPES must list at least one content type"
        ));
    }

    // Zero means unlimited, which is valid but worth calling out.
    if config.max_file_size_bytes() == 0 {
        tracing::info!("MAX_FILE_SIZE_BYTES is 0 - upload size is unlimited");
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}
