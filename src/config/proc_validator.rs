//! Configuration validation with aggregated errors.
//! Every issue is collected into a `Vec<String>` so a broken config file
//! is reported in one pass instead of one error per run.

use reqwest::Url;
use tracing::{error, info};

use crate::config::settings::{ApiConfig, ClientConfig, SettingsConfig, StorageConfig, StorageKind};
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_client_config(cfg: &ClientConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    validate_api(&settings.api, errors);
    validate_storage(&settings.storage, errors);

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_api(api: &ApiConfig, errors: &mut Vec<String>) {
    let base_url = api.base_url.trim();
    if base_url.is_empty() {
        errors.push("settings.api.base_url cannot be empty".to_string());
    } else {
        match Url::parse(base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(format!(
                "settings.api.base_url '{}' must use http or https, got '{}'",
                base_url,
                url.scheme()
            )),
            Err(e) => errors.push(format!(
                "settings.api.base_url '{}' is not an absolute URL: {}",
                base_url, e
            )),
        }
    }

    if api.timeout_ms == Some(0) {
        errors.push("settings.api.timeout_ms must be > 0".to_string());
    }
    if api.refresh_timeout_ms == Some(0) {
        errors.push("settings.api.refresh_timeout_ms must be > 0".to_string());
    }
}

fn validate_storage(storage: &StorageConfig, errors: &mut Vec<String>) {
    if storage.namespace.trim().is_empty() {
        errors.push("settings.storage.namespace cannot be empty".to_string());
    }
    if storage.kind == StorageKind::File
        && storage.path.as_deref().map(str::trim).unwrap_or("").is_empty()
    {
        errors.push("settings.storage.path is required when storage kind is 'file'".to_string());
    }
}
