//! Schema validation helpers for Buddy JSON5 configuration.

use super::SchemaMode;
use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
///
/// Partial layers may omit anything; the effective config additionally must
/// not carry empty model names.
pub(super) fn validate_layer_schema(
    value: &Value,
    mode: SchemaMode,
    layer: &str,
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = ["$schema", "memory", "embedding", "generation", "server"];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("memory") {
        validate_memory(value, layer, "memory")?;
    }
    if let Some(value) = map.get("embedding") {
        validate_endpoint(value, &["base_url", "model", "timeout_secs"], layer, "embedding")?;
    }
    if let Some(value) = map.get("generation") {
        validate_endpoint(
            value,
            &["base_url", "model", "assistant_name", "timeout_secs"],
            layer,
            "generation",
        )?;
        if let Some(name) = value.get("assistant_name") {
            expect_string(name, layer, "generation.assistant_name")?;
        }
    }
    if let Some(value) = map.get("server") {
        validate_server(value, layer, "server")?;
    }

    if matches!(mode, SchemaMode::Full) {
        for section in ["embedding", "generation"] {
            let model = map
                .get(section)
                .and_then(|value| value.get("model"))
                .and_then(Value::as_str);
            if model.is_some_and(|model| model.trim().is_empty()) {
                return Err(invalid_field(
                    layer,
                    &join_path(section, "model"),
                    "must not be empty",
                ));
            }
        }
    }

    Ok(())
}

/// Validate the "memory" block.
fn validate_memory(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "path",
            "recall_k",
            "seed_text",
            "exclude_self_match",
            "label_speakers",
        ],
        layer,
        path,
    )?;

    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    if let Some(value) = map.get("recall_k") {
        expect_u64(value, layer, &join_path(path, "recall_k"))?;
    }
    if let Some(value) = map.get("seed_text") {
        expect_string(value, layer, &join_path(path, "seed_text"))?;
    }
    if let Some(value) = map.get("exclude_self_match") {
        expect_bool(value, layer, &join_path(path, "exclude_self_match"))?;
    }
    if let Some(value) = map.get("label_speakers") {
        expect_bool(value, layer, &join_path(path, "label_speakers"))?;
    }
    Ok(())
}

/// Validate an Ollama endpoint block ("embedding" or "generation").
fn validate_endpoint(
    value: &Value,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, allowed, layer, path)?;

    if let Some(value) = map.get("base_url") {
        expect_string(value, layer, &join_path(path, "base_url"))?;
    }
    if let Some(value) = map.get("model") {
        expect_string(value, layer, &join_path(path, "model"))?;
    }
    if let Some(value) = map.get("timeout_secs") {
        expect_u64(value, layer, &join_path(path, "timeout_secs"))?;
    }
    Ok(())
}

/// Validate the "server" block.
fn validate_server(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["bind"], layer, path)?;

    if let Some(value) = map.get("bind") {
        expect_string(value, layer, &join_path(path, "bind"))?;
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Value::Bool(_)) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Expect a non-negative JSON integer or return a typed error.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
pub(super) fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
