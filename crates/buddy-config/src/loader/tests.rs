//! Tests for layered configuration loading.

use super::*;
use crate::{EmbeddingConfig, GenerationConfig, MemoryConfig, ServerConfig};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Options that only see layers under the temp root.
fn isolated_options(cwd: &Path) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::new(cwd);
    options.system_config_path = None;
    options.user_config_path = None;
    options
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = BuddyConfig::load_from_str("{}").expect("config");
    assert_eq!(config, BuddyConfig::default());
    assert_eq!(config.memory.recall_k, 10);
    assert_eq!(config.memory.seed_text, "initial memory");
    assert!(!config.memory.exclude_self_match);
    assert_eq!(config.embedding.model, "nomic-embed-text");
    assert_eq!(config.generation.model, "phi3:mini");
    assert_eq!(config.generation.assistant_name, "BuddyAI");
    assert_eq!(config.server.bind, "127.0.0.1:8000");
}

/// JSON5 comments and trailing commas are accepted.
#[test]
fn parse_json5_features() {
    let json5 = r#"{
        // tuned for a small laptop
        memory: { recall_k: 4, exclude_self_match: true, },
        generation: { model: "llama3.2", },
    }"#;
    let config = BuddyConfig::load_from_str(json5).expect("config");
    assert_eq!(config.memory.recall_k, 4);
    assert!(config.memory.exclude_self_match);
    assert_eq!(config.generation.model, "llama3.2");
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = BuddyConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("unknown key"));
}

/// Reject wrongly typed values with a path-qualified error.
#[test]
fn rejects_wrongly_typed_value() {
    let err = BuddyConfig::load_from_str(r#"{ memory: { recall_k: "ten" } }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("memory.recall_k"));
}

/// Reject a zero recall depth.
#[test]
fn rejects_zero_recall_k() {
    let err = BuddyConfig::load_from_str(r#"{ memory: { recall_k: 0 } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidField { ref path, .. } if path == "memory.recall_k"));
}

/// Reject empty model names and non-http endpoints.
#[test]
fn rejects_invalid_endpoints() {
    let err = BuddyConfig::load_from_str(r#"{ embedding: { model: " " } }"#).unwrap_err();
    assert!(format!("{err}").contains("embedding.model"));

    let err =
        BuddyConfig::load_from_str(r#"{ generation: { base_url: "localhost:11434" } }"#)
            .unwrap_err();
    assert!(format!("{err}").contains("generation.base_url"));
}

/// Reject bind addresses that are not socket addresses.
#[test]
fn rejects_invalid_bind() {
    let err = BuddyConfig::load_from_str(r#"{ server: { bind: "everywhere" } }"#).unwrap_err();
    assert!(format!("{err}").contains("server.bind"));
}

/// A configured memory path is used verbatim.
#[test]
fn memory_path_prefers_configured_value() {
    let config = BuddyConfig::load_from_str(r#"{ memory: { path: "/tmp/buddy/memory.jsonl" } }"#)
        .expect("config");
    assert_eq!(
        config.memory_path().expect("path"),
        PathBuf::from("/tmp/buddy/memory.jsonl")
    );
}

/// Ensure cwd config takes precedence over project, user and system config.
#[test]
fn layered_config_prefers_cwd_over_project() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let system_config = root.join("system.json5");
    write_json5(&system_config, "{ memory: { seed_text: \"system\" } }");
    let user_config = root.join("user.json5");
    write_json5(&user_config, "{ memory: { seed_text: \"user\", recall_k: 3 } }");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ memory: { seed_text: \"project\" } }",
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ memory: { seed_text: \"cwd\" } }",
    );

    let mut options = isolated_options(&cwd);
    options.system_config_path = Some(system_config);
    options.user_config_path = Some(user_config);

    let layered = BuddyConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.memory.seed_text, "cwd");
    assert_eq!(layered.config.memory.recall_k, 3);
    let sources: Vec<ConfigLayerSource> =
        layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::System,
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd,
        ]
    );
}

/// Project and cwd pointing at the same file load once.
#[test]
fn project_root_cwd_is_loaded_once() {
    let temp = TempDir::new().expect("tmp");
    let project_root = temp.path().join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ server: { bind: \"0.0.0.0:9000\" } }",
    );

    let layered =
        BuddyConfig::load_layered_with_options(isolated_options(&project_root)).expect("layered");
    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.config.server.bind, "0.0.0.0:9000");
}

#[test]
fn runtime_override_wins() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");
    fs::create_dir_all(&cwd).expect("cwd");
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ generation: { model: \"cwd-model\" } }",
    );
    let runtime_config = root.join("runtime.json5");
    write_json5(&runtime_config, "{ generation: { model: \"runtime-model\" } }");

    let options = isolated_options(&cwd).with_runtime_path(&runtime_config);
    let layered = BuddyConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.generation.model, "runtime-model");
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options = isolated_options(temp.path()).with_runtime_path(temp.path().join("absent.json5"));
    let err = BuddyConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}

/// Schema errors name the offending layer.
#[test]
fn layer_errors_carry_layer_label() {
    let temp = TempDir::new().expect("tmp");
    let cwd = temp.path();
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ server: { port: 8000 } }");

    let err = BuddyConfig::load_layered_with_options(isolated_options(cwd)).unwrap_err();
    let ConfigError::InvalidField { path, message } = err else {
        panic!("unexpected error: {err}");
    };
    assert!(path.starts_with("cwd("));
    assert!(path.ends_with(":server.port"));
    assert_eq!(message, "unknown key");
}

/// A single file loads without layering and applies defaults.
#[test]
fn load_from_path_reads_single_file() {
    let temp = TempDir::new().expect("tmp");
    let path = temp.path().join("solo.json5");
    write_json5(&path, "{ memory: { label_speakers: true } }");

    let config = BuddyConfig::load_from_path(&path).expect("config");
    assert!(config.memory.label_speakers);
    assert_eq!(config.memory.recall_k, 10);
}

/// The default layer stack picks up a cwd config.
#[test]
fn load_layered_uses_cwd_layer() {
    let temp = TempDir::new().expect("tmp");
    write_json5(
        &temp.path().join(DEFAULT_CONFIG_FILE),
        "{ generation: { assistant_name: \"Pal\" } }",
    );

    let layered = BuddyConfig::load_layered(temp.path()).expect("layered");
    assert_eq!(layered.config.generation.assistant_name, "Pal");
    assert_eq!(
        layered.layers.last().map(|layer| layer.source),
        Some(ConfigLayerSource::Cwd)
    );
}

/// Programmatic configs match their parsed equivalent.
#[test]
fn builder_matches_parsed_config() {
    let built = BuddyConfig::builder()
        .memory(MemoryConfig {
            recall_k: 4,
            label_speakers: true,
            ..MemoryConfig::default()
        })
        .generation(GenerationConfig {
            model: "llama3.2".to_string(),
            ..GenerationConfig::default()
        })
        .embedding(EmbeddingConfig::default())
        .server(ServerConfig {
            bind: "0.0.0.0:9000".to_string(),
        })
        .build();

    let parsed = BuddyConfig::load_from_str(
        r#"{
            memory: { recall_k: 4, label_speakers: true },
            generation: { model: "llama3.2" },
            server: { bind: "0.0.0.0:9000" },
        }"#,
    )
    .expect("config");
    assert_eq!(built, parsed);
}
