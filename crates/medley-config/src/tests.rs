use std::collections::HashMap;
use std::io::Write;

use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.ums.rate_limit_window_ms, 900_000);
    assert_eq!(config.ums.rate_limit_max, 100);
    assert_eq!(config.rag.chunk_size, 500);
    assert_eq!(config.rag.chunk_overlap, 50);
    assert_eq!(config.rag.top_k, 3);
    assert_eq!(config.chat.page_size, 50);
    assert_eq!(config.chat.default_room, "general");
    assert!(config.ums.require_auth);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_fills_defaults() {
    let config = Config::from_toml(
        r#"
        [server]
        port = 9100

        [apps]
        rag = false

        [rag]
        top_k = 5
        embedder = "remote"
        "#,
    )
    .unwrap();

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.server.host, "0.0.0.0");
    assert!(config.apps.chat);
    assert!(!config.apps.rag);
    assert_eq!(config.rag.top_k, 5);
    assert_eq!(config.rag.embedder, EmbedderKind::Remote);
    assert_eq!(config.rag.chunk_size, 500);
}

#[test]
fn test_from_file_reads_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[ums]\nrate_limit_max = 7").unwrap();
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.ums.rate_limit_max, 7);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Config::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_env_overrides_apply() {
    let mut config = Config::default();
    config.apply_overrides(lookup_from(&[
        ("MEDLEY_PORT", "7000"),
        ("RATE_LIMIT_MAX", "3"),
        ("FRONTEND_URL", "https://ums.example.org"),
        ("UPLOAD_FOLDER", "/tmp/docs"),
        ("LLM_API_KEY", "gsk_test"),
        ("UMS_REQUIRE_AUTH", "false"),
    ]));
    assert_eq!(config.server.port, 7000);
    assert_eq!(config.ums.rate_limit_max, 3);
    assert_eq!(config.ums.frontend_url, "https://ums.example.org");
    assert_eq!(config.rag.upload_dir, PathBuf::from("/tmp/docs"));
    assert!(!config.ums.require_auth);
    assert_eq!(config.llm.api_key().unwrap().expose_secret(), "gsk_test");
}

#[test]
fn test_bad_env_value_keeps_previous() {
    let mut config = Config::default();
    config.apply_overrides(lookup_from(&[("MEDLEY_PORT", "not-a-port")]));
    assert_eq!(config.server.port, 8000);
}

#[test]
fn test_overlap_must_be_smaller_than_chunk() {
    let mut config = Config::default();
    config.rag.chunk_overlap = 500;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_debug_redacts_api_key() {
    let llm = LlmConfig { api_key: Some("gsk_secret".into()), ..LlmConfig::default() };
    let printed = format!("{llm:?}");
    assert!(!printed.contains("gsk_secret"));
    assert!(printed.contains("REDACTED"));
}

#[test]
fn test_api_key_loads_from_toml_as_secret() {
    let config = Config::from_toml("[llm]\napi_key = \"gsk_from_file\"").unwrap();
    let key: &SecretString = config.llm.api_key.as_ref().unwrap();
    assert_eq!(key.expose_secret(), "gsk_from_file");
    assert!(!format!("{config:?}").contains("gsk_from_file"));
}
