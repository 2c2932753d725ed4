//! Config file read/write: main file plus an optional secrets overlay.

use crate::schema::ChatConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Main config file name within the config directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Secrets overlay, merged over the main file.
pub const SECRETS_FILE_NAME: &str = "secrets.yaml";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 3;

/// Resolve the config directory.
/// Priority: `CHATLOOM_CONFIG_DIR` env > `~/.chatloom/` > `./.chatloom/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHATLOOM_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".chatloom"),
        None => PathBuf::from(".chatloom"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

pub fn secrets_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SECRETS_FILE_NAME)
}

/// Read a YAML (or JSON) file into a generic value.
///
/// Returns `Ok(None)` if the file doesn't exist; an empty file reads as `{}`.
pub async fn load_value(path: &Path) -> Result<Option<Value>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config layer does not exist; skipping");
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(Some(Value::Object(Default::default())));
    }

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config layer");
    Ok(Some(value))
}

/// Merge the main config and secrets overlay for `config_dir` into one value.
pub async fn load_layers(config_dir: &Path) -> Result<Value> {
    let mut merged = load_value(&config_file_path(config_dir))
        .await?
        .unwrap_or_else(|| Value::Object(Default::default()));

    if let Some(secrets) = load_value(&secrets_file_path(config_dir)).await? {
        json_merge_patch(&mut merged, &secrets);
    }

    Ok(merged)
}

/// Write config to disk atomically (write to temp file, rename).
///
/// Creates a rolling backup of the previous config before overwriting.
pub async fn write_config(config: &ChatConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    if fs::try_exists(path).await.unwrap_or(false) {
        rotate_backups(path).await;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;

    fs::rename(&tmp_path, path).await.with_context(|| {
        format!("Failed to rename temp config to: {}", path.display())
    })?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

/// Rotate backup files: config.yaml.bak.1 → .bak.2 → ... → .bak.N
async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = path.with_extension(format!("yaml.bak.{i}"));
        let new = path.with_extension(format!("yaml.bak.{}", i + 1));
        if fs::try_exists(&old).await.unwrap_or(false) {
            if let Err(e) = fs::rename(&old, &new).await {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }

    let bak = path.with_extension("yaml.bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }
}

/// RFC 7396 JSON Merge Patch algorithm.
pub fn json_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target_map) = target {
        for (key, patch_val) in patch_map {
            if patch_val.is_null() {
                target_map.remove(key);
            } else {
                let entry = target_map.entry(key.clone()).or_insert(Value::Null);
                json_merge_patch(entry, patch_val);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ServiceConfig;
    use serde_json::json;

    async fn read_config(path: &Path) -> ChatConfig {
        let value = load_value(path).await.unwrap().unwrap();
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_patch_adds_key() {
        let mut base = json!({ "service": { "aiService": "OpenAI" } });
        json_merge_patch(&mut base, &json!({ "logging": { "level": "debug" } }));
        assert_eq!(base["logging"]["level"], "debug");
        assert_eq!(base["service"]["aiService"], "OpenAI");
    }

    #[test]
    fn test_merge_patch_removes_key() {
        let mut base = json!({ "application": { "useContext": false }, "logging": {} });
        json_merge_patch(&mut base, &json!({ "application": null }));
        assert!(base.get("application").is_none());
        assert!(base.get("logging").is_some());
    }

    #[tokio::test]
    async fn secrets_overlay_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            config_file_path(dir.path()),
            "service:\n  aiService: OpenAI\n  chatModelName: gpt-4o-mini\n  apiKey: placeholder\n",
        )
        .await
        .unwrap();
        fs::write(secrets_file_path(dir.path()), "service:\n  apiKey: sk-from-secrets\n")
            .await
            .unwrap();

        let merged = load_layers(dir.path()).await.unwrap();
        assert_eq!(merged["service"]["apiKey"], "sk-from-secrets");
        assert_eq!(merged["service"]["chatModelName"], "gpt-4o-mini");
    }

    #[tokio::test]
    async fn missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let merged = load_layers(dir.path()).await.unwrap();
        assert_eq!(merged, json!({}));
        assert!(load_value(&config_file_path(dir.path())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_load_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        let mut cfg = ChatConfig::default();
        cfg.service = Some(ServiceConfig {
            ai_service: Some("OpenAI".into()),
            ..Default::default()
        });

        write_config(&cfg, &path).await.unwrap();
        write_config(&ChatConfig::default(), &path).await.unwrap();

        assert_eq!(read_config(&path).await, ChatConfig::default());
        let backup = read_config(&path.with_extension("yaml.bak.1")).await;
        assert_eq!(backup, cfg);
    }

    #[tokio::test]
    async fn malformed_yaml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        fs::write(&path, "service: [unclosed").await.unwrap();
        let err = load_value(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("config.yaml"));
    }
}
