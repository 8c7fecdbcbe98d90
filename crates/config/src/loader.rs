use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::ParrotConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["parrot.toml", "parrot.yaml", "parrot.yml", "parrot.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ParrotConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./parrot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/parrot/parrot.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ParrotConfig::default()` if no config file is found.
pub fn discover_and_load() -> ParrotConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ParrotConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/parrot/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "parrot") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/parrot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "parrot").map(|d| d.config_dir().to_path_buf())
}

/// Returns the platform data directory for logs and state.
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "parrot").map(|d| d.data_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parrot.toml")
}

/// Serialize `config` to TOML and write it to `path`.
///
/// Creates parent directories if needed.
pub fn save_config(config: &ParrotConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

/// Write the server URL and token obtained from registration back to the
/// config file at `path`, preserving everything else in it.
///
/// Only called after registration succeeds; a failed registration must not
/// mutate stored state.
pub fn persist_credentials(path: &Path, server_url: &str, token: &str) -> anyhow::Result<()> {
    let mut config = if path.exists() {
        load_config(path)?
    } else {
        ParrotConfig::default()
    };
    config.server.url = Some(server_url.to_owned());
    config.server.token = Some(token.to_owned());
    save_config(&config, path)
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ParrotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parrot.toml");
        std::fs::write(&path, "[web]\nport = 4000\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.web.port, 4000);
        assert_eq!(cfg.web.bind, "127.0.0.1");
    }

    #[test]
    fn loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parrot.json");
        std::fs::write(&path, r#"{"sync": {"interval_secs": 9}}"#).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.sync.interval_secs, 9);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parrot.ini");
        std::fs::write(&path, "nope").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("parrot.toml");

        let mut cfg = ParrotConfig::default();
        cfg.watch.channels = vec!["chan-a".into()];
        save_config(&cfg, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.watch.channels, vec!["chan-a"]);
    }

    #[test]
    fn persist_credentials_writes_url_and_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parrot.toml");
        std::fs::write(&path, "[sync]\ninterval_secs = 3\n").unwrap();

        persist_credentials(&path, "https://chat.example.com", "abc").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.url.as_deref(), Some("https://chat.example.com"));
        assert_eq!(cfg.server.token.as_deref(), Some("abc"));
        // pre-existing settings survive the write-back
        assert_eq!(cfg.sync.interval_secs, 3);
    }

    #[test]
    fn persist_credentials_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parrot.toml");

        persist_credentials(&path, "https://chat.example.com", "tok").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.token.as_deref(), Some("tok"));
    }
}
