use anyhow::{Context, Result};
use directories::ProjectDirs;
use fitmeal_core::password::HashParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_WGER_URL: &str = "https://wger.de/api/v2";
pub const DEFAULT_MEALDB_URL: &str = "https://www.themealdb.com/api/json/v1/1";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub upstream: UpstreamConfig,
    pub hashing: HashParams,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    pub wger_url: String,
    pub mealdb_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            wger_url: DEFAULT_WGER_URL.to_string(),
            mealdb_url: DEFAULT_MEALDB_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// What the bootstrap does with the reference-data sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Run the catalog sync before every command.
    pub on_startup: bool,
    /// Refuse to start when the sync fails, instead of carrying on with
    /// whatever reference data is already stored.
    pub required: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            on_startup: true,
            required: false,
        }
    }
}

/// On-disk `config.toml`. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    database: DatabaseSection,
    upstream: UpstreamConfig,
    hashing: HashParams,
    sync: SyncConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DatabaseSection {
    path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "fitmeal").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let config_path = std::env::var_os("FITMEAL_CONFIG")
            .map_or_else(|| proj_dirs.config_dir().join("config.toml"), PathBuf::from);

        Self::from_sources(&data_dir, &config_path, |key| std::env::var(key).ok())
    }

    /// Layering, lowest to highest: built-in defaults, `config_path` (if it
    /// exists), then environment variables looked up through `env`.
    pub fn from_sources(
        data_dir: &Path,
        config_path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = if config_path.exists() {
            let text = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            tracing::debug!(path = %config_path.display(), "loaded config file");
            toml::from_str::<FileConfig>(&text)
                .with_context(|| format!("Invalid config: {}", config_path.display()))?
        } else {
            FileConfig::default()
        };

        let mut upstream = file.upstream;
        if let Some(url) = env("FITMEAL_WGER_URL") {
            upstream.wger_url = url;
        }
        if let Some(url) = env("FITMEAL_MEALDB_URL") {
            upstream.mealdb_url = url;
        }

        let db_path = env("FITMEAL_DB")
            .map(PathBuf::from)
            .or(file.database.path)
            .unwrap_or_else(|| data_dir.join("fitmeal.db"));

        Ok(Config {
            db_path,
            upstream,
            hashing: file.hashing,
            sync: file.sync,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            Config::from_sources(dir.path(), &dir.path().join("missing.toml"), no_env)
                .unwrap();

        assert_eq!(config.db_path, dir.path().join("fitmeal.db"));
        assert_eq!(config.upstream, UpstreamConfig::default());
        assert_eq!(config.hashing, HashParams::default());
        assert!(config.sync.on_startup);
        assert!(!config.sync.required);
    }

    #[test]
    fn test_file_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[database]
path = "/tmp/custom.db"

[upstream]
wger_url = "http://localhost:9000/api/v2"
timeout_secs = 5

[hashing]
memory_kib = 65536
iterations = 3

[sync]
required = true
"#,
        )
        .unwrap();

        let config = Config::from_sources(dir.path(), &path, no_env).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.upstream.wger_url, "http://localhost:9000/api/v2");
        assert_eq!(config.upstream.mealdb_url, DEFAULT_MEALDB_URL);
        assert_eq!(config.upstream.timeout_secs, 5);
        assert_eq!(config.hashing.memory_kib, 65536);
        assert_eq!(config.hashing.iterations, 3);
        assert_eq!(config.hashing.parallelism, 1);
        assert!(config.sync.on_startup);
        assert!(config.sync.required);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\npath = \"/tmp/from-file.db\"\n").unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            ("FITMEAL_DB", "/tmp/from-env.db"),
            ("FITMEAL_MEALDB_URL", "http://127.0.0.1:1/mealdb"),
        ]);
        let config = Config::from_sources(dir.path(), &path, |k| {
            env.get(k).map(|v| (*v).to_string())
        })
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/from-env.db"));
        assert_eq!(config.upstream.mealdb_url, "http://127.0.0.1:1/mealdb");
        assert_eq!(config.upstream.wger_url, DEFAULT_WGER_URL);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        for (section, body) in [
            ("database", "[database]\nurl = \"postgresql:///capstone\"\n"),
            ("upstream", "[upstream]\nwger = \"http://x\"\n"),
            ("hashing", "[hashing]\nmemory = 65536\n"),
            ("sync", "[sync]\nrequried = true\n"),
        ] {
            std::fs::write(&path, body).unwrap();
            let err = Config::from_sources(dir.path(), &path, no_env)
                .expect_err(&format!("typo in [{section}] accepted"));
            assert!(format!("{err:#}").contains("Invalid config"));
        }
    }
}
