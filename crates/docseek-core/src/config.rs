//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`APP_RETRIEVAL__TOP_K=8` sets `retrieval.top_k`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a known base
//! directory.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::RetrievalConfig;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let config = Self::from_figment(Self::figment_for_env(&env_name));
        config.settings()?;
        tracing::debug!(env = %env_name, "configuration loaded");
        Ok(config)
    }

    /// Layers for `env`, on top of the built-in defaults.
    pub fn figment_for_env(env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::debug!(env = other, "no environment overlay for this RUST_ENV"),
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extracts and validates the typed settings.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub input_folder: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self { input_folder: "input_files".to_string() }
    }
}

/// Sliding-window chunking, in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self { Self { chunk_size: 2500, chunk_overlap: 200 } }
}

/// Local model directories. `None` falls back to the provider's own lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModelSettings {
    pub embedding_dir: Option<String>,
    pub reranker_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalConfig,
    pub models: ModelSettings,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalConfig::default(),
            models: ModelSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        self.retrieval
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("retrieval: {e}")))?;
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(Error::InvalidConfig(format!("invalid log_level: {}", self.log_level)));
        }
        Ok(())
    }

    pub fn input_folder(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.paths.input_folder) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_files() {
        Jail::expect_with(|_jail| {
            let settings = Config::from_figment(Config::figment_for_env("dev"))
                .settings()
                .map_err(|e| e.to_string())?;
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.retrieval.top_k, 5);
            Ok(())
        });
    }

    #[test]
    fn env_overlay_and_env_vars_layer_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[retrieval]\ntop_k = 3\nrrf_k = 30.0\n")?;
            jail.create_file("config.test.toml", "[retrieval]\ntop_k = 4\n")?;
            jail.set_env("RUST_ENV", "test");
            jail.set_env("APP_RETRIEVAL__USE_RERANKING", "false");
            jail.set_env("APP_CHUNKING__CHUNK_SIZE", "1000");

            let settings = Config::load().and_then(|c| c.settings()).map_err(|e| e.to_string())?;
            assert_eq!(settings.retrieval.top_k, 4);
            assert_eq!(settings.retrieval.rrf_k, 30.0);
            assert!(!settings.retrieval.use_reranking);
            assert_eq!(settings.chunking.chunk_size, 1000);
            assert_eq!(settings.chunking.chunk_overlap, 200);
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "log_level = \"loud\"\n")?;
            assert!(Config::load().is_err());
            jail.create_file("config.toml", "[retrieval]\ntop_k = 101\n")?;
            assert!(Config::load().is_err());
            jail.create_file("config.toml", "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n")?;
            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/docs");
        assert_eq!(resolve_with_base(base, "input"), PathBuf::from("/srv/docs/input"));
        assert_eq!(resolve_with_base(base, "/abs/input"), PathBuf::from("/abs/input"));
    }
}
