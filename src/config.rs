use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::ChunkStrategy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Unit strategy applied when a request does not pick one explicitly.
    #[serde(default)]
    pub strategy: ChunkStrategy,
    /// Upper bound on chunk length, in characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Root directory for materialized chunk artifacts, one subdirectory
    /// per (document name, strategy) pair.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Worker pool size for directory ingestion. Bounded by I/O
    /// concurrency rather than core count.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Paths matching these globs (relative to the batch root) are not
    /// visited.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Write each chunk as a standalone file under `output_root`.
    #[serde(default = "default_materialize")]
    pub materialize: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            workers: default_workers(),
            exclude_globs: Vec::new(),
            materialize: default_materialize(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("./chunks_data")
}

fn default_workers() -> usize {
    4
}

fn default_materialize() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }

    if config.ingest.workers == 0 {
        anyhow::bail!("ingest.workers must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docshard.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let (_dir, path) = write_config(
            r#"
            [db]
            path = "./data/docshard.sqlite"

            [server]
            bind = "127.0.0.1:7400"
            "#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.strategy, ChunkStrategy::Sentence);
        assert_eq!(config.chunking.max_chars, 1000);
        assert_eq!(config.ingest.workers, 4);
        assert!(config.ingest.materialize);
    }

    #[test]
    fn unknown_strategy_is_rejected_at_the_boundary() {
        let (_dir, path) = write_config(
            r#"
            [db]
            path = "./data/docshard.sqlite"

            [chunking]
            strategy = "token"

            [server]
            bind = "127.0.0.1:7400"
            "#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn zero_max_chars_is_rejected() {
        let (_dir, path) = write_config(
            r#"
            [db]
            path = "./data/docshard.sqlite"

            [chunking]
            max_chars = 0

            [server]
            bind = "127.0.0.1:7400"
            "#,
        );
        assert!(load_config(&path).is_err());
    }
}
