use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use contactbook_api::book::PhotoRetention;
use contactbook_api::router::DEFAULT_MAX_BODY_BYTES;

/// Server settings, read from `CONTACTBOOK_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub photo_dir: PathBuf,
    pub photo_retention: PhotoRetention,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("CONTACTBOOK_PORT", "3000");
        let port: u16 = port
            .parse()
            .with_context(|| format!("CONTACTBOOK_PORT is not a port number: {}", port))?;

        let retention = var("CONTACTBOOK_PHOTO_RETENTION", "prune");
        let photo_retention = retention
            .parse::<PhotoRetention>()
            .context("Invalid CONTACTBOOK_PHOTO_RETENTION")?;

        let max_body = var("CONTACTBOOK_MAX_BODY_BYTES", &DEFAULT_MAX_BODY_BYTES.to_string());
        let max_body_bytes: usize = max_body
            .parse()
            .with_context(|| format!("CONTACTBOOK_MAX_BODY_BYTES is not a byte count: {}", max_body))?;

        Ok(Self {
            host: var("CONTACTBOOK_HOST", "0.0.0.0"),
            port,
            db_path: var("CONTACTBOOK_DB_PATH", "contactbook.db").into(),
            photo_dir: var("CONTACTBOOK_PHOTO_DIR", "./photos").into(),
            photo_retention,
            max_body_bytes,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}
