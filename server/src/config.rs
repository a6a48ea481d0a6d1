use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// Process-level settings read from the environment at start-up.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_raw = lookup("ATELIER_BIND")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .trim()
            .parse()
            .with_context(|| format!("ATELIER_BIND is not a socket address: {bind_raw}"))?;
        let data_dir = lookup("ATELIER_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        Ok(Self { bind, data_dir })
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("com", "Atelier", "Atelier") {
        proj.data_dir().to_path_buf()
    } else {
        std::env::temp_dir().join("Atelier")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert!(!config.data_dir.as_os_str().is_empty());
    }

    #[test]
    fn env_overrides_are_used() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("ATELIER_BIND", "0.0.0.0:9000"),
            ("ATELIER_DATA_DIR", "/var/lib/atelier"),
        ]))
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/atelier"));
    }

    #[test]
    fn bad_bind_is_an_error() {
        assert!(ServerConfig::from_lookup(lookup(&[("ATELIER_BIND", "nowhere")])).is_err());
    }
}
