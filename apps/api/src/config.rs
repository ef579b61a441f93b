use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

/// Which events backend to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Hosted PostgREST API (Supabase project URL + key).
    Rest { url: String, api_key: String },
    /// Direct Postgres connection.
    Postgres { database_url: String },
    /// In-process collection; data is lost on restart.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendKind {
    Rest,
    Postgres,
    Memory,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" | "supabase" => Ok(BackendKind::Rest),
            "postgres" | "pg" => Ok(BackendKind::Postgres),
            "memory" => Ok(BackendKind::Memory),
            other => Err(anyhow!(
                "EVENT_BACKEND must be one of rest, postgres, memory (got '{other}')"
            )),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    /// Bearer token required by the admin routes. Unset leaves them open.
    pub admin_token: Option<String>,
    /// Replacement seed catalog (JSON array of events).
    pub seed_file: Option<PathBuf>,
    pub backend_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let kind: BackendKind = optional("EVENT_BACKEND")
            .unwrap_or_else(|| "rest".to_string())
            .parse()?;
        let backend = match kind {
            BackendKind::Rest => BackendConfig::Rest {
                url: require("SUPABASE_URL")?,
                api_key: require("SUPABASE_KEY")?,
            },
            BackendKind::Postgres => BackendConfig::Postgres {
                database_url: require("DATABASE_URL")?,
            },
            BackendKind::Memory => BackendConfig::Memory,
        };

        Ok(Config {
            backend,
            admin_token: optional("ADMIN_TOKEN"),
            seed_file: optional("SEED_FILE").map(PathBuf::from),
            backend_timeout_secs: optional("BACKEND_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse::<u64>()
                .context("BACKEND_TIMEOUT_SECS must be a whole number of seconds")?,
            port: optional("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_rest_is_default_and_requires_credentials() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));

        let cfg = config(&[
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_KEY", "service-key"),
        ])
        .unwrap();
        assert_eq!(
            cfg.backend,
            BackendConfig::Rest {
                url: "https://abc.supabase.co".into(),
                api_key: "service-key".into()
            }
        );
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.backend_timeout_secs, 30);
        assert!(cfg.admin_token.is_none());
    }

    #[test]
    fn test_postgres_backend() {
        let cfg = config(&[
            ("EVENT_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/events"),
            ("PORT", "9000"),
            ("ADMIN_TOKEN", "s3cret"),
        ])
        .unwrap();
        assert!(matches!(cfg.backend, BackendConfig::Postgres { .. }));
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.admin_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_memory_backend_needs_nothing_else() {
        let cfg = config(&[("EVENT_BACKEND", "memory"), ("SEED_FILE", "seed.json")]).unwrap();
        assert_eq!(cfg.backend, BackendConfig::Memory);
        assert_eq!(cfg.seed_file, Some(PathBuf::from("seed.json")));
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("EVENT_BACKEND", "mongo")]).is_err());
        assert!(config(&[("EVENT_BACKEND", "memory"), ("PORT", "http")]).is_err());
        assert!(config(&[("EVENT_BACKEND", "memory"), ("ADMIN_TOKEN", "  ")])
            .unwrap()
            .admin_token
            .is_none());
    }
}
