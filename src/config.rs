use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use tracing::{info, warn};

const DEFAULT_ADDR: &str = "0.0.0.0:3146";
const DEFAULT_MAX_IMPORT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

/// Credentials are optional: a missing one switches its feature off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub tmdb_api_key: Option<String>,
    pub supabase: Option<SupabaseConfig>,
    pub addr: SocketAddr,
    pub max_import_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig { url, anon_key }),
            _ => None,
        };
        let addr = get("CINEMINHA_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse()
            .context("CINEMINHA_ADDR must be a socket address like 0.0.0.0:3146")?;
        let max_import_bytes = match get("CINEMINHA_MAX_IMPORT_BYTES") {
            Some(v) => v
                .parse()
                .context("CINEMINHA_MAX_IMPORT_BYTES must be a byte count")?,
            None => DEFAULT_MAX_IMPORT_BYTES,
        };

        Ok(Self {
            tmdb_api_key: get("TMDB_API_KEY"),
            supabase,
            addr,
            max_import_bytes,
        })
    }

    pub fn report(&self) {
        if self.tmdb_api_key.is_none() {
            warn!("TMDB_API_KEY not set - catalog search and enrichment disabled");
        }
        if self.supabase.is_none() {
            warn!("SUPABASE_URL/SUPABASE_ANON_KEY not set - accounts and collection disabled");
        }
        if self.tmdb_api_key.is_some() && self.supabase.is_some() {
            info!("All external services are configured");
        }
    }
}
