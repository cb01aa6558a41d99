use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Path to RocksDB database
    pub database_path: PathBuf,

    /// Path to the JSON directory of known servers and trackers
    pub directory_path: PathBuf,

    /// Service master key (hex-encoded 32 bytes)
    pub service_master_key: [u8; 32],

    /// Request timeout for key server and tracker calls
    pub registrar_timeout: Duration,

    /// Origins allowed by CORS; empty allows none
    pub cors_allowed_origins: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("database_path", &self.database_path)
            .field("directory_path", &self.directory_path)
            .field("registrar_timeout", &self.registrar_timeout)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bind_address = std::env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| "127.0.0.1:9090".to_string())
            .parse()?;

        let database_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "./data/melange.db".to_string())
            .into();

        let directory_path = std::env::var("DIRECTORY_PATH")
            .unwrap_or_else(|_| "./directory.json".to_string())
            .into();

        let service_master_key = match std::env::var("SERVICE_MASTER_KEY") {
            Ok(hex_key) => parse_master_key(&hex_key)?,
            Err(_) => anyhow::bail!(
                "SERVICE_MASTER_KEY environment variable required (or run with --generate-key)"
            ),
        };

        let registrar_timeout = Duration::from_secs(
            std::env::var("REGISTRAR_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        );

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
        );

        Ok(Config {
            bind_address,
            database_path,
            directory_path,
            service_master_key,
            registrar_timeout,
            cors_allowed_origins,
        })
    }
}

/// Parse a 64 hex character master key
pub fn parse_master_key(hex_key: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_key.trim())?;
    if bytes.len() != 32 {
        anyhow::bail!("SERVICE_MASTER_KEY must be 32 bytes (64 hex chars)");
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_master_key() {
        let key = parse_master_key(&"ab".repeat(32)).unwrap();
        assert_eq!(key, [0xab; 32]);

        assert!(parse_master_key("abcd").is_err());
        assert!(parse_master_key(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" http://a.example, ,http://b.example "),
            vec!["http://a.example", "http://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }
}
