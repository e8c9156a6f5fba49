use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Backend server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// sqlx connection string
    pub database_url: String,
    /// Pool size
    pub db_max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5229,
            database_url: "sqlite://pukul_tikus.db?mode=rwc".to_string(),
            db_max_connections: 5,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                if parsed > 0 {
                    config.port = parsed;
                } else {
                    tracing::warn!("PORT must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid PORT '{}', using default", port);
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            if url.trim().is_empty() {
                tracing::warn!("DATABASE_URL is empty, using default");
            } else {
                config.database_url = url;
            }
        }

        if let Ok(max) = std::env::var("DB_MAX_CONNECTIONS") {
            if let Ok(parsed) = max.parse::<u32>() {
                if parsed > 0 && parsed <= 100 {
                    config.db_max_connections = parsed;
                } else {
                    tracing::warn!("DB_MAX_CONNECTIONS must be 1-100, using default");
                }
            } else {
                tracing::warn!("Invalid DB_MAX_CONNECTIONS '{}', using default", max);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.database_url.is_empty() {
            return Err("database_url cannot be empty".to_string());
        }
        if self.db_max_connections == 0 {
            return Err("db_max_connections must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Outbound API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `https://localhost:7284`
    pub base_url: String,
    /// DEV only: accept invalid HTTPS certificates
    pub dev_bypass_cert: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:7284".to_string(),
            dev_bypass_cert: true,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("API_BASE_URL") {
            if url.trim().is_empty() {
                tracing::warn!("API_BASE_URL is empty, using default");
            } else {
                config.base_url = url.trim().to_string();
            }
        }

        if let Ok(bypass) = std::env::var("API_DEV_BYPASS_CERT") {
            match bypass.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.dev_bypass_cert = true,
                "0" | "false" | "no" => config.dev_bypass_cert = false,
                _ => tracing::warn!("Invalid API_DEV_BYPASS_CERT '{}', using default", bypass),
            }
        }

        if let Ok(secs) = std::env::var("API_TIMEOUT_SECS") {
            if let Ok(parsed) = secs.parse::<u64>() {
                if parsed > 0 && parsed <= 300 {
                    config.timeout = Duration::from_secs(parsed);
                } else {
                    tracing::warn!("API_TIMEOUT_SECS must be 1-300, using default");
                }
            } else {
                tracing::warn!("Invalid API_TIMEOUT_SECS '{}', using default", secs);
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url cannot be empty".to_string());
        }
        if self.timeout.is_zero() {
            return Err("timeout must be positive".to_string());
        }
        Ok(())
    }
}
