use std::{env, net::SocketAddr, str::FromStr};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Upper bound of the shared pool; every checkout holds one connection
    /// for the length of its transaction.
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            host: env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed_or("APP_PORT", 3000),
            db_max_connections: parsed_or::<u32>("DB_MAX_CONNECTIONS", 10).max(1),
        })
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip = self
            .host
            .parse::<std::net::IpAddr>()
            .with_context(|| format!("APP_HOST {:?} is not an IP address", self.host))?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}

// Unset or unparsable values fall back to the default.
fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_rejects_hostnames() {
        let mut config = AppConfig {
            database_url: "postgres://localhost/checkout".into(),
            host: "0.0.0.0".into(),
            port: 8080,
            db_max_connections: 5,
        };
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:8080");

        config.host = "localhost".into();
        assert!(config.listen_addr().is_err());
    }
}
