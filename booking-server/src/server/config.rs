//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Error reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Configuration for the booking server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen_addr: SocketAddr,

    /// Maximum number of connections served at once.
    /// Further clients wait in the listen backlog.
    pub workers: usize,

    /// Limit on each socket read and write.
    pub io_timeout: Duration,

    /// How long a booking waits for another booking on the same seat.
    pub lock_timeout: Duration,

    /// Longest accepted request line, newline excluded.
    pub max_request_bytes: usize,

    /// JSON file with stations, trains, journeys and existing tickets.
    pub seed_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 4631)),
            workers: 100,
            io_timeout: Duration::from_secs(10),
            lock_timeout: Duration::from_secs(2),
            max_request_bytes: 64 * 1024,
            seed_path: PathBuf::from("data/seed.json"),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `BOOKING_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = read(&lookup, "BOOKING_ADDR")? {
            config.listen_addr = addr;
        }
        if let Some(workers) = read::<usize>(&lookup, "BOOKING_WORKERS")? {
            if workers == 0 {
                return Err(ConfigError {
                    var: "BOOKING_WORKERS",
                    value: "0".into(),
                    reason: "at least one worker is required".into(),
                });
            }
            config.workers = workers;
        }
        if let Some(secs) = read(&lookup, "BOOKING_IO_TIMEOUT_SECS")? {
            config.io_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = read(&lookup, "BOOKING_LOCK_TIMEOUT_MS")? {
            config.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(bytes) = read(&lookup, "BOOKING_MAX_REQUEST_BYTES")? {
            config.max_request_bytes = bytes;
        }
        if let Some(path) = lookup("BOOKING_SEED").filter(|p| !p.trim().is_empty()) {
            config.seed_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

fn read<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:4631");
        assert_eq!(config.workers, 100);
        assert_eq!(config.io_timeout, Duration::from_secs(10));
        assert_eq!(config.lock_timeout, Duration::from_secs(2));
        assert_eq!(config.max_request_bytes, 65536);
        assert_eq!(config.seed_path, PathBuf::from("data/seed.json"));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.workers, 100);
        assert_eq!(config.listen_addr.port(), 4631);
    }

    #[test]
    fn overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BOOKING_ADDR", "0.0.0.0:9000"),
            ("BOOKING_WORKERS", " 8 "),
            ("BOOKING_IO_TIMEOUT_SECS", "3"),
            ("BOOKING_LOCK_TIMEOUT_MS", "250"),
            ("BOOKING_MAX_REQUEST_BYTES", "1024"),
            ("BOOKING_SEED", "/srv/booking/seed.json"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.workers, 8);
        assert_eq!(config.io_timeout, Duration::from_secs(3));
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.max_request_bytes, 1024);
        assert_eq!(config.seed_path, PathBuf::from("/srv/booking/seed.json"));
    }

    #[test]
    fn invalid_values() {
        let err = ServerConfig::from_lookup(lookup(&[("BOOKING_WORKERS", "many")])).unwrap_err();
        assert_eq!(err.var, "BOOKING_WORKERS");
        assert_eq!(err.value, "many");

        let err = ServerConfig::from_lookup(lookup(&[("BOOKING_WORKERS", "0")])).unwrap_err();
        assert_eq!(err.var, "BOOKING_WORKERS");

        let err = ServerConfig::from_lookup(lookup(&[("BOOKING_ADDR", "localhost")])).unwrap_err();
        assert!(err.to_string().starts_with("invalid BOOKING_ADDR=\"localhost\""));
    }
}
