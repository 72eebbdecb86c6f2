//! Node configuration.
//!
//! Values come from environment variables with defaults matching a small
//! single-host cluster; the binary's command-line flags override the ports
//! and identity.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the RPC surface.
    pub rpc_port: u16,
    /// Port for the sidecar health/metrics surface.
    pub http_port: u16,
    /// Maximum number of cache entries (>= 1).
    pub cache_capacity: usize,
    /// Concurrency permits for the admission controller (>= 1).
    pub max_concurrent: usize,
    /// Overload gate threshold over the normalized CPU signal, in [0, 1].
    pub cpu_threshold: f64,
    /// Rolling window for the overload gate (>= 1s).
    pub cpu_window: Duration,
    /// Interval between TTL sweep passes.
    pub sweep_interval: Duration,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// `RPC_PORT`, `HTTP_PORT`, `CACHE_CAPACITY`, `MAX_CONCURRENT`,
    /// `CPU_THRESHOLD`, `CPU_WINDOW_SECS`, `SWEEP_INTERVAL_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rpc_port: env_parse("RPC_PORT").unwrap_or(defaults.rpc_port),
            http_port: env_parse("HTTP_PORT").unwrap_or(defaults.http_port),
            cache_capacity: env_parse("CACHE_CAPACITY").unwrap_or(defaults.cache_capacity),
            max_concurrent: env_parse("MAX_CONCURRENT").unwrap_or(defaults.max_concurrent),
            cpu_threshold: env_parse("CPU_THRESHOLD").unwrap_or(defaults.cpu_threshold),
            cpu_window: env_parse("CPU_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cpu_window),
            sweep_interval: env_parse("SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rpc_port: 8080,
            http_port: 8081,
            cache_capacity: 10_000,
            max_concurrent: 1_000,
            cpu_threshold: 0.9,
            cpu_window: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.rpc_port, 8080);
        assert_eq!(config.http_port, 8081);
        assert_eq!(config.cache_capacity, 10_000);
        assert_eq!(config.max_concurrent, 1_000);
        assert!((config.cpu_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.cpu_window, Duration::from_secs(10));
    }

    #[test]
    fn test_from_env_falls_back_to_defaults() {
        env::remove_var("RPC_PORT");
        env::remove_var("CACHE_CAPACITY");

        let config = ServerConfig::from_env();
        assert_eq!(config.rpc_port, ServerConfig::default().rpc_port);
        assert_eq!(
            config.cache_capacity,
            ServerConfig::default().cache_capacity
        );
    }
}
