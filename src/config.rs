//! Configuration for warden.
//!
//! CLI arguments and environment variable handling using clap, same pattern
//! the gateway this crate grew out of used for its own `Args`.

use clap::Parser;
use std::net::SocketAddr;

/// warden - permission evaluation engine
#[derive(Parser, Debug, Clone)]
#[command(name = "warden")]
#[command(about = "Grant-based ACL evaluation engine")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "warden")]
    pub mongodb_db: String,

    /// Enable development mode (relaxed auth defaults, seeds a bootstrap
    /// superuser with a well-known password if none exists)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Decision cache TTL in seconds
    #[arg(long, env = "DECISION_CACHE_TTL_SECONDS", default_value = "60")]
    pub decision_cache_ttl_seconds: u64,

    /// Ancestor-chain cache TTL in seconds
    #[arg(long, env = "ANCESTOR_CACHE_TTL_SECONDS", default_value = "3600")]
    pub ancestor_cache_ttl_seconds: u64,

    /// Membership cache TTL in seconds
    #[arg(long, env = "MEMBERSHIP_CACHE_TTL_SECONDS", default_value = "300")]
    pub membership_cache_ttl_seconds: u64,

    /// External cache URL, retained for wire compatibility with deployments
    /// that expect it; the engine itself only ever runs the in-process TTL
    /// cache (see DESIGN.md) so this is parsed and otherwise unused.
    #[arg(long, env = "CACHE_URL")]
    pub cache_url: Option<String>,

    /// Whether the cache layer is enabled at all; `false` forces every check
    /// to recompute against the grant store.
    #[arg(long, env = "CACHE_ENABLED", default_value = "true")]
    pub cache_enabled: bool,

    /// Cache sweep interval in seconds
    #[arg(long, env = "CACHE_SWEEP_INTERVAL_SECONDS", default_value = "30")]
    pub cache_sweep_interval_seconds: u64,

    /// Per-call timeout for grant/audit/user store operations against
    /// MongoDB, in seconds. Bounds every store call so a slow or wedged
    /// connection surfaces as `WardenError::Unavailable` instead of hanging.
    #[arg(long, env = "STORE_TIMEOUT_SECONDS", default_value = "5")]
    pub store_timeout_seconds: u64,

    /// Secret key consumed by the external auth boundary (token issuance and
    /// validation are out of this engine's scope); dev mode falls back to an
    /// insecure fixed string exactly as the bootstrap password does.
    #[arg(long, env = "SECRET_KEY")]
    pub secret_key: Option<String>,

    /// Token TTL in seconds, consumed by the external auth boundary.
    #[arg(long, env = "TOKEN_TTL_SECONDS", default_value = "3600")]
    pub token_ttl_seconds: u64,

    /// Whether the scheduled expiration/notification worker runs at all.
    #[arg(long, env = "SCHEDULER_ENABLED", default_value = "true")]
    pub scheduler_enabled: bool,

    /// How often the expiration job checks for expired grants, in seconds.
    #[arg(long, env = "EXPIRY_CHECK_PERIOD_SECONDS", default_value = "3600")]
    pub expiry_check_period_seconds: u64,

    /// UTC hour (0-23) the daily and monthly lookahead notification jobs fire at.
    #[arg(long, env = "NOTIFICATION_HOUR_UTC", default_value = "9")]
    pub notification_hour_utc: u32,

    /// Lookahead window in days for the daily notification job.
    #[arg(long, env = "NOTIFICATION_LOOKAHEAD_DAYS", default_value = "7")]
    pub notification_lookahead_days: i64,

    /// Bootstrap superuser username, created on first startup if no
    /// superuser exists
    #[arg(long, env = "BOOTSTRAP_SUPERUSER_USERNAME", default_value = "root")]
    pub bootstrap_superuser_username: String,

    /// Bootstrap superuser password (required in production; dev mode falls
    /// back to an insecure default)
    #[arg(long, env = "BOOTSTRAP_SUPERUSER_PASSWORD")]
    pub bootstrap_superuser_password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn decision_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.decision_cache_ttl_seconds)
    }

    pub fn ancestor_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ancestor_cache_ttl_seconds)
    }

    pub fn membership_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.membership_cache_ttl_seconds)
    }

    pub fn cache_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_sweep_interval_seconds)
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.store_timeout_seconds)
    }

    pub fn expiry_check_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.expiry_check_period_seconds)
    }

    /// Effective bootstrap password: the configured value, or an insecure
    /// default in dev mode only.
    pub fn bootstrap_superuser_password(&self) -> String {
        if self.dev_mode {
            self.bootstrap_superuser_password.clone().unwrap_or_else(|| "dev-only-insecure-password".to_string())
        } else {
            self.bootstrap_superuser_password.clone().expect("BOOTSTRAP_SUPERUSER_PASSWORD is required in production mode")
        }
    }

    /// Effective secret key for the external auth boundary: the configured
    /// value, or an insecure fixed string in dev mode only.
    pub fn secret_key(&self) -> String {
        if self.dev_mode {
            self.secret_key.clone().unwrap_or_else(|| "dev-only-insecure-secret-key".to_string())
        } else {
            self.secret_key.clone().expect("SECRET_KEY is required in production mode")
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.bootstrap_superuser_password.is_none() {
            return Err("BOOTSTRAP_SUPERUSER_PASSWORD is required in production mode".to_string());
        }
        if !self.dev_mode && self.secret_key.is_none() {
            return Err("SECRET_KEY is required in production mode".to_string());
        }
        if self.decision_cache_ttl_seconds == 0 || self.ancestor_cache_ttl_seconds == 0 || self.membership_cache_ttl_seconds == 0 {
            return Err("cache TTLs must be non-zero".to_string());
        }
        if self.store_timeout_seconds == 0 {
            return Err("store timeout must be non-zero".to_string());
        }
        if self.notification_hour_utc > 23 {
            return Err("notification hour must be in 0-23".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_mode_falls_back_to_insecure_default_password() {
        let args = Args {
            listen: "0.0.0.0:8080".parse().unwrap(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "warden".to_string(),
            dev_mode: true,
            decision_cache_ttl_seconds: 60,
            ancestor_cache_ttl_seconds: 3600,
            membership_cache_ttl_seconds: 300,
            cache_url: None,
            cache_enabled: true,
            cache_sweep_interval_seconds: 30,
            store_timeout_seconds: 5,
            secret_key: None,
            token_ttl_seconds: 3600,
            scheduler_enabled: true,
            expiry_check_period_seconds: 3600,
            notification_hour_utc: 9,
            notification_lookahead_days: 7,
            bootstrap_superuser_username: "root".to_string(),
            bootstrap_superuser_password: None,
            log_level: "info".to_string(),
        };
        assert!(args.validate().is_ok());
        assert_eq!(args.bootstrap_superuser_password(), "dev-only-insecure-password");
        assert_eq!(args.secret_key(), "dev-only-insecure-secret-key");
    }

    #[test]
    fn production_mode_requires_password() {
        let args = Args {
            listen: "0.0.0.0:8080".parse().unwrap(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "warden".to_string(),
            dev_mode: false,
            decision_cache_ttl_seconds: 60,
            ancestor_cache_ttl_seconds: 3600,
            membership_cache_ttl_seconds: 300,
            cache_url: None,
            cache_enabled: true,
            cache_sweep_interval_seconds: 30,
            store_timeout_seconds: 5,
            secret_key: None,
            token_ttl_seconds: 3600,
            scheduler_enabled: true,
            expiry_check_period_seconds: 3600,
            notification_hour_utc: 9,
            notification_lookahead_days: 7,
            bootstrap_superuser_username: "root".to_string(),
            bootstrap_superuser_password: None,
            log_level: "info".to_string(),
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn out_of_range_notification_hour_rejected() {
        let args = Args {
            listen: "0.0.0.0:8080".parse().unwrap(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "warden".to_string(),
            dev_mode: true,
            decision_cache_ttl_seconds: 60,
            ancestor_cache_ttl_seconds: 3600,
            membership_cache_ttl_seconds: 300,
            cache_url: None,
            cache_enabled: true,
            cache_sweep_interval_seconds: 30,
            store_timeout_seconds: 5,
            secret_key: None,
            token_ttl_seconds: 3600,
            scheduler_enabled: true,
            expiry_check_period_seconds: 3600,
            notification_hour_utc: 24,
            notification_lookahead_days: 7,
            bootstrap_superuser_username: "root".to_string(),
            bootstrap_superuser_password: Some("x".to_string()),
            log_level: "info".to_string(),
        };
        assert!(args.validate().is_err());
    }
}
