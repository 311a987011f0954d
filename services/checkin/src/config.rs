//! Service configuration
//!
//! Loaded from `CHECKIN_*` environment variables through the `config`
//! crate. Database and Redis settings live with their pools in `common`.

use anyhow::{Context, Result};
use chrono::Duration;
use chrono_tz::Tz;
use config::{Config, Environment};
use serde::Deserialize;

use crate::{session::SessionPolicy, validation::NationalIdPolicy};

#[derive(Debug, Deserialize)]
struct RawServiceConfig {
    bind_address: String,
    timezone: String,
    session_ttl_seconds: i64,
    session_retention_seconds: i64,
    national_id_policy: NationalIdPolicy,
}

/// Check-in service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Listen address of the HTTP server
    pub bind_address: String,
    /// Zone that defines the operational day
    pub timezone: Tz,
    pub session: SessionPolicy,
    pub national_id_policy: NationalIdPolicy,
}

impl ServiceConfig {
    /// Create a new ServiceConfig from environment variables
    ///
    /// # Environment Variables
    /// - `CHECKIN_BIND_ADDRESS`: listen address (default: "0.0.0.0:3002")
    /// - `CHECKIN_TIMEZONE`: IANA zone of the operational day (default: "America/Sao_Paulo")
    /// - `CHECKIN_SESSION_TTL_SECONDS`: QR session lifetime (default: 300)
    /// - `CHECKIN_SESSION_RETENTION_SECONDS`: how long expired sessions are remembered (default: 3600)
    /// - `CHECKIN_NATIONAL_ID_POLICY`: `cpf` or `numeric` (default: "cpf")
    pub fn from_env() -> Result<Self> {
        let raw: RawServiceConfig = Config::builder()
            .set_default("bind_address", "0.0.0.0:3002")?
            .set_default("timezone", "America/Sao_Paulo")?
            .set_default("session_ttl_seconds", 300_i64)?
            .set_default("session_retention_seconds", 3600_i64)?
            .set_default("national_id_policy", "cpf")?
            .add_source(Environment::with_prefix("CHECKIN").try_parsing(true))
            .build()?
            .try_deserialize()
            .context("Invalid check-in service configuration")?;

        raw.try_into()
    }
}

impl TryFrom<RawServiceConfig> for ServiceConfig {
    type Error = anyhow::Error;

    fn try_from(raw: RawServiceConfig) -> Result<Self> {
        let timezone: Tz = raw
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid timezone {}: {}", raw.timezone, e))?;

        if raw.session_ttl_seconds <= 0 {
            anyhow::bail!("CHECKIN_SESSION_TTL_SECONDS must be positive");
        }
        if raw.session_retention_seconds < 0 {
            anyhow::bail!("CHECKIN_SESSION_RETENTION_SECONDS must not be negative");
        }

        Ok(ServiceConfig {
            bind_address: raw.bind_address,
            timezone,
            session: SessionPolicy {
                ttl: Duration::seconds(raw.session_ttl_seconds),
                retention: Duration::seconds(raw.session_retention_seconds),
            },
            national_id_policy: raw.national_id_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "CHECKIN_BIND_ADDRESS",
        "CHECKIN_TIMEZONE",
        "CHECKIN_SESSION_TTL_SECONDS",
        "CHECKIN_SESSION_RETENTION_SECONDS",
        "CHECKIN_NATIONAL_ID_POLICY",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_service_config_defaults() {
        clear_env();

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3002");
        assert_eq!(config.timezone, chrono_tz::America::Sao_Paulo);
        assert_eq!(config.session.ttl, Duration::minutes(5));
        assert_eq!(config.session.retention, Duration::hours(1));
        assert_eq!(config.national_id_policy, NationalIdPolicy::Cpf);
    }

    #[test]
    #[serial]
    fn test_service_config_from_env() {
        clear_env();
        unsafe {
            std::env::set_var("CHECKIN_TIMEZONE", "Europe/Lisbon");
            std::env::set_var("CHECKIN_SESSION_TTL_SECONDS", "120");
            std::env::set_var("CHECKIN_NATIONAL_ID_POLICY", "numeric");
        }

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Lisbon);
        assert_eq!(config.session.ttl, Duration::minutes(2));
        assert_eq!(config.national_id_policy, NationalIdPolicy::Numeric);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_service_config_rejects_unknown_timezone() {
        clear_env();
        unsafe {
            std::env::set_var("CHECKIN_TIMEZONE", "Mars/Olympus_Mons");
        }

        assert!(ServiceConfig::from_env().is_err());

        clear_env();
    }
}
