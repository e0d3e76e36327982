use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Attribute the territory strategy keys on unless configured otherwise.
pub const DEFAULT_TERRITORY_FIELD: &str = "region";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Runtime settings for the lead engine service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub assignment: AssignmentConfig,
}

impl AppConfig {
    /// Read `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup, trimming values and treating blanks as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let environment = value("APP_ENV")
            .map(|raw| AppEnvironment::parse(&raw))
            .unwrap_or(AppEnvironment::Development);

        let port = match value("APP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 3000,
        };
        let server = ServerConfig {
            host: value("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
        };

        let telemetry = TelemetryConfig {
            log_level: value("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        let territory_field =
            value("LEAD_TERRITORY_FIELD").unwrap_or_else(|| DEFAULT_TERRITORY_FIELD.to_string());
        if territory_field.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidTerritoryField(territory_field));
        }
        let assignment = AssignmentConfig {
            default_roster: value("LEAD_DEFAULT_ROSTER")
                .map(|raw| split_members(&raw))
                .unwrap_or_default(),
            territory_csv: value("LEAD_TERRITORY_CSV").map(PathBuf::from),
            territory_field,
        };

        Ok(Self {
            environment,
            server,
            telemetry,
            assignment,
        })
    }
}

fn split_members(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost {
                    host: self.host.clone(),
                    source,
                })?
        };

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Seed data for the assignment strategies.
#[derive(Debug, Clone, Default)]
pub struct AssignmentConfig {
    /// Members of the roster registered under the name `default`.
    pub default_roster: Vec<String>,
    /// Optional `territory,assignee` CSV loaded at startup.
    pub territory_csv: Option<PathBuf>,
    pub territory_field: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16, got '{0}'")]
    InvalidPort(String),
    #[error("APP_HOST '{host}' must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        host: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("LEAD_TERRITORY_FIELD must be a single attribute name, got '{0}'")]
    InvalidTerritoryField(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, OnceLock};

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = from_pairs(&[]).expect("config builds");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.assignment.default_roster.is_empty());
        assert!(config.assignment.territory_csv.is_none());
        assert_eq!(config.assignment.territory_field, DEFAULT_TERRITORY_FIELD);
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let config = from_pairs(&[("APP_HOST", "localhost"), ("APP_ENV", "ci")])
            .expect("config builds");
        assert_eq!(config.environment, AppEnvironment::Test);
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn assignment_settings_are_parsed() {
        let config = from_pairs(&[
            ("LEAD_DEFAULT_ROSTER", " alice, bob ,,carol "),
            ("LEAD_TERRITORY_CSV", "/etc/leads/territories.csv"),
            ("LEAD_TERRITORY_FIELD", "state"),
        ])
        .expect("config builds");

        assert_eq!(config.assignment.default_roster, vec!["alice", "bob", "carol"]);
        assert_eq!(
            config.assignment.territory_csv,
            Some(PathBuf::from("/etc/leads/territories.csv"))
        );
        assert_eq!(config.assignment.territory_field, "state");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            from_pairs(&[("APP_PORT", "not-a-port")]),
            Err(ConfigError::InvalidPort(raw)) if raw == "not-a-port"
        ));
        assert!(matches!(
            from_pairs(&[("LEAD_TERRITORY_FIELD", "sales region")]),
            Err(ConfigError::InvalidTerritoryField(_))
        ));

        let config = from_pairs(&[("APP_HOST", "not-an-ip")]).expect("config builds");
        assert!(matches!(
            config.server.socket_addr(),
            Err(ConfigError::InvalidHost { .. })
        ));
    }

    #[test]
    fn load_reads_process_environment() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        env::set_var("LEAD_TERRITORY_FIELD", "country");
        let loaded = AppConfig::load();
        env::remove_var("LEAD_TERRITORY_FIELD");

        let config = loaded.expect("config loads");
        assert_eq!(config.assignment.territory_field, "country");
    }
}
