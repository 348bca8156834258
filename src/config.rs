use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Process configuration, loaded once at startup and passed down explicitly.
/// Every field can be overridden from the environment with a `VIHARA_`
/// prefix (e.g. `VIHARA_DATABASE_URL`, `VIHARA_SESSION_TIMEOUT_SECS`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    /// Inactivity window after which a session expires (lazily, on next check).
    pub session_timeout_secs: u64,
    /// How long before expiry the client-side countdown should warn the user.
    pub session_warning_lead_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:vihara.sqlite".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            session_timeout_secs: 1800,
            session_warning_lead_secs: 120,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("VIHARA_"))
            .extract()
    }
}
