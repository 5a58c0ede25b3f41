use std::{env, time::Duration};

use lapak_common::Secret;
use log::*;
use tripay_tools::TripayConfig;

const DEFAULT_LAPAK_HOST: &str = "127.0.0.1";
const DEFAULT_LAPAK_PORT: u16 = 8370;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth: AuthConfig,
    /// How long a join waits on the payment gateway before rolling back.
    pub gateway_timeout: Duration,
    /// How often the deadline sweeper runs. `None` disables the in-process sweeper; deadlines are then only
    /// enforced through the internal trigger endpoint.
    pub sweep_interval: Option<Duration>,
    /// If set, `/internal/*` requests must carry this value in the `X-Internal-Key` header.
    pub internal_api_key: Option<Secret<String>>,
    pub tripay: TripayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LAPAK_HOST.to_string(),
            port: DEFAULT_LAPAK_PORT,
            database_url: String::default(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            auth: AuthConfig::default(),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
            internal_api_key: None,
            tripay: TripayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LAPAK_HOST").ok().unwrap_or_else(|| DEFAULT_LAPAK_HOST.into());
        let port = env::var("LAPAK_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for LAPAK_PORT. {e} Using the default, {DEFAULT_LAPAK_PORT}, \
                         instead."
                    );
                    DEFAULT_LAPAK_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_LAPAK_PORT);
        let database_url = env::var("LAPAK_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ LAPAK_DATABASE_URL is not set. Please set it to the URL for the Lapak database.");
            String::default()
        });
        let db_max_connections = env::var("LAPAK_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| error!("🪛️ Invalid LAPAK_DB_MAX_CONNECTIONS '{s}'. {e}. Using the default."))
                    .ok()
            })
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration. Authenticated endpoints will reject every request."
            );
            AuthConfig::default()
        });
        let gateway_timeout = env_seconds("LAPAK_GATEWAY_TIMEOUT_SECS")
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT);
        let sweep_interval = match env_seconds("LAPAK_SWEEP_INTERVAL_SECS") {
            Some(d) if d.is_zero() => {
                info!("🪛️ LAPAK_SWEEP_INTERVAL_SECS is 0. The deadline sweeper is disabled.");
                None
            },
            Some(d) => Some(d),
            None => Some(DEFAULT_SWEEP_INTERVAL),
        };
        let internal_api_key =
            env::var("LAPAK_INTERNAL_API_KEY").ok().filter(|s| !s.trim().is_empty()).map(Secret::new);
        if internal_api_key.is_none() {
            warn!("🪛️ LAPAK_INTERNAL_API_KEY is not set. The internal endpoints are open to anyone who can reach them.");
        }
        let mut tripay = TripayConfig::new_from_env_or_default();
        tripay.timeout = gateway_timeout;
        Self {
            host,
            port,
            database_url,
            db_max_connections,
            auth,
            gateway_timeout,
            sweep_interval,
            internal_api_key,
            tripay,
        }
    }
}

fn env_seconds(name: &str) -> Option<Duration> {
    let value = env::var(name).ok()?;
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| error!("🪛️ Invalid value for {name}: '{value}'. {e}. Using the default."))
        .ok()
}

/// Verification settings for the bearer tokens issued by the identity service.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// The shared HS256 secret.
    pub jwt_secret: Secret<String>,
    /// If set, tokens must carry this `aud` claim.
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, String> {
        let jwt_secret = env::var("LAPAK_JWT_SECRET").map_err(|_| "LAPAK_JWT_SECRET is not set".to_string())?;
        if jwt_secret.trim().is_empty() {
            return Err("LAPAK_JWT_SECRET is empty".into());
        }
        let audience = env::var("LAPAK_JWT_AUDIENCE").ok().filter(|s| !s.trim().is_empty());
        Ok(Self { jwt_secret: Secret::new(jwt_secret), audience })
    }
}
