use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued tokens. Default: 24 hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

/// Bootstrap admin account, created on startup when both fields are set.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoundsConfig {
    /// Compare answers case-sensitively. Default: false.
    #[serde(default)]
    pub case_sensitive_answers: bool,
    /// Default number of leaderboard rows. Default: 100.
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: u64,
}

fn default_token_ttl_hours() -> i64 {
    24
}
fn default_leaderboard_limit() -> u64 {
    100
}

impl Default for RoundsConfig {
    fn default() -> Self {
        Self {
            case_sensitive_answers: false,
            leaderboard_limit: default_leaderboard_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub rounds: RoundsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ROUNDGATE__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("ROUNDGATE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
