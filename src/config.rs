use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;

use serde::Deserialize;

/// Deployment flavour; only production marks the session cookie `Secure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_url: String,
    pub api_token: String,
    pub sender: String,
    pub timeout_ms: u64,
}

/// Listener address.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: Environment,
    pub server: ServerConfig,
    pub log: LogConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub reset_token_ttl_minutes: i64,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let environment = parse_or("APP_ENV", Environment::Development);
        let server = ServerConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("APP_PORT", 8080),
        };
        // LOG_FORMAT wins; otherwise JSON only in production
        let log = LogConfig {
            filter: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "authgate=debug,axum=info,tower_http=info".into()),
            json: match std::env::var("LOG_FORMAT") {
                Ok(format) => format == "json",
                Err(_) => environment.is_production(),
            },
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "authgate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authgate-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60 * 24 * 90),
            cookie_ttl_days: parse_or("JWT_COOKIE_TTL_DAYS", 90),
        };
        let mail = MailConfig {
            api_url: std::env::var("MAIL_API_URL")
                .unwrap_or_else(|_| "http://localhost:2525".into()),
            api_token: std::env::var("MAIL_API_TOKEN").unwrap_or_default(),
            sender: std::env::var("MAIL_SENDER")
                .unwrap_or_else(|_| "no-reply@authgate.local".into()),
            timeout_ms: parse_or("MAIL_TIMEOUT_MS", 10_000),
        };
        Ok(Self {
            database_url,
            environment,
            server,
            log,
            jwt,
            mail,
            reset_token_ttl_minutes: parse_or("RESET_TOKEN_TTL_MINUTES", 10),
        })
    }
}
