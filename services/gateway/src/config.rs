//! Environment configuration
//!
//! `PORT`, `ADMIN_PASSWORD`, and `CORS_ORIGIN`, with defaults suitable for
//! a classroom deployment behind a single origin.

use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub admin_password: String,
    /// Allowed browser origin; `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(port = %raw, "invalid PORT, using 8080");
                8080
            }),
            Err(_) => 8080,
        };
        let admin_password =
            std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
        let cors_origin = std::env::var("CORS_ORIGIN").ok().filter(|s| !s.is_empty());

        Self {
            port,
            admin_password,
            cors_origin,
        }
    }
}
