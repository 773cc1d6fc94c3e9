use std::env;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub stripe: StripeConfig,
    pub smtp: SmtpConfig,
    pub cleanup: CleanupConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_url: String,
    pub currency: String,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub contact_recipient: String,
}

#[derive(Clone, Debug)]
pub struct CleanupConfig {
    pub interval_secs: u64,
    pub pending_max_age_hours: i64,
}

/// Collect the full configuration from the environment. Call after
/// `bootstrap::init_env` so `.env` values are visible.
pub fn load() -> Result<Config> {
    Ok(Config {
        database: DatabaseConfig {
            url: require("DATABASE_URL")?,
        },
        server: ServerConfig {
            host: optional("HOST", "0.0.0.0"),
            port: optional("PORT", "3000").parse().context("Invalid PORT")?,
        },
        stripe: StripeConfig {
            secret_key: require("STRIPE_SECRET_KEY")?,
            api_url: optional("STRIPE_API_URL", "https://api.stripe.com"),
            currency: optional("CURRENCY", "eur"),
        },
        smtp: SmtpConfig {
            host: require("SMTP_HOST")?,
            port: optional("SMTP_PORT", "587")
                .parse()
                .context("Invalid SMTP_PORT")?,
            username: require("SMTP_USERNAME")?,
            password: require("SMTP_PASSWORD")?,
            from_address: require("MAIL_FROM")?,
            contact_recipient: require("CONTACT_RECIPIENT")?,
        },
        cleanup: CleanupConfig {
            interval_secs: optional("CLEANUP_INTERVAL_SECS", "3600")
                .parse()
                .context("Invalid CLEANUP_INTERVAL_SECS")?,
            pending_max_age_hours: optional("PENDING_MAX_AGE_HOURS", "3")
                .parse()
                .context("Invalid PENDING_MAX_AGE_HOURS")?,
        },
    })
}

fn require(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("Missing required environment variable {key}"))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
