// src/config.rs

use std::env;
use dotenvy::dotenv;

/// SMTP relay settings. Present only when `SMTP_HOST` is set.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// External image host that receives proxied profile photos.
#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub upload_url: String,
    pub upload_preset: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub jwt_expiration: u64,
    /// Lifetime of the e-mail verification token in seconds.
    pub verify_token_expiration: u64,
    pub reset_token_ttl_minutes: i64,
    pub rust_log: String,
    pub host: String,
    pub port: u16,
    /// Base URL of the web client, used to build links in e-mails.
    pub app_base_url: String,
    pub cors_origins: Vec<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub assets: Option<AssetConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let smtp = env::var("SMTP_HOST").ok().map(|host| SmtpConfig {
            host,
            port: parse_or("SMTP_PORT", 587),
            username: env::var("SMTP_USERNAME").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
            from: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "LinkIT <no-reply@linkit.local>".to_string()),
        });

        let assets = env::var("ASSET_UPLOAD_URL").ok().map(|upload_url| AssetConfig {
            upload_url,
            upload_preset: env::var("ASSET_UPLOAD_PRESET").ok(),
        });

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 86_400),
            verify_token_expiration: parse_or("VERIFY_TOKEN_EXPIRATION", 172_800),
            reset_token_ttl_minutes: parse_or("RESET_TOKEN_TTL_MINUTES", 60),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            host: env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("APP_PORT", 3000),
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            cors_origins,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            smtp,
            assets,
        }
    }

    /// Configuration for tests: no SMTP, no asset host, short-lived tokens.
    pub fn for_tests(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            jwt_secret: "linkit_test_secret".to_string(),
            jwt_expiration: 600,
            verify_token_expiration: 600,
            reset_token_ttl_minutes: 60,
            rust_log: "error".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            app_base_url: "http://localhost:5173".to_string(),
            cors_origins: vec![],
            admin_email: None,
            admin_password: None,
            smtp: None,
            assets: None,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
