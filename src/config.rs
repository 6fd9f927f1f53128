use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    /// Base URL of the storefront, used to build links in emails.
    pub public_url: String,
    pub require_email_verification: bool,
    /// Accounts registered with this email get the admin role.
    pub admin_email: Option<String>,
    /// `None` switches outgoing mail to the logging mailer.
    pub smtp: Option<SmtpConfig>,
    pub rates_api_url: String,
    pub low_stock_threshold: i32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "dropship".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "dropship-users".into()),
            ttl_minutes: parse_env("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: parse_env("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: parse_env("SMTP_PORT").unwrap_or(587),
                username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
                password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
                from: std::env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "Dropship <no-reply@dropship.local>".into()),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_env("APP_PORT").unwrap_or(8080),
            jwt,
            public_url: std::env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into())
                .trim_end_matches('/')
                .to_string(),
            require_email_verification: parse_env("REQUIRE_EMAIL_VERIFICATION").unwrap_or(true),
            admin_email: std::env::var("ADMIN_EMAIL")
                .ok()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty()),
            smtp,
            rates_api_url: std::env::var("RATES_API_URL")
                .unwrap_or_else(|_| "https://api.exchangerate-api.com/v4/latest/USD".into()),
            low_stock_threshold: parse_env("LOW_STOCK_THRESHOLD").unwrap_or(5),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_ignores_garbage() {
        // Unset and unparsable values both fall back to the caller's default.
        assert_eq!(parse_env::<i64>("DROPSHIP_TEST_UNSET_VARIABLE"), None);
    }
}
