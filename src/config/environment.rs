use std::env;

/// Environment configuration
/// Loads and validates environment variables
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub sender_email: String,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .map_err(|_| "PORT must be a number".to_string())?;

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let smtp_host = env::var("SMTP_HOST").map_err(|_| "SMTP_HOST must be set".to_string())?;

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .map_err(|_| "SMTP_PORT must be a number".to_string())?;

        let smtp_username =
            env::var("SMTP_USERNAME").map_err(|_| "SMTP_USERNAME must be set".to_string())?;

        let smtp_password =
            env::var("SMTP_PASSWORD").map_err(|_| "SMTP_PASSWORD must be set".to_string())?;

        let sender_email =
            env::var("SENDER_EMAIL").map_err(|_| "SENDER_EMAIL must be set".to_string())?;

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            port,
            database_url,
            jwt_secret,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            sender_email,
            cookie_secure,
        })
    }
}
