use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub token_secret: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;

        let token_secret = env::var("TOKEN_SECRET")
            .map_err(|_| crate::error::AppError::Config("TOKEN_SECRET missing".into()))?;
        if token_secret.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "TOKEN_SECRET must not be empty".into(),
            ));
        }

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4000);

        Ok(Self {
            database_url,
            token_secret,
            port,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            token_secret: "test-secret".into(),
            port: 4000,
        }
    }
}
