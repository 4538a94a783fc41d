/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `PUBLIC_BASE_URL`: External base URL used in emailed links
///   (default: http://localhost:8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `JWT_SECRET`: Secret key for JWT signing (required, >= 32 chars)
/// - `ACCESS_TOKEN_EXPIRE_MINUTES`: Access token lifetime (default: 30)
/// - `REFRESH_TOKEN_EXPIRE_WEEKS`: Refresh token lifetime (default: 4)
/// - `ACTIVATION_TOKEN_EXPIRE_MINUTES`: Activation/reset token lifetime
///   (default: 60)
/// - `RUST_LOG`: Log level (default: info)
///
/// # Example
///
/// ```no_run
/// use taskhive_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```
use serde::{Deserialize, Serialize};
use std::env;

use taskhive_shared::auth::token::JwtConfig;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtSettings,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// External base URL for links delivered by email
    pub public_base_url: String,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,

    /// Refresh token lifetime in weeks
    pub refresh_ttl_weeks: i64,

    /// Activation and password-reset token lifetime in minutes
    pub activation_ttl_minutes: i64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_ttl_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<i64>()?;

        let refresh_ttl_weeks = env::var("REFRESH_TOKEN_EXPIRE_WEEKS")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<i64>()?;

        let activation_ttl_minutes = env::var("ACTIVATION_TOKEN_EXPIRE_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<i64>()?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                public_base_url,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtSettings {
                secret: jwt_secret,
                access_ttl_minutes,
                refresh_ttl_weeks,
                activation_ttl_minutes,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Builds the token signing configuration from the JWT settings
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.jwt.secret.clone(),
            access_ttl_minutes: self.jwt.access_ttl_minutes,
            refresh_ttl_weeks: self.jwt.refresh_ttl_weeks,
            activation_ttl_minutes: self.jwt.activation_ttl_minutes,
        }
    }

    /// Builds the activation link delivered after sign-up
    pub fn activation_link(&self, token: &str) -> String {
        format!(
            "{}/v1/auth/activate?token={}",
            self.api.public_base_url.trim_end_matches('/'),
            token
        )
    }

    /// Builds the password reset link delivered on request
    pub fn password_reset_link(&self, token: &str) -> String {
        format!(
            "{}/v1/auth/password_reset?token={}",
            self.api.public_base_url.trim_end_matches('/'),
            token
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                public_base_url: "http://localhost:8080/".to_string(),
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtSettings {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                access_ttl_minutes: 30,
                refresh_ttl_weeks: 4,
                activation_ttl_minutes: 60,
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_activation_link_strips_trailing_slash() {
        let link = test_config().activation_link("abc.def.ghi");
        assert_eq!(link, "http://localhost:8080/v1/auth/activate?token=abc.def.ghi");
    }

    #[test]
    fn test_jwt_config_carries_lifetimes() {
        let jwt = test_config().jwt_config();
        assert_eq!(jwt.access_ttl_minutes, 30);
        assert_eq!(jwt.refresh_ttl_weeks, 4);
        assert_eq!(jwt.activation_ttl_minutes, 60);
    }
}
