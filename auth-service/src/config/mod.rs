use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub jwt: JwtConfig,
    pub verification: VerificationConfig,
    pub smtp: SmtpConfig,
    pub dispatch: DispatchConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub private_key_path: String,
    pub public_key_path: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub code_ttl_minutes: i64,
    pub code_length: usize,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub from_email: String,
    /// Public base URL used to build the activation link in emails.
    pub base_url: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    pub queue_size: usize,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("auth-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            jwt: JwtConfig {
                private_key_path: get_env("JWT_PRIVATE_KEY_PATH", None, is_prod)?,
                public_key_path: get_env("JWT_PUBLIC_KEY_PATH", None, is_prod)?,
                access_token_expiry_minutes: parse_env(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    Some("15"),
                    is_prod,
                )?,
                refresh_token_expiry_days: parse_env(
                    "JWT_REFRESH_TOKEN_EXPIRY_DAYS",
                    Some("7"),
                    is_prod,
                )?,
            },
            verification: VerificationConfig {
                code_ttl_minutes: parse_env("VERIFICATION_CODE_TTL_MINUTES", Some("10"), is_prod)?,
                code_length: parse_env("VERIFICATION_CODE_LENGTH", Some("6"), is_prod)?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", None, is_prod)?,
                user: get_env("SMTP_USER", None, is_prod)?,
                password: get_env("SMTP_PASSWORD", None, is_prod)?,
                from_email: get_env("SMTP_FROM_EMAIL", None, is_prod)?,
                base_url: get_env("PUBLIC_BASE_URL", Some("http://localhost:8080"), is_prod)?,
            },
            dispatch: DispatchConfig {
                queue_size: parse_env("DISPATCH_QUEUE_SIZE", Some("256"), is_prod)?,
                max_attempts: parse_env("DISPATCH_MAX_ATTEMPTS", Some("3"), is_prod)?,
                initial_backoff_ms: parse_env("DISPATCH_INITIAL_BACKOFF_MS", Some("100"), is_prod)?,
                max_backoff_ms: parse_env("DISPATCH_MAX_BACKOFF_MS", Some("10000"), is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.jwt.refresh_token_expiry_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_REFRESH_TOKEN_EXPIRY_DAYS must be positive"
            )));
        }

        if self.verification.code_ttl_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "VERIFICATION_CODE_TTL_MINUTES must be positive"
            )));
        }

        if !(4..=12).contains(&self.verification.code_length) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "VERIFICATION_CODE_LENGTH must be between 4 and 12"
            )));
        }

        if self.dispatch.max_attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DISPATCH_MAX_ATTEMPTS must be at least 1"
            )));
        }

        if self.environment == Environment::Prod
            && self.security.allowed_origins.iter().any(|o| o == "*")
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?.parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} is not a valid value: {}", key, e))
    })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AuthConfig {
        AuthConfig {
            common: core_config::Config { port: 8080 },
            environment: Environment::Dev,
            service_name: "auth-service".to_string(),
            service_version: "test".to_string(),
            log_level: "debug".to_string(),
            jwt: JwtConfig {
                private_key_path: "keys/private.pem".to_string(),
                public_key_path: "keys/public.pem".to_string(),
                access_token_expiry_minutes: 15,
                refresh_token_expiry_days: 7,
            },
            verification: VerificationConfig {
                code_ttl_minutes: 10,
                code_length: 6,
            },
            smtp: SmtpConfig {
                host: "smtp.example.com".to_string(),
                user: "mailer".to_string(),
                password: "secret".to_string(),
                from_email: "noreply@example.com".to_string(),
                base_url: "http://localhost:8080".to_string(),
            },
            dispatch: DispatchConfig {
                queue_size: 256,
                max_attempts: 3,
                initial_backoff_ms: 100,
                max_backoff_ms: 10_000,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_access_ttl_is_rejected() {
        let mut config = base_config();
        config.jwt.access_token_expiry_minutes = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_code_length_is_rejected() {
        let mut config = base_config();
        config.verification.code_length = 3;
        assert!(config.validate().is_err());

        config.verification.code_length = 13;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_dispatch_attempts_is_rejected() {
        let mut config = base_config();
        config.dispatch.max_attempts = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn wildcard_origin_is_rejected_in_prod() {
        let mut config = base_config();
        config.security.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_ok());

        config.environment = Environment::Prod;
        assert!(config.validate().is_err());
    }
}
