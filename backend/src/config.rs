use shared::api::DEFAULT_MAX_IMAGE_BYTES;
use std::env;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Memory,
    DynamoDb { predictions_table: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub store: StoreBackend,
    pub frontend_dir: String,
    pub max_image_bytes: usize,
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value,
            })?,
            None => 8081,
        };

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let store = match lookup("STORE_BACKEND").as_deref().unwrap_or("memory") {
            "memory" => StoreBackend::Memory,
            "dynamodb" => StoreBackend::DynamoDb {
                predictions_table: lookup("DYNAMODB_PREDICTIONS_TABLE")
                    .ok_or(ConfigError::Missing("DYNAMODB_PREDICTIONS_TABLE"))?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let frontend_dir = lookup("FRONTEND_DIR").unwrap_or_else(|| {
            match lookup("CARGO_MANIFEST_DIR") {
                Some(manifest_dir) => format!("{}/../frontend/dist", manifest_dir),
                None => "/usr/src/app/frontend/dist".to_string(),
            }
        });

        let max_image_bytes = match lookup("MAX_IMAGE_BYTES") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "MAX_IMAGE_BYTES",
                value,
            })?,
            None => DEFAULT_MAX_IMAGE_BYTES,
        };

        Ok(Self {
            port,
            jwt_secret,
            store,
            frontend_dir,
            max_image_bytes,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
