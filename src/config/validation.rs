use std::net::SocketAddr;

use crate::config::models::ServerConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// A configured key that no directive answers to. Not an error: such keys are
/// dropped at resolution, but they are usually typos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedKey {
    /// Position of the item in the specification
    pub item: usize,
    pub key: String,
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_file_name(&config.file_name) {
            errors.push(e);
        }

        if config.logging.level.trim().is_empty() {
            errors.push(ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: "Log level must not be empty".to_string(),
            });
        }

        for (field, dir) in [
            ("root_dir", &config.root_dir),
            ("src_dir", &config.src_dir),
            ("static_dir", &config.static_dir),
            ("generate_dir", &config.generate_dir),
        ] {
            if dir.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: field.to_string(),
                    message: "Directory must not be empty (use '.' for the current directory)"
                        .to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Keys in the configured specification that will be ignored.
    pub fn unrecognized_keys(config: &ServerConfig) -> Vec<UnrecognizedKey> {
        let Some(spec) = &config.robots else {
            return Vec::new();
        };
        spec.items()
            .iter()
            .enumerate()
            .flat_map(|(index, item)| {
                item.unrecognized_keys().map(move |key| UnrecognizedKey {
                    item: index,
                    key: key.to_string(),
                })
            })
            .collect()
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// The file name doubles as the URL path, so it must be a single segment.
    fn validate_file_name(name: &str) -> ValidationResult<()> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ValidationError::InvalidField {
                field: "file_name".to_string(),
                message: format!("'{name}' must be a plain file name such as 'robots.txt'"),
            });
        }
        Ok(())
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        let mut message = format!("Found {} validation error(s):\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
