use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),

    #[error("Valid Bearer token required")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable code reported in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Error::DeviceNotFound(_) => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::InvalidJson(_) => "BAD_REQUEST",
            Error::Unauthorized => "UNAUTHORIZED",
            Error::Internal(_) | Error::Config(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_violations() {
        let err = Error::Validation(vec![
            "device_id is required".to_string(),
            "humidity must be between 0 and 100 percent".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: device_id is required; humidity must be between 0 and 100 percent"
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(Error::DeviceNotFound("dev-1".into()).code(), "NOT_FOUND");
        assert_eq!(Error::Validation(vec![]).code(), "VALIDATION_ERROR");
        assert_eq!(Error::Internal("boom".into()).code(), "INTERNAL_ERROR");
        assert_eq!(Error::Unauthorized.code(), "UNAUTHORIZED");
    }
}
