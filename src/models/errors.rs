use thiserror::Error;

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Channel not found: {id}")]
    ChannelNotFound { id: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },

    #[error("Video provider error: {source}")]
    Provider {
        #[from]
        source: ProviderError,
    },

    #[error("Auth error: {source}")]
    Auth {
        #[from]
        source: AuthError,
    },

    #[error("Webhook error: {source}")]
    Webhook {
        #[from]
        source: WebhookError,
    },
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database connection failed")]
    ConnectionFailed,

    #[error("Item not found")]
    NotFound,

    #[error("Unique constraint violated: {message}")]
    UniqueViolation { message: String },

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("PostgREST error: status={status}, code={code}, message={message}")]
    Postgrest {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP transport error: {message}")]
    Http { message: String },

    #[error("Timeout occurred during operation")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Errors raised by the video provider client
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Video provider rejected credentials")]
    Unauthorized,

    #[error("Video provider rate limit exceeded")]
    RateLimited,

    #[error("Video provider API error: status={status}, message={message}")]
    Api { status: u16, message: String },

    #[error("Video provider returned an invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP transport error: {message}")]
    Http { message: String },

    #[error("Timeout occurred calling video provider")]
    Timeout,
}

/// Errors raised while authenticating a request
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing access token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Auth provider error: status={status}, message={message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP transport error: {message}")]
    Http { message: String },
}

impl AuthError {
    /// True when the caller's credentials were rejected, as opposed to the provider failing
    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::MissingToken | AuthError::InvalidToken)
    }
}

/// Errors raised while verifying or applying a provider webhook
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Malformed signature header: {message}")]
    MalformedSignature { message: String },

    #[error("Signature timestamp outside tolerance: age={age_seconds}s")]
    StaleTimestamp { age_seconds: u64 },

    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Invalid webhook payload: {message}")]
    InvalidPayload { message: String },

    #[error("Webhook secret is not usable as an HMAC key")]
    InvalidSecret,
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field too long: {field}, max_length={max_length}, actual_length={actual_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("Invalid format: {field}, expected={expected}")]
    InvalidFormat { field: String, expected: String },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type alias for video provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ServiceError::ChannelNotFound {
            id: "c-1".to_string(),
        };
        assert_eq!(error.to_string(), "Channel not found: c-1");

        let validation_error = ValidationError::RequiredField {
            field: "title".to_string(),
        };
        assert_eq!(validation_error.to_string(), "Required field missing: title");
    }

    #[test]
    fn test_error_conversion() {
        let validation_error = ValidationError::InvalidFormat {
            field: "email".to_string(),
            expected: "a valid email address".to_string(),
        };

        let service_error: ServiceError = validation_error.into();
        match service_error {
            ServiceError::ValidationError { message } => {
                assert!(message.contains("Invalid format"));
            }
            _ => panic!("Expected ValidationError conversion"),
        }
    }

    #[test]
    fn test_repository_error_from_serde() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_error.is_err());

        let repo_error: RepositoryError = json_error.unwrap_err().into();
        match repo_error {
            RepositoryError::Serialization { .. } => {}
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_layer_errors_lift_into_service_error() {
        let service_error: ServiceError = ProviderError::RateLimited.into();
        assert!(matches!(service_error, ServiceError::Provider { .. }));

        let service_error: ServiceError = AuthError::InvalidToken.into();
        assert!(matches!(service_error, ServiceError::Auth { .. }));

        let service_error: ServiceError = WebhookError::SignatureMismatch.into();
        assert!(matches!(service_error, ServiceError::Webhook { .. }));
    }

    #[test]
    fn test_auth_error_rejection_classification() {
        assert!(AuthError::MissingToken.is_rejection());
        assert!(AuthError::InvalidToken.is_rejection());
        assert!(!AuthError::Upstream {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_rejection());
    }
}
