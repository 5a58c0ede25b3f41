use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use borongan_engine::BoronganError;
use log::*;
use thiserror::Error;

pub const GATEWAY_UNAVAILABLE_MESSAGE: &str = "Payment processing is unavailable. Please try again.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("{0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    NoRecordFound(String),
    #[error("{0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{GATEWAY_UNAVAILABLE_MESSAGE}")]
    GatewayUnavailable,
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCallbackSignature(_) => StatusCode::UNAUTHORIZED,
                AuthError::InvalidInternalKey => StatusCode::FORBIDDEN,
                AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("{0}")]
    InvalidCallbackSignature(String),
    #[error("Invalid internal API key.")]
    InvalidInternalKey,
    #[error("Authentication is not configured on this server.")]
    NotConfigured,
}

impl From<BoronganError> for ServerError {
    fn from(e: BoronganError) -> Self {
        match e {
            BoronganError::DatabaseError(e) => {
                error!("💻️ Database error: {e}");
                Self::BackendError("Database error".into())
            },
            BoronganError::NotFound(s) => Self::NoRecordFound(s),
            BoronganError::InvalidState(s) => Self::InvalidState(s),
            BoronganError::Forbidden(s) => Self::InsufficientPermissions(s),
            BoronganError::Conflict(s) => Self::Conflict(s),
            BoronganError::InvalidArgument(s) => Self::InvalidRequestBody(s),
            BoronganError::Unauthorized(s) => Self::AuthenticationError(AuthError::InvalidCallbackSignature(s)),
            BoronganError::DependencyFailure(s) => {
                warn!("💻️ Payment gateway failure: {s}");
                Self::GatewayUnavailable
            },
        }
    }
}
