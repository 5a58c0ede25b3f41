use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TripayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request to Tripay failed: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Tripay rejected the request: {0}")]
    Rejected(String),
    #[error("Tripay returned an empty response")]
    EmptyResponse,
    #[error("Could not sign request: {0}")]
    Signature(String),
}
