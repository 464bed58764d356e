//! Error types for gateway operations

use crate::legacy::TransactionResponse;
use crate::soap::SoapStatus;
use thiserror::Error;

/// Gateway error taxonomy.
///
/// The three processor-facing kinds are distinct: a
/// `Connection` failure means the outcome of the request is unknown, while a
/// `Response` failure is an explicit rejection by the processor. Neither is
/// retried by this crate.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Local pre-flight rejection; no request was sent
    #[error("Invalid data: {0}")]
    Validation(String),

    /// Transport failure, SOAP fault or unreadable response
    #[error("Connection error: {0}")]
    Connection(String),

    /// The processor declined or rejected the request
    #[error("{reason}")]
    Response {
        /// Human-readable reason (legacy reason text or `"<code>: <text>"`)
        reason: String,
        /// Structured response as returned by the processor
        response: Box<ProcessorResponse>,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// The structured processor response, for `Response` errors.
    pub fn response(&self) -> Option<&ProcessorResponse> {
        match self {
            Self::Response { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }

    /// The parsed legacy field map, when the rejection came from a
    /// delimited transaction response.
    pub fn transaction_response(&self) -> Option<&TransactionResponse> {
        match self.response() {
            Some(ProcessorResponse::Transaction(fields)) => Some(fields),
            _ => None,
        }
    }

    /// Whether the error happened before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the request outcome is unknown.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether the processor explicitly rejected the request.
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response { .. })
    }
}

/// Structured processor response attached to [`GatewayError::Response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorResponse {
    /// Delimited response from the transaction protocol (or a profile
    /// transaction's direct response)
    Transaction(TransactionResponse),
    /// Result code and messages from a SOAP service
    Soap(SoapStatus),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Connection(err.to_string())
    }
}

impl From<quick_xml::DeError> for GatewayError {
    fn from(err: quick_xml::DeError) -> Self {
        GatewayError::Connection(format!("malformed SOAP response: {}", err))
    }
}

impl From<quick_xml::SeError> for GatewayError {
    fn from(err: quick_xml::SeError) -> Self {
        GatewayError::Connection(format!("could not encode SOAP request: {}", err))
    }
}

impl From<quick_xml::Error> for GatewayError {
    fn from(err: quick_xml::Error) -> Self {
        GatewayError::Connection(format!("malformed SOAP response: {}", err))
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
