use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::operation::RequestId;
use std::fmt;
use thiserror::Error;

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Sns,
    Sqs,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sns => f.write_str("SNS"),
            Self::Sqs => f.write_str("SQS"),
        }
    }
}

/// Which side of the exchange a fault is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Sender,
    Receiver,
    Unknown,
}

impl ErrorType {
    pub const fn from_status(status: Option<u16>) -> Self {
        match status {
            Some(400..=499) => Self::Sender,
            Some(500..=599) => Self::Receiver,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => f.write_str("Sender"),
            Self::Receiver => f.write_str("Receiver"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// A fault raised by the notification or queue service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} {operation} failed: {message}")]
pub struct ServiceFault {
    pub service: Service,
    pub operation: &'static str,
    pub message: String,
    pub status_code: Option<u16>,
    pub error_code: Option<String>,
    pub error_type: ErrorType,
    pub request_id: Option<String>,
}

impl ServiceFault {
    pub fn from_sdk<E>(service: Service, operation: &'static str, err: SdkError<E>) -> Self
    where
        E: ProvideErrorMetadata + RequestId + std::error::Error + 'static,
    {
        let status_code = err.raw_response().map(|raw| raw.status().as_u16());
        let (error_code, message, request_id) = match err.as_service_error() {
            Some(service_err) => (
                service_err.code().map(ToString::to_string),
                service_err.message().map(ToString::to_string),
                service_err.request_id().map(ToString::to_string),
            ),
            None => (None, None, None),
        };

        Self {
            service,
            operation,
            message: message.unwrap_or_else(|| DisplayErrorContext(&err).to_string()),
            status_code,
            error_code,
            error_type: ErrorType::from_status(status_code),
            request_id,
        }
    }

    /// Lines printed to the operator when the run is aborted by this fault.
    pub fn report_lines(&self) -> Vec<String> {
        let or_none = |v: Option<&str>| v.unwrap_or("(none)").to_string();
        vec![
            format!("Caught Exception: {}", self.message),
            format!(
                "Response Status Code: {}",
                self.status_code
                    .map_or_else(|| "(none)".to_string(), |s| s.to_string())
            ),
            format!("Error Code: {}", or_none(self.error_code.as_deref())),
            format!("Error Type: {}", self.error_type),
            format!("Request ID: {}", or_none(self.request_id.as_deref())),
        ]
    }
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error(transparent)]
    Service(#[from] ServiceFault),

    #[error("{operation} response did not include {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Invalid queue access policy: {0}")]
    Policy(#[from] serde_json::Error),

    #[error("Failed to read subscription confirmation: {0}")]
    Confirmation(#[from] std::io::Error),
}

impl ProvisionError {
    pub fn report_lines(&self) -> Vec<String> {
        match self {
            Self::Service(fault) => fault.report_lines(),
            other => vec![format!("Caught Exception: {other}")],
        }
    }
}
