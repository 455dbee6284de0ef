//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses; services construct them from port failures.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::TraceId;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// The requested resource does not exist or is not owned by the caller.
    NotFound,
    /// The caller's wallet cannot cover a metered operation.
    InsufficientCredits,
    /// A credit grant carried a non-positive amount.
    InvalidCreditAmount,
    /// The model replied with JSON that could not be recovered.
    #[serde(rename = "INVALID_LLM_RESPONSE")]
    InvalidLlmResponse,
    /// The model vendor failed after all retries.
    #[serde(rename = "LLM_REQUEST_FAILED")]
    LlmRequestFailed,
    /// A backing service (database pool) is temporarily unavailable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

impl ErrorCode {
    fn fallback_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::InsufficientCredits => "insufficient credits",
            Self::InvalidCreditAmount => "credit amount must be positive",
            Self::InvalidLlmResponse => "invalid response from language model",
            Self::LlmRequestFailed => "language model request failed",
            Self::ServiceUnavailable => "service unavailable",
            Self::InternalError => "Internal server error",
        }
    }
}

/// Error payload shared by every layer.
///
/// ## Invariants
/// - `message` is non-empty once trimmed of whitespace.
/// - `trace_id`, when present, is non-empty.
///
/// # Examples
/// ```
/// use pantry_backend::domain::{Error, ErrorCode};
///
/// let err = Error::new(ErrorCode::NotFound, "missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    #[schema(example = "INSUFFICIENT_CREDITS")]
    code: ErrorCode,
    #[schema(example = "insufficient credits")]
    message: String,
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    details: Option<Value>,
}

/// Validation errors emitted by the fallible constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    /// The message was blank.
    #[error("error message must not be empty")]
    EmptyMessage,
    /// The trace identifier was blank.
    #[error("trace identifier must not be empty")]
    EmptyTraceId,
}

impl Error {
    /// Create a new error, capturing the trace identifier in scope.
    ///
    /// A blank message is replaced by the code's generic description so the
    /// invariant holds without panicking.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            code.fallback_message().to_owned()
        } else {
            message
        };
        Self {
            code,
            message,
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    /// Fallible constructor that validates the message content.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self::new(code, message))
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Correlation identifier captured when the error was built.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Supplementary error details for adapters.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach a trace identifier, replacing any captured one.
    #[must_use]
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.trace_id = if id.trim().is_empty() { None } else { Some(id) };
        self
    }

    /// Attach a trace identifier, rejecting blank values.
    pub fn try_with_trace_id(self, id: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ErrorValidationError::EmptyTraceId);
        }
        Ok(self.with_trace_id(id))
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use pantry_backend::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("bad").with_details(json!({ "field": "servings" }));
    /// assert!(err.details().is_some());
    /// ```
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::InsufficientCredits`].
    pub fn insufficient_credits(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientCredits, message)
    }

    /// Convenience constructor for [`ErrorCode::InvalidCreditAmount`].
    pub fn invalid_credit_amount(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidCreditAmount, message)
    }

    /// Convenience constructor for [`ErrorCode::InvalidLlmResponse`].
    pub fn invalid_llm_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidLlmResponse, message)
    }

    /// Convenience constructor for [`ErrorCode::LlmRequestFailed`].
    pub fn llm_request_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::LlmRequestFailed, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            trace_id: value.trace_id,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            trace_id,
            details,
        } = value;
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        if trace_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(ErrorValidationError::EmptyTraceId);
        }
        // Decoded payloads carry their own correlation id, never the ambient one.
        Ok(Self {
            code,
            message,
            trace_id,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

    #[fixture]
    fn expected_trace_id() -> String {
        TRACE_ID.to_owned()
    }

    #[rstest]
    fn try_new_rejects_empty_messages() {
        let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
        assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
    }

    #[rstest]
    fn new_substitutes_generic_message_for_blank_input() {
        let err = Error::new(ErrorCode::InsufficientCredits, " ");
        assert_eq!(err.message(), "insufficient credits");
    }

    #[rstest]
    fn try_with_trace_id_rejects_empty_values() {
        let result = Error::invalid_request("bad").try_with_trace_id("   ");
        assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
    }

    #[rstest]
    fn new_returns_none_when_trace_id_out_of_scope() {
        assert!(Error::internal("boom").trace_id().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn new_captures_trace_id_in_scope(expected_trace_id: String) {
        let trace_id: TraceId = expected_trace_id.parse().expect("valid UUID");
        let error = TraceId::scope(trace_id, async move { Error::internal("boom") }).await;
        assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
    }

    #[rstest]
    #[case(ErrorCode::InsufficientCredits, "\"INSUFFICIENT_CREDITS\"")]
    #[case(ErrorCode::InvalidLlmResponse, "\"INVALID_LLM_RESPONSE\"")]
    #[case(ErrorCode::LlmRequestFailed, "\"LLM_REQUEST_FAILED\"")]
    #[case(ErrorCode::InvalidCreditAmount, "\"INVALID_CREDIT_AMOUNT\"")]
    fn codes_serialise_in_screaming_snake_case(#[case] code: ErrorCode, #[case] expected: &str) {
        assert_eq!(serde_json::to_string(&code).expect("serialise"), expected);
    }

    #[rstest]
    fn payload_uses_snake_case_fields(expected_trace_id: String) {
        let err = Error::forbidden("nope")
            .with_trace_id(expected_trace_id.clone())
            .with_details(json!({"pantry_id": "p"}));
        let value = serde_json::to_value(&err).expect("serialise");
        assert_eq!(
            value,
            json!({
                "code": "FORBIDDEN",
                "message": "nope",
                "trace_id": expected_trace_id,
                "details": {"pantry_id": "p"},
            })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn decoding_ignores_ambient_trace(expected_trace_id: String) {
        let trace_id: TraceId = expected_trace_id.parse().expect("valid UUID");
        let decoded = TraceId::scope(trace_id, async move {
            serde_json::from_value::<Error>(json!({"code": "NOT_FOUND", "message": "gone"}))
                .expect("decode")
        })
        .await;
        assert!(decoded.trace_id().is_none());
    }

    #[rstest]
    fn decoding_rejects_blank_message() {
        let result = serde_json::from_value::<Error>(json!({"code": "NOT_FOUND", "message": ""}));
        assert!(result.is_err());
    }
}
