use thiserror::Error;

/// Machine-readable tag carried on [`Error::InvalidRequest`]: the fixed vocabulary of
/// protocol-shape errors that an editor needs to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorCode {
    PathFormat,
    AttachPortRequired,
    CompletionsStackFrameNotValid,
    SourceRequestIllegalHandle,
    SetValueNotSupported,
    ErrorFromEvaluate,
}

impl RequestErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestErrorCode::PathFormat => "pathFormat",
            RequestErrorCode::AttachPortRequired => "attach.portRequired",
            RequestErrorCode::CompletionsStackFrameNotValid => "completionsStackFrameNotValid",
            RequestErrorCode::SourceRequestIllegalHandle => "sourceRequestIllegalHandle",
            RequestErrorCode::SetValueNotSupported => "setValueNotSupported",
            RequestErrorCode::ErrorFromEvaluate => "errorFromEvaluate",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("DAP error: {0}")]
    Dap(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("RPC transport error: {0}")]
    Rpc(String),

    #[error("[{}] {1}", .0.as_str())]
    InvalidRequest(RequestErrorCode, String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// DAP `ErrorResponse.body.error.id`: a JSON-RPC-style negative-range
    /// code, otherwise opaque and adapter-local.
    pub fn error_code(&self) -> i32 {
        match self {
            Error::SessionNotFound(_) => -32001,
            Error::InvalidState(_) => -32002,
            Error::Dap(_) => -32003,
            Error::Cdp(_) => -32004,
            Error::Rpc(_) => -32005,
            Error::InvalidRequest(..) => -32600,
            Error::Timeout(_) => -32050,
            Error::Internal(_) => -32603,
            Error::Io(_) | Error::Json(_) => -32603,
        }
    }

    pub fn path_format(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(RequestErrorCode::PathFormat, msg.into())
    }

    pub fn attach_port_required() -> Self {
        Error::InvalidRequest(
            RequestErrorCode::AttachPortRequired,
            "attach requires a port".to_string(),
        )
    }

    pub fn completions_stack_frame_not_valid() -> Self {
        Error::InvalidRequest(
            RequestErrorCode::CompletionsStackFrameNotValid,
            "frameId does not refer to a current stack frame".to_string(),
        )
    }

    pub fn source_request_illegal_handle() -> Self {
        Error::InvalidRequest(
            RequestErrorCode::SourceRequestIllegalHandle,
            "sourceReference does not refer to a known source".to_string(),
        )
    }

    pub fn set_value_not_supported(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(RequestErrorCode::SetValueNotSupported, msg.into())
    }

    pub fn error_from_evaluate(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(RequestErrorCode::ErrorFromEvaluate, msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_carries_code_in_display() {
        let err = Error::attach_port_required();
        assert!(err.to_string().contains("attach.portRequired"));
    }

    #[test]
    fn error_code_is_stable_per_variant() {
        assert_eq!(Error::SessionNotFound("x".into()).error_code(), -32001);
        assert_eq!(Error::Timeout("x".into()).error_code(), -32050);
    }
}
