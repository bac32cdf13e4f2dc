use thiserror::Error;

/// Failures while decoding wire data into values and messages.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("incomplete frame")]
    Incomplete,
    #[error("frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {kind} value: {reason}")]
    InvalidValue { kind: &'static str, reason: String },
    #[error("message header lacks {0}")]
    MissingHeader(&'static str),
    #[error("message header {key} out of range: {value}")]
    HeaderOutOfRange { key: &'static str, value: i64 },
    #[error("unknown message {ns}/{id}")]
    UnknownKind { ns: i32, id: i32 },
    #[error("message {ns}/{id}: argument {index} missing or mistyped")]
    BadArgument { ns: i32, id: i32, index: usize },
}

/// Tree mutations rejected because they contradict the local state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("splice index {index} beyond {len} children")]
    IndexOutOfRange { index: usize, len: usize },
}
