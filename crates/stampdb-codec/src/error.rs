use thiserror::Error;

/// Errors produced while encoding or decoding values.
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error from the underlying stream (includes truncated input).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A string's modified UTF-8 form does not fit the 16-bit length prefix.
    #[error("string too long: {len} encoded bytes (max 65535)")]
    StringTooLong { len: usize },

    /// The bytes following a string length prefix are not modified UTF-8.
    #[error("malformed string: {0}")]
    MalformedString(String),

    /// A container holds more elements than the `i32` count can describe.
    #[error("too many elements: {len}")]
    TooManyElements { len: usize },

    /// Containers nest deeper than the decoder allows.
    #[error("value nesting exceeds {max} levels")]
    NestingTooDeep { max: usize },
}

pub type CodecResult<T> = Result<T, CodecError>;
