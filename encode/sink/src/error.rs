/*!
    Session-level errors.
*/

use thiserror::Error;

use encode_types::Medium;

/**
    Error returned by fallible encode session entry points.

    Two classes exist: structural misuse, which means the caller broke the
    session's ordering rules and should not retry, and fatal session errors,
    which mean the output cannot be produced. Degrading failures and timestamp
    anomalies are logged and repaired instead of being returned.
*/
#[derive(Debug, Error)]
pub enum Error {
    #[error("no output format matches name {name:?} and file {file:?}")]
    FormatNotFound { name: Option<String>, file: String },

    #[error("{medium} encoder {name:?} not found")]
    EncoderNotFound { medium: Medium, name: Option<String> },

    #[error("cannot add a {0} stream after the header was written")]
    StreamAfterHeader(Medium),

    #[error("a {0} stream was already allocated")]
    DuplicateStream(Medium),

    #[error("no {0} stream was configured")]
    NoStream(Medium),

    #[error("packet written before the header")]
    HeaderNotWritten,

    #[error("a previous attempt to write the header failed")]
    HeaderFailed,

    #[error("session already finished")]
    Finished,

    #[error("resolution change from {from_width}x{from_height} to {to_width}x{to_height} is not supported")]
    ResolutionChange {
        from_width: u32,
        from_height: u32,
        to_width: u32,
        to_height: u32,
    },

    #[error("invalid output configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Media(#[from] encode_types::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /**
        Returns true if this error reports a caller bug rather than a
        resource or configuration failure.
    */
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::StreamAfterHeader(_)
                | Self::DuplicateStream(_)
                | Self::NoStream(_)
                | Self::HeaderNotWritten
                | Self::Finished
                | Self::ResolutionChange { .. }
        )
    }
}

/**
    Result type alias for encode sessions.
*/
pub type Result<T> = std::result::Result<T, Error>;
