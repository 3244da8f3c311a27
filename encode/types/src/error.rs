/*!
    Media-level error types shared by encode backends.
*/

use thiserror::Error;

/**
    Failure reported by a media backend while opening an encoder,
    encoding, or writing the container.
*/
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Encoder refused to open or to take a frame.
    #[error("codec error: {message}")]
    Codec { message: String },
    /// Header, packet or trailer write failure.
    #[error("mux error: {message}")]
    Mux { message: String },
    /// Raw input that does not match its declared layout.
    #[error("invalid data: {message}")]
    InvalidData { message: String },
    /// Input the encoder or container cannot take.
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },
}

impl Error {
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    pub fn mux(message: impl Into<String>) -> Self {
        Self::Mux {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn error_display() {
        let e = Error::codec("encode failed");
        assert_eq!(format!("{e}"), "codec error: encode failed");

        let e = Error::mux("trailer rejected");
        assert_eq!(format!("{e}"), "mux error: trailer rejected");

        let e = Error::invalid_data("short sample buffer");
        assert_eq!(format!("{e}"), "invalid data: short sample buffer");

        let e = Error::unsupported_format("unknown codec");
        assert_eq!(format!("{e}"), "unsupported format: unknown codec");

    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(format!("{e}").contains("file not found"));
    }

    #[test]
    fn error_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let e = Error::Io(io_err);
        assert!(StdError::source(&e).is_some());
        assert!(StdError::source(&Error::codec("test")).is_none());
    }
}
