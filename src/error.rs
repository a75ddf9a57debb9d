//! Error type for message composition and delivery

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
};

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The errors that may occur while composing or sending a message
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Bytes could not be decoded to text with the requested encoding
    TextDecode(TextDecodeError),
    /// The message cannot be sent or rendered as it is
    InvalidMessage(&'static str),
    /// A header contains a line break that is not valid folding
    BadHeader,
    /// An address could not be encoded or used for the envelope
    Address(String),
    /// A configuration value is invalid
    Config {
        /// Settings key holding the value
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
    /// Error reported by the SMTP transport
    Transport(BoxError),
}

impl Error {
    /// Wraps a transport failure
    pub fn transport<E: Into<BoxError>>(err: E) -> Self {
        Error::Transport(err.into())
    }

    pub(crate) fn config<R: Into<String>>(key: &'static str, reason: R) -> Self {
        Error::Config {
            key,
            reason: reason.into(),
        }
    }

    /// Returns true if the error comes from the transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Returns true if the message was rejected for a header injection
    pub fn is_bad_header(&self) -> bool {
        matches!(self, Error::BadHeader)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::TextDecode(err) => Display::fmt(err, f),
            Error::InvalidMessage(reason) => write!(f, "invalid message: {reason}"),
            Error::BadHeader => f.write_str("header injection attempt detected"),
            Error::Address(address) => write!(f, "invalid address: {address}"),
            Error::Config { key, reason } => write!(f, "invalid setting {key}: {reason}"),
            Error::Transport(err) => write!(f, "transport error: {err}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::TextDecode(err) => Some(err),
            Error::Transport(err) => {
                let err: &(dyn StdError + 'static) = &**err;
                Some(err)
            }
            _ => None,
        }
    }
}

impl From<TextDecodeError> for Error {
    fn from(err: TextDecodeError) -> Self {
        Error::TextDecode(err)
    }
}

impl From<lettre::transport::smtp::Error> for Error {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

/// Bytes that could not be decoded, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDecodeError {
    original: Vec<u8>,
    encoding: String,
    reason: String,
}

impl TextDecodeError {
    pub(crate) fn new<E: Into<String>, R: Into<String>>(
        original: &[u8],
        encoding: E,
        reason: R,
    ) -> Self {
        Self {
            original: original.to_vec(),
            encoding: encoding.into(),
            reason: reason.into(),
        }
    }

    /// The value that failed to decode
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    /// The encoding label that was requested
    pub fn encoding(&self) -> &str {
        &self.encoding
    }
}

impl Display for TextDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}): {} codec can't decode",
            self.reason,
            String::from_utf8_lossy(&self.original),
            self.encoding
        )
    }
}

impl StdError for TextDecodeError {}
