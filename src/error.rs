//! Error types for collection-level operations.
use bson::{self, oid, Bson};
use crate::coll::error::{BulkWriteException, WriteException};
use std::{error, fmt, sync};

/// A type for results generated by collection operations.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Server error codes the driver interprets itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadValue = 2,
    FailedToParse = 9,
    CursorNotFound = 43,
    NamespaceNotFound = 26,
    CommandNotFound = 59,
    WriteConcernFailed = 64,
    DocumentValidationFailure = 121,
    BsonObjectTooLarge = 10334,
    DuplicateKey = 11000,
}

impl ErrorCode {
    /// Maps a raw server code onto a known error code, if it is one.
    pub fn from_i32(code: i32) -> Option<ErrorCode> {
        match code {
            2 => Some(ErrorCode::BadValue),
            9 => Some(ErrorCode::FailedToParse),
            43 => Some(ErrorCode::CursorNotFound),
            26 => Some(ErrorCode::NamespaceNotFound),
            59 => Some(ErrorCode::CommandNotFound),
            64 => Some(ErrorCode::WriteConcernFailed),
            121 => Some(ErrorCode::DocumentValidationFailure),
            10334 => Some(ErrorCode::BsonObjectTooLarge),
            11000 | 11001 | 12582 => Some(ErrorCode::DuplicateKey),
            _ => None,
        }
    }
}

/// The error type for collection operations.
#[derive(Debug)]
pub enum Error {
    /// The caller supplied invalid arguments; nothing was sent to the server.
    ArgumentError(String),
    /// A value could not be encoded into a document.
    EncoderError(bson::EncoderError),
    /// A document could not be decoded into the requested type.
    DecoderError(bson::DecoderError),
    /// A codec rejected a value for a reason other than serialization.
    CodecError(String),
    /// An ObjectId could not be generated.
    OIDError(oid::Error),
    /// The server reply did not have the expected shape.
    ResponseError(String),
    /// The transport failed to deliver the command or its reply.
    TransportError(String),
    /// The server rejected the command as a whole.
    CommandError {
        code: i32,
        code_name: Option<String>,
        message: String,
    },
    /// A single-document write was rejected.
    WriteError(WriteException),
    /// One or more writes of a bulk operation were rejected.
    BulkWriteError(BulkWriteException),
    /// The operation was cancelled before a reply was received.
    Cancelled,
    /// The cursor was closed and can no longer be read.
    CursorClosed,
    /// A lock guarding shared state was poisoned.
    PoisonLockError,
}

impl Error {
    /// Builds a command error out of an `ok: 0` server reply.
    pub fn from_command_reply(reply: &bson::Document) -> Error {
        let code = match reply.get("code") {
            Some(&Bson::I32(code)) => code,
            Some(&Bson::I64(code)) => code as i32,
            Some(&Bson::FloatingPoint(code)) => code as i32,
            _ => 0,
        };

        let code_name = match reply.get("codeName") {
            Some(&Bson::String(ref name)) => Some(name.to_owned()),
            _ => None,
        };

        let message = match reply.get("errmsg") {
            Some(&Bson::String(ref msg)) => msg.to_owned(),
            _ => String::from("Command failed without an error message."),
        };

        Error::CommandError {
            code: code,
            code_name: code_name,
            message: message,
        }
    }

    /// Returns the server error code carried by this error, if any.
    pub fn code(&self) -> Option<i32> {
        match *self {
            Error::CommandError { code, .. } => Some(code),
            Error::WriteError(ref inner) => {
                inner.write_error.as_ref().map(|e| e.code)
                    .or_else(|| inner.write_concern_error.as_ref().map(|e| e.code))
            }
            _ => None,
        }
    }

    /// Whether this error reports a duplicate key violation.
    pub fn is_duplicate_key(&self) -> bool {
        self.code().and_then(ErrorCode::from_i32) == Some(ErrorCode::DuplicateKey)
    }
}

impl From<bson::EncoderError> for Error {
    fn from(err: bson::EncoderError) -> Error {
        Error::EncoderError(err)
    }
}

impl From<bson::DecoderError> for Error {
    fn from(err: bson::DecoderError) -> Error {
        Error::DecoderError(err)
    }
}

impl From<oid::Error> for Error {
    fn from(err: oid::Error) -> Error {
        Error::OIDError(err)
    }
}

impl From<WriteException> for Error {
    fn from(err: WriteException) -> Error {
        Error::WriteError(err)
    }
}

impl From<BulkWriteException> for Error {
    fn from(err: BulkWriteException) -> Error {
        Error::BulkWriteError(err)
    }
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Error {
        Error::PoisonLockError
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::ArgumentError(ref inner) => inner.fmt(fmt),
            Error::EncoderError(ref inner) => inner.fmt(fmt),
            Error::DecoderError(ref inner) => inner.fmt(fmt),
            Error::CodecError(ref inner) => inner.fmt(fmt),
            Error::OIDError(ref inner) => inner.fmt(fmt),
            Error::ResponseError(ref inner) => inner.fmt(fmt),
            Error::TransportError(ref inner) => inner.fmt(fmt),
            Error::CommandError { code, ref code_name, ref message } => {
                match *code_name {
                    Some(ref name) => write!(fmt, "Command failed ({} {}): {}", code, name, message),
                    None => write!(fmt, "Command failed ({}): {}", code, message),
                }
            }
            Error::WriteError(ref inner) => inner.fmt(fmt),
            Error::BulkWriteError(ref inner) => inner.fmt(fmt),
            Error::Cancelled => fmt.write_str("Operation was cancelled."),
            Error::CursorClosed => fmt.write_str("Cursor has been closed."),
            Error::PoisonLockError => fmt.write_str("Lock poisoned."),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::EncoderError(ref inner) => Some(inner),
            Error::DecoderError(ref inner) => Some(inner),
            Error::OIDError(ref inner) => Some(inner),
            Error::WriteError(ref inner) => Some(inner),
            Error::BulkWriteError(ref inner) => Some(inner),
            _ => None,
        }
    }
}
