//! Write errors for collection-level operations.
use bson::{self, Bson};
use super::options::WriteModel;
use crate::common::get_integer;
use crate::{Error, Result};
use std::{error, fmt};

/// The error type for single-document write operations.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteException {
    pub write_concern_error: Option<WriteConcernError>,
    pub write_error: Option<WriteError>,
    pub message: String,
}

/// The durability requirement of a write could not be satisfied.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteConcernError {
    pub code: i32,
    pub code_name: Option<String>,
    pub message: String,
    pub details: Option<bson::Document>,
}

/// The server rejected a write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteError {
    pub code: i32,
    pub message: String,
    pub details: Option<bson::Document>,
}

/// The error struct for Bulk-Write related operations.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkWriteException {
    pub processed_requests: Vec<WriteModel>,
    pub unprocessed_requests: Vec<WriteModel>,
    pub write_errors: Vec<BulkWriteError>,
    pub write_concern_error: Option<WriteConcernError>,
    pub message: String,
}

/// A single failed request of a bulk write, located by its index in the
/// caller's original request list.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkWriteError {
    pub index: usize,
    pub code: i32,
    pub message: String,
    pub details: Option<bson::Document>,
    pub request: Option<WriteModel>,
}

impl error::Error for WriteException {}

impl error::Error for BulkWriteException {}

impl fmt::Display for WriteException {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str("WriteException: ")?;
        fmt.write_str(&self.message)
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "WriteError (code {}): {}", self.code, self.message)
    }
}

impl fmt::Display for WriteConcernError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "WriteConcernError (code {}): {}", self.code, self.message)
    }
}

impl fmt::Display for BulkWriteException {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt,
               "BulkWriteException: {} processed, {} unprocessed",
               self.processed_requests.len(),
               self.unprocessed_requests.len())?;

        if let Some(ref error) = self.write_concern_error {
            write!(fmt, "; {}", error)?;
        }

        for v in &self.write_errors {
            write!(fmt, "; {}", v)?;
        }

        Ok(())
    }
}

impl fmt::Display for BulkWriteError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt,
               "BulkWriteError at index {} (code {}): {}",
               self.index,
               self.code,
               self.message)
    }
}

impl WriteException {
    /// Returns a new WriteException containing the given errors.
    pub fn new(wc_err: Option<WriteConcernError>, w_err: Option<WriteError>) -> WriteException {
        let mut parts = Vec::new();

        if let Some(ref error) = w_err {
            parts.push(error.to_string());
        }

        if let Some(ref error) = wc_err {
            parts.push(error.to_string());
        }

        WriteException {
            write_concern_error: wc_err,
            write_error: w_err,
            message: parts.join("; "),
        }
    }

    /// Downgrades a BulkWriteException for a single-document write. Only the
    /// first write error can exist, since just one request was sent.
    pub fn with_bulk_exception(bulk_exception: BulkWriteException) -> WriteException {
        let write_error = bulk_exception.write_errors
            .into_iter()
            .next()
            .map(|e| WriteError::new(e.code, e.message, e.details));

        WriteException::new(bulk_exception.write_concern_error, write_error)
    }
}

impl WriteConcernError {
    /// Parses a `writeConcernError` reply document.
    pub fn parse(error: &bson::Document) -> Result<WriteConcernError> {
        let code = get_integer(error, "code");
        let message = match error.get("errmsg") {
            Some(&Bson::String(ref message)) => Some(message.to_owned()),
            _ => None,
        };

        match (code, message) {
            (Some(code), Some(message)) => {
                let code_name = match error.get("codeName") {
                    Some(&Bson::String(ref name)) => Some(name.to_owned()),
                    _ => None,
                };

                let details = match error.get("errInfo") {
                    Some(&Bson::Document(ref info)) => Some(info.clone()),
                    _ => None,
                };

                Ok(WriteConcernError {
                    code: code as i32,
                    code_name: code_name,
                    message: message,
                    details: details,
                })
            }
            _ => Err(Error::ResponseError(format!(
                "WriteConcernError document is invalid: {}",
                error
            ))),
        }
    }
}

impl WriteError {
    /// Returns a new WriteError containing the provided error information.
    pub fn new<T: ToString>(code: i32, message: T, details: Option<bson::Document>) -> WriteError {
        WriteError {
            code: code,
            message: message.to_string(),
            details: details,
        }
    }
}

impl BulkWriteError {
    /// Returns a new BulkWriteError containing the provided error information.
    pub fn new<T: ToString>(index: usize,
                            code: i32,
                            message: T,
                            request: Option<WriteModel>)
                            -> BulkWriteError {
        BulkWriteError {
            index: index,
            code: code,
            message: message.to_string(),
            details: None,
            request: request,
        }
    }

    /// Parses one entry of a `writeErrors` reply array. The index is the
    /// position within the batch that was sent, not the original request list.
    pub fn parse(error: &bson::Document) -> Result<BulkWriteError> {
        let index = get_integer(error, "index");
        let code = get_integer(error, "code");
        let message = match error.get("errmsg") {
            Some(&Bson::String(ref message)) => Some(message.to_owned()),
            _ => None,
        };

        match (index, code, message) {
            (Some(index), Some(code), Some(message)) if index >= 0 => {
                let mut bulk_error = BulkWriteError::new(index as usize, code as i32, message, None);
                if let Some(&Bson::Document(ref info)) = error.get("errInfo") {
                    bulk_error.details = Some(info.clone());
                }
                Ok(bulk_error)
            }
            _ => Err(Error::ResponseError(format!("WriteError document is invalid: {}", error))),
        }
    }
}

impl BulkWriteException {
    /// Returns a new BulkWriteException containing the provided error information.
    pub fn new(processed: Vec<WriteModel>,
               unprocessed: Vec<WriteModel>,
               write_errors: Vec<BulkWriteError>,
               write_concern_error: Option<WriteConcernError>)
               -> BulkWriteException {
        let mut exception = BulkWriteException {
            processed_requests: processed,
            unprocessed_requests: unprocessed,
            write_concern_error: write_concern_error,
            write_errors: write_errors,
            message: String::new(),
        };
        exception.message = exception.to_string();
        exception
    }

    /// Whether any request failed or the write concern was not satisfied.
    pub fn is_empty(&self) -> bool {
        self.write_errors.is_empty() && self.write_concern_error.is_none()
    }

    /// Parses the write errors and write concern error out of a write command
    /// reply. Returns `None` when the reply reports neither.
    pub fn from_reply(result: &bson::Document) -> Result<Option<BulkWriteException>> {
        let wc_err = match result.get("writeConcernError") {
            Some(&Bson::Document(ref error)) => Some(WriteConcernError::parse(error)?),
            _ => None,
        };

        let w_errs = match result.get("writeErrors") {
            Some(&Bson::Array(ref errors)) => {
                if errors.is_empty() {
                    return Err(Error::ResponseError(String::from(
                        "Server indicates a write error, but none were found.",
                    )));
                }

                let mut vec = Vec::with_capacity(errors.len());
                for err in errors {
                    match *err {
                        Bson::Document(ref doc) => vec.push(BulkWriteError::parse(doc)?),
                        _ => {
                            return Err(Error::ResponseError(String::from(
                                "WriteError provided was not a bson document.",
                            )))
                        }
                    }
                }
                vec
            }
            _ => Vec::new(),
        };

        if wc_err.is_none() && w_errs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(BulkWriteException::new(Vec::new(), Vec::new(), w_errs, wc_err)))
        }
    }

    /// Refreshes the summary message after the exception has been extended.
    pub fn finalize(&mut self) {
        self.write_errors.sort_by_key(|e| e.index);
        self.message = self.to_string();
    }
}
