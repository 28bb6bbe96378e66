//! Conversion between application values and BSON documents.
use bson::{self, Bson};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};
use std::fmt;
use std::marker::PhantomData;

/// Encodes values into documents and decodes replies back into values.
///
/// Encoding happens before any command is built, so an encoding failure never
/// reaches the server.
pub trait DocumentCodec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<bson::Document>;
    fn decode(&self, document: bson::Document) -> Result<T>;
}

/// The identity codec used by untyped collections.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawCodec;

impl DocumentCodec<bson::Document> for RawCodec {
    fn encode(&self, value: &bson::Document) -> Result<bson::Document> {
        Ok(value.clone())
    }

    fn decode(&self, document: bson::Document) -> Result<bson::Document> {
        Ok(document)
    }
}

/// Maps any serde-compatible type to and from documents.
pub struct SerdeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeCodec<T> {
    pub fn new() -> SerdeCodec<T> {
        SerdeCodec { _marker: PhantomData }
    }
}

impl<T> Default for SerdeCodec<T> {
    fn default() -> Self {
        SerdeCodec::new()
    }
}

impl<T> fmt::Debug for SerdeCodec<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str("SerdeCodec")
    }
}

impl<T> DocumentCodec<T> for SerdeCodec<T>
    where T: Serialize + DeserializeOwned
{
    fn encode(&self, value: &T) -> Result<bson::Document> {
        match bson::to_bson(value)? {
            Bson::Document(doc) => Ok(doc),
            other => Err(Error::CodecError(format!(
                "Value must serialize to a document, got {:?}.",
                other
            ))),
        }
    }

    fn decode(&self, document: bson::Document) -> Result<T> {
        Ok(bson::from_bson(Bson::Document(document))?)
    }
}
