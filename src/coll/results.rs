//! Results of collection write operations.
use bson::{self, Bson};
use std::collections::BTreeMap;

use super::batch::BatchKind;
use super::error::BulkWriteException;
use crate::common::get_integer;
use crate::{Error, Result};

/// Results for a bulk write operation.
///
/// Every map is keyed by the index of the request in the caller's original
/// request list.
#[derive(Clone, Debug, PartialEq)]
pub struct BulkWriteResult {
    pub acknowledged: bool,
    pub inserted_count: i64,
    pub inserted_ids: BTreeMap<usize, Bson>,
    pub matched_count: i64,
    pub modified_count: i64,
    pub deleted_count: i64,
    pub upserted_count: i64,
    pub upserted_ids: BTreeMap<usize, Bson>,
    pub bulk_write_exception: Option<BulkWriteException>,
}

/// Results for an insertOne operation.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertOneResult {
    pub acknowledged: bool,
    pub inserted_id: Bson,
}

/// Results for an insertMany operation.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertManyResult {
    pub acknowledged: bool,
    pub inserted_ids: BTreeMap<usize, Bson>,
    pub bulk_write_exception: Option<BulkWriteException>,
}

/// Results for a deletion operation.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: i64,
}

/// Results for an update or replace operation.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: i64,
    pub modified_count: i64,
    pub upserted_id: Option<Bson>,
}

impl BulkWriteResult {
    pub fn new(acknowledged: bool) -> BulkWriteResult {
        BulkWriteResult {
            acknowledged: acknowledged,
            inserted_count: 0,
            inserted_ids: BTreeMap::new(),
            matched_count: 0,
            modified_count: 0,
            deleted_count: 0,
            upserted_count: 0,
            upserted_ids: BTreeMap::new(),
            bulk_write_exception: None,
        }
    }

    /// Adds the counts reported by one batch reply. `indices` maps positions
    /// within the batch back to positions in the original request list.
    pub fn merge_reply(&mut self,
                       kind: BatchKind,
                       reply: &bson::Document,
                       indices: &[usize])
                       -> Result<()> {
        let n = get_integer(reply, "n").unwrap_or(0);

        match kind {
            BatchKind::Insert => self.inserted_count += n,
            BatchKind::Delete => self.deleted_count += n,
            BatchKind::Update => {
                let upserted = parse_upserted_ids(reply, indices)?;
                let n_upserted = upserted.len() as i64;

                self.matched_count += n - n_upserted;
                self.modified_count += get_integer(reply, "nModified").unwrap_or(0);
                self.upserted_count += n_upserted;
                self.upserted_ids.extend(upserted);
            }
        }

        Ok(())
    }

    /// Whether every request succeeded and the write concern was satisfied.
    pub fn is_success(&self) -> bool {
        self.bulk_write_exception.as_ref().map_or(true, |e| e.is_empty())
    }

    /// Converts a partial failure into `Error::BulkWriteError`. The counts of
    /// the requests that did succeed are dropped.
    pub fn into_result(self) -> Result<BulkWriteResult> {
        match self.bulk_write_exception {
            Some(ref exception) if !exception.is_empty() => {
                Err(Error::BulkWriteError(exception.clone()))
            }
            _ => Ok(self),
        }
    }
}

// Reads the `upserted` array of an update reply, translating each entry's
// batch position into the original request index.
fn parse_upserted_ids(reply: &bson::Document,
                      indices: &[usize])
                      -> Result<BTreeMap<usize, Bson>> {
    let mut upserted_ids = BTreeMap::new();

    let entries = match reply.get("upserted") {
        Some(&Bson::Array(ref entries)) => entries,
        Some(_) => return Err(Error::ResponseError(String::from("'upserted' must be an array."))),
        None => return Ok(upserted_ids),
    };

    for entry in entries {
        let doc = match *entry {
            Bson::Document(ref doc) => doc,
            _ => return Err(Error::ResponseError(String::from("Upserted entry was not a document."))),
        };

        let position = get_integer(doc, "index");
        let original = position.and_then(|i| indices.get(i as usize));

        match (original, doc.get("_id")) {
            (Some(&original), Some(id)) => {
                upserted_ids.insert(original, id.clone());
            }
            _ => {
                return Err(Error::ResponseError(format!("Upserted entry is invalid: {}", doc)))
            }
        }
    }

    Ok(upserted_ids)
}

impl InsertOneResult {
    /// Extracts the id of the single insert of a successful bulk result.
    pub fn with_bulk_result(mut result: BulkWriteResult) -> Result<InsertOneResult> {
        match result.inserted_ids.remove(&0) {
            Some(id) => Ok(InsertOneResult {
                acknowledged: result.acknowledged,
                inserted_id: id,
            }),
            None => Err(Error::ResponseError(String::from("No id was recorded for insert_one."))),
        }
    }
}

impl InsertManyResult {
    pub fn with_bulk_result(result: BulkWriteResult) -> InsertManyResult {
        InsertManyResult {
            acknowledged: result.acknowledged,
            inserted_ids: result.inserted_ids,
            bulk_write_exception: result.bulk_write_exception,
        }
    }

    /// Whether every document was inserted.
    pub fn is_success(&self) -> bool {
        self.bulk_write_exception.as_ref().map_or(true, |e| e.is_empty())
    }
}

impl DeleteResult {
    pub fn with_bulk_result(result: BulkWriteResult) -> DeleteResult {
        DeleteResult {
            acknowledged: result.acknowledged,
            deleted_count: result.deleted_count,
        }
    }
}

impl UpdateResult {
    pub fn with_bulk_result(result: BulkWriteResult) -> UpdateResult {
        UpdateResult {
            acknowledged: result.acknowledged,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_ids.into_iter().next().map(|(_, id)| id),
        }
    }
}
