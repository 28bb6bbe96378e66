//! Partitioning of bulk write requests into protocol batches.
//!
//! Requests become `Step`s: either a batch of same-kind statements to send in
//! one command, or a request rejected on the client because its statement can
//! never fit in a single command.
use super::error::{BulkWriteError, BulkWriteException, WriteConcernError};
use super::options::WriteModel;
use super::results::BulkWriteResult;
use crate::command;
use crate::command_type::CommandType;
use crate::error::ErrorCode;
use crate::{Error, Limits, Result};

use std::collections::BTreeSet;

/// Write commands group requests by the kind of statement they carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchKind {
    Insert,
    Update,
    Delete,
}

impl BatchKind {
    pub fn of<T>(model: &WriteModel<T>) -> BatchKind {
        match *model {
            WriteModel::InsertOne { .. } => BatchKind::Insert,
            WriteModel::DeleteOne { .. } |
            WriteModel::DeleteMany { .. } => BatchKind::Delete,
            WriteModel::ReplaceOne { .. } |
            WriteModel::UpdateOne { .. } |
            WriteModel::UpdateMany { .. } => BatchKind::Update,
        }
    }

    pub fn command_type(&self) -> CommandType {
        match *self {
            BatchKind::Insert => CommandType::InsertMany,
            BatchKind::Update => CommandType::UpdateMany,
            BatchKind::Delete => CommandType::DeleteMany,
        }
    }
}

/// A request staged for dispatch, remembering where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchEntry {
    /// Position in the caller's request list.
    pub index: usize,
    pub model: WriteModel,
    pub statement: bson::Document,
    /// Encoded size of `statement` in bytes.
    pub size: usize,
}

impl BatchEntry {
    pub fn new(index: usize, model: WriteModel) -> Result<BatchEntry> {
        let statement = match model {
            WriteModel::InsertOne { ref document } => document.clone(),
            WriteModel::DeleteOne { ref filter, ref collation } => {
                command::delete_statement(filter.clone(), false, collation.clone())
            }
            WriteModel::DeleteMany { ref filter, ref collation } => {
                command::delete_statement(filter.clone(), true, collation.clone())
            }
            WriteModel::ReplaceOne { ref filter, ref replacement, upsert, ref collation } => {
                command::update_statement(filter.clone(), replacement.clone(), upsert, false,
                                          collation.clone(), None)
            }
            WriteModel::UpdateOne { ref filter, ref update, upsert, ref collation, ref array_filters } => {
                command::update_statement(filter.clone(), update.clone(), upsert, false,
                                          collation.clone(), array_filters.clone())
            }
            WriteModel::UpdateMany { ref filter, ref update, upsert, ref collation, ref array_filters } => {
                command::update_statement(filter.clone(), update.clone(), upsert, true,
                                          collation.clone(), array_filters.clone())
            }
        };

        let size = command::encoded_size(&statement)?;

        Ok(BatchEntry {
            index: index,
            model: model,
            statement: statement,
            size: size,
        })
    }
}

/// Same-kind statements sent together in one write command.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub kind: BatchKind,
    pub entries: Vec<BatchEntry>,
    bytes: usize,
}

impl Batch {
    fn new(kind: BatchKind) -> Batch {
        Batch {
            kind: kind,
            entries: Vec::new(),
            bytes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Original request indices, in batch order.
    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.index).collect()
    }

    pub fn statements(&self) -> Vec<bson::Document> {
        self.entries.iter().map(|e| e.statement.clone()).collect()
    }

    fn fits(&self, entry: &BatchEntry, limits: &Limits) -> bool {
        self.entries.len() < limits.max_write_batch_size &&
        self.bytes + entry.size <= limits.max_batch_bytes()
    }

    fn push(&mut self, entry: BatchEntry) {
        self.bytes += entry.size;
        self.entries.push(entry);
    }
}

/// One unit of bulk write progress.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Send(Batch),
    /// The request's statement alone exceeds the maximum document size.
    Reject(BatchEntry),
}

fn is_oversized(entry: &BatchEntry, limits: &Limits) -> bool {
    entry.size > limits.max_bson_object_size
}

/// Splits requests into maximal runs of consecutive same-kind requests. Steps
/// are returned in request order.
pub fn ordered_steps(entries: Vec<BatchEntry>, limits: &Limits) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut current: Option<Batch> = None;

    for entry in entries {
        if is_oversized(&entry, limits) {
            if let Some(batch) = current.take() {
                steps.push(Step::Send(batch));
            }
            steps.push(Step::Reject(entry));
            continue;
        }

        let kind = BatchKind::of(&entry.model);
        let batch = match current.take() {
            Some(batch) => {
                if batch.kind == kind && batch.fits(&entry, limits) {
                    batch
                } else {
                    steps.push(Step::Send(batch));
                    Batch::new(kind)
                }
            }
            None => Batch::new(kind),
        };

        let mut batch = batch;
        batch.push(entry);
        current = Some(batch);
    }

    if let Some(batch) = current {
        steps.push(Step::Send(batch));
    }

    steps
}

/// Groups requests by kind regardless of their position. Rejections come
/// first, then inserts, deletes and updates. Within a group, requests keep
/// their relative order.
pub fn unordered_steps(entries: Vec<BatchEntry>, limits: &Limits) -> Vec<Step> {
    let mut rejected = Vec::new();
    let mut inserts = vec![Batch::new(BatchKind::Insert)];
    let mut deletes = vec![Batch::new(BatchKind::Delete)];
    let mut updates = vec![Batch::new(BatchKind::Update)];

    for entry in entries {
        if is_oversized(&entry, limits) {
            rejected.push(Step::Reject(entry));
            continue;
        }

        let group = match BatchKind::of(&entry.model) {
            BatchKind::Insert => &mut inserts,
            BatchKind::Delete => &mut deletes,
            BatchKind::Update => &mut updates,
        };

        let needs_new = match group.last() {
            Some(batch) => !batch.fits(&entry, limits),
            None => true,
        };

        if needs_new {
            let kind = BatchKind::of(&entry.model);
            group.push(Batch::new(kind));
        }

        if let Some(batch) = group.last_mut() {
            batch.push(entry);
        }
    }

    rejected.into_iter()
        .chain(inserts.into_iter()
            .chain(deletes)
            .chain(updates)
            .filter(|batch| !batch.is_empty())
            .map(Step::Send))
        .collect()
}

/// Merges the outcome of each step into one bulk write result, translating
/// batch positions back to request indices.
#[derive(Debug)]
pub struct BulkProgress {
    result: BulkWriteResult,
    processed: Vec<WriteModel>,
    unprocessed: Vec<WriteModel>,
    write_errors: Vec<BulkWriteError>,
    write_concern_error: Option<WriteConcernError>,
}

impl BulkProgress {
    pub fn new(acknowledged: bool) -> BulkProgress {
        BulkProgress {
            result: BulkWriteResult::new(acknowledged),
            processed: Vec::new(),
            unprocessed: Vec::new(),
            write_errors: Vec::new(),
            write_concern_error: None,
        }
    }

    /// Whether any request has failed so far.
    pub fn has_write_errors(&self) -> bool {
        !self.write_errors.is_empty()
    }

    /// Records a step that will never be attempted.
    pub fn skip(&mut self, step: Step) {
        match step {
            Step::Send(batch) => self.unprocessed.extend(batch.entries.into_iter().map(|e| e.model)),
            Step::Reject(entry) => self.unprocessed.push(entry.model),
        }
    }

    /// Records a request that failed on the client because it is too large.
    pub fn reject(&mut self, entry: BatchEntry, limits: &Limits) {
        let message = format!("Request of {} bytes exceeds the maximum document size of {} bytes.",
                              entry.size,
                              limits.max_bson_object_size);

        self.write_errors.push(BulkWriteError::new(entry.index,
                                                   ErrorCode::BsonObjectTooLarge as i32,
                                                   message,
                                                   Some(entry.model.clone())));
        self.processed.push(entry.model);
    }

    /// Records a batch the server rejected as a whole. Every request in it is
    /// reported with the command's error code, since none of them were applied.
    pub fn fail_batch(&mut self, batch: Batch, code: i32, message: &str) {
        for entry in batch.entries {
            self.write_errors.push(BulkWriteError::new(entry.index,
                                                       code,
                                                       message,
                                                       Some(entry.model.clone())));
            self.processed.push(entry.model);
        }
    }

    /// Merges the reply to a sent batch. In ordered mode, the requests after
    /// the first failed one were never executed by the server.
    pub fn record(&mut self, batch: Batch, reply: &bson::Document, ordered: bool) -> Result<()> {
        let kind = batch.kind;
        let len = batch.len();
        let indices = batch.indices();
        let mut failed = BTreeSet::new();

        if self.result.acknowledged {
            if let Some(exception) = BulkWriteException::from_reply(reply)? {
                for mut error in exception.write_errors {
                    let position = error.index;
                    let entry = match batch.entries.get(position) {
                        Some(entry) => entry,
                        None => {
                            return Err(Error::ResponseError(format!(
                                "Write error index {} is outside a batch of {} requests.",
                                position,
                                len
                            )))
                        }
                    };

                    error.index = entry.index;
                    error.request = Some(entry.model.clone());
                    failed.insert(position);
                    self.write_errors.push(error);
                }

                if self.write_concern_error.is_none() {
                    self.write_concern_error = exception.write_concern_error;
                }
            }

            self.result.merge_reply(kind, reply, &indices)?;
        }

        let cutoff = if ordered {
            failed.iter().next().map_or(len, |first| first + 1)
        } else {
            len
        };

        for (position, entry) in batch.entries.into_iter().enumerate() {
            if position >= cutoff {
                self.unprocessed.push(entry.model);
                continue;
            }

            if kind == BatchKind::Insert && !failed.contains(&position) {
                if let Some(id) = entry.statement.get("_id") {
                    self.result.inserted_ids.insert(entry.index, id.clone());
                }
            }

            self.processed.push(entry.model);
        }

        Ok(())
    }

    pub fn finish(self) -> BulkWriteResult {
        let mut result = self.result;

        if !self.write_errors.is_empty() || self.write_concern_error.is_some() {
            let mut exception = BulkWriteException::new(self.processed,
                                                        self.unprocessed,
                                                        self.write_errors,
                                                        self.write_concern_error);
            exception.finalize();
            result.bulk_write_exception = Some(exception);
        }

        result
    }
}
