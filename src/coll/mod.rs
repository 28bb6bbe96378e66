//! Interface for collection-level operations.
pub mod batch;
pub mod error;
pub mod options;
pub mod results;

use bson::{self, oid, Bson};
use log::{debug, warn};

use self::batch::{BatchEntry, BulkProgress, Step};
use self::error::{WriteConcernError, WriteException};
use self::options::*;
use self::results::*;

use crate::cancellation::CancellationToken;
use crate::codec::{DocumentCodec, RawCodec};
use crate::command::{self, Modification};
use crate::command_type::CommandType;
use crate::common::{get_integer, Namespace, ReadPreference, WriteConcern};
use crate::cursor::{Cursor, CursorSettings};
use crate::db::Database;
use crate::executor::Executor;
use crate::{Error, Result};

use std::sync::Arc;
use std::time::Duration;

/// Interfaces with a MongoDB collection.
///
/// A collection's settings never change once it is created. The `with_*`
/// methods return new handles that share the namespace, codec and database
/// with the original and differ only in the replaced setting.
pub struct Collection<T = bson::Document> {
    /// A reference to the database that spawned this collection.
    pub db: Database,
    namespace: Arc<Namespace>,
    codec: Arc<dyn DocumentCodec<T>>,
    read_preference: ReadPreference,
    write_concern: WriteConcern,
    cancel: CancellationToken,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Collection {
            db: self.db.clone(),
            namespace: self.namespace.clone(),
            codec: self.codec.clone(),
            read_preference: self.read_preference.clone(),
            write_concern: self.write_concern.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T> Collection<T> {
    /// Creates a collection representation with optional read and write controls.
    /// Unset controls are inherited from the database.
    pub fn new(db: Database,
               name: &str,
               codec: Arc<dyn DocumentCodec<T>>,
               read_preference: Option<ReadPreference>,
               write_concern: Option<WriteConcern>)
               -> Collection<T> {
        let rp = read_preference.unwrap_or_else(|| db.read_preference.to_owned());
        let wc = write_concern.unwrap_or_else(|| db.write_concern.to_owned());
        let namespace = Namespace::new(&db.name, name);

        Collection {
            db: db,
            namespace: Arc::new(namespace),
            codec: codec,
            read_preference: rp,
            write_concern: wc,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a handle that routes reads with `read_preference`.
    pub fn with_read_preference(&self, read_preference: ReadPreference) -> Collection<T> {
        Collection { read_preference: read_preference, ..self.clone() }
    }

    /// Returns a handle whose writes require `write_concern`.
    pub fn with_write_concern(&self, write_concern: WriteConcern) -> Collection<T> {
        Collection { write_concern: write_concern, ..self.clone() }
    }

    /// Returns a handle whose operations, and the cursors they open, stop
    /// with `Error::Cancelled` once `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Collection<T> {
        Collection { cancel: token, ..self.clone() }
    }

    /// Returns a handle on the same collection that converts documents with
    /// another codec.
    pub fn clone_with_type<U>(&self, codec: Arc<dyn DocumentCodec<U>>) -> Collection<U> {
        Collection {
            db: self.db.clone(),
            namespace: self.namespace.clone(),
            codec: codec,
            read_preference: self.read_preference.clone(),
            write_concern: self.write_concern.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// The collection name, without the database prefix.
    pub fn name(&self) -> &str {
        &self.namespace.coll
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn read_preference(&self) -> &ReadPreference {
        &self.read_preference
    }

    pub fn write_concern(&self) -> &WriteConcern {
        &self.write_concern
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns a unique operational request id.
    pub fn get_req_id(&self) -> i64 {
        self.executor().get_req_id()
    }

    fn executor(&self) -> &Executor {
        self.db.client.executor()
    }

    fn idle_timeout(&self, no_cursor_timeout: bool) -> Option<Duration> {
        if no_cursor_timeout {
            None
        } else {
            Some(self.db.client.options.cursor_idle_timeout)
        }
    }

    fn run_command(&self,
                   cmd: bson::Document,
                   cmd_type: CommandType,
                   read_preference: Option<&ReadPreference>)
                   -> Result<bson::Document> {
        self.executor().execute(&self.namespace.db, cmd, cmd_type, read_preference, &self.cancel)
    }

    /// Runs an aggregation framework pipeline.
    ///
    /// Pipelines ending in `$out` or `$merge` write to the database and always
    /// run on the primary.
    pub fn aggregate(&self,
                     pipeline: Vec<bson::Document>,
                     options: Option<AggregateOptions>)
                     -> Result<Cursor<bson::Document>> {
        let options = options.unwrap_or_else(AggregateOptions::new);
        let writes_output = command::has_output_stage(&pipeline);

        let read_preference = if writes_output {
            None
        } else {
            Some(options.read_preference.clone().unwrap_or_else(|| self.read_preference.clone()))
        };

        let settings = CursorSettings {
            batch_size: options.batch_size,
            limit: 0,
            idle_timeout: self.idle_timeout(false),
        };

        let codec: Arc<dyn DocumentCodec<bson::Document>> = Arc::new(RawCodec);
        let mut cmd = command::aggregate(self.name(), pipeline, options);
        if writes_output {
            cmd = command::with_write_concern(cmd, &self.write_concern);
        }

        Cursor::open(self.executor().clone(),
                     (*self.namespace).clone(),
                     cmd,
                     CommandType::Aggregate,
                     read_preference.as_ref(),
                     codec,
                     self.cancel.clone(),
                     settings)
    }

    /// Gets the number of documents matching the filter.
    pub fn count(&self,
                 filter: Option<bson::Document>,
                 options: Option<CountOptions>)
                 -> Result<i64> {
        let options = options.unwrap_or_else(CountOptions::new);
        let read_preference = options.read_preference
            .clone()
            .unwrap_or_else(|| self.read_preference.clone());

        let cmd = command::count(self.name(), filter, options);
        let reply = self.run_command(cmd, CommandType::Count, Some(&read_preference))?;

        match get_integer(&reply, "n") {
            Some(n) => Ok(n),
            None => Err(Error::ResponseError(String::from("Count reply is missing 'n'."))),
        }
    }

    /// Finds the distinct values for a specified field across a single collection.
    pub fn distinct(&self,
                    field_name: &str,
                    filter: Option<bson::Document>,
                    options: Option<DistinctOptions>)
                    -> Result<Vec<Bson>> {
        let options = options.unwrap_or_else(DistinctOptions::new);
        let read_preference = options.read_preference
            .clone()
            .unwrap_or_else(|| self.read_preference.clone());

        let cmd = command::distinct(self.name(), field_name, filter, options);
        let reply = self.run_command(cmd, CommandType::Distinct, Some(&read_preference))?;

        match reply.get("values") {
            Some(&Bson::Array(ref values)) => Ok(values.to_owned()),
            _ => Err(Error::ResponseError(String::from("Distinct reply is missing 'values'."))),
        }
    }

    /// Returns a cursor over the documents matching the filter.
    pub fn find(&self,
                filter: Option<bson::Document>,
                options: Option<FindOptions>)
                -> Result<Cursor<T>> {
        self.find_with_command_type(filter, options.unwrap_or_else(FindOptions::new), CommandType::Find)
    }

    fn find_with_command_type(&self,
                              filter: Option<bson::Document>,
                              options: FindOptions,
                              cmd_type: CommandType)
                              -> Result<Cursor<T>> {
        let read_preference = options.read_preference
            .clone()
            .unwrap_or_else(|| self.read_preference.clone());

        let settings = CursorSettings {
            batch_size: options.batch_size,
            limit: options.limit.unwrap_or(0),
            idle_timeout: self.idle_timeout(options.no_cursor_timeout),
        };

        let cmd = command::find(self.name(), filter, options);

        Cursor::open(self.executor().clone(),
                     (*self.namespace).clone(),
                     cmd,
                     cmd_type,
                     Some(&read_preference),
                     self.codec.clone(),
                     self.cancel.clone(),
                     settings)
    }

    /// Returns the first document matching the filter, if any.
    pub fn find_one(&self,
                    filter: Option<bson::Document>,
                    options: Option<FindOptions>)
                    -> Result<Option<T>> {
        let mut options = options.unwrap_or_else(FindOptions::new);
        options.limit = Some(-1);

        let mut cursor = self.find_with_command_type(filter, options, CommandType::Find)?;
        match cursor.next() {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    // Helper method for all findAndModify commands.
    fn find_and_modify(&self,
                       filter: bson::Document,
                       modification: Modification,
                       options: bson::Document,
                       write_concern: Option<WriteConcern>,
                       cmd_type: CommandType)
                       -> Result<Option<T>> {
        let wc = write_concern.unwrap_or_else(|| self.write_concern.clone());
        let cmd = command::find_and_modify(self.name(), filter, modification, options, &wc);
        let reply = self.run_command(cmd, cmd_type, None)?;

        if let Some(&Bson::Document(ref error)) = reply.get("writeConcernError") {
            let wc_err = WriteConcernError::parse(error)?;
            return Err(Error::WriteError(WriteException::new(Some(wc_err), None)));
        }

        match reply.get("value") {
            Some(&Bson::Document(ref doc)) => Ok(Some(self.codec.decode(doc.to_owned())?)),
            Some(&Bson::Null) | None => Ok(None),
            Some(_) => Err(Error::ResponseError(String::from("findAndModify value was not a document."))),
        }
    }

    /// Finds a single document and deletes it, returning the original.
    pub fn find_one_and_delete(&self,
                               filter: bson::Document,
                               options: Option<FindOneAndDeleteOptions>)
                               -> Result<Option<T>> {
        let options = options.unwrap_or_else(FindOneAndDeleteOptions::new);
        let write_concern = options.write_concern.clone();

        self.find_and_modify(filter,
                             Modification::Delete,
                             options.into(),
                             write_concern,
                             CommandType::FindOneAndDelete)
    }

    /// Finds a single document and replaces it, returning either the original
    /// or replaced document.
    pub fn find_one_and_replace(&self,
                                filter: bson::Document,
                                replacement: T,
                                options: Option<FindOneAndReplaceOptions>)
                                -> Result<Option<T>> {
        let replacement = self.codec.encode(&replacement)?;
        validate_replace(&replacement)?;

        let options = options.unwrap_or_else(FindOneAndReplaceOptions::new);
        let write_concern = options.write_concern.clone();

        self.find_and_modify(filter,
                             Modification::Replace(replacement),
                             options.into(),
                             write_concern,
                             CommandType::FindOneAndReplace)
    }

    /// Finds a single document and updates it, returning either the original
    /// or updated document.
    pub fn find_one_and_update(&self,
                               filter: bson::Document,
                               update: bson::Document,
                               options: Option<FindOneAndUpdateOptions>)
                               -> Result<Option<T>> {
        validate_update(&update)?;

        let options = options.unwrap_or_else(FindOneAndUpdateOptions::new);
        let write_concern = options.write_concern.clone();

        self.find_and_modify(filter,
                             Modification::Update(update),
                             options.into(),
                             write_concern,
                             CommandType::FindOneAndUpdate)
    }

    /// Executes a sequence of writes as one logical operation.
    ///
    /// Ordered execution (the default) stops at the first failed request;
    /// unordered execution attempts every request. Requests the server
    /// rejected are reported in `BulkWriteResult::bulk_write_exception`, keyed
    /// by their index in `requests`; a batch the server rejects as a whole
    /// reports each of its requests with the command's error code. Transport
    /// failures, malformed replies and cancellation abort the operation and
    /// are returned as errors.
    pub fn bulk_write(&self,
                      requests: Vec<WriteModel<T>>,
                      options: Option<BulkWriteOptions>)
                      -> Result<BulkWriteResult> {
        let options = options.unwrap_or_else(BulkWriteOptions::new);

        let mut models = Vec::with_capacity(requests.len());
        for request in requests {
            models.push(self.encode_model(request)?);
        }

        let wc = options.write_concern.unwrap_or_else(|| self.write_concern.clone());
        self.execute_writes(models,
                            options.ordered.unwrap_or(true),
                            options.bypass_document_validation,
                            wc,
                            Some(CommandType::BulkWrite))
    }

    // Encodes the documents of a model, generating a missing insert `_id`
    // and validating update and replacement documents.
    fn encode_model(&self, model: WriteModel<T>) -> Result<WriteModel> {
        let codec = &self.codec;
        let model = model.try_map(|value| codec.encode(&value))?;
        prepare_model(model)
    }

    fn execute_writes(&self,
                      models: Vec<WriteModel>,
                      ordered: bool,
                      bypass_document_validation: Option<bool>,
                      write_concern: WriteConcern,
                      cmd_type: Option<CommandType>)
                      -> Result<BulkWriteResult> {
        if models.is_empty() {
            return Err(Error::ArgumentError(String::from("No write requests were provided.")));
        }

        let limits = &self.db.client.options.limits;

        let mut entries = Vec::with_capacity(models.len());
        for (index, model) in models.into_iter().enumerate() {
            entries.push(BatchEntry::new(index, model)?);
        }

        let steps = if ordered {
            batch::ordered_steps(entries, limits)
        } else {
            batch::unordered_steps(entries, limits)
        };

        debug!("Writing to {} in {} step(s), ordered: {}", self.namespace, steps.len(), ordered);

        let mut progress = BulkProgress::new(write_concern.is_acknowledged());

        for step in steps {
            if ordered && progress.has_write_errors() {
                progress.skip(step);
                continue;
            }

            match step {
                Step::Reject(entry) => progress.reject(entry, limits),
                Step::Send(batch) => {
                    let kind = batch.kind;
                    let cmd = command::write(kind,
                                             self.name(),
                                             batch.statements(),
                                             ordered,
                                             bypass_document_validation,
                                             &write_concern);

                    let cmd_type = cmd_type.unwrap_or_else(|| kind.command_type());
                    match self.run_command(cmd, cmd_type, None) {
                        Ok(reply) => progress.record(batch, &reply, ordered)?,
                        Err(Error::CommandError { code, message, .. }) => {
                            warn!("{} batch of {} request(s) on {} failed (code {}): {}",
                                  cmd_type.to_str(),
                                  batch.len(),
                                  self.namespace,
                                  code,
                                  message);
                            progress.fail_batch(batch, code, &message);
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        Ok(progress.finish())
    }

    // Runs a single write, turning a reported failure into `Error::WriteError`.
    fn write_one(&self,
                 model: WriteModel,
                 bypass_document_validation: Option<bool>,
                 write_concern: Option<WriteConcern>,
                 cmd_type: CommandType)
                 -> Result<BulkWriteResult> {
        let wc = write_concern.unwrap_or_else(|| self.write_concern.clone());
        let mut result = self.execute_writes(vec![model],
                                             true,
                                             bypass_document_validation,
                                             wc,
                                             Some(cmd_type))?;

        match result.bulk_write_exception.take() {
            Some(exception) => Err(Error::WriteError(WriteException::with_bulk_exception(exception))),
            None => Ok(result),
        }
    }

    /// Inserts the provided document. If the document is missing an identifier,
    /// one is generated.
    pub fn insert_one(&self, doc: T, options: Option<InsertOneOptions>) -> Result<InsertOneResult> {
        let options = options.unwrap_or_else(InsertOneOptions::new);
        let model = self.encode_model(WriteModel::insert_one(doc))?;

        let result = self.write_one(model,
                                    options.bypass_document_validation,
                                    options.write_concern,
                                    CommandType::InsertOne)?;

        InsertOneResult::with_bulk_result(result)
    }

    /// Inserts the provided documents. If any documents are missing an
    /// identifier, one is generated. Documents that fail to insert are
    /// reported in `InsertManyResult::bulk_write_exception`.
    pub fn insert_many(&self,
                       docs: Vec<T>,
                       options: Option<InsertManyOptions>)
                       -> Result<InsertManyResult> {
        let options = options.unwrap_or_else(InsertManyOptions::new);

        let mut models = Vec::with_capacity(docs.len());
        for doc in docs {
            models.push(self.encode_model(WriteModel::insert_one(doc))?);
        }

        let wc = options.write_concern.unwrap_or_else(|| self.write_concern.clone());
        let result = self.execute_writes(models,
                                         options.ordered.unwrap_or(true),
                                         options.bypass_document_validation,
                                         wc,
                                         Some(CommandType::InsertMany))?;

        Ok(InsertManyResult::with_bulk_result(result))
    }

    /// Deletes a single document.
    pub fn delete_one(&self,
                      filter: bson::Document,
                      options: Option<DeleteOptions>)
                      -> Result<DeleteResult> {
        let options = options.unwrap_or_else(DeleteOptions::new);
        let model = WriteModel::DeleteOne {
            filter: filter,
            collation: options.collation,
        };

        let result = self.write_one(model, None, options.write_concern, CommandType::DeleteOne)?;
        Ok(DeleteResult::with_bulk_result(result))
    }

    /// Deletes multiple documents.
    pub fn delete_many(&self,
                       filter: bson::Document,
                       options: Option<DeleteOptions>)
                       -> Result<DeleteResult> {
        let options = options.unwrap_or_else(DeleteOptions::new);
        let model = WriteModel::DeleteMany {
            filter: filter,
            collation: options.collation,
        };

        let result = self.write_one(model, None, options.write_concern, CommandType::DeleteMany)?;
        Ok(DeleteResult::with_bulk_result(result))
    }

    /// Replaces a single document.
    pub fn replace_one(&self,
                       filter: bson::Document,
                       replacement: T,
                       options: Option<ReplaceOptions>)
                       -> Result<UpdateResult> {
        let options = options.unwrap_or_else(ReplaceOptions::new);
        let model = self.encode_model(WriteModel::ReplaceOne {
            filter: filter,
            replacement: replacement,
            upsert: options.upsert,
            collation: options.collation,
        })?;

        let result = self.write_one(model,
                                    options.bypass_document_validation,
                                    options.write_concern,
                                    CommandType::ReplaceOne)?;
        Ok(UpdateResult::with_bulk_result(result))
    }

    /// Updates a single document.
    pub fn update_one(&self,
                      filter: bson::Document,
                      update: bson::Document,
                      options: Option<UpdateOptions>)
                      -> Result<UpdateResult> {
        let options = options.unwrap_or_else(UpdateOptions::new);
        let model = prepare_model(WriteModel::UpdateOne {
            filter: filter,
            update: update,
            upsert: options.upsert,
            collation: options.collation,
            array_filters: options.array_filters,
        })?;

        let result = self.write_one(model,
                                    options.bypass_document_validation,
                                    options.write_concern,
                                    CommandType::UpdateOne)?;
        Ok(UpdateResult::with_bulk_result(result))
    }

    /// Updates multiple documents.
    pub fn update_many(&self,
                       filter: bson::Document,
                       update: bson::Document,
                       options: Option<UpdateOptions>)
                       -> Result<UpdateResult> {
        let options = options.unwrap_or_else(UpdateOptions::new);
        let model = prepare_model(WriteModel::UpdateMany {
            filter: filter,
            update: update,
            upsert: options.upsert,
            collation: options.collation,
            array_filters: options.array_filters,
        })?;

        let result = self.write_one(model,
                                    options.bypass_document_validation,
                                    options.write_concern,
                                    CommandType::UpdateMany)?;
        Ok(UpdateResult::with_bulk_result(result))
    }
}

fn prepare_model(model: WriteModel) -> Result<WriteModel> {
    match model {
        WriteModel::InsertOne { document } => return Ok(WriteModel::insert_one(with_id(document)?)),
        WriteModel::ReplaceOne { ref replacement, .. } => validate_replace(replacement)?,
        WriteModel::UpdateOne { ref update, .. } |
        WriteModel::UpdateMany { ref update, .. } => validate_update(update)?,
        WriteModel::DeleteOne { .. } |
        WriteModel::DeleteMany { .. } => (),
    }

    Ok(model)
}

// Puts a generated ObjectId first when the document has no `_id`.
fn with_id(document: bson::Document) -> Result<bson::Document> {
    if document.contains_key("_id") {
        return Ok(document);
    }

    let id = oid::ObjectId::new()?;
    let mut with_id = doc! { "_id": id };
    for (key, value) in document {
        with_id.insert(key, value);
    }

    Ok(with_id)
}

fn validate_replace(replacement: &bson::Document) -> Result<()> {
    for key in replacement.keys() {
        if key.starts_with('$') {
            return Err(Error::ArgumentError(String::from("Replacement cannot include $ operators.")));
        }
    }
    Ok(())
}

fn validate_update(update: &bson::Document) -> Result<()> {
    if update.is_empty() {
        return Err(Error::ArgumentError(String::from("Update document must not be empty.")));
    }

    for key in update.keys() {
        if !key.starts_with('$') {
            return Err(Error::ArgumentError(String::from("Update only works with $ operators.")));
        }
    }
    Ok(())
}
