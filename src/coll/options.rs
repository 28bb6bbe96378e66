//! Options for collection-level operations.
//!
//! Every option set converts into the command fields it controls. Unset fields
//! are left out of the command so that server defaults apply; read preferences
//! and write concerns are resolved by `Collection` and never merged here.
use bson::{self, Bson};
use crate::common::{ReadPreference, WriteConcern};

bitflags! {
    /// Cursor behaviours requested by a find.
    pub struct CursorFlags: i32 {
        const TAILABLE              = 0b00000010;
        const OPLOG_REPLAY          = 0b00001000;
        const NO_CURSOR_TIMEOUT     = 0b00010000;
        const AWAIT_DATA            = 0b00100000;
        const ALLOW_PARTIAL_RESULTS = 0b10000000;
    }
}

impl CursorFlags {
    /// Constructs the flag set described by a FindOptions struct.
    pub fn with_find_options(options: &FindOptions) -> CursorFlags {
        let mut flags = CursorFlags::empty();

        if options.cursor_type != CursorType::NonTailable {
            flags.insert(Self::TAILABLE);
        }

        if options.oplog_replay {
            flags.insert(Self::OPLOG_REPLAY);
        }

        if options.no_cursor_timeout {
            flags.insert(Self::NO_CURSOR_TIMEOUT);
        }

        if options.cursor_type == CursorType::TailableAwait {
            flags.insert(Self::AWAIT_DATA);
        }

        if options.allow_partial_results {
            flags.insert(Self::ALLOW_PARTIAL_RESULTS);
        }

        flags
    }
}

/// Describes the type of cursor to return on collection queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorType {
    NonTailable,
    Tailable,
    TailableAwait,
}

impl Default for CursorType {
    fn default() -> Self {
        CursorType::NonTailable
    }
}

/// Describes which version of a document find-and-modify operations return.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReturnDocument {
    Before,
    After,
}

impl ReturnDocument {
    pub fn as_bool(&self) -> bool {
        match *self {
            ReturnDocument::Before => false,
            ReturnDocument::After => true,
        }
    }
}

/// An index hint, either by name or by key pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum Hint {
    Name(String),
    Keys(bson::Document),
}

impl From<Hint> for Bson {
    fn from(hint: Hint) -> Bson {
        match hint {
            Hint::Name(name) => Bson::String(name),
            Hint::Keys(keys) => Bson::Document(keys),
        }
    }
}

/// A single write of a bulk operation.
///
/// `T` is the collection's document type; it only appears where a whole
/// document is written.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteModel<T = bson::Document> {
    InsertOne { document: T },
    DeleteOne {
        filter: bson::Document,
        collation: Option<bson::Document>,
    },
    DeleteMany {
        filter: bson::Document,
        collation: Option<bson::Document>,
    },
    ReplaceOne {
        filter: bson::Document,
        replacement: T,
        upsert: Option<bool>,
        collation: Option<bson::Document>,
    },
    UpdateOne {
        filter: bson::Document,
        update: bson::Document,
        upsert: Option<bool>,
        collation: Option<bson::Document>,
        array_filters: Option<Vec<bson::Document>>,
    },
    UpdateMany {
        filter: bson::Document,
        update: bson::Document,
        upsert: Option<bool>,
        collation: Option<bson::Document>,
        array_filters: Option<Vec<bson::Document>>,
    },
}

impl<T> WriteModel<T> {
    pub fn insert_one(document: T) -> WriteModel<T> {
        WriteModel::InsertOne { document: document }
    }

    pub fn delete_one(filter: bson::Document) -> WriteModel<T> {
        WriteModel::DeleteOne { filter: filter, collation: None }
    }

    pub fn delete_many(filter: bson::Document) -> WriteModel<T> {
        WriteModel::DeleteMany { filter: filter, collation: None }
    }

    pub fn replace_one(filter: bson::Document, replacement: T, upsert: Option<bool>) -> WriteModel<T> {
        WriteModel::ReplaceOne {
            filter: filter,
            replacement: replacement,
            upsert: upsert,
            collation: None,
        }
    }

    pub fn update_one(filter: bson::Document, update: bson::Document, upsert: Option<bool>) -> WriteModel<T> {
        WriteModel::UpdateOne {
            filter: filter,
            update: update,
            upsert: upsert,
            collation: None,
            array_filters: None,
        }
    }

    pub fn update_many(filter: bson::Document, update: bson::Document, upsert: Option<bool>) -> WriteModel<T> {
        WriteModel::UpdateMany {
            filter: filter,
            update: update,
            upsert: upsert,
            collation: None,
            array_filters: None,
        }
    }

    /// Converts the written document, if any, leaving the rest of the model intact.
    pub fn try_map<U, E, F>(self, f: F) -> Result<WriteModel<U>, E>
        where F: FnOnce(T) -> Result<U, E>
    {
        Ok(match self {
            WriteModel::InsertOne { document } => WriteModel::InsertOne { document: f(document)? },
            WriteModel::DeleteOne { filter, collation } => {
                WriteModel::DeleteOne { filter: filter, collation: collation }
            }
            WriteModel::DeleteMany { filter, collation } => {
                WriteModel::DeleteMany { filter: filter, collation: collation }
            }
            WriteModel::ReplaceOne { filter, replacement, upsert, collation } => {
                WriteModel::ReplaceOne {
                    filter: filter,
                    replacement: f(replacement)?,
                    upsert: upsert,
                    collation: collation,
                }
            }
            WriteModel::UpdateOne { filter, update, upsert, collation, array_filters } => {
                WriteModel::UpdateOne {
                    filter: filter,
                    update: update,
                    upsert: upsert,
                    collation: collation,
                    array_filters: array_filters,
                }
            }
            WriteModel::UpdateMany { filter, update, upsert, collation, array_filters } => {
                WriteModel::UpdateMany {
                    filter: filter,
                    update: update,
                    upsert: upsert,
                    collation: collation,
                    array_filters: array_filters,
                }
            }
        })
    }
}

/// Options for aggregation queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateOptions {
    pub allow_disk_use: Option<bool>,
    pub batch_size: Option<i32>,
    pub bypass_document_validation: Option<bool>,
    pub collation: Option<bson::Document>,
    pub comment: Option<String>,
    pub max_time_ms: Option<i64>,
    pub read_preference: Option<ReadPreference>,
}

impl AggregateOptions {
    pub fn new() -> Self {
        Default::default()
    }
}

impl From<AggregateOptions> for bson::Document {
    fn from(options: AggregateOptions) -> Self {
        let mut document = bson::Document::new();

        if let Some(allow_disk_use) = options.allow_disk_use {
            document.insert("allowDiskUse", allow_disk_use);
        }

        // The server requires a cursor document even when it is empty.
        let mut cursor = bson::Document::new();
        if let Some(batch_size) = options.batch_size {
            cursor.insert("batchSize", batch_size);
        }
        document.insert("cursor", cursor);

        if let Some(bypass) = options.bypass_document_validation {
            document.insert("bypassDocumentValidation", bypass);
        }

        if let Some(collation) = options.collation {
            document.insert("collation", collation);
        }

        if let Some(comment) = options.comment {
            document.insert("comment", comment);
        }

        if let Some(max_time_ms) = options.max_time_ms {
            document.insert("maxTimeMS", max_time_ms);
        }

        // read_preference is used directly by Collection::aggregate.

        document
    }
}

/// Options for count queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountOptions {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub hint: Option<Hint>,
    pub collation: Option<bson::Document>,
    pub max_time_ms: Option<i64>,
    pub read_preference: Option<ReadPreference>,
}

impl CountOptions {
    pub fn new() -> Self {
        Default::default()
    }
}

impl From<CountOptions> for bson::Document {
    fn from(options: CountOptions) -> Self {
        let mut document = bson::Document::new();

        if let Some(skip) = options.skip {
            document.insert("skip", skip);
        }

        if let Some(limit) = options.limit {
            document.insert("limit", limit);
        }

        if let Some(hint) = options.hint {
            document.insert("hint", hint);
        }

        if let Some(collation) = options.collation {
            document.insert("collation", collation);
        }

        if let Some(max_time_ms) = options.max_time_ms {
            document.insert("maxTimeMS", max_time_ms);
        }

        // read_preference is used directly by Collection::count.

        document
    }
}

/// Options for distinct queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DistinctOptions {
    pub collation: Option<bson::Document>,
    pub max_time_ms: Option<i64>,
    pub read_preference: Option<ReadPreference>,
}

impl DistinctOptions {
    pub fn new() -> Self {
        Default::default()
    }
}

impl From<DistinctOptions> for bson::Document {
    fn from(options: DistinctOptions) -> Self {
        let mut document = bson::Document::new();

        if let Some(collation) = options.collation {
            document.insert("collation", collation);
        }

        if let Some(max_time_ms) = options.max_time_ms {
            document.insert("maxTimeMS", max_time_ms);
        }

        document
    }
}

/// Options for collection queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOptions {
    pub allow_partial_results: bool,
    pub no_cursor_timeout: bool,
    pub oplog_replay: bool,
    pub skip: Option<i64>,
    /// A negative limit asks for a single batch of at most `-limit` documents.
    pub limit: Option<i64>,
    pub cursor_type: CursorType,
    pub batch_size: Option<i32>,
    pub collation: Option<bson::Document>,
    pub comment: Option<String>,
    pub hint: Option<Hint>,
    pub max_time_ms: Option<i64>,
    pub projection: Option<bson::Document>,
    pub sort: Option<bson::Document>,
    pub read_preference: Option<ReadPreference>,
}

impl FindOptions {
    /// Creates a new FindOptions struct with default parameters.
    pub fn new() -> Self {
        Default::default()
    }
}

impl From<FindOptions> for bson::Document {
    fn from(options: FindOptions) -> Self {
        let mut document = bson::Document::new();
        let flags = CursorFlags::with_find_options(&options);

        if let Some(sort) = options.sort {
            document.insert("sort", sort);
        }

        if let Some(projection) = options.projection {
            document.insert("projection", projection);
        }

        if let Some(hint) = options.hint {
            document.insert("hint", hint);
        }

        if let Some(skip) = options.skip {
            document.insert("skip", skip);
        }

        if let Some(limit) = options.limit {
            if limit < 0 {
                document.insert("limit", limit.checked_neg().unwrap_or(i64::max_value()));
                document.insert("singleBatch", true);
            } else if limit > 0 {
                document.insert("limit", limit);
            }
        }

        if let Some(batch_size) = options.batch_size {
            document.insert("batchSize", batch_size);
        }

        if let Some(comment) = options.comment {
            document.insert("comment", comment);
        }

        if let Some(max_time_ms) = options.max_time_ms {
            document.insert("maxTimeMS", max_time_ms);
        }

        if let Some(collation) = options.collation {
            document.insert("collation", collation);
        }

        if flags.contains(CursorFlags::TAILABLE) {
            document.insert("tailable", true);
        }

        if flags.contains(CursorFlags::OPLOG_REPLAY) {
            document.insert("oplogReplay", true);
        }

        if flags.contains(CursorFlags::NO_CURSOR_TIMEOUT) {
            document.insert("noCursorTimeout", true);
        }

        if flags.contains(CursorFlags::AWAIT_DATA) {
            document.insert("awaitData", true);
        }

        if flags.contains(CursorFlags::ALLOW_PARTIAL_RESULTS) {
            document.insert("allowPartialResults", true);
        }

        // read_preference is used directly by Collection::find.

        document
    }
}

/// Options for `findOneAndDelete` operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOneAndDeleteOptions {
    pub collation: Option<bson::Document>,
    pub max_time_ms: Option<i64>,
    pub projection: Option<bson::Document>,
    pub sort: Option<bson::Document>,
    pub write_concern: Option<WriteConcern>,
}

impl FindOneAndDeleteOptions {
    pub fn new() -> Self {
        Default::default()
    }
}

impl From<FindOneAndDeleteOptions> for bson::Document {
    fn from(options: FindOneAndDeleteOptions) -> Self {
        let mut document = bson::Document::new();

        if let Some(projection) = options.projection {
            document.insert("fields", projection);
        }

        if let Some(sort) = options.sort {
            document.insert("sort", sort);
        }

        if let Some(collation) = options.collation {
            document.insert("collation", collation);
        }

        if let Some(max_time_ms) = options.max_time_ms {
            document.insert("maxTimeMS", max_time_ms);
        }

        document
    }
}

/// Options for `findOneAndReplace` operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOneAndReplaceOptions {
    pub bypass_document_validation: Option<bool>,
    pub collation: Option<bson::Document>,
    pub max_time_ms: Option<i64>,
    pub projection: Option<bson::Document>,
    pub return_document: Option<ReturnDocument>,
    pub sort: Option<bson::Document>,
    pub upsert: Option<bool>,
    pub write_concern: Option<WriteConcern>,
}

impl FindOneAndReplaceOptions {
    pub fn new() -> Self {
        Default::default()
    }
}

impl From<FindOneAndReplaceOptions> for bson::Document {
    fn from(options: FindOneAndReplaceOptions) -> Self {
        let mut document = bson::Document::new();

        if let Some(return_document) = options.return_document {
            document.insert("new", return_document.as_bool());
        }

        if let Some(projection) = options.projection {
            document.insert("fields", projection);
        }

        if let Some(sort) = options.sort {
            document.insert("sort", sort);
        }

        if let Some(upsert) = options.upsert {
            document.insert("upsert", upsert);
        }

        if let Some(bypass) = options.bypass_document_validation {
            document.insert("bypassDocumentValidation", bypass);
        }

        if let Some(collation) = options.collation {
            document.insert("collation", collation);
        }

        if let Some(max_time_ms) = options.max_time_ms {
            document.insert("maxTimeMS", max_time_ms);
        }

        document
    }
}

/// Options for `findOneAndUpdate` operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOneAndUpdateOptions {
    pub array_filters: Option<Vec<bson::Document>>,
    pub bypass_document_validation: Option<bool>,
    pub collation: Option<bson::Document>,
    pub max_time_ms: Option<i64>,
    pub projection: Option<bson::Document>,
    pub return_document: Option<ReturnDocument>,
    pub sort: Option<bson::Document>,
    pub upsert: Option<bool>,
    pub write_concern: Option<WriteConcern>,
}

impl FindOneAndUpdateOptions {
    pub fn new() -> Self {
        Default::default()
    }
}

impl From<FindOneAndUpdateOptions> for bson::Document {
    fn from(options: FindOneAndUpdateOptions) -> Self {
        let array_filters = options.array_filters;

        let replace_options = FindOneAndReplaceOptions {
            bypass_document_validation: options.bypass_document_validation,
            collation: options.collation,
            max_time_ms: options.max_time_ms,
            projection: options.projection,
            return_document: options.return_document,
            sort: options.sort,
            upsert: options.upsert,
            write_concern: None,
        };

        let mut document = bson::Document::from(replace_options);

        if let Some(filters) = array_filters {
            let filters: Vec<Bson> = filters.into_iter().map(Bson::Document).collect();
            document.insert("arrayFilters", filters);
        }

        document
    }
}

/// Options for insertOne operations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct InsertOneOptions {
    pub bypass_document_validation: Option<bool>,
    pub write_concern: Option<WriteConcern>,
}

impl InsertOneOptions {
    pub fn new() -> Self {
        Default::default()
    }
}

/// Options for insertMany operations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct InsertManyOptions {
    pub bypass_document_validation: Option<bool>,
    /// Defaults to `true`.
    pub ordered: Option<bool>,
    pub write_concern: Option<WriteConcern>,
}

impl InsertManyOptions {
    pub fn new() -> Self {
        Default::default()
    }
}

/// Options for update operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateOptions {
    pub array_filters: Option<Vec<bson::Document>>,
    pub bypass_document_validation: Option<bool>,
    pub collation: Option<bson::Document>,
    pub upsert: Option<bool>,
    pub write_concern: Option<WriteConcern>,
}

impl UpdateOptions {
    pub fn new() -> UpdateOptions {
        Default::default()
    }
}

/// Options for replace operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplaceOptions {
    pub bypass_document_validation: Option<bool>,
    pub collation: Option<bson::Document>,
    pub upsert: Option<bool>,
    pub write_concern: Option<WriteConcern>,
}

impl ReplaceOptions {
    pub fn new() -> ReplaceOptions {
        Default::default()
    }
}

/// Options for delete operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteOptions {
    pub collation: Option<bson::Document>,
    pub write_concern: Option<WriteConcern>,
}

impl DeleteOptions {
    pub fn new() -> DeleteOptions {
        Default::default()
    }
}

/// Options for bulk write operations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BulkWriteOptions {
    pub bypass_document_validation: Option<bool>,
    /// Defaults to `true`.
    pub ordered: Option<bool>,
    pub write_concern: Option<WriteConcern>,
}

impl BulkWriteOptions {
    pub fn new() -> Self {
        Default::default()
    }
}
