//! Builds protocol-level command documents from logical operations.
//!
//! Every function here is pure. Optional fields that are not set are omitted
//! from the command rather than sent as `null`, so that server defaults apply.
use bson::{self, Bson};

use crate::coll::batch::BatchKind;
use crate::coll::options::{AggregateOptions, CountOptions, DistinctOptions, FindOptions};
use crate::common::{merge_options, Namespace, WriteConcern};
use crate::Result;

/// The change a findAndModify command applies to the matched document.
#[derive(Clone, Debug, PartialEq)]
pub enum Modification {
    Delete,
    Replace(bson::Document),
    Update(bson::Document),
}

pub fn find(coll: &str, filter: Option<bson::Document>, options: FindOptions) -> bson::Document {
    let mut command = doc! { "find": coll };

    if let Some(filter) = filter {
        command.insert("filter", filter);
    }

    merge_options(command, options)
}

/// The pipeline stages are sent in the order given.
pub fn aggregate(coll: &str,
                 pipeline: Vec<bson::Document>,
                 options: AggregateOptions)
                 -> bson::Document {
    let stages: Vec<Bson> = pipeline.into_iter().map(Bson::Document).collect();
    let command = doc! {
        "aggregate": coll,
        "pipeline": stages
    };

    merge_options(command, options)
}

/// Whether the pipeline writes its results to a collection, in which case it
/// must run on a primary.
pub fn has_output_stage(pipeline: &[bson::Document]) -> bool {
    match pipeline.last() {
        Some(stage) => stage.contains_key("$out") || stage.contains_key("$merge"),
        None => false,
    }
}

pub fn count(coll: &str, filter: Option<bson::Document>, options: CountOptions) -> bson::Document {
    let mut command = doc! { "count": coll };

    if let Some(filter) = filter {
        command.insert("query", filter);
    }

    merge_options(command, options)
}

pub fn distinct(coll: &str,
                field_name: &str,
                filter: Option<bson::Document>,
                options: DistinctOptions)
                -> bson::Document {
    let mut command = doc! {
        "distinct": coll,
        "key": field_name
    };

    if let Some(filter) = filter {
        command.insert("query", filter);
    }

    merge_options(command, options)
}

/// One entry of an update command's `updates` array.
pub fn update_statement(filter: bson::Document,
                        update: bson::Document,
                        upsert: Option<bool>,
                        multi: bool,
                        collation: Option<bson::Document>,
                        array_filters: Option<Vec<bson::Document>>)
                        -> bson::Document {
    let mut statement = doc! {
        "q": filter,
        "u": update
    };

    if let Some(upsert) = upsert {
        statement.insert("upsert", upsert);
    }

    if multi {
        statement.insert("multi", true);
    }

    if let Some(collation) = collation {
        statement.insert("collation", collation);
    }

    if let Some(filters) = array_filters {
        let filters: Vec<Bson> = filters.into_iter().map(Bson::Document).collect();
        statement.insert("arrayFilters", filters);
    }

    statement
}

/// One entry of a delete command's `deletes` array.
pub fn delete_statement(filter: bson::Document,
                        multi: bool,
                        collation: Option<bson::Document>)
                        -> bson::Document {
    let limit = if multi { 0 } else { 1 };
    let mut statement = doc! {
        "q": filter,
        "limit": limit
    };

    if let Some(collation) = collation {
        statement.insert("collation", collation);
    }

    statement
}

/// A batched insert, update or delete command.
///
/// `ordered` is only sent when false, since ordered execution is the server
/// default. Delete commands never carry `bypassDocumentValidation`.
pub fn write(kind: BatchKind,
             coll: &str,
             statements: Vec<bson::Document>,
             ordered: bool,
             bypass_document_validation: Option<bool>,
             write_concern: &WriteConcern)
             -> bson::Document {
    let (name, field) = match kind {
        BatchKind::Insert => ("insert", "documents"),
        BatchKind::Update => ("update", "updates"),
        BatchKind::Delete => ("delete", "deletes"),
    };

    let statements: Vec<Bson> = statements.into_iter().map(Bson::Document).collect();
    let mut command = bson::Document::new();
    command.insert(name, coll);
    command.insert(field, statements);

    if !ordered {
        command.insert("ordered", false);
    }

    if kind != BatchKind::Delete {
        if let Some(bypass) = bypass_document_validation {
            command.insert("bypassDocumentValidation", bypass);
        }
    }

    with_write_concern(command, write_concern)
}

/// An atomic find-and-modify. Exactly one of `remove` and `update` is encoded,
/// as dictated by `modification`; `options` carries sort, projection, upsert
/// and the pre- or post-image choice.
pub fn find_and_modify(coll: &str,
                       filter: bson::Document,
                       modification: Modification,
                       options: bson::Document,
                       write_concern: &WriteConcern)
                       -> bson::Document {
    let mut command = doc! {
        "findAndModify": coll,
        "query": filter
    };

    match modification {
        Modification::Delete => {
            command.insert("remove", true);
        }
        Modification::Replace(document) |
        Modification::Update(document) => {
            command.insert("update", document);
        }
    }

    let command = merge_options(command, options);
    with_write_concern(command, write_concern)
}

pub fn get_more(namespace: &Namespace, cursor_id: i64, batch_size: Option<i32>) -> bson::Document {
    let mut command = doc! {
        "getMore": cursor_id,
        "collection": namespace.coll.to_owned()
    };

    if let Some(size) = batch_size {
        command.insert("batchSize", size);
    }

    command
}

pub fn kill_cursors(namespace: &Namespace, cursor_ids: &[i64]) -> bson::Document {
    let ids: Vec<Bson> = cursor_ids.iter().map(|&id| Bson::I64(id)).collect();
    doc! {
        "killCursors": namespace.coll.to_owned(),
        "cursors": ids
    }
}

/// Attaches a `writeConcern` document unless every field defers to the server.
pub fn with_write_concern(mut command: bson::Document,
                          write_concern: &WriteConcern)
                          -> bson::Document {
    if !write_concern.is_server_default() {
        command.insert("writeConcern", write_concern.to_bson());
    }
    command
}

/// Size of the document once encoded as BSON.
pub fn encoded_size(document: &bson::Document) -> Result<usize> {
    let mut buf = Vec::new();
    bson::encode_document(&mut buf, document)?;
    Ok(buf.len())
}
