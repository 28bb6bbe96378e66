use bson::{Bson, Document};
use mongodb_collection::coll::options::{AggregateOptions, CountOptions, FindOptions, InsertManyOptions,
                                        ReplaceOptions, UpdateOptions};
use mongodb_collection::db::ThreadedDatabase;
use mongodb_collection::{Error, ErrorCode, ThreadedClient};

use crate::support::{self, Injection};

#[test]
fn find_and_insert() {
    let (client, _) = support::client();
    let coll = client.db("test").collection("find_and_insert");

    let doc = doc! { "title": "Jaws" };
    coll.insert_one(doc, None).ok().expect("Failed to insert document");

    let mut cursor = coll.find(None, None).ok().expect("Failed to execute find command.");
    let result = cursor.next().expect("cursor should return a document");
    let result = result.ok().expect("Failed to decode document");

    match result.get("title") {
        Some(&Bson::String(ref title)) => assert_eq!("Jaws", title),
        _ => panic!("Expected Bson::String!"),
    }

    match result.get("_id") {
        Some(&Bson::ObjectId(_)) => (),
        _ => panic!("Expected a generated ObjectId!"),
    }

    assert!(cursor.next().is_none());
}

#[test]
fn insert_one_keeps_supplied_id() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("insert_one_keeps_supplied_id");

    let result = coll.insert_one(doc! { "_id": 42, "title": "Jaws" }, None)
        .ok()
        .expect("Failed to insert document");

    assert!(result.acknowledged);
    assert_eq!(result.inserted_id, Bson::I32(42));

    let inserts = server.commands("insert");
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].get_str("insert").ok(), Some("insert_one_keeps_supplied_id"));
    assert!(!inserts[0].contains_key("ordered"));
    assert!(!inserts[0].contains_key("writeConcern"));
}

#[test]
fn insert_one_duplicate_key_is_write_error() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("insert_one_duplicate_key");
    server.seed("test", "insert_one_duplicate_key", vec![doc! { "_id": 1 }]);

    match coll.insert_one(doc! { "_id": 1 }, None) {
        Err(ref err @ Error::WriteError(_)) => {
            assert!(err.is_duplicate_key());
            assert_eq!(err.code(), Some(ErrorCode::DuplicateKey as i32));
        }
        other => panic!("Expected a write error, got {:?}", other),
    }
}

#[test]
fn find_with_filter_and_options() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("find_with_filter_and_options");
    server.seed("test", "find_with_filter_and_options", vec![
        doc! { "_id": 1, "genre": "horror" },
        doc! { "_id": 2, "genre": "comedy" },
        doc! { "_id": 3, "genre": "horror" },
        doc! { "_id": 4, "genre": "horror" },
    ]);

    let mut options = FindOptions::new();
    options.skip = Some(1);
    options.sort = Some(doc! { "_id": 1 });

    let results: Vec<Document> = coll.find(Some(doc! { "genre": "horror" }), Some(options))
        .ok()
        .expect("Failed to execute find command.")
        .map(|doc| doc.ok().expect("Failed to decode document"))
        .collect();

    let ids: Vec<_> = results.iter().map(|doc| doc.get("_id").cloned()).collect();
    assert_eq!(ids, vec![Some(Bson::I32(3)), Some(Bson::I32(4))]);

    let finds = server.commands("find");
    let keys: Vec<_> = finds[0].keys().cloned().collect();
    assert_eq!(keys, vec!["find", "filter", "sort", "skip"]);
}

#[test]
fn find_one_returns_first_match() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("find_one_returns_first_match");
    server.seed("test", "find_one_returns_first_match", support::numbered(300));

    let doc = coll.find_one(None, None)
        .ok()
        .expect("Failed to execute find_one.")
        .expect("a document should be found");
    assert_eq!(doc, doc! { "_id": 0, "n": 0 });

    let finds = server.commands("find");
    assert_eq!(finds[0].get("limit"), Some(&Bson::I64(1)));
    assert_eq!(finds[0].get("singleBatch"), Some(&Bson::Boolean(true)));
    assert!(server.get_mores().is_empty());
    assert_eq!(server.open_cursors(), 0);
}

#[test]
fn find_one_without_match() {
    let (client, _) = support::client();
    let coll = client.db("test").collection("find_one_without_match");

    let doc = coll.find_one(Some(doc! { "_id": "missing" }), None).ok().expect("find_one failed");
    assert!(doc.is_none());
}

#[test]
fn insert_many_generates_ids() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("insert_many_generates_ids");

    let docs = vec![doc! { "title": "Jaws" }, doc! { "_id": 7, "title": "Alien" }];
    let result = coll.insert_many(docs, None).ok().expect("Failed to insert documents");

    assert!(result.is_success());
    assert_eq!(result.inserted_ids.len(), 2);
    assert_eq!(result.inserted_ids.get(&1), Some(&Bson::I32(7)));
    match result.inserted_ids.get(&0) {
        Some(&Bson::ObjectId(_)) => (),
        other => panic!("Expected a generated ObjectId, got {:?}", other),
    }

    assert_eq!(server.documents("test", "insert_many_generates_ids").len(), 2);
}

#[test]
fn insert_many_ordered_stops_at_duplicate() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("insert_many_ordered");
    server.seed("test", "insert_many_ordered", vec![doc! { "_id": 2 }]);

    let docs = vec![doc! { "_id": 1 }, doc! { "_id": 2 }, doc! { "_id": 3 }];
    let result = coll.insert_many(docs, None).ok().expect("insert_many should report, not fail");

    assert!(!result.is_success());
    let exception = result.bulk_write_exception.expect("a bulk write exception");
    assert_eq!(exception.write_errors.len(), 1);
    assert_eq!(exception.write_errors[0].index, 1);
    assert_eq!(exception.write_errors[0].code, 11000);
    assert_eq!(exception.unprocessed_requests.len(), 1);

    let stored = server.documents("test", "insert_many_ordered");
    assert_eq!(stored, vec![doc! { "_id": 2 }, doc! { "_id": 1 }]);
}

#[test]
fn insert_many_unordered_attempts_everything() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("insert_many_unordered");
    server.seed("test", "insert_many_unordered", vec![doc! { "_id": 2 }]);

    let mut options = InsertManyOptions::new();
    options.ordered = Some(false);

    let docs = vec![doc! { "_id": 1 }, doc! { "_id": 2 }, doc! { "_id": 3 }];
    let result = coll.insert_many(docs, Some(options)).ok().expect("insert_many failed");

    let exception = result.bulk_write_exception.expect("a bulk write exception");
    assert_eq!(exception.write_errors.len(), 1);
    assert_eq!(exception.write_errors[0].index, 1);
    assert!(exception.unprocessed_requests.is_empty());

    assert_eq!(result.inserted_ids.keys().cloned().collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(server.documents("test", "insert_many_unordered").len(), 3);
    assert_eq!(server.commands("insert")[0].get("ordered"), Some(&Bson::Boolean(false)));
}

#[test]
fn delete_one_and_many() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("delete_one_and_many");
    server.seed("test", "delete_one_and_many", vec![
        doc! { "_id": 1, "kind": "a" },
        doc! { "_id": 2, "kind": "a" },
        doc! { "_id": 3, "kind": "a" },
        doc! { "_id": 4, "kind": "b" },
    ]);

    let result = coll.delete_one(doc! { "kind": "a" }, None).ok().expect("delete_one failed");
    assert_eq!(result.deleted_count, 1);

    let result = coll.delete_many(doc! { "kind": "a" }, None).ok().expect("delete_many failed");
    assert_eq!(result.deleted_count, 2);

    assert_eq!(server.documents("test", "delete_one_and_many"), vec![doc! { "_id": 4, "kind": "b" }]);

    let deletes = server.commands("delete");
    let limits: Vec<_> = deletes.iter()
        .map(|cmd| match cmd.get("deletes") {
            Some(&Bson::Array(ref statements)) => match statements[0] {
                Bson::Document(ref statement) => statement.get("limit").cloned(),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(limits, vec![Some(Bson::I32(1)), Some(Bson::I32(0))]);
}

#[test]
fn update_one_and_many() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("update_one_and_many");
    server.seed("test", "update_one_and_many", vec![
        doc! { "_id": 1, "score": 1 },
        doc! { "_id": 2, "score": 1 },
        doc! { "_id": 3, "score": 2 },
    ]);

    let result = coll.update_one(doc! { "score": 1 }, doc! { "$inc": { "score": 10 } }, None)
        .ok()
        .expect("update_one failed");
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 1);
    assert!(result.upserted_id.is_none());

    let result = coll.update_many(doc! {}, doc! { "$set": { "seen": true } }, None)
        .ok()
        .expect("update_many failed");
    assert_eq!(result.matched_count, 3);
    assert_eq!(result.modified_count, 3);

    let stored = server.documents("test", "update_one_and_many");
    assert_eq!(stored[0], doc! { "_id": 1, "score": 11, "seen": true });
    assert_eq!(stored[1], doc! { "_id": 2, "score": 1, "seen": true });
}

#[test]
fn update_one_upserts() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("update_one_upserts");

    let mut options = UpdateOptions::new();
    options.upsert = Some(true);

    let result = coll.update_one(doc! { "_id": "new" }, doc! { "$set": { "x": 1 } }, Some(options))
        .ok()
        .expect("update_one failed");

    assert_eq!(result.upserted_id, Some(Bson::String(String::from("new"))));
    assert_eq!(server.documents("test", "update_one_upserts"), vec![doc! { "_id": "new", "x": 1 }]);
}

#[test]
fn update_requires_operators() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("update_requires_operators");

    match coll.update_one(doc! {}, doc! { "x": 1 }, None) {
        Err(Error::ArgumentError(_)) => (),
        other => panic!("Expected an argument error, got {:?}", other),
    }

    match coll.update_many(doc! {}, doc! {}, None) {
        Err(Error::ArgumentError(_)) => (),
        other => panic!("Expected an argument error, got {:?}", other),
    }

    assert_eq!(server.round_trips(), 0);
}

#[test]
fn replace_one_keeps_id() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("replace_one_keeps_id");
    server.seed("test", "replace_one_keeps_id", vec![doc! { "_id": 1, "title": "Jaws" }]);

    let result = coll.replace_one(doc! { "_id": 1 }, doc! { "title": "Jaws 2" }, None)
        .ok()
        .expect("replace_one failed");
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 1);

    assert_eq!(server.documents("test", "replace_one_keeps_id"),
               vec![doc! { "_id": 1, "title": "Jaws 2" }]);

    let mut options = ReplaceOptions::new();
    options.upsert = Some(true);
    match coll.replace_one(doc! {}, doc! { "$set": { "title": "Jaws 3" } }, Some(options)) {
        Err(Error::ArgumentError(_)) => (),
        other => panic!("Expected an argument error, got {:?}", other),
    }
}

#[test]
fn count_and_distinct() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("count_and_distinct");
    server.seed("test", "count_and_distinct", vec![
        doc! { "_id": 1, "genre": "horror" },
        doc! { "_id": 2, "genre": "comedy" },
        doc! { "_id": 3, "genre": "horror" },
    ]);

    assert_eq!(coll.count(None, None).ok().expect("count failed"), 3);
    assert_eq!(coll.count(Some(doc! { "genre": "horror" }), None).ok().expect("count failed"), 2);

    let mut options = CountOptions::new();
    options.limit = Some(1);
    assert_eq!(coll.count(None, Some(options)).ok().expect("count failed"), 1);

    let values = coll.distinct("genre", None, None).ok().expect("distinct failed");
    assert_eq!(values, vec![Bson::String(String::from("horror")), Bson::String(String::from("comedy"))]);

    let distinct = &server.commands("distinct")[0];
    assert_eq!(distinct.get_str("key").ok(), Some("genre"));
    assert!(!distinct.contains_key("query"));
}

#[test]
fn aggregate_returns_cursor() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("aggregate_returns_cursor");
    server.seed("test", "aggregate_returns_cursor", support::numbered(10));

    let mut options = AggregateOptions::new();
    options.batch_size = Some(3);

    let pipeline = vec![doc! { "$skip": 2 }, doc! { "$limit": 5 }];
    let results: Vec<Document> = coll.aggregate(pipeline, Some(options))
        .ok()
        .expect("aggregate failed")
        .map(|doc| doc.ok().expect("Failed to decode document"))
        .collect();

    let ns: Vec<_> = results.iter().map(|doc| doc.get("n").cloned()).collect();
    assert_eq!(ns, (2..7).map(|i| Some(Bson::I32(i))).collect::<Vec<_>>());

    let aggregate = &server.commands("aggregate")[0];
    assert_eq!(aggregate.get_document("cursor").ok(), Some(&doc! { "batchSize": 3 }));
    assert_eq!(server.get_mores(), vec![(1001, Some(3))]);
}

#[test]
fn aggregate_with_out_stage() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("aggregate_with_out_stage");
    server.seed("test", "aggregate_with_out_stage", support::numbered(4));

    let pipeline = vec![doc! { "$match": { "n": 1 } }, doc! { "$out": "archive" }];
    let mut cursor = coll.aggregate(pipeline, None).ok().expect("aggregate failed");
    assert!(cursor.next().is_none());

    assert_eq!(server.documents("test", "archive"), vec![doc! { "_id": 1, "n": 1 }]);
    assert_eq!(server.targets(), vec![mongodb_collection::transport::TargetSelector::Primary]);
}

#[test]
fn command_errors_surface() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("command_errors_surface");
    server.inject("count", Injection::Reply(doc! {
        "ok": 0,
        "code": 26,
        "codeName": "NamespaceNotFound",
        "errmsg": "ns not found"
    }));

    match coll.count(None, None) {
        Err(Error::CommandError { code, code_name, .. }) => {
            assert_eq!(code, ErrorCode::NamespaceNotFound as i32);
            assert_eq!(code_name, Some(String::from("NamespaceNotFound")));
        }
        other => panic!("Expected a command error, got {:?}", other),
    }

    server.inject("find", Injection::TransportError);
    match coll.find(None, None) {
        Err(Error::TransportError(_)) => (),
        Err(other) => panic!("Expected a transport error, got {:?}", other),
        Ok(_) => panic!("Expected a transport error, got a cursor"),
    }
}

#[test]
fn write_concern_error_on_single_write() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("write_concern_error_on_single_write");
    server.inject("delete", Injection::Reply(doc! {
        "ok": 1,
        "n": 1,
        "writeConcernError": { "code": 64, "errmsg": "waiting for replication timed out" }
    }));

    match coll.delete_one(doc! { "_id": 1 }, None) {
        Err(Error::WriteError(exception)) => {
            assert!(exception.write_error.is_none());
            let wc_err = exception.write_concern_error.expect("a write concern error");
            assert_eq!(wc_err.code, ErrorCode::WriteConcernFailed as i32);
        }
        other => panic!("Expected a write error, got {:?}", other),
    }
}
