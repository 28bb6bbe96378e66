use bson::Bson;
use mongodb_collection::coll::options::WriteModel;
use mongodb_collection::db::ThreadedDatabase;
use mongodb_collection::{Error, ThreadedClient};

use crate::support;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Movie {
    #[serde(rename = "_id")]
    id: i32,
    title: String,
    year: i32,
}

fn movie(id: i32, title: &str, year: i32) -> Movie {
    Movie {
        id: id,
        title: title.to_owned(),
        year: year,
    }
}

#[test]
fn typed_round_trip() {
    let (client, server) = support::client();
    let coll = client.db("test").typed_collection::<Movie>("typed_round_trip");

    coll.insert_one(movie(1, "Jaws", 1975), None).ok().expect("insert_one failed");
    coll.insert_many(vec![movie(2, "Alien", 1979), movie(3, "Heat", 1995)], None)
        .ok()
        .expect("insert_many failed");

    assert_eq!(server.documents("test", "typed_round_trip")[0],
               doc! { "_id": 1, "title": "Jaws", "year": 1975 });

    let found = coll.find_one(Some(doc! { "title": "Alien" }), None)
        .ok()
        .expect("find_one failed");
    assert_eq!(found, Some(movie(2, "Alien", 1979)));

    let all: Vec<Movie> = coll.find(None, None)
        .ok()
        .expect("find failed")
        .map(|movie| movie.ok().expect("Failed to decode movie"))
        .collect();
    assert_eq!(all.len(), 3);

    let replaced = coll.find_one_and_replace(doc! { "_id": 3 }, movie(3, "Heat", 1996), None)
        .ok()
        .expect("find_one_and_replace failed");
    assert_eq!(replaced, Some(movie(3, "Heat", 1995)));
}

#[test]
fn typed_bulk_write() {
    let (client, server) = support::client();
    let coll = client.db("test").typed_collection::<Movie>("typed_bulk_write");

    let models = vec![
        WriteModel::insert_one(movie(1, "Jaws", 1975)),
        WriteModel::replace_one(doc! { "_id": 1 }, movie(1, "Jaws", 1976), None),
        WriteModel::update_one(doc! { "_id": 1 }, doc! { "$inc": { "year": 1 } }, None),
    ];

    let result = coll.bulk_write(models, None).ok().expect("bulk_write failed");
    assert!(result.is_success());
    assert_eq!(result.inserted_ids.get(&0), Some(&Bson::I32(1)));
    assert_eq!(result.matched_count, 2);

    assert_eq!(server.documents("test", "typed_bulk_write"),
               vec![doc! { "_id": 1, "title": "Jaws", "year": 1977 }]);
}

#[test]
fn undecodable_documents_surface_errors() {
    let (client, server) = support::client();
    let coll = client.db("test").typed_collection::<Movie>("undecodable_documents");
    server.seed("test", "undecodable_documents", vec![doc! { "_id": 1, "title": 7 }]);

    match coll.find_one(None, None) {
        Err(Error::DecoderError(_)) => (),
        other => panic!("Expected a decoder error, got {:?}", other),
    }
}

#[test]
fn untyped_handle_on_typed_collection() {
    let (client, server) = support::client();
    let typed = client.db("test").typed_collection::<Movie>("untyped_handle");
    server.seed("test", "untyped_handle", vec![doc! { "_id": 1, "title": "Jaws", "year": 1975, "extra": true }]);

    let raw = typed.clone_with_type::<bson::Document>(std::sync::Arc::new(mongodb_collection::codec::RawCodec));
    let doc = raw.find_one(None, None).ok().expect("find_one failed").expect("a document");
    assert_eq!(doc.get("extra"), Some(&Bson::Boolean(true)));
    assert_eq!(raw.name(), typed.name());
}
