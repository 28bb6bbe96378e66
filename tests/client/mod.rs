mod coll;
mod settings;
mod typed;

use mongodb_collection::db::ThreadedDatabase;
use mongodb_collection::ThreadedClient;

use std::thread;

use crate::support;

#[test]
fn is_sync() {
    let (client, server) = support::client();
    let client1 = client.clone();
    let client2 = client.clone();

    let child1 = thread::spawn(move || {
        let coll = client1.db("test-client-mod-is_sync").collection("test1");
        coll.insert_one(doc! { "_id": 1 }, None)
            .expect("Failed to insert placeholder document into collection");
    });

    let child2 = thread::spawn(move || {
        let coll = client2.db("test-client-mod-is_sync").collection("test2");
        coll.insert_one(doc! { "_id": 2 }, None)
            .expect("Failed to insert placeholder document into collection");
    });

    child1.join().expect("first writer panicked");
    child2.join().expect("second writer panicked");

    assert_eq!(server.documents("test-client-mod-is_sync", "test1"), vec![doc! { "_id": 1 }]);
    assert_eq!(server.documents("test-client-mod-is_sync", "test2"), vec![doc! { "_id": 2 }]);
}

#[test]
fn request_ids_are_unique() {
    let (client, _) = support::client();
    let coll = client.db("test").collection("request_ids");

    let first = client.get_req_id();
    let second = coll.get_req_id();
    assert!(second > first);
}
