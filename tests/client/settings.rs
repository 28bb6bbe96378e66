use mongodb_collection::coll::options::FindOptions;
use mongodb_collection::common::{ReadMode, ReadPreference, WriteConcern};
use mongodb_collection::db::ThreadedDatabase;
use mongodb_collection::transport::TargetSelector;
use mongodb_collection::{ClientOptions, ThreadedClient};

use crate::support;

#[test]
fn settings_are_inherited() {
    let mut options = ClientOptions::new();
    options.read_preference = ReadPreference::new(ReadMode::Nearest, None);
    options.write_concern = WriteConcern::nodes(2);

    let (client, _) = support::client_with_options(options);
    let db = client.db("test");
    assert_eq!(db.read_preference.mode, ReadMode::Nearest);

    let coll = db.collection("settings_are_inherited");
    assert_eq!(coll.read_preference().mode, ReadMode::Nearest);
    assert_eq!(coll.write_concern(), &WriteConcern::nodes(2));

    let db = client.db_with_prefs("test", Some(ReadPreference::primary()), None);
    let coll = db.collection_with_prefs("settings_are_inherited", None, Some(WriteConcern::majority()));
    assert_eq!(coll.read_preference().mode, ReadMode::Primary);
    assert_eq!(coll.write_concern(), &WriteConcern::majority());
}

#[test]
fn with_settings_do_not_alias() {
    let (client, _) = support::client();
    let coll = client.db("test").collection("with_settings_do_not_alias");

    let secondary = coll.with_read_preference(ReadPreference::new(ReadMode::Secondary, None));
    let majority = coll.with_write_concern(WriteConcern::majority());

    assert_eq!(coll.read_preference().mode, ReadMode::Primary);
    assert_eq!(coll.write_concern(), &WriteConcern::new());

    assert_eq!(secondary.read_preference().mode, ReadMode::Secondary);
    assert_eq!(secondary.write_concern(), &WriteConcern::new());

    assert_eq!(majority.read_preference().mode, ReadMode::Primary);
    assert_eq!(majority.write_concern(), &WriteConcern::majority());

    // Derived handles share the namespace rather than copying it.
    assert!(std::ptr::eq(coll.namespace(), secondary.namespace()));
    assert!(std::ptr::eq(coll.namespace(), majority.namespace()));
    assert_eq!(secondary.name(), "with_settings_do_not_alias");
}

#[test]
fn reads_use_read_preference() {
    let (client, server) = support::client();
    let coll = client.db("test").collection("reads_use_read_preference");
    let secondary = ReadPreference::new(ReadMode::Secondary, None);
    let nearest = ReadPreference::new(ReadMode::Nearest, None);

    let coll = coll.with_read_preference(secondary.clone());
    coll.find_one(None, None).ok().expect("find_one failed");
    coll.count(None, None).ok().expect("count failed");

    let mut options = FindOptions::new();
    options.read_preference = Some(nearest.clone());
    coll.find(None, Some(options)).ok().expect("find failed");

    assert_eq!(server.targets(), vec![
        TargetSelector::Read(secondary.clone()),
        TargetSelector::Read(secondary),
        TargetSelector::Read(nearest),
    ]);
}

#[test]
fn writes_ignore_read_preference() {
    let (client, server) = support::client();
    let coll = client.db("test")
        .collection("writes_ignore_read_preference")
        .with_read_preference(ReadPreference::new(ReadMode::Secondary, None));

    coll.insert_one(doc! { "_id": 1 }, None).ok().expect("insert_one failed");
    coll.update_one(doc! { "_id": 1 }, doc! { "$set": { "x": 1 } }, None).ok().expect("update_one failed");
    coll.delete_one(doc! { "_id": 1 }, None).ok().expect("delete_one failed");

    assert_eq!(server.targets(), vec![TargetSelector::Primary; 3]);
}

#[test]
fn unacknowledged_writes_report_no_counts() {
    let (client, server) = support::client();
    let coll = client.db("test")
        .collection("unacknowledged_writes")
        .with_write_concern(WriteConcern::nodes(0));

    let result = coll.delete_many(doc! {}, None).ok().expect("delete_many failed");
    assert!(!result.acknowledged);
    assert_eq!(result.deleted_count, 0);

    let command = &server.commands("delete")[0];
    assert_eq!(command.get_document("writeConcern").ok(), Some(&doc! { "w": 0 }));
}
