//! Interface for database-level handles.
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{DocumentCodec, RawCodec, SerdeCodec};
use crate::coll::Collection;
use crate::common::{ReadPreference, WriteConcern};
use crate::Client;

use std::sync::Arc;

/// Interfaces with a MongoDB database.
pub struct DatabaseInner {
    pub name: String,
    pub client: Client,
    pub read_preference: ReadPreference,
    pub write_concern: WriteConcern,
}

pub type Database = Arc<DatabaseInner>;

pub trait ThreadedDatabase {
    /// Creates a database representation with optional read and write controls.
    fn open(client: Client,
            name: &str,
            read_preference: Option<ReadPreference>,
            write_concern: Option<WriteConcern>)
            -> Database;
    /// Creates an untyped collection representation with inherited read and write controls.
    fn collection(&self, coll_name: &str) -> Collection;
    /// Creates an untyped collection representation with custom read and write controls.
    fn collection_with_prefs(&self,
                             coll_name: &str,
                             read_preference: Option<ReadPreference>,
                             write_concern: Option<WriteConcern>)
                             -> Collection;
    /// Creates a collection whose documents are converted by `codec`.
    fn collection_with_codec<T>(&self,
                                coll_name: &str,
                                codec: Arc<dyn DocumentCodec<T>>)
                                -> Collection<T>;
    /// Creates a collection of serde-compatible values.
    fn typed_collection<T>(&self, coll_name: &str) -> Collection<T>
        where T: Serialize + DeserializeOwned + 'static;
}

impl ThreadedDatabase for Database {
    fn open(client: Client,
            name: &str,
            read_preference: Option<ReadPreference>,
            write_concern: Option<WriteConcern>)
            -> Database {
        let rp = read_preference.unwrap_or_else(|| client.options.read_preference.to_owned());
        let wc = write_concern.unwrap_or_else(|| client.options.write_concern.to_owned());

        Arc::new(DatabaseInner {
            name: name.to_owned(),
            client: client,
            read_preference: rp,
            write_concern: wc,
        })
    }

    fn collection(&self, coll_name: &str) -> Collection {
        self.collection_with_codec(coll_name, Arc::new(RawCodec))
    }

    fn collection_with_prefs(&self,
                             coll_name: &str,
                             read_preference: Option<ReadPreference>,
                             write_concern: Option<WriteConcern>)
                             -> Collection {
        Collection::new(self.clone(), coll_name, Arc::new(RawCodec), read_preference, write_concern)
    }

    fn collection_with_codec<T>(&self,
                                coll_name: &str,
                                codec: Arc<dyn DocumentCodec<T>>)
                                -> Collection<T> {
        Collection::new(self.clone(), coll_name, codec, None, None)
    }

    fn typed_collection<T>(&self, coll_name: &str) -> Collection<T>
        where T: Serialize + DeserializeOwned + 'static
    {
        self.collection_with_codec(coll_name, Arc::new(SerdeCodec::<T>::new()))
    }
}
