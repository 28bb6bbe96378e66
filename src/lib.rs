//! Collection-level operations for a MongoDB client.
//!
//! The library exposes the operations an application runs against a single
//! collection: queries returning lazy cursors, single and bulk writes, and the
//! atomic find-and-modify family. Moving commands to the server is delegated
//! to a `Transport` implementation, and converting application values to
//! documents to a `DocumentCodec`.
//!
//! ```no_run
//! # #[macro_use] extern crate bson;
//! # extern crate mongodb_collection;
//! # use std::sync::Arc;
//! # use mongodb_collection::transport::Transport;
//! # fn transport() -> Arc<dyn Transport> { unimplemented!() }
//! # fn main() {
//! use mongodb_collection::{Client, ThreadedClient};
//! use mongodb_collection::db::ThreadedDatabase;
//!
//! let client = Client::connect(transport());
//! let coll = client.db("test").collection("movies");
//!
//! coll.insert_one(doc! { "title": "Back to the Future" }, None).unwrap();
//!
//! let cursor = coll.find(Some(doc! { "title": "Back to the Future" }), None).unwrap();
//! for result in cursor {
//!     println!("{}", result.unwrap());
//! }
//! # }
//! ```
//!
//! ## Command Monitoring
//!
//! Hooks registered with `add_start_hook` and `add_completion_hook` observe
//! every command the client sends.
//!
//! ```no_run
//! # extern crate mongodb_collection;
//! # use std::sync::Arc;
//! # use mongodb_collection::transport::Transport;
//! # fn transport() -> Arc<dyn Transport> { unimplemented!() }
//! # fn main() {
//! use mongodb_collection::{Client, CommandResult, ThreadedClient};
//!
//! let client = Client::connect(transport());
//! client.add_completion_hook(|result: &CommandResult| {
//!     println!("{}", result);
//! }).unwrap();
//! # }
//! ```
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate bson;

pub mod apm;
pub mod cancellation;
pub mod codec;
pub mod coll;
pub mod command;
pub mod command_type;
pub mod common;
pub mod cursor;
pub mod db;
pub mod error;
pub mod executor;
pub mod transport;

pub use crate::apm::{CommandResult, CommandStarted};
pub use crate::cancellation::CancellationToken;
pub use crate::command_type::CommandType;
pub use crate::error::{Error, ErrorCode, Result};

use crate::apm::Listener;
use crate::common::{ReadPreference, WriteConcern};
use crate::db::{Database, ThreadedDatabase};
use crate::executor::Executor;
use crate::transport::Transport;

use std::sync::Arc;
use std::time::Duration;

/// Idle time after which an unused cursor is released instead of continued.
/// Matches the server's default `cursorTimeoutMillis`.
pub const DEFAULT_CURSOR_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Space reserved in a write command for everything but its statements.
pub const COMMAND_OVERHEAD_BYTES: usize = 16 * 1024;

/// Size and count bounds for write batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Limits {
    /// Most statements a single write command may carry.
    pub max_write_batch_size: usize,
    /// Largest single document or statement, in bytes.
    pub max_bson_object_size: usize,
    /// Largest message the transport will send, in bytes.
    pub max_message_size_bytes: usize,
}

impl Limits {
    /// Byte budget for the statements of one write command.
    pub fn max_batch_bytes(&self) -> usize {
        self.max_message_size_bytes.saturating_sub(COMMAND_OVERHEAD_BYTES)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_write_batch_size: 100_000,
            max_bson_object_size: 16 * 1024 * 1024,
            max_message_size_bytes: 48_000_000,
        }
    }
}

/// Client-wide configuration inherited by every database and collection.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    pub read_preference: ReadPreference,
    pub write_concern: WriteConcern,
    pub limits: Limits,
    pub cursor_idle_timeout: Duration,
}

impl ClientOptions {
    pub fn new() -> ClientOptions {
        Default::default()
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            read_preference: ReadPreference::primary(),
            write_concern: WriteConcern::new(),
            limits: Limits::default(),
            cursor_idle_timeout: DEFAULT_CURSOR_IDLE_TIMEOUT,
        }
    }
}

/// Interfaces with a MongoDB deployment through a transport.
pub struct ClientInner {
    executor: Executor,
    pub options: ClientOptions,
}

pub type Client = Arc<ClientInner>;

pub trait ThreadedClient: Sync + Sized {
    /// Creates a client with default options that sends commands through
    /// `transport`.
    fn connect(transport: Arc<dyn Transport>) -> Self;
    /// `connect` with custom options.
    fn with_options(transport: Arc<dyn Transport>, options: ClientOptions) -> Self;
    /// Creates a database representation with default read and write controls.
    fn db(&self, db_name: &str) -> Database;
    /// Creates a database representation with custom read and write controls.
    fn db_with_prefs(&self,
                     db_name: &str,
                     read_preference: Option<ReadPreference>,
                     write_concern: Option<WriteConcern>)
                     -> Database;
    /// Returns a unique operational request id.
    fn get_req_id(&self) -> i64;
    /// Registers a hook run before every command is sent.
    fn add_start_hook<F>(&self, hook: F) -> Result<()>
        where F: Fn(&CommandStarted) + Send + Sync + 'static;
    /// Registers a hook run after every command completes or fails.
    fn add_completion_hook<F>(&self, hook: F) -> Result<()>
        where F: Fn(&CommandResult) + Send + Sync + 'static;
}

impl ThreadedClient for Client {
    fn connect(transport: Arc<dyn Transport>) -> Client {
        Client::with_options(transport, ClientOptions::new())
    }

    fn with_options(transport: Arc<dyn Transport>, options: ClientOptions) -> Client {
        Arc::new(ClientInner {
            executor: Executor::new(transport, Arc::new(Listener::new())),
            options: options,
        })
    }

    fn db(&self, db_name: &str) -> Database {
        Database::open(self.clone(), db_name, None, None)
    }

    fn db_with_prefs(&self,
                     db_name: &str,
                     read_preference: Option<ReadPreference>,
                     write_concern: Option<WriteConcern>)
                     -> Database {
        Database::open(self.clone(), db_name, read_preference, write_concern)
    }

    fn get_req_id(&self) -> i64 {
        self.executor.get_req_id()
    }

    fn add_start_hook<F>(&self, hook: F) -> Result<()>
        where F: Fn(&CommandStarted) + Send + Sync + 'static
    {
        self.executor.listener().add_start_hook(hook)
    }

    fn add_completion_hook<F>(&self, hook: F) -> Result<()>
        where F: Fn(&CommandResult) + Send + Sync + 'static
    {
        self.executor.listener().add_completion_hook(hook)
    }
}

impl ClientInner {
    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}
