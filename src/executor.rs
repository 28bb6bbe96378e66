//! Dispatches built commands through the transport.
//!
//! Each call is exactly one round trip. The executor never retries; it checks
//! cancellation before dispatch, routes the command, publishes monitoring
//! events and separates server-reported command failures from malformed
//! replies.
use bson::{self, Bson};
use log::{debug, warn};

use crate::apm::{CommandResult, CommandStarted, Listener};
use crate::cancellation::CancellationToken;
use crate::command;
use crate::command_type::CommandType;
use crate::common::{Namespace, ReadPreference};
use crate::transport::{TargetSelector, Transport};
use crate::{Error, Result};

use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

/// Runs commands against the transport. Clones share the transport, the
/// monitoring listener and the request id counter.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    listener: Arc<Listener>,
    req_id: Arc<AtomicIsize>,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, listener: Arc<Listener>) -> Executor {
        Executor {
            transport: transport,
            listener: listener,
            req_id: Arc::new(AtomicIsize::new(0)),
        }
    }

    /// Returns a unique operational request id.
    pub fn get_req_id(&self) -> i64 {
        self.req_id.fetch_add(1, Ordering::SeqCst) as i64
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Picks the server kind a command must run on. Writes ignore the read
    /// preference entirely.
    pub fn select_target(cmd_type: CommandType,
                         read_preference: Option<&ReadPreference>)
                         -> TargetSelector {
        if cmd_type.is_write_command() {
            return TargetSelector::Primary;
        }

        match read_preference {
            Some(rp) => TargetSelector::Read(rp.clone()),
            None => TargetSelector::Primary,
        }
    }

    /// Sends `command` to `db` and returns the server reply once it reports
    /// success.
    pub fn execute(&self,
                   db: &str,
                   command: bson::Document,
                   cmd_type: CommandType,
                   read_preference: Option<&ReadPreference>,
                   cancel: &CancellationToken)
                   -> Result<bson::Document> {
        let target = Executor::select_target(cmd_type, read_preference);
        let transport = self.transport.clone();
        let db_name = db.to_owned();

        self.round_trip(db, cmd_type, command.clone(), cancel, move || {
            transport.send(&db_name, command, &target, cancel)
        })
    }

    /// Requests the next batch of a server cursor.
    pub fn get_more(&self,
                    namespace: &Namespace,
                    cursor_id: i64,
                    batch_size: Option<i32>,
                    cancel: &CancellationToken)
                    -> Result<bson::Document> {
        let command = command::get_more(namespace, cursor_id, batch_size);
        let transport = self.transport.clone();
        self.round_trip(&namespace.db, CommandType::GetMore, command, cancel, move || {
            transport.get_more(namespace, cursor_id, batch_size, cancel)
        })
    }

    /// Releases a server cursor without waiting for, or reporting, the outcome.
    pub fn kill_cursor(&self, namespace: &Namespace, cursor_id: i64) {
        debug!("COMMAND.{} {}: {}",
               CommandType::KillCursors.to_str(),
               namespace.db,
               command::kill_cursors(namespace, &[cursor_id]));
        self.transport.kill_cursors(namespace, &[cursor_id]);
    }

    fn round_trip<F>(&self,
                     db: &str,
                     cmd_type: CommandType,
                     command: bson::Document,
                     cancel: &CancellationToken,
                     send: F)
                     -> Result<bson::Document>
        where F: FnOnce() -> Result<bson::Document>
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let req_id = self.get_req_id();
        let cmd_name = cmd_type.to_str();

        let started = CommandStarted {
            command: command,
            database_name: db.to_owned(),
            command_name: cmd_name.to_owned(),
            request_id: req_id,
        };

        debug!("{}", started);
        if let Err(e) = self.listener.run_start_hooks(&started) {
            warn!("Failed to run start hooks for request {}: {}", req_id, e);
        }

        let init_time = time::precise_time_ns();
        let result = send().and_then(validate_reply);
        let duration = time::precise_time_ns() - init_time;

        let hook_result = match result {
            Ok(ref reply) => {
                let event = CommandResult::Success {
                    duration: duration,
                    reply: reply.clone(),
                    command_name: cmd_name.to_owned(),
                    request_id: req_id,
                };
                debug!("{}", event);
                self.listener.run_completion_hooks(&event)
            }
            Err(ref err) => {
                let event = CommandResult::Failure {
                    duration: duration,
                    command_name: cmd_name.to_owned(),
                    failure: err,
                    request_id: req_id,
                };
                warn!("{}", event);
                self.listener.run_completion_hooks(&event)
            }
        };

        if let Err(e) = hook_result {
            warn!("Failed to run completion hooks for request {}: {}", req_id, e);
        }

        result
    }
}

/// Separates `ok: 0` replies (command errors) from replies that cannot be
/// interpreted at all (protocol errors).
fn validate_reply(reply: bson::Document) -> Result<bson::Document> {
    let ok = match reply.get("ok") {
        Some(&Bson::FloatingPoint(f)) => f == 1.0,
        Some(&Bson::I32(i)) => i == 1,
        Some(&Bson::I64(i)) => i == 1,
        Some(&Bson::Boolean(b)) => b,
        Some(other) => {
            return Err(Error::ResponseError(format!("Reply has an invalid 'ok' field: {:?}", other)))
        }
        None => return Err(Error::ResponseError(String::from("Reply is missing the 'ok' field."))),
    };

    if ok {
        Ok(reply)
    } else {
        Err(Error::from_command_reply(&reply))
    }
}
