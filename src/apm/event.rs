use std::fmt::{Display, Error, Formatter};

use bson::Document;
use crate::error::Error as MongoError;

/// Published just before a command is handed to the transport.
pub struct CommandStarted {
    pub command: Document,
    pub database_name: String,
    pub command_name: String,
    pub request_id: i64,
}

impl Display for CommandStarted {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), Error> {
        fmt.write_fmt(format_args!("COMMAND.{} {} STARTED: {}", self.command_name,
                                   self.database_name, self.command))
    }
}

/// Published once the transport has answered or failed.
pub enum CommandResult<'a> {
    Success {
        duration: u64,
        reply: Document,
        command_name: String,
        request_id: i64,
    },
    Failure {
        duration: u64,
        command_name: String,
        failure: &'a MongoError,
        request_id: i64,
    },
}

impl<'a> CommandResult<'a> {
    pub fn request_id(&self) -> i64 {
        match *self {
            CommandResult::Success { request_id, .. } |
            CommandResult::Failure { request_id, .. } => request_id,
        }
    }

    pub fn is_success(&self) -> bool {
        match *self {
            CommandResult::Success { .. } => true,
            CommandResult::Failure { .. } => false,
        }
    }
}

impl<'a> Display for CommandResult<'a> {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), Error> {
        match *self {
            CommandResult::Success { duration, ref reply, ref command_name, .. } => {
                fmt.write_fmt(format_args!("COMMAND.{} COMPLETED: {} ({} ns)", command_name,
                                           reply, duration))
            }
            CommandResult::Failure { duration, ref command_name, failure, .. } => {
                fmt.write_fmt(format_args!("COMMAND.{} FAILURE: {} ({} ns)", command_name,
                                           failure, duration))
            }
        }
    }
}
