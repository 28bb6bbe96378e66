//! The collaborator that moves commands to the server and replies back.
//!
//! Connection management, server selection and wire framing all live behind
//! this trait; the collection layer only ever sees decoded reply documents.
use crate::cancellation::CancellationToken;
use crate::common::{Namespace, ReadPreference};
use crate::Result;

/// Describes which kind of server a command must be routed to.
#[derive(Clone, Debug, PartialEq)]
pub enum TargetSelector {
    /// A primary-capable node. Writes always use this.
    Primary,
    /// Any node permitted by the read preference.
    Read(ReadPreference),
}

/// Sends commands to a deployment.
///
/// Implementations are expected to abandon an in-flight wait and return
/// `Error::Cancelled` once `cancel` fires, and to report failures to deliver a
/// command or read its reply as `Error::TransportError`.
pub trait Transport: Send + Sync {
    /// Runs `command` against `db` and returns the reply document.
    fn send(&self,
            db: &str,
            command: bson::Document,
            target: &TargetSelector,
            cancel: &CancellationToken)
            -> Result<bson::Document>;

    /// Fetches the next batch of an open server cursor.
    fn get_more(&self,
                namespace: &Namespace,
                cursor_id: i64,
                batch_size: Option<i32>,
                cancel: &CancellationToken)
                -> Result<bson::Document>;

    /// Releases server cursors. Failures are ignored by callers.
    fn kill_cursors(&self, namespace: &Namespace, cursor_ids: &[i64]);
}
