//! Lazily iterates over the results of a query or aggregation.
use bson::{self, Bson};
use log::{debug, warn};

use crate::cancellation::CancellationToken;
use crate::codec::DocumentCodec;
use crate::command_type::CommandType;
use crate::common::{get_integer, Namespace, ReadPreference};
use crate::error::ErrorCode;
use crate::executor::Executor;
use crate::{Error, Result};

use std::cmp;
use std::collections::vec_deque::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where a cursor is in its lifecycle. The initial command always runs while
/// the cursor is being opened, so a live cursor starts out `Active` with its
/// first batch loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorState {
    /// Documents may still be buffered or available from the server.
    Active,
    /// Every document has been returned; reads keep returning nothing.
    Exhausted,
    /// Released before exhaustion; reads fail with `Error::CursorClosed`.
    Closed,
}

/// How a new cursor should batch and bound its results.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CursorSettings {
    pub batch_size: Option<i32>,
    /// `0` leaves the result unbounded; a negative value returns a single
    /// batch of at most `-limit` documents.
    pub limit: i64,
    /// Reads that need a new batch after the cursor sat unused for longer
    /// than this release the cursor instead.
    pub idle_timeout: Option<Duration>,
}

/// Returns documents from a server cursor, fetching further batches only as
/// the buffered ones are consumed.
///
/// The server-side cursor is released exactly once: when the server reports
/// it exhausted, when the requested limit is reached, on `close`, on a failed
/// or cancelled fetch, or when the `Cursor` is dropped.
pub struct Cursor<T = bson::Document> {
    executor: Executor,
    namespace: Namespace,
    codec: Arc<dyn DocumentCodec<T>>,
    cancel: CancellationToken,
    batch_size: Option<i32>,
    cursor_id: i64,
    limit: i64,
    count: i64,
    buffer: VecDeque<bson::Document>,
    state: CursorState,
    idle_timeout: Option<Duration>,
    last_used: Instant,
}

impl<T> Cursor<T> {
    /// Runs the command that creates the cursor and loads its first batch.
    ///
    /// # Arguments
    ///
    /// `namespace` - The collection the command runs against.
    /// `command` - A find or aggregate command replying with a cursor document.
    /// `read_preference` - Where the command may be served; `None` targets the primary.
    ///
    /// # Return value
    ///
    /// Returns the opened cursor, or the error the initial command failed with.
    pub fn open(executor: Executor,
                namespace: Namespace,
                command: bson::Document,
                cmd_type: CommandType,
                read_preference: Option<&ReadPreference>,
                codec: Arc<dyn DocumentCodec<T>>,
                cancel: CancellationToken,
                settings: CursorSettings)
                -> Result<Cursor<T>> {
        let reply = executor.execute(&namespace.db, command, cmd_type, read_preference, &cancel)?;
        let (cursor_id, reply_ns, first_batch) = parse_cursor_reply(&reply, "firstBatch")?;

        let mut cursor = Cursor {
            executor: executor,
            namespace: reply_ns.unwrap_or(namespace),
            codec: codec,
            cancel: cancel,
            batch_size: settings.batch_size,
            cursor_id: cursor_id,
            limit: settings.limit.checked_abs().unwrap_or(i64::max_value()),
            count: 0,
            buffer: first_batch,
            state: CursorState::Active,
            idle_timeout: settings.idle_timeout,
            last_used: Instant::now(),
        };

        cursor.apply_limit();

        if settings.limit < 0 {
            cursor.release();
        }

        Ok(cursor)
    }

    /// The server cursor id, or `0` once nothing remains open server-side.
    pub fn id(&self) -> i64 {
        self.cursor_id
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Checks whether there are any more documents for the cursor to return,
    /// fetching the next batch if the buffered one is drained.
    pub fn has_next(&mut self) -> Result<bool> {
        match self.state {
            CursorState::Closed => return Err(Error::CursorClosed),
            CursorState::Exhausted => return Ok(false),
            CursorState::Active => (),
        }

        // A live server cursor may answer with an empty batch.
        while self.buffer.is_empty() && self.cursor_id != 0 {
            self.fetch_more()?;
        }

        if self.buffer.is_empty() {
            self.state = CursorState::Exhausted;
        }

        Ok(!self.buffer.is_empty())
    }

    /// Attempts to read a specified number of documents from the cursor.
    ///
    /// # Return value
    ///
    /// Returns up to `n` documents; fewer are returned once the cursor is
    /// exhausted.
    pub fn next_n(&mut self, n: usize) -> Result<Vec<T>> {
        let mut vec = Vec::with_capacity(n);

        for _ in 0..n {
            match self.next() {
                Some(Ok(value)) => vec.push(value),
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }

        Ok(vec)
    }

    /// Returns every buffered document, fetching a new batch first if none
    /// are buffered.
    pub fn drain_current_batch(&mut self) -> Result<Vec<T>> {
        if !self.has_next()? {
            return Ok(Vec::new());
        }

        let batch: Vec<bson::Document> = self.buffer.drain(..).collect();
        self.count += batch.len() as i64;
        self.touch_exhaustion();

        batch.into_iter().map(|doc| self.codec.decode(doc)).collect()
    }

    /// Releases the server cursor and discards buffered documents. Later reads
    /// fail with `Error::CursorClosed`.
    pub fn close(&mut self) {
        if self.state == CursorState::Closed {
            return;
        }

        self.release();
        self.buffer.clear();
        self.state = CursorState::Closed;
    }

    fn next_document(&mut self) -> Result<Option<bson::Document>> {
        if !self.has_next()? {
            return Ok(None);
        }

        let doc = self.buffer.pop_front();
        if doc.is_some() {
            self.count += 1;
            self.touch_exhaustion();
        }

        Ok(doc)
    }

    // Marks the cursor exhausted as soon as the last document is handed out.
    fn touch_exhaustion(&mut self) {
        if self.buffer.is_empty() && self.cursor_id == 0 {
            self.state = CursorState::Exhausted;
        }
    }

    fn fetch_more(&mut self) -> Result<()> {
        if self.cursor_id == 0 {
            return Ok(());
        }

        if self.idle_expired() {
            debug!("Cursor {} on {} exceeded its idle timeout", self.cursor_id, self.namespace);
            self.close();
            return Err(Error::CursorClosed);
        }

        let batch_size = self.next_batch_size();
        let result = self.executor
            .get_more(&self.namespace, self.cursor_id, batch_size, &self.cancel)
            .and_then(|reply| parse_cursor_reply(&reply, "nextBatch"));

        match result {
            Ok((cursor_id, _, batch)) => {
                self.cursor_id = cursor_id;
                self.buffer.extend(batch);
                self.last_used = Instant::now();
                self.apply_limit();
                Ok(())
            }
            Err(err) => {
                if err.code() == Some(ErrorCode::CursorNotFound as i32) {
                    // Already gone server-side.
                    self.cursor_id = 0;
                }
                warn!("Closing cursor on {} after failed getMore: {}", self.namespace, err);
                self.close();
                Err(err)
            }
        }
    }

    // Never asks for more documents than the limit leaves. A non-positive
    // batch size only means "server default" on the initial command, so
    // getMore omits it.
    fn next_batch_size(&self) -> Option<i32> {
        let remaining = if self.limit > 0 {
            Some(self.limit - self.count - self.buffer.len() as i64)
        } else {
            None
        };

        match (self.batch_size.filter(|&size| size > 0), remaining) {
            (Some(size), Some(remaining)) => Some(cmp::min(size as i64, remaining) as i32),
            (Some(size), None) => Some(size),
            (None, Some(remaining)) => Some(cmp::min(remaining, i32::max_value() as i64) as i32),
            (None, None) => None,
        }
    }

    // Drops documents past the limit, releasing the cursor once it is reached.
    fn apply_limit(&mut self) {
        if self.limit <= 0 {
            return;
        }

        let remaining = cmp::max(self.limit - self.count, 0) as usize;
        if self.buffer.len() >= remaining {
            self.buffer.truncate(remaining);
            self.release();
        }
    }

    fn idle_expired(&self) -> bool {
        match self.idle_timeout {
            Some(timeout) => self.last_used.elapsed() > timeout,
            None => false,
        }
    }

    fn release(&mut self) {
        if self.cursor_id != 0 {
            self.executor.kill_cursor(&self.namespace, self.cursor_id);
            self.cursor_id = 0;
        }
    }
}

impl<T> Iterator for Cursor<T> {
    type Item = Result<T>;

    /// Attempts to read a document from the cursor.
    ///
    /// # Return value
    ///
    /// Returns a decoded document if there is another one to return; `None`
    /// if there are no more documents to return; or an Error if the request
    /// for another batch fails or the cursor is closed.
    fn next(&mut self) -> Option<Result<T>> {
        match self.next_document() {
            Ok(Some(doc)) => Some(self.codec.decode(doc)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl<T> Drop for Cursor<T> {
    fn drop(&mut self) {
        self.release();
    }
}

// Extracts the cursor id, namespace and batch from a cursor-bearing reply.
fn parse_cursor_reply(reply: &bson::Document,
                      batch_field: &str)
                      -> Result<(i64, Option<Namespace>, VecDeque<bson::Document>)> {
    let cursor = match reply.get("cursor") {
        Some(&Bson::Document(ref cursor)) => cursor,
        _ => return Err(Error::ResponseError(String::from("Reply is missing the cursor document."))),
    };

    let cursor_id = match get_integer(cursor, "id") {
        Some(id) => id,
        None => return Err(Error::ResponseError(String::from("Cursor document is missing its id."))),
    };

    let namespace = match cursor.get("ns") {
        Some(&Bson::String(ref ns)) => {
            ns.find('.').map(|i| Namespace::new(&ns[..i], &ns[i + 1..]))
        }
        _ => None,
    };

    let batch = match cursor.get(batch_field) {
        Some(&Bson::Array(ref batch)) => batch,
        _ => {
            return Err(Error::ResponseError(format!("Cursor document is missing '{}'.", batch_field)))
        }
    };

    let mut docs = VecDeque::with_capacity(batch.len());
    for item in batch {
        match *item {
            Bson::Document(ref doc) => docs.push_back(doc.clone()),
            _ => {
                return Err(Error::ResponseError(String::from("Cursor batch held a non-document value.")))
            }
        }
    }

    Ok((cursor_id, namespace, docs))
}
