//! Outbound write queue.
//!
//! Application code enqueues frames from any thread; a single writer pulls
//! wire bytes with [`WriteQueue::next_buffer`] and reports back with
//! [`WriteQueue::on_write_succeeded`] or [`WriteQueue::on_write_failed`].
//!
//! Ordering rules:
//!
//! - data frames keep FIFO order, so fragments of a message never reorder
//! - a PING jumps ahead of every queued frame that is not yet being written
//! - a CLOSE goes to the tail and closes the queue, so it is always the last
//!   frame emitted
//!
//! Every frame carries a [`Completion`] that fires exactly once, always
//! after the queue lock has been released.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::connection::Role;
use crate::error::WriteError;
use crate::protocol::{Frame, FrameCursor, Generator, OpCode};

type Callback = Box<dyn FnOnce(Result<(), WriteError>) + Send>;

/// Single-use notification for the outcome of one enqueued frame.
///
/// [`Completion::complete`] takes `self`, so a frame cannot be reported
/// twice.
pub struct Completion {
    callback: Callback,
}

impl Completion {
    /// Run `f` with the outcome.
    pub fn new(f: impl FnOnce(Result<(), WriteError>) + Send + 'static) -> Self {
        Self {
            callback: Box::new(f),
        }
    }

    /// A completion nobody listens to.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// A completion paired with a handle that can await the outcome.
    #[cfg(feature = "async-tokio")]
    #[must_use]
    pub fn channel() -> (Self, WriteHandle) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let completion = Self::new(move |result| {
            let _ = tx.send(result);
        });
        (completion, WriteHandle { rx })
    }

    /// Deliver the outcome, consuming the token.
    pub fn complete(self, result: Result<(), WriteError>) {
        (self.callback)(result);
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

/// Awaits the completion created by [`Completion::channel`].
#[cfg(feature = "async-tokio")]
#[derive(Debug)]
pub struct WriteHandle {
    rx: tokio::sync::oneshot::Receiver<Result<(), WriteError>>,
}

#[cfg(feature = "async-tokio")]
impl WriteHandle {
    /// Wait at most `bound` for the frame to be written.
    ///
    /// # Errors
    ///
    /// The frame's own failure, [`WriteError::TimedOut`] when `bound`
    /// elapses first, or [`WriteError::ForcedDisconnect`] if the queue was
    /// dropped with the frame still pending.
    pub async fn wait(self, bound: std::time::Duration) -> Result<(), WriteError> {
        match tokio::time::timeout(bound, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(WriteError::ForcedDisconnect),
            Err(_) => Err(WriteError::TimedOut),
        }
    }
}

/// Wakes the writer side of a connection.
pub trait FlushHook: Send + Sync {
    /// A frame was admitted; there may be bytes to pull.
    fn enqueued(&self);

    /// A chunk was confirmed written; pull the next one.
    fn succeeded(&self);

    /// The queue failed for good.
    fn failed(&self, error: &WriteError);
}

struct PendingWrite {
    cursor: FrameCursor,
    completion: Completion,
}

impl PendingWrite {
    fn new(frame: Frame, completion: Completion) -> Self {
        Self {
            cursor: FrameCursor::new(frame),
            completion,
        }
    }
}

struct Inner {
    queue: VecDeque<PendingWrite>,
    active: Option<PendingWrite>,
    closed: bool,
    failure: Option<WriteError>,
    generator: Generator,
}

impl Inner {
    /// Why a new frame cannot be admitted, if it cannot.
    fn rejection(&self) -> Option<WriteError> {
        if self.closed {
            Some(WriteError::Closed)
        } else {
            self.failure
                .as_ref()
                .map(|failure| WriteError::QueueFailed(Box::new(failure.clone())))
        }
    }

    fn admit(&mut self, pending: PendingWrite) {
        match pending.cursor.frame().opcode {
            OpCode::Ping => self.queue.push_front(pending),
            OpCode::Close => {
                self.queue.push_back(pending);
                self.closed = true;
            }
            _ => self.queue.push_back(pending),
        }
    }
}

/// Per-connection outbound queue.
pub struct WriteQueue {
    inner: Mutex<Inner>,
    hook: Option<Arc<dyn FlushHook>>,
    max_chunk: usize,
}

impl WriteQueue {
    /// Create a queue without a flush hook.
    ///
    /// `max_chunk` bounds the size of each buffer handed out by
    /// [`next_buffer`](Self::next_buffer).
    #[must_use]
    pub fn new(role: Role, max_chunk: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                active: None,
                closed: false,
                failure: None,
                generator: Generator::new(role),
            }),
            hook: None,
            max_chunk,
        }
    }

    /// Create a queue that signals `hook` whenever the writer should act.
    #[must_use]
    pub fn with_hook(role: Role, max_chunk: usize, hook: Arc<dyn FlushHook>) -> Self {
        Self {
            hook: Some(hook),
            ..Self::new(role, max_chunk)
        }
    }

    /// Admit `frame`, or fail `completion` right away if the queue no longer
    /// accepts frames.
    pub fn enqueue(&self, frame: Frame, completion: Completion) {
        let opcode = frame.opcode;
        let mut inner = self.inner.lock();
        if let Some(error) = inner.rejection() {
            drop(inner);
            tracing::debug!(%opcode, %error, "frame rejected");
            completion.complete(Err(error));
            return;
        }

        inner.admit(PendingWrite::new(frame, completion));
        tracing::trace!(%opcode, queued = inner.queue.len(), "frame enqueued");
        drop(inner);
        self.signal_enqueued();
    }

    /// Admit the frames of one message back to back, so concurrent senders
    /// cannot interleave with it.
    ///
    /// `completion` follows the last frame; the others report to nobody.
    pub fn enqueue_all(&self, frames: impl IntoIterator<Item = Frame>, completion: Completion) {
        let mut frames: Vec<Frame> = frames.into_iter().collect();
        let Some(last) = frames.pop() else {
            completion.complete(Ok(()));
            return;
        };

        let mut inner = self.inner.lock();
        if let Some(error) = inner.rejection() {
            drop(inner);
            tracing::debug!(opcode = %last.opcode, %error, "message rejected");
            completion.complete(Err(error));
            return;
        }

        let count = frames.len() + 1;
        for frame in frames {
            inner.admit(PendingWrite::new(frame, Completion::noop()));
        }
        inner.admit(PendingWrite::new(last, completion));
        tracing::trace!(frames = count, queued = inner.queue.len(), "message enqueued");
        drop(inner);
        self.signal_enqueued();
    }

    /// Next chunk of wire bytes, at most `max_chunk` long.
    ///
    /// Returns `None` when nothing is pending, and also while the active
    /// frame is fully generated but its last chunk has not been confirmed by
    /// [`on_write_succeeded`](Self::on_write_succeeded).
    pub fn next_buffer(&self) -> Option<Bytes> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.active.is_none() {
            inner.active = inner.queue.pop_front();
        }

        let active = inner.active.as_mut()?;
        if active.cursor.is_done() {
            return None;
        }
        Some(inner.generator.generate(self.max_chunk, &mut active.cursor))
    }

    /// The last buffer from [`next_buffer`](Self::next_buffer) was written.
    pub fn on_write_succeeded(&self) {
        let finished = {
            let mut inner = self.inner.lock();
            match &inner.active {
                None => return,
                Some(active) if active.cursor.is_done() => inner.active.take(),
                Some(_) => None,
            }
        };

        if let Some(pending) = finished {
            tracing::trace!(opcode = %pending.cursor.frame().opcode, "frame written");
            pending.completion.complete(Ok(()));
        }
        if let Some(hook) = &self.hook {
            hook.succeeded();
        }
    }

    /// The transport failed. Every pending frame fails with `error` and the
    /// queue rejects all later enqueues.
    pub fn on_write_failed(&self, error: WriteError) {
        let swept: Vec<PendingWrite> = {
            let mut inner = self.inner.lock();
            if inner.failure.is_none() {
                inner.failure = Some(error.clone());
            }
            let active = inner.active.take();
            active.into_iter().chain(inner.queue.drain(..)).collect()
        };

        tracing::warn!(%error, frames = swept.len(), "write queue failed");
        for pending in swept {
            pending.completion.complete(Err(error.clone()));
        }
        if let Some(hook) = &self.hook {
            hook.failed(&error);
        }
    }

    /// Close the queue and fail everything not yet written.
    pub fn force_close(&self) {
        self.inner.lock().closed = true;
        self.on_write_failed(WriteError::ForcedDisconnect);
    }

    /// No more frames are admitted.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Closed and nothing left to write.
    pub fn is_finished(&self) -> bool {
        let inner = self.inner.lock();
        inner.closed && inner.active.is_none() && inner.queue.is_empty()
    }

    /// The failure recorded by [`on_write_failed`](Self::on_write_failed).
    pub fn failure(&self) -> Option<WriteError> {
        self.inner.lock().failure.clone()
    }

    /// Frames not yet confirmed written, including the active one.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.queue.len() + usize::from(inner.active.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn signal_enqueued(&self) {
        if let Some(hook) = &self.hook {
            hook.enqueued();
        }
    }
}

impl std::fmt::Debug for WriteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("WriteQueue")
            .field("queued", &inner.queue.len())
            .field("active", &inner.active.is_some())
            .field("closed", &inner.closed)
            .field("failure", &inner.failure)
            .field("max_chunk", &self.max_chunk)
            .finish()
    }
}
