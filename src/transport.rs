//! Tokio driver connecting the engine to an async byte stream.
//!
//! [`Connection::run`] splits the stream and drives both halves inside the
//! calling task:
//!
//! - the read half feeds [`FrameReader`] output into the [`EventDispatcher`]
//! - the write half drains the [`WriteQueue`], woken by a [`FlushSignal`]
//!
//! The HTTP upgrade is not handled here; `run` expects a stream that has
//! already been upgraded.
//!
//! ```rust,ignore
//! let handler = Handler::new().on_text_message(|session, text| {
//!     session.send_text(text.to_owned(), Completion::noop());
//!     Ok(())
//! });
//! let connection = Connection::new(Role::Server, Config::default(), handler)?;
//! connection.run(upgraded_stream).await?;
//! ```

use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;

use crate::config::Config;
use crate::connection::{Binding, EventDispatcher, FlushHook, Role, Session, WriteQueue};
use crate::error::{Error, Result, WriteError};
use crate::message::CloseCode;
use crate::protocol::Frame;
use crate::protocol::validation::FrameValidator;

/// [`FlushHook`] that wakes the task running [`write_loop`].
#[derive(Debug, Default)]
pub struct FlushSignal {
    notify: Notify,
}

impl FlushSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next signal. A signal sent while nobody waits is kept.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

impl FlushHook for FlushSignal {
    fn enqueued(&self) {
        self.notify.notify_one();
    }

    fn succeeded(&self) {
        self.notify.notify_one();
    }

    fn failed(&self, _error: &WriteError) {
        self.notify.notify_one();
    }
}

/// Reads and validates frames from the read half of a stream.
pub struct FrameReader<R> {
    io: R,
    read_buf: BytesMut,
    read_size: usize,
    validator: FrameValidator,
}

impl<R> FrameReader<R> {
    #[must_use]
    pub fn new(io: R, role: Role, config: &Config) -> Self {
        let validator = FrameValidator::new(role, config.limits.clone())
            .with_accept_unmasked(config.accept_unmasked_frames);
        Self {
            io,
            read_buf: BytesMut::with_capacity(config.read_buffer_size),
            read_size: config.read_buffer_size,
            validator,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> R {
        self.io
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames. The
    /// header is validated before the payload is buffered, so oversized or
    /// wrongly masked frames are rejected early.
    ///
    /// # Errors
    ///
    /// - validation and parse errors from the header
    /// - `Error::ConnectionClosed` if the stream ends inside a frame
    /// - `Error::Io` for read failures
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if !self.read_buf.is_empty() {
                self.validator.check_header(&self.read_buf)?;
                match Frame::parse(&self.read_buf) {
                    Ok((frame, consumed)) => {
                        self.read_buf.advance(consumed);
                        return Ok(Some(frame));
                    }
                    Err(Error::IncompleteFrame { .. }) => {}
                    Err(e) => return Err(e),
                }
            }

            self.read_buf.reserve(self.read_size);
            let n = self.io.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return if self.read_buf.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::ConnectionClosed(None))
                };
            }
        }
    }
}

/// Drain `queue` into `io` until the queue is finished or fails.
///
/// Each chunk is confirmed with [`WriteQueue::on_write_succeeded`] once it
/// has been written in full; a write error fails the whole queue.
///
/// # Errors
///
/// The failure recorded by the queue, including the write error that
/// caused it.
pub async fn write_loop<W: AsyncWrite + Unpin>(
    queue: &WriteQueue,
    signal: &FlushSignal,
    io: &mut W,
) -> std::result::Result<(), WriteError> {
    loop {
        let mut wrote = false;
        while let Some(chunk) = queue.next_buffer() {
            if let Err(err) = io.write_all(&chunk).await {
                let error = WriteError::from(err);
                queue.on_write_failed(error.clone());
                return Err(error);
            }
            queue.on_write_succeeded();
            wrote = true;
        }
        if wrote {
            if let Err(err) = io.flush().await {
                let error = WriteError::from(err);
                queue.on_write_failed(error.clone());
                return Err(error);
            }
        }

        if let Some(failure) = queue.failure() {
            tracing::debug!(%failure, "writer stopped");
            return Err(failure);
        }
        if queue.is_finished() {
            tracing::debug!("close frame written, shutting down writer");
            let _ = io.shutdown().await;
            return Ok(());
        }
        signal.notified().await;
    }
}

/// Feed frames from `reader` into `dispatcher` until the close handshake
/// ends the read side or the stream goes away.
///
/// # Errors
///
/// Returns the transport error when the stream failed abnormally.
/// Protocol violations are answered with a CLOSE and are not errors here.
pub async fn read_loop<R: AsyncRead + Unpin>(
    reader: &mut FrameReader<R>,
    dispatcher: &mut EventDispatcher,
) -> Result<()> {
    dispatcher.open();
    loop {
        match reader.read_frame().await {
            Ok(Some(frame)) => {
                dispatcher.incoming_frame(frame);
                if dispatcher.close_received() {
                    return Ok(());
                }
            }
            Ok(None) => {
                dispatcher.disconnect();
                return Ok(());
            }
            Err(error) => {
                let abnormal = error.close_code() == CloseCode::Abnormal;
                dispatcher.incoming_error(error.clone());
                // The buffer cannot be resynchronised after a decode error.
                return if abnormal { Err(error) } else { Ok(()) };
            }
        }
    }
}

/// One engine instance bound to an application handler.
pub struct Connection {
    role: Role,
    config: Config,
    queue: Arc<WriteQueue>,
    signal: Arc<FlushSignal>,
    dispatcher: EventDispatcher,
}

impl Connection {
    /// # Errors
    ///
    /// - `Error::InvalidConfig` if `config` does not validate
    /// - `Error::InvalidHandler` if `binding` exposes no callbacks
    pub fn new(role: Role, config: Config, binding: impl Binding) -> Result<Self> {
        config.validate()?;
        let signal = Arc::new(FlushSignal::new());
        let queue = Arc::new(WriteQueue::with_hook(
            role,
            config.output_buffer_size,
            signal.clone(),
        ));
        let dispatcher = EventDispatcher::new(role, &config, binding, queue.clone())?;
        Ok(Self {
            role,
            config,
            queue,
            signal,
            dispatcher,
        })
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// A sending handle usable from other tasks while [`run`](Self::run) is going.
    #[must_use]
    pub fn session(&self) -> Session {
        self.dispatcher.session().clone()
    }

    /// Drive the connection over an already upgraded stream until it closes.
    ///
    /// # Errors
    ///
    /// Transport failures on either half. A clean close handshake, or a
    /// close forced by a protocol violation, returns `Ok(())`.
    pub async fn run<T: AsyncRead + AsyncWrite>(mut self, io: T) -> Result<()> {
        let (read_half, mut write_half) = tokio::io::split(io);
        let mut reader = FrameReader::new(read_half, self.role, &self.config);

        let (read_result, write_result) = tokio::join!(
            read_loop(&mut reader, &mut self.dispatcher),
            write_loop(&self.queue, &self.signal, &mut write_half),
        );
        self.dispatcher.disconnect();

        read_result?;
        match write_result {
            Ok(()) | Err(WriteError::ForcedDisconnect) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("role", &self.role)
            .field("queue", &self.queue)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
