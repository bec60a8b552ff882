//! Application callback table.
//!
//! A [`Handler`] is a record of optional callbacks. Applications either
//! build one directly or implement [`Listener`] and wrap it in a
//! [`ListenerBinding`]. Both go through [`Binding::resolve`], which rejects a
//! table with no callbacks before any frame is dispatched.
//!
//! ```rust,ignore
//! let handler = Handler::new()
//!     .on_text_message(|session, text| {
//!         session.send_text(text.to_owned(), Completion::noop());
//!         Ok(())
//!     })
//!     .on_close(|_, code, reason| {
//!         tracing::info!(%code, reason, "peer closed");
//!         Ok(())
//!     });
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Session;
use crate::error::{Error, HandlerResult, Result};
use crate::message::CloseCode;
use crate::protocol::Frame;

type SessionFn = Box<dyn FnMut(&Session) -> HandlerResult + Send>;
type ChunkFn = Box<dyn FnMut(&Session, &[u8], bool) -> HandlerResult + Send>;
type TextFn = Box<dyn FnMut(&Session, &str) -> HandlerResult + Send>;
type BinaryFn = Box<dyn FnMut(&Session, &[u8]) -> HandlerResult + Send>;
type CloseFn = Box<dyn FnMut(&Session, CloseCode, &str) -> HandlerResult + Send>;
type ErrorFn = Box<dyn FnMut(&Session, &Error) + Send>;
type FrameFn = Box<dyn FnMut(&Session, &Frame) -> HandlerResult + Send>;

/// Optional callbacks invoked by the [`EventDispatcher`](crate::EventDispatcher).
///
/// When both a chunk callback and a whole-message callback are set for the
/// same message type, the chunk callback wins and messages are never
/// buffered.
#[derive(Default)]
pub struct Handler {
    pub(crate) on_connect: Option<SessionFn>,
    pub(crate) on_text_chunk: Option<ChunkFn>,
    pub(crate) on_text_message: Option<TextFn>,
    pub(crate) on_binary_chunk: Option<ChunkFn>,
    pub(crate) on_binary_message: Option<BinaryFn>,
    pub(crate) on_close: Option<CloseFn>,
    pub(crate) on_error: Option<ErrorFn>,
    pub(crate) on_frame: Option<FrameFn>,
}

impl Handler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The connection opened.
    #[must_use]
    pub fn on_connect(mut self, f: impl FnMut(&Session) -> HandlerResult + Send + 'static) -> Self {
        self.on_connect = Some(Box::new(f));
        self
    }

    /// Each text frame as it arrives, with its `fin` flag.
    ///
    /// A chunk may end inside a multi-byte character; the bytes seen so far
    /// are always a valid UTF-8 prefix.
    #[must_use]
    pub fn on_text_chunk(
        mut self,
        f: impl FnMut(&Session, &[u8], bool) -> HandlerResult + Send + 'static,
    ) -> Self {
        self.on_text_chunk = Some(Box::new(f));
        self
    }

    /// Whole text messages.
    #[must_use]
    pub fn on_text_message(
        mut self,
        f: impl FnMut(&Session, &str) -> HandlerResult + Send + 'static,
    ) -> Self {
        self.on_text_message = Some(Box::new(f));
        self
    }

    /// Each binary frame as it arrives, with its `fin` flag.
    #[must_use]
    pub fn on_binary_chunk(
        mut self,
        f: impl FnMut(&Session, &[u8], bool) -> HandlerResult + Send + 'static,
    ) -> Self {
        self.on_binary_chunk = Some(Box::new(f));
        self
    }

    /// Whole binary messages.
    #[must_use]
    pub fn on_binary_message(
        mut self,
        f: impl FnMut(&Session, &[u8]) -> HandlerResult + Send + 'static,
    ) -> Self {
        self.on_binary_message = Some(Box::new(f));
        self
    }

    /// The connection is closing. Called at most once per connection.
    #[must_use]
    pub fn on_close(
        mut self,
        f: impl FnMut(&Session, CloseCode, &str) -> HandlerResult + Send + 'static,
    ) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    /// A protocol violation or application fault is about to close the connection.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(&Session, &Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Every frame before it is processed. Observation only.
    #[must_use]
    pub fn on_frame(
        mut self,
        f: impl FnMut(&Session, &Frame) -> HandlerResult + Send + 'static,
    ) -> Self {
        self.on_frame = Some(Box::new(f));
        self
    }

    /// No callback is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on_connect.is_none()
            && self.on_text_chunk.is_none()
            && self.on_text_message.is_none()
            && self.on_binary_chunk.is_none()
            && self.on_binary_message.is_none()
            && self.on_close.is_none()
            && self.on_error.is_none()
            && self.on_frame.is_none()
    }

    /// Text messages need buffering until `fin`.
    pub(crate) fn buffers_text(&self) -> bool {
        self.on_text_chunk.is_none() && self.on_text_message.is_some()
    }

    /// Binary messages need buffering until `fin`.
    pub(crate) fn buffers_binary(&self) -> bool {
        self.on_binary_chunk.is_none() && self.on_binary_message.is_some()
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_text_chunk", &self.on_text_chunk.is_some())
            .field("on_text_message", &self.on_text_message.is_some())
            .field("on_binary_chunk", &self.on_binary_chunk.is_some())
            .field("on_binary_message", &self.on_binary_message.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_frame", &self.on_frame.is_some())
            .finish()
    }
}

/// Turns an application object into a [`Handler`].
pub trait Binding {
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandler`] if the object exposes no callbacks.
    fn resolve(self) -> Result<Handler>;
}

impl Binding for Handler {
    fn resolve(self) -> Result<Handler> {
        if self.is_empty() {
            return Err(Error::InvalidHandler(
                "handler has no callbacks".into(),
            ));
        }
        Ok(self)
    }
}

/// Object-style alternative to building a [`Handler`] from closures.
///
/// Every method defaults to doing nothing. Set [`Listener::STREAMING`] to
/// receive frames through the chunk methods instead of whole messages.
pub trait Listener: Send + 'static {
    /// Deliver data frame by frame instead of buffering whole messages.
    const STREAMING: bool = false;

    fn on_connect(&mut self, _session: &Session) -> HandlerResult {
        Ok(())
    }

    fn on_text_chunk(&mut self, _session: &Session, _chunk: &[u8], _fin: bool) -> HandlerResult {
        Ok(())
    }

    fn on_text_message(&mut self, _session: &Session, _text: &str) -> HandlerResult {
        Ok(())
    }

    fn on_binary_chunk(&mut self, _session: &Session, _chunk: &[u8], _fin: bool) -> HandlerResult {
        Ok(())
    }

    fn on_binary_message(&mut self, _session: &Session, _data: &[u8]) -> HandlerResult {
        Ok(())
    }

    fn on_close(&mut self, _session: &Session, _code: CloseCode, _reason: &str) -> HandlerResult {
        Ok(())
    }

    fn on_error(&mut self, _session: &Session, _error: &Error) {}
}

/// Binds a [`Listener`] as the connection's callback table.
#[derive(Debug)]
pub struct ListenerBinding<L>(pub L);

impl<L: Listener> Binding for ListenerBinding<L> {
    fn resolve(self) -> Result<Handler> {
        let listener = Arc::new(Mutex::new(self.0));
        let shared = || Arc::clone(&listener);

        let handler = Handler::new()
            .on_connect({
                let l = shared();
                move |s: &Session| l.lock().on_connect(s)
            })
            .on_close({
                let l = shared();
                move |s: &Session, code: CloseCode, reason: &str| l.lock().on_close(s, code, reason)
            })
            .on_error({
                let l = shared();
                move |s: &Session, e: &Error| l.lock().on_error(s, e)
            });

        let handler = if L::STREAMING {
            handler
                .on_text_chunk({
                    let l = shared();
                    move |s: &Session, chunk: &[u8], fin: bool| l.lock().on_text_chunk(s, chunk, fin)
                })
                .on_binary_chunk({
                    let l = shared();
                    move |s: &Session, chunk: &[u8], fin: bool| l.lock().on_binary_chunk(s, chunk, fin)
                })
        } else {
            handler
                .on_text_message({
                    let l = shared();
                    move |s: &Session, text: &str| l.lock().on_text_message(s, text)
                })
                .on_binary_message({
                    let l = shared();
                    move |s: &Session, data: &[u8]| l.lock().on_binary_message(s, data)
                })
        };

        handler.resolve()
    }
}
