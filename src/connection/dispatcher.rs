//! Inbound event dispatcher.
//!
//! Consumes decoded frames in arrival order and turns them into callbacks on
//! the connection's [`Handler`]. Protocol side effects happen here no matter
//! which callbacks are bound:
//!
//! - PING is answered with a PONG carrying the same payload
//! - CLOSE is reported once and echoed, completing the close handshake
//! - TEXT payloads are checked for UTF-8 as they stream in
//!
//! Every way of closing the connection from this side goes through
//! [`EventDispatcher::terminate`].

use std::sync::Arc;

use crate::config::Config;
use crate::connection::handler::{Binding, Handler};
use crate::connection::write_queue::{Completion, WriteQueue};
use crate::connection::{ConnectionState, Role, Session};
use crate::error::{Error, HandlerError, HandlerResult, Result};
use crate::message::{CloseCode, CloseFrame, truncate_reason};
use crate::protocol::{Frame, MessageAssembler, OpCode};

/// Status and reason to close with after a callback failed.
///
/// A [`HandlerError::Close`] keeps what the application asked for unless the
/// code may not be sent (1005, 1006, 1015, out of range), in which case the
/// role's generic status is used. Any other failure closes with that status
/// and the error text.
#[must_use]
pub fn classify_fault(role: Role, error: &HandlerError) -> (CloseCode, String) {
    match error {
        HandlerError::Close { code, reason } if code.is_valid() => (*code, reason.clone()),
        HandlerError::Close { reason, .. } | HandlerError::Failed(reason) => {
            (role.fault_code(), reason.clone())
        }
    }
}

/// Per-connection dispatcher. Frames are processed one at a time.
pub struct EventDispatcher {
    role: Role,
    state: ConnectionState,
    handler: Handler,
    session: Session,
    assembler: MessageAssembler,
    remote_closed: bool,
    close_notified: bool,
}

impl EventDispatcher {
    /// Resolve `binding` and attach the dispatcher to `queue`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHandler` if the binding has no callbacks.
    pub fn new(
        role: Role,
        config: &Config,
        binding: impl Binding,
        queue: Arc<WriteQueue>,
    ) -> Result<Self> {
        let handler = binding.resolve()?;
        Ok(Self {
            role,
            state: ConnectionState::Connecting,
            handler,
            session: Session::new(queue, config.fragment_size),
            assembler: MessageAssembler::new(config.limits.clone()),
            remote_closed: false,
            close_notified: false,
        })
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The peer's CLOSE has been processed; nothing more will be dispatched.
    #[must_use]
    pub fn close_received(&self) -> bool {
        self.remote_closed
    }

    /// The transport is ready: `Connecting -> Open`, then `on_connect`.
    pub fn open(&mut self) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        self.state = ConnectionState::Open;
        tracing::debug!(role = %self.role, "connection open");

        let result = match self.handler.on_connect.as_mut() {
            Some(cb) => cb(&self.session),
            None => Ok(()),
        };
        self.check(result);
    }

    /// Process one decoded frame.
    pub fn incoming_frame(&mut self, frame: Frame) {
        if !self.state.can_receive() || self.remote_closed {
            tracing::trace!(opcode = %frame.opcode, state = %self.state, "frame ignored");
            return;
        }
        tracing::trace!(
            opcode = %frame.opcode,
            fin = frame.fin,
            len = frame.payload().len(),
            "frame received"
        );

        if frame.opcode == OpCode::Ping && frame.validate().is_ok() {
            self.session
                .send_frame(Frame::pong(frame.payload_bytes()), Completion::noop());
        }

        if let Some(cb) = self.handler.on_frame.as_mut() {
            let result = cb(&self.session, &frame);
            if !self.check(result) {
                return;
            }
        }

        if let Err(error) = frame.validate() {
            self.protocol_error(error);
            return;
        }

        match frame.opcode {
            OpCode::Close => self.remote_close(&frame),
            OpCode::Ping | OpCode::Pong => {}
            OpCode::Text | OpCode::Binary | OpCode::Continuation => self.data(&frame),
        }
    }

    /// A decode error from the transport side (reserved opcode, masking
    /// violation, oversized frame and so on).
    pub fn incoming_error(&mut self, error: Error) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.protocol_error(error);
    }

    /// Close the connection with `code` and `reason`.
    ///
    /// The reason is cut to fit a control frame and a code that may not be
    /// sent is replaced by the role's fault status. Does nothing once a close
    /// is already underway.
    pub fn terminate(&mut self, code: CloseCode, reason: &str) {
        if self.state.is_closing() {
            return;
        }
        let code = if code.is_valid() {
            code
        } else {
            self.role.fault_code()
        };
        let reason = truncate_reason(reason);
        tracing::debug!(%code, reason, role = %self.role, "terminating connection");

        self.state = ConnectionState::Closing;
        self.assembler.reset();
        self.session
            .close(&CloseFrame::new(code, reason), Completion::noop());
    }

    /// The transport is gone.
    ///
    /// Reports an abnormal closure (1006) if the application never heard
    /// about a close, and fails everything still queued.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        tracing::debug!(role = %self.role, "transport disconnected");

        self.notify_close(CloseCode::Abnormal, "");
        self.session.queue().force_close();
    }

    fn remote_close(&mut self, frame: &Frame) {
        let close = match CloseFrame::from_payload(frame.payload()) {
            Ok(close) => close,
            Err(error) => {
                self.protocol_error(error);
                return;
            }
        };
        self.remote_closed = true;
        tracing::debug!(code = %close.code, reason = %close.reason, "close received");

        self.notify_close(close.code, &close.reason);

        if self.session.is_closed() {
            // We spoke first; the peer's reply completes the handshake.
            self.state = ConnectionState::Closed;
        } else {
            self.state = ConnectionState::Closing;
            self.assembler.reset();
            self.session
                .close(&CloseFrame::new(close.code, ""), Completion::noop());
        }
    }

    fn data(&mut self, frame: &Frame) {
        let message_opcode = match frame.opcode {
            OpCode::Continuation => None,
            opcode => Some(opcode),
        };
        let buffer = match message_opcode {
            Some(OpCode::Text) => self.handler.buffers_text(),
            Some(_) => self.handler.buffers_binary(),
            None => false,
        };

        let accepted = match self.assembler.push(frame, buffer) {
            Ok(accepted) => accepted,
            Err(error) => {
                self.protocol_error(error);
                return;
            }
        };

        let text = accepted.text();

        let session = &self.session;
        let handler = &mut self.handler;
        let result = if accepted.opcode == OpCode::Text {
            if let Some(cb) = handler.on_text_chunk.as_mut() {
                cb(session, frame.payload(), accepted.fin)
            } else if let (Some(cb), Some(text)) = (handler.on_text_message.as_mut(), text) {
                cb(session, text)
            } else {
                Ok(())
            }
        } else if let Some(cb) = handler.on_binary_chunk.as_mut() {
            cb(session, frame.payload(), accepted.fin)
        } else if let (Some(cb), Some(data)) =
            (handler.on_binary_message.as_mut(), accepted.message.as_deref())
        {
            cb(session, data)
        } else {
            Ok(())
        };
        self.check(result);
    }

    /// Route a callback result; returns `false` if it closed the connection.
    fn check(&mut self, result: HandlerResult) -> bool {
        let Err(error) = result else {
            return true;
        };

        let (code, reason) = classify_fault(self.role, &error);
        if let HandlerError::Failed(_) = error {
            tracing::warn!(%error, role = %self.role, "unhandled application error, closing connection");
            self.notify_error(&Error::Handler(error));
        }
        self.terminate(code, &reason);
        false
    }

    fn protocol_error(&mut self, error: Error) {
        let code = error.close_code();
        tracing::debug!(%error, %code, "protocol error");
        self.notify_error(&error);
        // 1006 may not be sent; an I/O failure has no one left to tell.
        if code == CloseCode::Abnormal {
            self.disconnect();
        } else {
            self.terminate(code, &error.to_string());
        }
    }

    fn notify_error(&mut self, error: &Error) {
        if let Some(cb) = self.handler.on_error.as_mut() {
            cb(&self.session, error);
        }
    }

    fn notify_close(&mut self, code: CloseCode, reason: &str) {
        if std::mem::replace(&mut self.close_notified, true) {
            return;
        }
        if let Some(cb) = self.handler.on_close.as_mut() {
            if let Err(error) = cb(&self.session, code, reason) {
                tracing::warn!(%error, "close callback failed");
            }
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("remote_closed", &self.remote_closed)
            .field("close_notified", &self.close_notified)
            .finish_non_exhaustive()
    }
}
