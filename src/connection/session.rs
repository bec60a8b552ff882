//! Outbound half of a connection as seen by application callbacks.

use std::sync::Arc;

use bytes::Bytes;

use crate::connection::fragmenter::MessageFragmenter;
use crate::connection::write_queue::{Completion, WriteQueue};
use crate::error::{Error, Result};
use crate::message::CloseFrame;
use crate::protocol::frame::MAX_CONTROL_FRAME_PAYLOAD;
use crate::protocol::{Frame, OpCode};

/// Cheap, cloneable handle for sending on a connection.
///
/// Messages larger than the configured fragment size are split into
/// CONTINUATION frames and enqueued atomically, so concurrent senders never
/// interleave fragments.
#[derive(Debug, Clone)]
pub struct Session {
    queue: Arc<WriteQueue>,
    fragment_size: usize,
}

impl Session {
    #[must_use]
    pub fn new(queue: Arc<WriteQueue>, fragment_size: usize) -> Self {
        Self {
            queue,
            fragment_size,
        }
    }

    /// Send a text message.
    pub fn send_text(&self, text: impl Into<String>, completion: Completion) {
        self.send_message(OpCode::Text, Bytes::from(text.into()), completion);
    }

    /// Send a binary message.
    pub fn send_binary(&self, data: impl Into<Bytes>, completion: Completion) {
        self.send_message(OpCode::Binary, data.into(), completion);
    }

    /// Send a PING. It overtakes queued messages that are not yet being written.
    ///
    /// # Errors
    ///
    /// Returns `Error::ControlFrameTooLarge` if `payload` exceeds 125 bytes.
    pub fn ping(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.send_control(Frame::ping(payload))
    }

    /// Send an unsolicited PONG (a heartbeat without reply).
    ///
    /// # Errors
    ///
    /// Returns `Error::ControlFrameTooLarge` if `payload` exceeds 125 bytes.
    pub fn pong(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.send_control(Frame::pong(payload))
    }

    /// Start the close handshake. The reason is truncated to fit.
    ///
    /// A code that may not be sent (1005, 1006, 1015 or out of range) goes
    /// out as a CLOSE without status. Nothing can be sent afterwards.
    pub fn close(&self, close: &CloseFrame, completion: Completion) {
        self.queue.enqueue(Frame::close(close), completion);
    }

    /// Enqueue a frame as is.
    pub fn send_frame(&self, frame: Frame, completion: Completion) {
        self.queue.enqueue(frame, completion);
    }

    /// A CLOSE was sent or the queue was shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    #[must_use]
    pub fn queue(&self) -> &Arc<WriteQueue> {
        &self.queue
    }

    fn send_message(&self, opcode: OpCode, payload: Bytes, completion: Completion) {
        let fragments = MessageFragmenter::new(payload, opcode, self.fragment_size);
        self.queue.enqueue_all(fragments, completion);
    }

    fn send_control(&self, frame: Frame) -> Result<()> {
        if frame.payload().len() > MAX_CONTROL_FRAME_PAYLOAD {
            return Err(Error::ControlFrameTooLarge(frame.payload().len()));
        }
        self.queue.enqueue(frame, Completion::noop());
        Ok(())
    }
}
