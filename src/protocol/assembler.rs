//! Message fragmentation and reassembly for WebSocket (RFC 6455).
//!
//! The assembler enforces fragment sequencing, the per-type message limits
//! and streaming UTF-8 validation for text. Whether the payload is also
//! buffered until `fin` is decided per message by the caller, so a handler
//! that consumes chunks never pays for a copy of the whole message.

use bytes::{Bytes, BytesMut};

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::utf8::Utf8Validator;
use crate::protocol::{Frame, OpCode};

/// Outcome of pushing one data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// Opcode of the message the frame belongs to (`Text` or `Binary`),
    /// also for `Continuation` frames.
    pub opcode: OpCode,
    /// The frame completed its message.
    pub fin: bool,
    /// The whole message, when it was buffered and `fin` was set.
    ///
    /// For `Text` this is always well-formed UTF-8: the assembler rejects
    /// the message before `fin` otherwise.
    pub message: Option<Bytes>,
}

impl Accepted {
    /// The buffered message as text, without validating it again.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match (self.opcode, self.message.as_deref()) {
            // SAFETY: text messages only reach `fin` after the streaming
            // validator accepted every byte and ended on a char boundary.
            (OpCode::Text, Some(bytes)) => Some(unsafe { std::str::from_utf8_unchecked(bytes) }),
            _ => None,
        }
    }
}

/// Reassembles fragmented WebSocket messages.
#[derive(Debug)]
pub struct MessageAssembler {
    buffer: BytesMut,
    buffering: bool,
    fragment_count: usize,
    opcode: Option<OpCode>,
    total_size: usize,
    utf8: Utf8Validator,
    limits: Limits,
}

impl MessageAssembler {
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            buffering: false,
            fragment_count: 0,
            opcode: None,
            total_size: 0,
            utf8: Utf8Validator::new(),
            limits,
        }
    }

    /// Add a data frame to the message in progress.
    ///
    /// `buffer` is only looked at on the first frame of a message and
    /// decides whether the payload is kept until `fin`.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` for control frames, a continuation
    ///   without a started message, or a new message before `fin`
    /// - `Error::MessageTooLarge` / `Error::TooManyFragments` on limits
    /// - `Error::InvalidUtf8` as soon as text stops being valid UTF-8, or
    ///   when the final frame ends inside a code point
    pub fn push(&mut self, frame: &Frame, buffer: bool) -> Result<Accepted> {
        let opcode = match (frame.opcode, self.opcode) {
            (OpCode::Continuation, Some(opcode)) => opcode,
            (OpCode::Continuation, None) => {
                return Err(Error::ProtocolViolation(
                    "Unexpected continuation frame".into(),
                ));
            }
            (OpCode::Text | OpCode::Binary, None) => {
                self.opcode = Some(frame.opcode);
                self.buffering = buffer;
                self.utf8.reset();
                frame.opcode
            }
            (OpCode::Text | OpCode::Binary, Some(_)) => {
                return Err(Error::ProtocolViolation(
                    "Expected continuation frame".into(),
                ));
            }
            (other, _) => {
                return Err(Error::ProtocolViolation(format!(
                    "{other} frame is not part of a data message"
                )));
            }
        };

        self.limits.check_fragment_count(self.fragment_count + 1)?;

        let new_size = self.total_size + frame.payload().len();
        if opcode == OpCode::Text {
            self.limits.check_text_message_size(new_size)?;
            self.utf8.process(frame.payload())?;
            if frame.fin && !self.utf8.is_complete() {
                return Err(Error::InvalidUtf8);
            }
        } else {
            self.limits.check_binary_message_size(new_size)?;
        }

        self.total_size = new_size;
        self.fragment_count += 1;
        if self.buffering {
            self.buffer.extend_from_slice(frame.payload());
        }

        if !frame.fin {
            return Ok(Accepted {
                opcode,
                fin: false,
                message: None,
            });
        }

        let message = self.buffering.then(|| self.buffer.split().freeze());
        self.reset();
        Ok(Accepted {
            opcode,
            fin: true,
            message,
        })
    }

    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    /// Bytes accepted so far for the message in progress.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.buffering = false;
        self.fragment_count = 0;
        self.opcode = None;
        self.total_size = 0;
        self.utf8.reset();
    }
}
