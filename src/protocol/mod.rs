//! WebSocket protocol core implementation (RFC 6455).

pub mod assembler;
pub mod frame;
pub mod generator;
pub mod mask;
pub mod opcode;
pub mod utf8;
pub mod validation;

pub use assembler::{Accepted, MessageAssembler};
pub use frame::{Frame, MAX_CONTROL_FRAME_PAYLOAD, MAX_HEADER_SIZE};
pub use generator::{FrameCursor, Generator};
pub use mask::{apply_mask, apply_mask_at};
pub use opcode::OpCode;
pub use utf8::{Utf8Validator, validate_utf8};
pub use validation::FrameValidator;
