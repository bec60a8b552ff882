//! # rsws-engine - WebSocket message engine
//!
//! The in-process core of an RFC 6455 endpoint, sitting between an already
//! upgraded byte stream and the application:
//!
//! - **Outbound write queue** with PING priority, atomic fragment groups and
//!   sticky failure ([`WriteQueue`])
//! - **Inbound event dispatcher** driving the close handshake and mapping
//!   application faults to close codes ([`EventDispatcher`])
//! - **Streaming UTF-8 validation** across frame boundaries ([`Utf8Validator`])
//!
//! The engine core is runtime-agnostic; the `async-tokio` feature adds a
//! [`Connection`] driver for tokio streams.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rsws_engine::{Completion, Config, Connection, Handler, Role};
//!
//! let handler = Handler::new().on_text_message(|session, text| {
//!     session.send_text(text.to_owned(), Completion::noop());
//!     Ok(())
//! });
//! Connection::new(Role::Server, Config::default(), handler)?
//!     .run(stream)
//!     .await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;

#[cfg(feature = "async-tokio")]
pub mod transport;

pub use config::{Config, Limits};
#[cfg(feature = "async-tokio")]
pub use connection::WriteHandle;
pub use connection::{
    Binding, Completion, ConnectionState, EventDispatcher, FlushHook, Handler, Listener,
    ListenerBinding, Role, Session, WriteQueue,
};
pub use error::{Error, HandlerError, HandlerResult, Result, WriteError};
pub use message::{CloseCode, CloseFrame};
pub use protocol::{Frame, OpCode, Utf8Validator};

#[cfg(feature = "async-tokio")]
pub use transport::{Connection, FlushSignal, FrameReader};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_public_types_are_send() {
        assert_send::<Error>();
        assert_send::<WriteError>();
        assert_send::<Config>();
        assert_send::<Frame>();
        assert_send::<CloseFrame>();
        assert_send::<Completion>();
        assert_send::<Handler>();
        assert_send::<Session>();
        assert_send::<EventDispatcher>();
    }

    #[test]
    fn test_public_types_are_sync() {
        assert_sync::<Error>();
        assert_sync::<Config>();
        assert_sync::<Limits>();
        assert_sync::<WriteQueue>();
        assert_sync::<Session>();
        assert_sync::<ConnectionState>();
        assert_sync::<Role>();
    }
}
