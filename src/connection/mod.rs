//! Per-connection engine: outbound queue, inbound dispatch and the
//! application callback surface.
//!
//! ## Connection Lifecycle
//!
//! 1. **Connecting** - Created, no frame dispatched yet
//! 2. **Open** - `on_connect` delivered, data flows both ways
//! 3. **Closing** - A CLOSE was sent, waiting for the peer's reply
//! 4. **Closed** - Handshake finished or transport gone
//!
//! The [`EventDispatcher`] owns the inbound side and must be driven by one
//! reader at a time. The [`WriteQueue`] is shared: any number of
//! [`Session`] clones may enqueue while a single writer drains it.

mod dispatcher;
mod fragmenter;
mod handler;
mod role;
mod session;
mod state;
mod write_queue;

pub use dispatcher::{EventDispatcher, classify_fault};
pub use fragmenter::MessageFragmenter;
pub use handler::{Binding, Handler, Listener, ListenerBinding};
pub use role::Role;
pub use session::Session;
pub use state::ConnectionState;
#[cfg(feature = "async-tokio")]
pub use write_queue::WriteHandle;
pub use write_queue::{Completion, FlushHook, WriteQueue};
