//! WebSocket layer
//!
//! - **`server`** - session registry, emit and broadcast
//! - **`events`** - event name to handler registry
//! - **`handler`** - `GET /socket` upgrade and connection loop

pub mod events;
pub mod handler;
pub mod server;

pub use events::{EventContext, EventHandler, EventMethod, EventRegistry};
pub use handler::socket_handler;
pub use server::{Handshake, Session, SocketMiddleware, SocketServer};
