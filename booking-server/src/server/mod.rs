//! Network layer for the booking server.
//!
//! Speaks newline-delimited JSON over TCP: one request line and one
//! response line per connection.

mod config;
mod pool;
mod protocol;
mod request;
mod router;

pub use config::{ConfigError, ServerConfig};
pub use pool::{ConnectionWorkerPool, TransportError};
pub use protocol::*;
pub use request::{Request, RouterError, SegmentQuery};
pub use router::RequestRouter;
