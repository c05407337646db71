//! Output transports
//!
//! The port registry talks to the operating environment only through these
//! two traits: a [`Transport`] lists and opens destinations, an
//! [`OutputConnection`] writes bytes to one of them.

pub mod memory;
pub mod system;

use crate::error::Result;

pub use memory::VirtualTransport;
pub use system::MidirTransport;

/// Source of named output destinations
///
/// Note: takes &self so a transport can be shared as `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    /// Names of the destinations currently present
    fn enumerate_destinations(&self) -> Result<Vec<String>>;

    /// Open a write-capable connection to `name`
    fn open(&self, name: &str) -> Result<Box<dyn OutputConnection>>;
}

/// An open, writable session bound to one destination
pub trait OutputConnection: Send {
    /// Write one encoded message
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the connection. Further writes must fail.
    fn close(&mut self) -> Result<()>;

    /// Whether the connection is still usable
    ///
    /// Default implementation: open until closed by the registry.
    fn is_open(&self) -> bool {
        true
    }
}
