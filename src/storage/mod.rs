//! Cloud storage for encrypted vault blobs.
//!
//! - `ObjectKey`: identity-scoped object naming (`key`)
//! - `ObjectTransport` and the bundled memory / filesystem transports (`transport`)
//! - `CloudStorageProvider`: get/put by vault id (`provider`)

pub mod key;
pub mod provider;
pub mod transport;

pub use key::ObjectKey;
pub use provider::CloudStorageProvider;
pub use transport::{FileSystemTransport, MemoryTransport, ObjectTransport};
