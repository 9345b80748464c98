//! Content store boundary for the virtual chain.
//!
//! Block bodies live in a content-addressable store and are named only by
//! the hash of their bytes. The store is untrusted: `ContentResolver`
//! rehashes everything it fetches and rejects bytes that do not match the
//! requested address.

pub mod error;
pub mod memory;
pub mod resolver;
pub mod traits;

pub use error::{ResolveError, StoreError, StoreResult};
pub use memory::{InMemoryContentStore, StoreSnapshot};
pub use resolver::{ContentResolver, Resolved};
pub use traits::ContentStore;
