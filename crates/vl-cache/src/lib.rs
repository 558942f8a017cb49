//! # vl-cache
//!
//! The handle cache that bridges a resolution to later streaming requests.
//!
//! [`HandleCache`] mints handles and enforces the TTL; storage is delegated
//! to a [`CacheStore`] backend chosen by configuration:
//!
//! - [`MemoryStore`] -- a concurrent in-process map.
//! - [`FileStore`] -- one JSON record per handle in a directory.

pub mod cache;
pub mod file;
pub mod memory;
pub mod store;

pub use cache::{start_sweep_task, HandleCache, SweepReport};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{open_store, CacheStore};
