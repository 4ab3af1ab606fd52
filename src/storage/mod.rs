//! Container storage using [`sled`](http://docs.rs/sled/) as backend
use crate::zfx_id::Id;
use crate::Result;

use bytes::Bytes;

/// Storage routines for container bytes
pub mod container;

pub use container::SledStorage;

/// Persists and retrieves container bytes by content identifier.
pub trait Storage {
    fn put(&self, id: Id, container: &[u8]) -> Result<()>;

    fn get(&self, id: &Id) -> Result<Option<Bytes>>;

    fn contains(&self, id: &Id) -> Result<bool>;
}
