use super::Storage;

use crate::zfx_id::Id;
use crate::Result;

use bytes::Bytes;
use zerocopy::{AsBytes, FromBytes, Unaligned};

#[derive(Clone, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct Key {
    hash: [u8; 32],
}

impl Key {
    pub fn new(id: &Id) -> Key {
        Key { hash: id.bytes() }
    }
}

/// Container storage backed by a `sled` tree.
#[derive(Clone)]
pub struct SledStorage {
    db: sled::Db,
}

impl SledStorage {
    pub fn new(db: sled::Db) -> Self {
        SledStorage { db }
    }

    /// A throwaway database, removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(SledStorage { db })
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }
}

impl Storage for SledStorage {
    /// Inserts container bytes. Re-inserting a known container is a no-op.
    fn put(&self, id: Id, container: &[u8]) -> Result<()> {
        let key = Key::new(&id);
        let _ = self.db.insert(key.as_bytes(), container)?;
        Ok(())
    }

    fn get(&self, id: &Id) -> Result<Option<Bytes>> {
        let key = Key::new(id);
        match self.db.get(key.as_bytes())? {
            Some(v) => Ok(Some(Bytes::copy_from_slice(v.as_ref()))),
            None => Ok(None),
        }
    }

    fn contains(&self, id: &Id) -> Result<bool> {
        let key = Key::new(id);
        Ok(self.db.contains_key(key.as_bytes())?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_put_get() {
        let storage = SledStorage::temporary().unwrap();
        let bytes = b"vertex-bytes".to_vec();
        let id = Id::new(&bytes);
        assert!(!storage.contains(&id).unwrap());
        assert_eq!(storage.get(&id).unwrap(), None);

        storage.put(id, &bytes).unwrap();
        assert!(storage.contains(&id).unwrap());
        assert_eq!(storage.get(&id).unwrap(), Some(Bytes::from(bytes.clone())));

        // Idempotent
        storage.put(id, &bytes).unwrap();
        assert_eq!(storage.len(), 1);
    }
}
