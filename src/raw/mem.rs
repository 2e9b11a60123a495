//! raw/mem — in-memory RawStore (BTreeMap). Для unit-тестов tree/commit без диска.

use anyhow::Result;
use std::collections::BTreeMap;

use super::{RawStore, RawStoreMut};

#[derive(Debug, Default, Clone)]
pub struct MemStore {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl RawStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn scan_stream<F>(&self, prefix: Option<&[u8]>, mut cb: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]),
    {
        let pref = prefix.unwrap_or_default();
        for (k, v) in self.map.range(pref.to_vec()..) {
            if !k.starts_with(pref) {
                break;
            }
            cb(k, v);
        }
        Ok(())
    }
}

impl RawStoreMut for MemStore {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }
}
