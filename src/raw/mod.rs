//! raw — граница с хранилищем сырых байтовых записей.
//!
//! Разделение:
//! - record.rs — формат кадра лога (заголовок + CRC32C), запись/чтение.
//! - log.rs    — LogStore: файл лога на диске, replay в память, RO/RW открытие с локом.
//! - mem.rs    — MemStore: in-memory реализация, только для unit-тестов (cfg(test)).
//!
//! Здесь же: трейты RawStore / RawStoreMut и PrefixStore (view, ограниченный префиксом).

use anyhow::Result;

pub mod log;
#[cfg(test)]
pub mod mem;
pub mod record;

pub use log::LogStore;
#[cfg(test)]
pub use mem::MemStore;

/// Read side of a raw key-value store.
///
/// The native iteration order of `scan_stream` is unspecified (LogStore iterates
/// a HashMap). Callers that produce user-visible sequences must sort.
pub trait RawStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Потоковый скан: cb вызывается для каждой пары; prefix=None — полный скан.
    fn scan_stream<F>(&self, prefix: Option<&[u8]>, cb: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]);
}

/// Write side, used only by fixtures::StoreWriter. The dump path never needs it.
pub trait RawStoreMut: RawStore {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&mut self, key: &[u8]) -> Result<()>;
}

impl<S: RawStore + ?Sized> RawStore for &S {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn scan_stream<F>(&self, prefix: Option<&[u8]>, cb: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]),
    {
        (**self).scan_stream(prefix, cb)
    }
}

/// View over `inner` restricted to keys starting with `prefix`; the prefix is
/// prepended on lookup and stripped from scanned keys.
#[derive(Debug)]
pub struct PrefixStore<S> {
    inner: S,
    prefix: Vec<u8>,
}

impl<S> PrefixStore<S> {
    pub fn new(inner: S, prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut k = Vec::with_capacity(self.prefix.len() + key.len());
        k.extend_from_slice(&self.prefix);
        k.extend_from_slice(key);
        k
    }
}

impl<S: RawStore> RawStore for PrefixStore<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(&self.full_key(key))
    }

    fn scan_stream<F>(&self, prefix: Option<&[u8]>, mut cb: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]),
    {
        let full = self.full_key(prefix.unwrap_or_default());
        let strip = self.prefix.len();
        self.inner
            .scan_stream(Some(&full), |k, v| cb(&k[strip..], v))
    }
}

impl<S: RawStoreMut> RawStoreMut for PrefixStore<S> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let k = self.full_key(key);
        self.inner.put(&k, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        let k = self.full_key(key);
        self.inner.delete(&k)
    }
}

impl<S: RawStoreMut + ?Sized> RawStoreMut for &mut S {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        (**self).delete(key)
    }
}

impl<S: RawStore + ?Sized> RawStore for &mut S {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn scan_stream<F>(&self, prefix: Option<&[u8]>, cb: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]),
    {
        (**self).scan_stream(prefix, cb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_store_isolates_neighbouring_prefixes() -> Result<()> {
        let mut mem = MemStore::default();
        mem.put(b"s/k:bank/a", b"1")?;
        mem.put(b"s/k:bank/b", b"2")?;
        mem.put(b"s/k:bankx/a", b"3")?;
        mem.put(b"s/k:ban/a", b"4")?;

        let view = PrefixStore::new(&mem, b"s/k:bank/".to_vec());
        assert_eq!(view.get(b"a")?, Some(b"1".to_vec()));
        assert_eq!(view.get(b"c")?, None);

        let mut seen = Vec::new();
        view.scan_stream(None, |k, v| seen.push((k.to_vec(), v.to_vec())))?;
        seen.sort();
        assert_eq!(
            seen,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec())
            ]
        );
        Ok(())
    }

    #[test]
    fn prefix_store_writes_through_with_prefix() -> Result<()> {
        let mut mem = MemStore::default();
        {
            let mut view = PrefixStore::new(&mut mem, b"p/".to_vec());
            view.put(b"x", b"1")?;
            view.put(b"y", b"2")?;
            view.delete(b"y")?;
        }
        assert_eq!(mem.get(b"p/x")?, Some(b"1".to_vec()));
        assert_eq!(mem.get(b"p/y")?, None);
        Ok(())
    }
}
