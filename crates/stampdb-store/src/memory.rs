use std::io::{self, Cursor, Write};
use std::sync::{Arc, RwLock};

use crate::provider::StampProvider;

#[derive(Debug, Default)]
struct Backing {
    data: Option<Vec<u8>>,
    generation: u64,
    read_only: bool,
}

/// In-memory [`StampProvider`].
///
/// Intended for tests and embedding. The document lives in a shared buffer
/// behind a `RwLock`; the stamp is a generation counter bumped on every
/// completed write. Clones share the same buffer, so several stores can be
/// bound to one backend.
#[derive(Clone, Default)]
pub struct MemoryStampProvider {
    backing: Arc<RwLock<Backing>>,
}

impl MemoryStampProvider {
    /// Create a provider with no document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider whose document already holds `data`.
    pub fn with_contents(data: Vec<u8>) -> Self {
        let provider = Self::new();
        provider.replace(data);
        provider
    }

    /// Overwrite the document as an outside writer would, bumping the stamp.
    pub fn replace(&self, data: Vec<u8>) {
        let mut backing = self.backing.write().expect("lock poisoned");
        backing.data = Some(data);
        backing.generation += 1;
    }

    /// Current document bytes, if one has been written.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.backing.read().expect("lock poisoned").data.clone()
    }

    /// Number of completed writes so far.
    pub fn generation(&self) -> u64 {
        self.backing.read().expect("lock poisoned").generation
    }

    /// When set, `open_output` fails with `PermissionDenied`.
    pub fn set_read_only(&self, read_only: bool) {
        self.backing.write().expect("lock poisoned").read_only = read_only;
    }
}

/// Buffered writer handed out by [`MemoryStampProvider`].
///
/// Nothing becomes visible until the provider finishes it; dropping it
/// discards the write.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    buf: Vec<u8>,
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl StampProvider for MemoryStampProvider {
    type Stamp = u64;
    type Reader = Cursor<Vec<u8>>;
    type Writer = MemoryWriter;

    fn current_stamp(&self) -> u64 {
        self.generation()
    }

    fn open_input(&self) -> io::Result<Cursor<Vec<u8>>> {
        match self.contents() {
            Some(data) => Ok(Cursor::new(data)),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no document written")),
        }
    }

    fn open_output(&self) -> io::Result<MemoryWriter> {
        if self.backing.read().expect("lock poisoned").read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "provider is read-only",
            ));
        }
        Ok(MemoryWriter::default())
    }

    fn finish_output(&self, writer: MemoryWriter) -> io::Result<()> {
        self.replace(writer.buf);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStampProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backing = self.backing.read().expect("lock poisoned");
        f.debug_struct("MemoryStampProvider")
            .field("generation", &backing.generation)
            .field("len", &backing.data.as_ref().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn empty_provider_has_no_input() {
        let provider = MemoryStampProvider::new();
        assert_eq!(provider.current_stamp(), 0);
        let err = provider.open_input().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn finished_write_is_visible_and_bumps_stamp() {
        let provider = MemoryStampProvider::new();
        let mut w = provider.open_output().unwrap();
        w.write_all(b"doc").unwrap();
        assert_eq!(provider.current_stamp(), 0);

        provider.finish_output(w).unwrap();
        assert_eq!(provider.current_stamp(), 1);

        let mut back = Vec::new();
        provider.open_input().unwrap().read_to_end(&mut back).unwrap();
        assert_eq!(back, b"doc");
    }

    #[test]
    fn dropped_writer_publishes_nothing() {
        let provider = MemoryStampProvider::with_contents(b"old".to_vec());
        {
            let mut w = provider.open_output().unwrap();
            w.write_all(b"new").unwrap();
        }
        assert_eq!(provider.contents().unwrap(), b"old");
        assert_eq!(provider.generation(), 1);
    }

    #[test]
    fn clones_share_backing() {
        let a = MemoryStampProvider::new();
        let b = a.clone();
        a.replace(b"shared".to_vec());
        assert_eq!(b.contents().unwrap(), b"shared");
        assert_eq!(b.current_stamp(), a.current_stamp());
    }

    #[test]
    fn read_only_rejects_output() {
        let provider = MemoryStampProvider::new();
        provider.set_read_only(true);
        let err = provider.open_output().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        provider.set_read_only(false);
        assert!(provider.open_output().is_ok());
    }

    #[test]
    fn debug_format() {
        let provider = MemoryStampProvider::with_contents(vec![0; 4]);
        let debug = format!("{provider:?}");
        assert!(debug.contains("MemoryStampProvider"));
        assert!(debug.contains("generation"));
    }
}
