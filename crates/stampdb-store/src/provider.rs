use std::fmt::Debug;
use std::io::{self, Read, Write};

/// Backend that supplies a store's byte streams and change stamps.
///
/// All implementations must satisfy these invariants:
/// - [`current_stamp`](Self::current_stamp) is cheap and never opens the
///   data stream. The store may call it on every `reload()`.
/// - Two stamps compare equal iff the backing content is unchanged between
///   the two observations. Stamp inequality is the store's only staleness
///   signal; it never diffs content.
/// - [`open_output`](Self::open_output) succeeds even when the backing
///   resource does not exist yet, creating it.
/// - Streams are scoped to one load or save and released when dropped.
pub trait StampProvider: Send + Sync + 'static {
    /// Opaque version token for the backing content.
    type Stamp: Clone + PartialEq + Debug + Send + Sync + 'static;
    /// Stream a load reads the document from.
    type Reader: Read;
    /// Stream a save writes the document to.
    type Writer: Write;

    /// Observe the backend's current version.
    fn current_stamp(&self) -> Self::Stamp;

    /// Open the document for reading.
    fn open_input(&self) -> io::Result<Self::Reader>;

    /// Open the document for writing, replacing its content.
    fn open_output(&self) -> io::Result<Self::Writer>;

    /// Complete a save once the whole document has been written.
    ///
    /// Default implementation flushes. Backends may override to make the
    /// write durable or visible (e.g., `fsync`, publishing a buffer).
    fn finish_output(&self, mut writer: Self::Writer) -> io::Result<()> {
        writer.flush()
    }
}
