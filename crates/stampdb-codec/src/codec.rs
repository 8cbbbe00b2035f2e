use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::mutf8;
use crate::value::{Value, ValueKind};

/// Deepest container nesting the decoder will follow.
pub const MAX_DEPTH: usize = 64;

/// Counters reported by [`read_document`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DocumentStats {
    /// Entry count announced by the document header.
    pub declared: usize,
    /// Entries handed to the sink.
    pub decoded: usize,
    /// Entries dropped because their value tag was unrecognized.
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Write a value as `[1 byte tag][payload]`.
///
/// Integers and floats are big-endian, bools are one byte, chars are a `u16`
/// code unit, strings are length-prefixed modified UTF-8. Lists and sets write
/// an `i32` element count followed by the elements; maps write an `i32` pair
/// count followed by alternating keys and values.
pub fn write_value<W: Write + ?Sized>(w: &mut W, value: &Value) -> CodecResult<()> {
    w.write_all(&[value.kind().tag()])?;
    match value {
        Value::Byte(v) => w.write_all(&v.to_be_bytes())?,
        Value::Short(v) => w.write_all(&v.to_be_bytes())?,
        Value::Int(v) => w.write_all(&v.to_be_bytes())?,
        Value::Long(v) => w.write_all(&v.to_be_bytes())?,
        Value::Float(v) => w.write_all(&v.to_be_bytes())?,
        Value::Double(v) => w.write_all(&v.to_be_bytes())?,
        Value::Bool(v) => w.write_all(&[u8::from(*v)])?,
        Value::Char(v) => w.write_all(&v.to_be_bytes())?,
        Value::String(s) => mutf8::write_str(w, s)?,
        Value::List(items) => {
            write_count(w, items.len())?;
            for item in items {
                write_value(w, item)?;
            }
        }
        Value::Set(items) => {
            write_count(w, items.len())?;
            for item in items {
                write_value(w, item)?;
            }
        }
        Value::Map(pairs) => {
            write_count(w, pairs.len())?;
            for (k, v) in pairs {
                write_value(w, k)?;
                write_value(w, v)?;
            }
        }
    }
    Ok(())
}

/// Read one tagged value.
///
/// Returns `Ok(None)` when the tag is not in the table. Nothing past the tag
/// byte is consumed in that case. Inside containers, elements that come back
/// as `None` are dropped, as are map pairs whose key or value does.
pub fn read_value<R: Read + ?Sized>(r: &mut R) -> CodecResult<Option<Value>> {
    read_nested(r, 0)
}

fn read_nested<R: Read + ?Sized>(r: &mut R, depth: usize) -> CodecResult<Option<Value>> {
    let tag = read_array::<_, 1>(r)?[0];
    let Some(kind) = ValueKind::from_tag(tag) else {
        debug!(tag, depth, "unrecognized value tag");
        return Ok(None);
    };

    let value = match kind {
        ValueKind::Byte => Value::Byte(i8::from_be_bytes(read_array(r)?)),
        ValueKind::Short => Value::Short(i16::from_be_bytes(read_array(r)?)),
        ValueKind::Int => Value::Int(i32::from_be_bytes(read_array(r)?)),
        ValueKind::Long => Value::Long(i64::from_be_bytes(read_array(r)?)),
        ValueKind::Float => Value::Float(f32::from_be_bytes(read_array(r)?)),
        ValueKind::Double => Value::Double(f64::from_be_bytes(read_array(r)?)),
        ValueKind::Bool => Value::Bool(read_array::<_, 1>(r)?[0] != 0),
        ValueKind::Char => Value::Char(u16::from_be_bytes(read_array(r)?)),
        ValueKind::String => Value::String(mutf8::read_str(r)?),
        ValueKind::List => {
            let depth = descend(depth)?;
            let mut items = Vec::new();
            for _ in 0..read_count(r)? {
                if let Some(item) = read_nested(r, depth)? {
                    items.push(item);
                }
            }
            Value::List(items)
        }
        ValueKind::Set => {
            let depth = descend(depth)?;
            let mut items = BTreeSet::new();
            for _ in 0..read_count(r)? {
                if let Some(item) = read_nested(r, depth)? {
                    items.insert(item);
                }
            }
            Value::Set(items)
        }
        ValueKind::Map => {
            let depth = descend(depth)?;
            let mut pairs = BTreeMap::new();
            for _ in 0..read_count(r)? {
                let key = read_nested(r, depth)?;
                let value = read_nested(r, depth)?;
                if let (Some(key), Some(value)) = (key, value) {
                    pairs.insert(key, value);
                }
            }
            Value::Map(pairs)
        }
    };
    Ok(Some(value))
}

fn descend(depth: usize) -> CodecResult<usize> {
    if depth >= MAX_DEPTH {
        return Err(CodecError::NestingTooDeep { max: MAX_DEPTH });
    }
    Ok(depth + 1)
}

fn read_array<R: Read + ?Sized, const N: usize>(r: &mut R) -> CodecResult<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Counts are signed on the wire; a negative count reads as empty.
fn read_count<R: Read + ?Sized>(r: &mut R) -> CodecResult<usize> {
    let count = i32::from_be_bytes(read_array(r)?);
    Ok(usize::try_from(count).unwrap_or(0))
}

fn write_count<W: Write + ?Sized>(w: &mut W, len: usize) -> CodecResult<()> {
    let count = i32::try_from(len).map_err(|_| CodecError::TooManyElements { len })?;
    w.write_all(&count.to_be_bytes())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Write a whole document: `[i32 count]` then `count` times
/// `[modified UTF-8 key][tagged value]`, in the iterator's order.
pub fn write_document<'a, W, I, K>(w: &mut W, entries: I) -> CodecResult<()>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = (K, &'a Value)>,
    I::IntoIter: ExactSizeIterator,
    K: AsRef<str>,
{
    let entries = entries.into_iter();
    write_count(w, entries.len())?;
    for (key, value) in entries {
        mutf8::write_str(w, key.as_ref())?;
        write_value(w, value)?;
    }
    Ok(())
}

/// Read a whole document, handing each decoded entry to `sink` as soon as
/// it is read.
///
/// Entries whose top-level tag is unrecognized are skipped. On error, every
/// entry read before the failure has already reached the sink.
pub fn read_document<R, F>(r: &mut R, mut sink: F) -> CodecResult<DocumentStats>
where
    R: Read + ?Sized,
    F: FnMut(String, Value),
{
    let declared = read_count(r)?;
    let mut stats = DocumentStats {
        declared,
        ..DocumentStats::default()
    };
    for _ in 0..declared {
        let key = mutf8::read_str(r)?;
        match read_value(r)? {
            Some(value) => {
                sink(key, value);
                stats.decoded += 1;
            }
            None => {
                debug!(key = %key, "skipping entry with unrecognized tag");
                stats.skipped += 1;
            }
        }
    }
    Ok(stats)
}

// ---------------------------------------------------------------------------
// In-memory helpers
// ---------------------------------------------------------------------------

/// Encode a single value into a fresh buffer.
pub fn encode_value(value: &Value) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_value(&mut buf, value)?;
    Ok(buf)
}

/// Decode a single value from the front of `data`.
pub fn decode_value(mut data: &[u8]) -> CodecResult<Option<Value>> {
    read_value(&mut data)
}

/// Encode a document into a fresh buffer.
pub fn encode_document<'a, I, K>(entries: I) -> CodecResult<Vec<u8>>
where
    I: IntoIterator<Item = (K, &'a Value)>,
    I::IntoIter: ExactSizeIterator,
    K: AsRef<str>,
{
    let mut buf = Vec::new();
    write_document(&mut buf, entries)?;
    Ok(buf)
}

/// Decode a document into its entries, in file order.
pub fn decode_document(mut data: &[u8]) -> CodecResult<Vec<(String, Value)>> {
    let mut entries = Vec::new();
    read_document(&mut data, |k, v| entries.push((k, v)))?;
    Ok(entries)
}
