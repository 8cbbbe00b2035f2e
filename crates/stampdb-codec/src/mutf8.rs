//! Length-prefixed modified UTF-8 strings.
//!
//! This is the string form used by big-endian data streams: a `u16` byte
//! count followed by the string's UTF-16 code units, each written as one to
//! three bytes. It differs from standard UTF-8 in two ways:
//!
//! - U+0000 is written as the two bytes `C0 80`, never as a raw zero byte.
//! - Characters outside the BMP are written as a surrogate pair, each
//!   surrogate taking three bytes (six in total instead of four).

use std::io::{Read, Write};

use crate::error::{CodecError, CodecResult};

/// Largest encoded length the `u16` prefix can describe.
pub const MAX_ENCODED_LEN: usize = u16::MAX as usize;

/// Number of bytes `s` occupies once encoded, excluding the prefix.
pub fn encoded_len(s: &str) -> usize {
    s.encode_utf16().map(unit_len).sum()
}

fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007f => 1,
        0x0000 | 0x0080..=0x07ff => 2,
        _ => 3,
    }
}

/// Encode `s` without the length prefix.
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(s));
    for unit in s.encode_utf16() {
        match unit_len(unit) {
            1 => out.push(unit as u8),
            2 => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

/// Decode bytes produced by [`encode`].
///
/// Unpaired surrogates cannot live in a Rust `String` and are replaced with
/// U+FFFD. Any other malformed sequence is an error.
pub fn decode(bytes: &[u8]) -> CodecResult<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let unit = match b >> 4 {
            0x0..=0x7 => {
                i += 1;
                u16::from(b)
            }
            0xc | 0xd => {
                let b2 = continuation(bytes, i, 1)?;
                i += 2;
                (u16::from(b & 0x1f) << 6) | u16::from(b2 & 0x3f)
            }
            0xe => {
                let b2 = continuation(bytes, i, 1)?;
                let b3 = continuation(bytes, i, 2)?;
                i += 3;
                (u16::from(b & 0x0f) << 12) | (u16::from(b2 & 0x3f) << 6) | u16::from(b3 & 0x3f)
            }
            _ => {
                return Err(CodecError::MalformedString(format!(
                    "invalid lead byte {b:#04x} at offset {i}"
                )))
            }
        };
        units.push(unit);
    }
    Ok(String::from_utf16_lossy(&units))
}

fn continuation(bytes: &[u8], lead: usize, n: usize) -> CodecResult<u8> {
    match bytes.get(lead + n) {
        Some(&b) if b & 0xc0 == 0x80 => Ok(b),
        Some(&b) => Err(CodecError::MalformedString(format!(
            "invalid continuation byte {b:#04x} at offset {}",
            lead + n
        ))),
        None => Err(CodecError::MalformedString(format!(
            "sequence at offset {lead} truncated"
        ))),
    }
}

/// Write `s` with its `u16` big-endian length prefix.
pub fn write_str<W: Write + ?Sized>(w: &mut W, s: &str) -> CodecResult<()> {
    let len = encoded_len(s);
    if len > MAX_ENCODED_LEN {
        return Err(CodecError::StringTooLong { len });
    }
    w.write_all(&(len as u16).to_be_bytes())?;
    w.write_all(&encode(s))?;
    Ok(())
}

/// Read a string written by [`write_str`].
pub fn read_str<R: Read + ?Sized>(r: &mut R) -> CodecResult<String> {
    let mut prefix = [0u8; 2];
    r.read_exact(&mut prefix)?;
    let mut bytes = vec![0u8; u16::from_be_bytes(prefix) as usize];
    r.read_exact(&mut bytes)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_plain_bytes() {
        assert_eq!(encode("abc"), b"abc");
        assert_eq!(encoded_len("abc"), 3);
    }

    #[test]
    fn nul_uses_two_bytes() {
        assert_eq!(encode("a\0b"), [b'a', 0xc0, 0x80, b'b']);
        assert_eq!(decode(&[b'a', 0xc0, 0x80, b'b']).unwrap(), "a\0b");
    }

    #[test]
    fn two_and_three_byte_units() {
        // U+00E9 and U+20AC match standard UTF-8.
        assert_eq!(encode("é€"), "é€".as_bytes());
        assert_eq!(decode("é€".as_bytes()).unwrap(), "é€");
    }

    #[test]
    fn supplementary_chars_use_surrogate_pairs() {
        // U+1F600 = D83D DE00
        let bytes = encode("😀");
        assert_eq!(bytes, [0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80]);
        assert_eq!(encoded_len("😀"), 6);
        assert_eq!(decode(&bytes).unwrap(), "😀");
    }

    #[test]
    fn raw_zero_byte_is_accepted() {
        assert_eq!(decode(&[0x00]).unwrap(), "\0");
    }

    #[test]
    fn unpaired_surrogate_is_replaced() {
        assert_eq!(decode(&[0xed, 0xa0, 0xbd]).unwrap(), "\u{fffd}");
    }

    #[test]
    fn malformed_sequences_rejected() {
        assert!(matches!(decode(&[0x80]), Err(CodecError::MalformedString(_))));
        assert!(matches!(decode(&[0xf0, 0x9f, 0x98, 0x80]), Err(CodecError::MalformedString(_))));
        assert!(matches!(decode(&[0xc3]), Err(CodecError::MalformedString(_))));
        assert!(matches!(decode(&[0xe2, 0x82, 0x41]), Err(CodecError::MalformedString(_))));
    }

    #[test]
    fn prefixed_roundtrip() {
        let mut buf = Vec::new();
        write_str(&mut buf, "héllo\0").unwrap();
        assert_eq!(&buf[..2], &[0x00, 0x08]);
        let back = read_str(&mut buf.as_slice()).unwrap();
        assert_eq!(back, "héllo\0");
    }

    #[test]
    fn overlong_string_rejected() {
        let s = "€".repeat(MAX_ENCODED_LEN / 3 + 1);
        let err = write_str(&mut Vec::new(), &s).unwrap_err();
        assert!(matches!(err, CodecError::StringTooLong { len } if len == MAX_ENCODED_LEN + 3));
    }

    #[test]
    fn exactly_max_length_fits() {
        let s = "a".repeat(MAX_ENCODED_LEN);
        let mut buf = Vec::new();
        write_str(&mut buf, &s).unwrap();
        assert_eq!(&buf[..2], &[0xff, 0xff]);
        assert_eq!(read_str(&mut buf.as_slice()).unwrap().len(), MAX_ENCODED_LEN);
    }

    #[test]
    fn truncated_body_is_io_error() {
        let data = [0x00, 0x05, b'a', b'b'];
        assert!(matches!(read_str(&mut &data[..]), Err(CodecError::Io(_))));
    }
}
