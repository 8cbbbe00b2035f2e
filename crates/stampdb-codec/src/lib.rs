//! Typed values and the tagged binary format for stampdb documents.
//!
//! A document is a flat mapping from string keys to [`Value`]s. Each value is
//! written as a one-byte tag followed by its payload, recursively for
//! containers:
//!
//! ```text
//! document := [i32 count] { [u16 len][modified UTF-8 key] value }*count
//! value    := [u8 tag] payload
//! ```
//!
//! | Tag | Kind   | Payload                                  |
//! |-----|--------|------------------------------------------|
//! | 0   | byte   | `i8`                                     |
//! | 1   | short  | `i16` big-endian                         |
//! | 2   | int    | `i32` big-endian                         |
//! | 3   | long   | `i64` big-endian                         |
//! | 4   | float  | IEEE-754 `f32` bits, big-endian          |
//! | 5   | double | IEEE-754 `f64` bits, big-endian          |
//! | 6   | bool   | one byte, non-zero is `true`             |
//! | 7   | char   | one UTF-16 code unit, big-endian         |
//! | 8   | string | `u16` length + modified UTF-8            |
//! | 9   | list   | `i32` count + values                     |
//! | 10  | set    | `i32` count + values                     |
//! | 11  | map    | `i32` count + (key value) pairs          |
//!
//! # Decoding Rules
//!
//! 1. An unrecognized tag decodes to "no value". The entry or element that
//!    carried it is dropped; decoding continues.
//! 2. A map pair whose key or value is dropped is dropped as a whole.
//! 3. Truncated or malformed input is an error; entries already delivered by
//!    [`read_document`] stay delivered.

pub mod codec;
pub mod error;
pub mod mutf8;
pub mod value;

pub use codec::{
    decode_document, decode_value, encode_document, encode_value, read_document, read_value,
    write_document, write_value, DocumentStats, MAX_DEPTH,
};
pub use error::{CodecError, CodecResult};
pub use value::{FromValue, Value, ValueKind};
