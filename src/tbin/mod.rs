//! TBin, the compact tagged binary encoding of RDL values
//!
//! # Overview
//!
//! A TBin stream opens with a version tag and continues with a sequence of
//! *tagged* values. Primitive kinds have fixed tags; composite shapes (typed
//! arrays, maps and structs, unions, enums) are bound to user tags from
//! `0x40` upwards the first time they occur, by an inline definition written
//! just before the first value of the shape. Later values of the same shape
//! cost only the tag. Symbols are interned the same way, so that a repeated
//! symbol costs only its id.
//!
//! The per-stream tables live in a [`Session`], borrowed by an [`Encoder`]
//! on the writing side and by a [`Decoder`] on the reading side. A session
//! that outlives one encoder lets another continue the same stream.
//!
//! # Typed and generic values
//!
//! Types implementing [`Marshal`] and [`Unmarshal`] (usually through
//! `#[derive(Marshal, Unmarshal)]`) are encoded according to their static
//! [`Signature`]. Dynamically-typed data goes through [`Value`], whose
//! containers encode to the generic array, map and struct tags and whose
//! elements always carry their own tags.
//!
//! For one-shot use, [`marshal`] and [`unmarshal`] wrap a fresh session
//! around a single value.

mod decoder;
mod encoder;
mod error;
mod marshal;
mod parse;
mod session;
mod signature;
pub mod tag;
mod target;
mod varint;

pub use self::decoder::{Decoder, MAX_DEPTH};
pub use self::encoder::Encoder;
pub use self::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use self::marshal::{MapKey, Marshal, Unmarshal};
pub use self::parse::{Parser, ReadParser, SliceParser};
pub use self::session::Session;
pub use self::signature::{FieldSignature, Signature};
pub use self::target::{ByteCounter, Target};
pub use self::varint::{unzigzag32, unzigzag64, zigzag32, zigzag64};

use crate::value::Value;

/// Encodes `value` as a complete stream, header included.
pub fn marshal<T: Marshal + ?Sized>(value: &T) -> EncodeResult<Vec<u8>> {
    let mut session = Session::new();
    let mut enc = Encoder::new(&mut session);
    enc.encode(value)?;
    Ok(enc.take_bytes())
}

/// Number of bytes [`marshal`] would produce for `value`.
pub fn encoded_len<T: Marshal + ?Sized>(value: &T) -> EncodeResult<usize> {
    let mut session = Session::new();
    let mut enc = Encoder::with_target(&mut session, ByteCounter::create());
    enc.encode(value)?;
    Ok(enc.written())
}

/// Decodes the first value of a complete stream into `T`.
///
/// With the `check_complete_parse` feature enabled, any bytes left after
/// that value are an error.
pub fn unmarshal<T: Unmarshal>(bytes: &[u8]) -> DecodeResult<T> {
    let mut session = Session::new();
    let mut dec = Decoder::new(&mut session, SliceParser::new(bytes))?;
    let value = dec.decode()?;
    cfg_if::cfg_if! {
        if #[cfg(feature = "check_complete_parse")] {
            dec.finish()?;
        }
    }
    Ok(value)
}

/// Decodes the first value of a complete stream generically.
pub fn unmarshal_value(bytes: &[u8]) -> DecodeResult<Value> {
    unmarshal(bytes)
}
