use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::error::{DecodeError, DecodeResult};
use super::marshal::Unmarshal;
use super::parse::Parser;
use super::session::Session;
use super::signature::{FieldSignature, Signature};
use super::tag;
use super::varint::{read_uvarint32, read_uvarint64, unzigzag32, unzigzag64};
use crate::value::{Timestamp, Uuid, Value};

/// Upper bound on capacity reserved up front from an untrusted count.
pub(crate) const PREALLOC_LIMIT: usize = 1024;

/// How deeply values, and the definitions of their shapes, may nest.
pub const MAX_DEPTH: usize = 256;

/// Longest rendering of a stream shape quoted in an error.
const KEY_LIMIT: usize = 120;

/// Streaming TBin decoder
///
/// The decoder reads from a [`Parser`] and records the symbols and shapes
/// the stream introduces in a borrowed [`Session`]. Constructing a decoder
/// over a fresh session reads and checks the stream header.
///
/// Values are read either generically, into a [`Value`]
/// ([`decode_value`](Decoder::decode_value)), or into a type implementing
/// [`Unmarshal`] ([`decode`](Decoder::decode)). Typed decoding matches struct
/// fields by name, ignoring ASCII case; fields the target does not know are
/// read and discarded, and fields the stream does not carry keep their
/// default values unless [strict](Decoder::strict) mode is on.
///
/// As with the encoder, the first error is latched and returned by every
/// later call. Input nested more than [`MAX_DEPTH`] levels deep fails with
/// [`DecodeError::TooDeep`].
pub struct Decoder<'s, P: Parser> {
    session: &'s mut Session,
    input: P,
    strict: bool,
    pending_tiny: Option<usize>,
    depth: usize,
    error: Option<DecodeError>,
}

impl<'s, P: Parser> Decoder<'s, P> {
    pub fn new(session: &'s mut Session, input: P) -> DecodeResult<Self> {
        let mut dec = Self {
            session,
            input,
            strict: false,
            pending_tiny: None,
            depth: 0,
            error: None,
        };
        if !dec.session.is_started() {
            dec.read_header()?;
            dec.session.start();
        }
        Ok(dec)
    }

    fn read_header(&mut self) -> DecodeResult<()> {
        let tag = self.read_uvarint()?;
        if tag & tag::VERSION_MASK != tag::VERSION {
            return Err(self.fail(DecodeError::NotTbin));
        }
        let version = (tag & tag::VERSION_DATA_MASK) + 1;
        if version != tag::CURRENT_VERSION {
            return Err(self.fail(DecodeError::UnsupportedVersion(version)));
        }
        Ok(())
    }

    /// Rejects typed decodes that leave required fields unset.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    #[inline]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    #[inline]
    pub fn error(&self) -> Option<&DecodeError> {
        self.error.as_ref()
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.input.offset()
    }

    #[inline]
    pub fn session(&self) -> &Session {
        self.session
    }

    pub fn into_parser(self) -> P {
        self.input
    }

    /// Latches `err` (unless an earlier error is already latched) and
    /// returns the latched error.
    pub fn fail(&mut self, err: DecodeError) -> DecodeError {
        match &self.error {
            Some(latched) => latched.clone(),
            None => {
                debug!(error = %err, offset = self.input.offset(), "tbin decoder failed");
                self.error = Some(err.clone());
                err
            }
        }
    }

    /// Latches a type mismatch between `expected` and the stream's shape.
    pub fn mismatch(&mut self, expected: &str, found: &Signature) -> DecodeError {
        self.fail(DecodeError::TypeMismatch {
            expected: expected.to_owned(),
            found: found.key_within(KEY_LIMIT),
        })
    }

    #[inline]
    fn check(&self) -> DecodeResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    #[inline]
    fn latch<T>(&mut self, res: DecodeResult<T>) -> DecodeResult<T> {
        res.map_err(|err| self.fail(err))
    }

    /// Enters one level of nesting; every successful call is paired with
    /// [`leave`](Self::leave).
    fn enter(&mut self) -> DecodeResult<()> {
        if self.depth >= MAX_DEPTH {
            return Err(self.fail(DecodeError::TooDeep { limit: MAX_DEPTH }));
        }
        self.depth += 1;
        Ok(())
    }

    #[inline]
    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Fails unless every byte of the input has been consumed.
    pub fn finish(&mut self) -> DecodeResult<()> {
        self.check()?;
        let at_end = self.input.at_end();
        if self.latch(at_end)? {
            Ok(())
        } else {
            let offset = self.input.offset();
            Err(self.fail(DecodeError::TrailingBytes { offset }))
        }
    }

    pub fn read_uvarint(&mut self) -> DecodeResult<u32> {
        self.check()?;
        let n = read_uvarint32(&mut self.input);
        self.latch(n)
    }

    pub fn read_uvarint64(&mut self) -> DecodeResult<u64> {
        self.check()?;
        let n = read_uvarint64(&mut self.input);
        self.latch(n)
    }

    pub fn read_size(&mut self) -> DecodeResult<usize> {
        self.read_uvarint().map(|n| n as usize)
    }

    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        self.read_uvarint().map(|n| n != 0)
    }

    pub fn read_int32(&mut self) -> DecodeResult<i32> {
        self.read_uvarint().map(unzigzag32)
    }

    pub fn read_int64(&mut self) -> DecodeResult<i64> {
        self.read_uvarint64().map(unzigzag64)
    }

    pub fn read_float32(&mut self) -> DecodeResult<f32> {
        self.check()?;
        let x = self.input.take_f32();
        self.latch(x)
    }

    pub fn read_float64(&mut self) -> DecodeResult<f64> {
        self.check()?;
        let x = self.input.take_f64();
        self.latch(x)
    }

    fn consume_owned(&mut self, n: usize) -> DecodeResult<Vec<u8>> {
        self.check()?;
        let buf = self.input.consume(n).map(<[u8]>::to_vec);
        self.latch(buf)
    }

    fn read_utf8(&mut self, n: usize) -> DecodeResult<String> {
        let buf = self.consume_owned(n)?;
        String::from_utf8(buf).map_err(|err| self.fail(err.utf8_error().into()))
    }

    pub fn read_bytes(&mut self) -> DecodeResult<Vec<u8>> {
        let n = self.read_size()?;
        self.consume_owned(n)
    }

    /// Reads a string; after a tiny-string tag, its length comes from the tag.
    pub fn read_string(&mut self) -> DecodeResult<String> {
        let n = match self.pending_tiny.take() {
            Some(n) => n,
            None => self.read_size()?,
        };
        self.read_utf8(n)
    }

    /// Reads a symbol id, and the symbol's name if the id is new.
    pub fn read_symbol(&mut self) -> DecodeResult<String> {
        let id = self.read_uvarint()?;
        if let Some(name) = self.session.symbol(id) {
            return Ok(name.to_owned());
        }
        if id as usize != self.session.symbol_count() {
            return Err(self.fail(DecodeError::UndefinedSymbol(id)));
        }
        let n = self.read_size()?;
        let name = self.read_utf8(n)?;
        match self.session.intern_symbol(&name) {
            (_, true) => Ok(name),
            (_, false) => Err(self.fail(DecodeError::DuplicateSymbol(name))),
        }
    }

    pub fn read_timestamp(&mut self) -> DecodeResult<Timestamp> {
        let secs = self.read_float64()?;
        Timestamp::from_epoch_seconds(secs).ok_or_else(|| self.fail(DecodeError::InvalidTimestamp(secs)))
    }

    pub fn read_uuid(&mut self) -> DecodeResult<Uuid> {
        self.check()?;
        let bytes = self.input.consume_arr::<16>();
        self.latch(bytes).map(Uuid::from_bytes)
    }

    /// Reads the tag that introduces a value and returns its shape.
    ///
    /// Definitions preceding the tag are read and registered along the way.
    /// `Null` yields [`Signature::Null`], after which nothing further is read.
    pub fn read_type(&mut self) -> DecodeResult<Arc<Signature>> {
        loop {
            let tag = self.read_uvarint()?;
            if tag >= tag::FIRST_USER {
                if let Some(sig) = self.session.shape(tag) {
                    return Ok(sig.clone());
                }
                if tag == self.session.next_tag() {
                    self.read_definition()?;
                    continue;
                }
                return Err(self.fail(DecodeError::UndefinedTag(tag)));
            }
            if tag::is_tiny_str(tag) {
                self.pending_tiny = Some((tag & tag::TINY_STR_DATA_MASK) as usize);
                return Ok(Signature::fixed(tag::STRING).unwrap_or_else(|| Arc::new(Signature::String)));
            }
            return match Signature::fixed(tag) {
                Some(sig) if tag != tag::ANY => Ok(sig),
                _ => Err(self.fail(DecodeError::UnexpectedTag(tag))),
            };
        }
    }

    /// Reads a type reference within a definition, appending it to `key`
    /// and raising `depth` to the depth of the referenced shape.
    ///
    /// Nested shapes appear in `key` by tag; as every shape bound so far
    /// has a distinct layout, so do the keys built this way.
    fn read_type_ref(&mut self, key: &mut String, depth: &mut usize) -> DecodeResult<Arc<Signature>> {
        let tag = self.read_uvarint()?;
        let sig = if tag >= tag::FIRST_USER {
            match self.session.shape(tag) {
                Some(sig) => sig.clone(),
                None => return Err(self.fail(DecodeError::UndefinedTag(tag))),
            }
        } else {
            match Signature::fixed(tag) {
                Some(sig) => sig,
                None => return Err(self.fail(DecodeError::UnexpectedTag(tag))),
            }
        };
        if tag >= tag::FIRST_USER {
            key.push('#');
            key.push_str(&tag.to_string());
        } else {
            key.push_str(&sig.key());
        }
        *depth = (*depth).max(self.session.shape_depth(tag));
        Ok(sig)
    }

    fn read_definition(&mut self) -> DecodeResult<()> {
        let def = self.read_uvarint()?;
        let mut key = String::new();
        let mut depth = 0;
        let sig = match def {
            tag::DEF_ARRAY => {
                key.push_str("Array<");
                let items = self.read_type_ref(&mut key, &mut depth)?;
                key.push('>');
                Signature::Array(Some(items))
            }
            tag::DEF_MAP => {
                key.push_str("Map<");
                let keys = self.read_type_ref(&mut key, &mut depth)?;
                key.push(',');
                let items = self.read_type_ref(&mut key, &mut depth)?;
                key.push('>');
                Signature::Map(Some((keys, items)))
            }
            tag::DEF_STRUCT => {
                let n = self.read_size()?;
                let mut fields = Vec::with_capacity(n.min(PREALLOC_LIMIT));
                key.push_str("Struct{");
                for i in 0..n {
                    let len = self.read_size()?;
                    let name = self.read_utf8(len)?;
                    if i > 0 {
                        key.push(',');
                    }
                    key.push_str(&name);
                    key.push(':');
                    let ty = self.read_type_ref(&mut key, &mut depth)?;
                    let optional = *ty == Signature::Any;
                    fields.push(FieldSignature { name, ty, optional });
                }
                key.push('}');
                Signature::Struct(Some(fields))
            }
            tag::DEF_UNION => {
                let n = self.read_size()?;
                let mut variants = Vec::with_capacity(n.min(PREALLOC_LIMIT));
                key.push_str("Union<");
                for i in 0..n {
                    if i > 0 {
                        key.push(',');
                    }
                    variants.push(self.read_type_ref(&mut key, &mut depth)?);
                }
                key.push('>');
                Signature::Union(variants)
            }
            tag::DEF_ENUM => {
                let n = self.read_size()?;
                let mut symbols = Vec::with_capacity(n.min(PREALLOC_LIMIT));
                for _ in 0..n {
                    let len = self.read_size()?;
                    symbols.push(self.read_utf8(len)?);
                }
                let sig = Signature::Enum(symbols);
                key = sig.key();
                sig
            }
            other => return Err(self.fail(DecodeError::UnexpectedTag(other))),
        };
        if depth >= MAX_DEPTH {
            return Err(self.fail(DecodeError::TooDeep { limit: MAX_DEPTH }));
        }
        match self.session.define(key, Arc::new(sig), depth + 1) {
            Ok(_) => Ok(()),
            Err(key) => Err(self.fail(DecodeError::DuplicateDefinition(key))),
        }
    }

    /// Decodes the next tagged value generically.
    pub fn decode_value(&mut self) -> DecodeResult<Value> {
        let sig = self.read_type()?;
        self.read_value(&sig)
    }

    /// Decodes the next tagged value into `T`.
    pub fn decode<T: Unmarshal>(&mut self) -> DecodeResult<T> {
        T::unmarshal(self)
    }

    fn key_text(&mut self, key: Value) -> DecodeResult<String> {
        match key {
            Value::String(s) => Ok(s),
            Value::Symbol(s) => Ok(s.into_string()),
            other => Err(self.fail(DecodeError::NonStringKey(other.kind_name().to_owned()))),
        }
    }

    fn read_index(&mut self, what: &'static str, index: i64, len: usize) -> DecodeResult<usize> {
        if index >= 1 && index as u64 <= len as u64 {
            Ok(index as usize - 1)
        } else {
            Err(self.fail(DecodeError::IndexOutOfRange { what, index, len }))
        }
    }

    fn narrow<T: TryFrom<i32>>(&mut self, n: i32, target: &'static str) -> DecodeResult<T> {
        T::try_from(n).map_err(|_| {
            self.fail(DecodeError::Overflow {
                target,
                value: i64::from(n),
            })
        })
    }

    /// Reads a value laid out according to `sig`, generically.
    ///
    /// Enum values decode to the symbol's text and union values to the
    /// value of the variant present; optional struct fields holding `Null`
    /// are left out of the resulting struct.
    pub fn read_value(&mut self, sig: &Signature) -> DecodeResult<Value> {
        self.enter()?;
        let value = self.read_value_in(sig);
        self.leave();
        value
    }

    fn read_value_in(&mut self, sig: &Signature) -> DecodeResult<Value> {
        Ok(match sig {
            Signature::Null => Value::Null,
            Signature::Bool => Value::Bool(self.read_bool()?),
            Signature::Int8 => {
                let n = self.read_int32()?;
                Value::Int8(self.narrow(n, "Int8")?)
            }
            Signature::Int16 => {
                let n = self.read_int32()?;
                Value::Int16(self.narrow(n, "Int16")?)
            }
            Signature::Int32 => Value::Int32(self.read_int32()?),
            Signature::Int64 => Value::Int64(self.read_int64()?),
            Signature::Float32 => Value::Float32(self.read_float32()?),
            Signature::Float64 => Value::Float64(self.read_float64()?),
            Signature::Bytes => Value::Bytes(self.read_bytes()?),
            Signature::String => Value::String(self.read_string()?),
            Signature::Timestamp => Value::Timestamp(self.read_timestamp()?),
            Signature::Symbol => Value::Symbol(self.read_symbol()?.into()),
            Signature::Uuid => Value::Uuid(self.read_uuid()?),
            Signature::Any => return self.decode_value(),
            Signature::Array(items) => {
                let n = self.read_size()?;
                let mut out = Vec::with_capacity(n.min(PREALLOC_LIMIT));
                for _ in 0..n {
                    out.push(match items {
                        Some(items) => self.read_value(items)?,
                        None => self.decode_value()?,
                    });
                }
                Value::Array(out)
            }
            Signature::Map(entries) => {
                let n = self.read_size()?;
                let mut out = IndexMap::with_capacity(n.min(PREALLOC_LIMIT));
                for _ in 0..n {
                    let (k, v) = match entries {
                        Some((keys, items)) => {
                            let k = self.read_value(keys)?;
                            (k, self.read_value(items)?)
                        }
                        None => {
                            let k = self.decode_value()?;
                            (k, self.decode_value()?)
                        }
                    };
                    let k = self.key_text(k)?;
                    out.insert(k, v);
                }
                Value::Map(out)
            }
            Signature::Struct(None) => {
                let n = self.read_size()?;
                let mut out = IndexMap::with_capacity(n.min(PREALLOC_LIMIT));
                for _ in 0..n {
                    let name = self.read_symbol()?;
                    let v = self.decode_value()?;
                    out.insert(name, v);
                }
                Value::Struct(out)
            }
            Signature::Struct(Some(fields)) => {
                let mut out = IndexMap::with_capacity(fields.len());
                for f in fields {
                    let v = self.read_value(&f.ty)?;
                    if !v.is_null() {
                        out.insert(f.name.clone(), v);
                    }
                }
                Value::Struct(out)
            }
            Signature::Enum(symbols) => {
                let n = self.read_int32()?;
                let ix = self.read_index("enum symbol", i64::from(n), symbols.len())?;
                Value::String(symbols[ix].clone())
            }
            Signature::Union(variants) => {
                let n = self.read_uvarint()?;
                let ix = self.read_index("union variant", i64::from(n), variants.len())?;
                let variant = variants[ix].clone();
                return self.read_value(&variant);
            }
        })
    }

    /// Reads and discards a value laid out according to `sig`.
    pub fn skip(&mut self, sig: &Signature) -> DecodeResult<()> {
        self.read_value(sig).map(drop)
    }

    /// Handles the two shapes every target treats alike: for `Any`, reads
    /// the tag that follows and unmarshals through it; for `Null`, yields
    /// [`Unmarshal::unmarshal_null`] or a mismatch. Returns `Ok(None)` for
    /// every other shape, which the caller is left to handle.
    pub fn read_indirect<T: Unmarshal>(&mut self, sig: &Signature, expected: &str) -> DecodeResult<Option<T>> {
        match sig {
            Signature::Any => {
                let sig = self.read_type()?;
                self.enter()?;
                let value = T::unmarshal_value(self, &sig);
                self.leave();
                value.map(Some)
            }
            Signature::Null => match T::unmarshal_null() {
                Some(v) => Ok(Some(v)),
                None => Err(self.mismatch(expected, sig)),
            },
            _ => Ok(None),
        }
    }

    /// Reads a field value, yielding `None` if the stream holds `Null`.
    pub fn read_field<T: Unmarshal>(&mut self, sig: &Signature) -> DecodeResult<Option<T>> {
        match sig {
            Signature::Null => Ok(None),
            Signature::Any => {
                let sig = self.read_type()?;
                self.read_field(&sig)
            }
            _ => T::unmarshal_value(self, sig).map(Some),
        }
    }

    /// Walks the named entries of a struct- or map-shaped value.
    ///
    /// `visit` is called with the name and the shape of each entry and
    /// returns whether it consumed the entry's value; unconsumed values are
    /// skipped.
    pub fn read_fields<F>(&mut self, sig: &Signature, expected: &str, visit: F) -> DecodeResult<()>
    where
        F: FnMut(&mut Self, &str, &Signature) -> DecodeResult<bool>,
    {
        self.enter()?;
        let res = self.read_fields_in(sig, expected, visit);
        self.leave();
        res
    }

    fn read_fields_in<F>(&mut self, sig: &Signature, expected: &str, mut visit: F) -> DecodeResult<()>
    where
        F: FnMut(&mut Self, &str, &Signature) -> DecodeResult<bool>,
    {
        match sig {
            Signature::Struct(Some(fields)) => {
                for f in fields {
                    if !visit(self, &f.name, f.ty.as_ref())? {
                        self.skip(&f.ty)?;
                    }
                }
                Ok(())
            }
            Signature::Struct(None) => {
                let n = self.read_size()?;
                for _ in 0..n {
                    let name = self.read_symbol()?;
                    if !visit(self, &name, &Signature::Any)? {
                        self.decode_value()?;
                    }
                }
                Ok(())
            }
            Signature::Map(entries) => {
                let n = self.read_size()?;
                for _ in 0..n {
                    let (key, items) = match entries {
                        Some((keys, items)) => (self.read_value(keys)?, items.clone()),
                        None => (self.decode_value()?, Arc::new(Signature::Any)),
                    };
                    let key = self.key_text(key)?;
                    if !visit(self, &key, items.as_ref())? {
                        self.skip(&items)?;
                    }
                }
                Ok(())
            }
            Signature::Any => {
                let sig = self.read_type()?;
                self.read_fields_in(&sig, expected, visit)
            }
            _ => Err(self.mismatch(expected, sig)),
        }
    }

    /// Reads an integer of any width, widened to `i64`.
    pub fn read_integer(&mut self, sig: &Signature, expected: &str) -> DecodeResult<i64> {
        match sig {
            Signature::Int8 | Signature::Int16 | Signature::Int32 => self.read_int32().map(i64::from),
            Signature::Int64 => self.read_int64(),
            _ => Err(self.mismatch(expected, sig)),
        }
    }

    /// Reads text carried as a string, a symbol, or an enum symbol.
    pub fn read_text(&mut self, sig: &Signature, expected: &str) -> DecodeResult<String> {
        match sig {
            Signature::String => self.read_string(),
            Signature::Symbol => self.read_symbol(),
            Signature::Enum(symbols) => {
                let n = self.read_int32()?;
                let ix = self.read_index("enum symbol", i64::from(n), symbols.len())?;
                Ok(symbols[ix].clone())
            }
            _ => Err(self.mismatch(expected, sig)),
        }
    }

    /// Reads the variant index of a union, returning the zero-based index
    /// and the variant's shape.
    pub fn read_variant(&mut self, sig: &Signature, expected: &str) -> DecodeResult<(usize, Arc<Signature>)> {
        match sig {
            Signature::Union(variants) => {
                let n = self.read_uvarint()?;
                let ix = self.read_index("union variant", i64::from(n), variants.len())?;
                Ok((ix, variants[ix].clone()))
            }
            _ => Err(self.mismatch(expected, sig)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tbin::parse::{ReadParser, SliceParser};
    use crate::tbin::varint::write_uvarint;

    fn decode_all(bytes: &[u8]) -> DecodeResult<Value> {
        let mut session = Session::new();
        let mut dec = Decoder::new(&mut session, SliceParser::new(bytes))?;
        dec.decode_value()
    }

    #[test]
    fn header() {
        let mut session = Session::new();
        assert!(matches!(
            Decoder::new(&mut session, SliceParser::new(&[0x09])).err(),
            Some(DecodeError::NotTbin)
        ));
        let mut session = Session::new();
        assert!(matches!(
            Decoder::new(&mut session, SliceParser::new(&[0x19])).err(),
            Some(DecodeError::UnsupportedVersion(2))
        ));
        let mut session = Session::new();
        assert!(matches!(
            Decoder::new(&mut session, SliceParser::new(&[])).err(),
            Some(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn primitives() {
        assert_eq!(decode_all(&[24, 0]).unwrap(), Value::Null);
        assert_eq!(decode_all(&[24, 1, 1]).unwrap(), Value::Bool(true));
        assert_eq!(decode_all(&[24, 2, 255, 1]).unwrap(), Value::Int8(-128));
        assert_eq!(decode_all(&[24, 3, 254, 255, 3]).unwrap(), Value::Int16(32767));
        assert_eq!(decode_all(&[24, 4, 45]).unwrap(), Value::Int32(-23));
        assert_eq!(
            decode_all(&[24, 5, 255, 255, 255, 255, 255, 255, 255, 255, 255, 1]).unwrap(),
            Value::Int64(i64::MIN)
        );
        assert_eq!(decode_all(&[24, 6, 65, 188, 143, 92]).unwrap(), Value::Float32(23.57));
        assert_eq!(decode_all(&[24, 8, 2, 0, 0]).unwrap(), Value::Bytes(vec![0, 0]));
        assert_eq!(decode_all(&[24, 35, 102, 111, 111]).unwrap(), Value::from("foo"));
        assert_eq!(decode_all(&[24, 32]).unwrap(), Value::from(""));
        assert_eq!(
            decode_all(&[24, 10, 65, 213, 85, 231, 223, 64, 32, 197]).unwrap(),
            Value::Timestamp(Timestamp::parse("2015-05-16T19:50:21.002Z").unwrap())
        );
    }

    #[test]
    fn narrowing_overflow() {
        let err = decode_all(&[24, 2, 0x80, 0x04]).unwrap_err();
        assert!(matches!(err, DecodeError::Overflow { target: "Int8", value: 256 }));
    }

    #[test]
    fn symbols() {
        let bytes = [24, 11, 0, 3, 102, 111, 111, 11, 1, 3, 98, 97, 114, 11, 0, 11, 1];
        let mut session = Session::new();
        let mut dec = Decoder::new(&mut session, SliceParser::new(&bytes)).unwrap();
        let syms: Vec<Value> = (0..4).map(|_| dec.decode_value().unwrap()).collect();
        let expect: Vec<Value> = ["foo", "bar", "foo", "bar"]
            .into_iter()
            .map(|s| Value::Symbol(s.into()))
            .collect();
        assert_eq!(syms, expect);
        dec.finish().unwrap();

        let err = decode_all(&[24, 11, 1, 3, 102, 111, 111]).unwrap_err();
        assert!(matches!(err, DecodeError::UndefinedSymbol(1)));
    }

    #[test]
    fn generic_containers() {
        assert_eq!(
            decode_all(&[24, 13, 1, 4, 46]).unwrap(),
            Value::array([Value::Int32(23)])
        );
        assert_eq!(
            decode_all(&[24, 14, 1, 35, 102, 111, 111, 4, 46]).unwrap(),
            Value::map([("foo", Value::Int32(23))])
        );
        assert_eq!(
            decode_all(&[24, 15, 1, 0, 3, 102, 111, 111, 4, 46]).unwrap(),
            Value::structure([("foo", Value::Int32(23))])
        );
        let err = decode_all(&[24, 14, 1, 4, 46, 4, 46]).unwrap_err();
        assert!(matches!(err, DecodeError::NonStringKey(_)));
    }

    #[test]
    fn symbol_keyed_map_collapses_to_strings() {
        let bytes = [24, 14, 2, 11, 0, 3, 102, 111, 111, 35, 98, 97, 114, 11, 1, 3, 98, 97, 114, 11, 0];
        assert_eq!(
            decode_all(&bytes).unwrap(),
            Value::map([
                ("foo", Value::from("bar")),
                ("bar", Value::Symbol("foo".into())),
            ])
        );
    }

    #[test]
    fn typed_values() {
        let point = [0x18, 0x40, 0x13, 0x02, 0x01, 0x78, 0x04, 0x01, 0x79, 0x04, 0x40, 0x2e, 0x72];
        assert_eq!(
            decode_all(&point).unwrap(),
            Value::structure([("x", Value::Int32(23)), ("y", Value::Int32(57))])
        );
        let msi = [24, 64, 18, 9, 4, 64, 1, 3, 102, 111, 111, 46];
        assert_eq!(decode_all(&msi).unwrap(), Value::map([("foo", Value::Int32(23))]));
        let ai = [24, 64, 17, 4, 64, 5, 2, 4, 6, 8, 10];
        assert_eq!(
            decode_all(&ai).unwrap(),
            Value::array((1..=5).map(Value::Int32))
        );
    }

    #[test]
    fn optional_fields() {
        let absent = [
            0x18, 0x40, 0x13, 0x03, 0x03, 0x49, 0x33, 0x32, 0x04, 0x04, 0x50, 0x69, 0x33, 0x32, 0x04,
            0x04, 0x4f, 0x69, 0x33, 0x32, 0x10, 0x40, 0x02, 0x2e, 0x00,
        ];
        assert_eq!(
            decode_all(&absent).unwrap(),
            Value::structure([("I32", Value::Int32(1)), ("Pi32", Value::Int32(23))])
        );
        let mut present = absent.to_vec();
        present.pop();
        present.extend([0x04, 0x2e]);
        assert_eq!(
            decode_all(&present).unwrap(),
            Value::structure([
                ("I32", Value::Int32(1)),
                ("Pi32", Value::Int32(23)),
                ("Oi32", Value::Int32(23)),
            ])
        );
    }

    #[test]
    fn tag_errors() {
        assert!(matches!(
            decode_all(&[24, 0x41, 0x11, 0x04]).unwrap_err(),
            DecodeError::UndefinedTag(0x41)
        ));
        assert!(matches!(
            decode_all(&[24, 0x40, 0x04]).unwrap_err(),
            DecodeError::UnexpectedTag(0x04)
        ));
        assert!(matches!(decode_all(&[24, 0x10]).unwrap_err(), DecodeError::UnexpectedTag(0x10)));
        assert!(matches!(
            decode_all(&[24, 0x40, 0x11, 0x04, 0x41, 0x11, 0x04]).unwrap_err(),
            DecodeError::DuplicateDefinition(_)
        ));
        assert!(matches!(
            decode_all(&[24, 0x40, 0x15, 0x01, 0x01, 0x41, 0x40, 0x04]).unwrap_err(),
            DecodeError::IndexOutOfRange { what: "enum symbol", index: 2, len: 1 }
        ));
        assert!(matches!(decode_all(&[24, 9, 5, 1]).unwrap_err(), DecodeError::Truncated { .. }));
        assert!(matches!(
            decode_all(&[24, 34, 0xff, 0xfe]).unwrap_err(),
            DecodeError::InvalidUtf8(_)
        ));
    }

    #[test]
    fn enums_and_unions() {
        let enum_value = [24, 0x40, 0x15, 0x02, 0x01, 0x41, 0x01, 0x42, 0x40, 0x04];
        assert_eq!(decode_all(&enum_value).unwrap(), Value::from("B"));
        let union_value = [24, 0x40, 0x14, 0x02, 0x04, 0x09, 0x40, 0x02, 0x03, 0x61, 0x62, 0x63];
        assert_eq!(decode_all(&union_value).unwrap(), Value::from("abc"));
    }

    #[test]
    fn nesting_is_bounded() {
        fn nested(levels: usize) -> Vec<u8> {
            let mut bytes = vec![24];
            for _ in 0..levels {
                bytes.extend([0x0d, 0x01]);
            }
            bytes.push(0x00);
            bytes
        }
        fn depth(v: &Value) -> usize {
            match v {
                Value::Array(items) => 1 + items.first().map_or(0, depth),
                _ => 0,
            }
        }
        assert_eq!(depth(&decode_all(&nested(MAX_DEPTH - 1)).unwrap()), MAX_DEPTH - 1);
        assert!(matches!(
            decode_all(&nested(MAX_DEPTH)).unwrap_err(),
            DecodeError::TooDeep { limit: MAX_DEPTH }
        ));
        assert!(matches!(decode_all(&nested(200_000)).unwrap_err(), DecodeError::TooDeep { .. }));
    }

    #[test]
    fn definition_depth_is_bounded() {
        fn chain(levels: u64) -> Vec<u8> {
            let mut bytes = vec![24];
            let mut items = u64::from(tag::INT32);
            for i in 0..levels {
                let tag = u64::from(tag::FIRST_USER) + i;
                write_uvarint(&mut bytes, tag);
                bytes.push(tag::DEF_ARRAY as u8);
                write_uvarint(&mut bytes, items);
                items = tag;
            }
            write_uvarint(&mut bytes, items);
            bytes.push(0);
            bytes
        }
        assert_eq!(decode_all(&chain(MAX_DEPTH as u64)).unwrap(), Value::Array(Vec::new()));
        assert!(matches!(
            decode_all(&chain(MAX_DEPTH as u64 + 1)).unwrap_err(),
            DecodeError::TooDeep { limit: MAX_DEPTH }
        ));
    }

    #[test]
    fn mismatch_messages_stay_short() {
        let mut bytes = vec![24];
        let mut field = u64::from(tag::INT32);
        for i in 0..48u64 {
            let tag = u64::from(tag::FIRST_USER) + i;
            write_uvarint(&mut bytes, tag);
            bytes.extend([tag::DEF_STRUCT as u8, 2, 1, b'a']);
            write_uvarint(&mut bytes, field);
            bytes.extend([1, b'b']);
            write_uvarint(&mut bytes, field);
            field = tag;
        }
        write_uvarint(&mut bytes, field);
        let mut session = Session::new();
        let mut dec = Decoder::new(&mut session, SliceParser::new(&bytes)).unwrap();
        let err = dec.decode::<bool>().unwrap_err();
        match err {
            DecodeError::TypeMismatch { found, .. } => assert!(found.len() <= KEY_LIMIT + 3),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn errors_latch() {
        let mut session = Session::new();
        let mut dec = Decoder::new(&mut session, SliceParser::new(&[24, 0x17, 0])).unwrap();
        assert!(dec.decode_value().is_err());
        assert!(matches!(dec.decode_value(), Err(DecodeError::UnexpectedTag(0x17))));
        assert!(dec.error().is_some());
    }

    #[test]
    fn trailing_bytes() {
        let mut session = Session::new();
        let mut dec = Decoder::new(&mut session, SliceParser::new(&[24, 0, 0])).unwrap();
        assert_eq!(dec.decode_value().unwrap(), Value::Null);
        assert!(matches!(dec.finish(), Err(DecodeError::TrailingBytes { offset: 2 })));
    }

    #[test]
    fn reader_input() {
        let bytes: &[u8] = &[24, 14, 1, 35, 102, 111, 111, 4, 46];
        let mut session = Session::new();
        let mut dec = Decoder::new(&mut session, ReadParser::new(bytes)).unwrap();
        assert_eq!(dec.decode_value().unwrap(), Value::map([("foo", Value::Int32(23))]));
        dec.finish().unwrap();
    }

    #[test]
    fn reader_rejects_oversized_lengths() {
        let bytes: &[u8] = &[24, 9, 0xff, 0xff, 0xff, 0xff, 0x0f, b'a'];
        let mut session = Session::new();
        let mut dec = Decoder::new(&mut session, ReadParser::new(bytes)).unwrap();
        assert!(matches!(
            dec.decode_value(),
            Err(DecodeError::Truncated { offset: 7, requested }) if requested == u32::MAX as usize
        ));
    }
}
