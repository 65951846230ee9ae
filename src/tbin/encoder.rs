use std::io::Write;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::error::{EncodeError, EncodeResult};
use super::marshal::Marshal;
use super::session::Session;
use super::signature::Signature;
use super::tag;
use super::target::Target;
use super::varint::{write_uvarint, zigzag32, zigzag64};
use crate::value::{Timestamp, Uuid, Value};

/// Streaming TBin encoder
///
/// The encoder appends to a [`Target`] (a `Vec<u8>` unless otherwise
/// specified) and draws its symbol and shape tables from a borrowed
/// [`Session`]. Constructing an encoder over a fresh session writes the
/// stream header.
///
/// Methods come in two flavours:
///   * `encode_X` writes a *tagged* value, one that can be read back without
///     knowing its type in advance
///   * `write_X` writes the bare value, for positions whose type is implied
///     by an enclosing definition
///
/// The first error encountered is latched: every later call returns it
/// without writing anything, and [`error`](Encoder::error) exposes it.
pub struct Encoder<'s, U: Target = Vec<u8>> {
    session: &'s mut Session,
    out: U,
    written: usize,
    error: Option<EncodeError>,
}

impl<'s> Encoder<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self::with_target(session, Vec::new())
    }

    /// Encoded bytes not yet flushed.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.out
    }

    /// Takes the encoded bytes, leaving the buffer empty.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }

    /// Writes the buffered bytes to `out`, then empties the buffer.
    pub fn flush<W: Write>(&mut self, out: &mut W) -> EncodeResult<()> {
        self.check()?;
        if let Err(err) = out.write_all(&self.out) {
            return Err(self.fail(err.into()));
        }
        self.out.clear();
        Ok(())
    }
}

impl<'s, U: Target> Encoder<'s, U> {
    pub fn with_target(session: &'s mut Session, out: U) -> Self {
        let mut enc = Self {
            session,
            out,
            written: 0,
            error: None,
        };
        if !enc.session.is_started() {
            enc.session.start();
            enc.put_uvarint(u64::from(tag::CURRENT_VERSION_TAG));
        }
        enc
    }

    pub fn into_target(self) -> U {
        self.out
    }

    /// Total number of bytes appended to the target, header included.
    #[inline]
    pub fn written(&self) -> usize {
        self.written
    }

    /// The latched error, if any.
    #[inline]
    pub fn error(&self) -> Option<&EncodeError> {
        self.error.as_ref()
    }

    /// Latches `err` (unless an earlier error is already latched) and
    /// returns the latched error.
    pub fn fail(&mut self, err: EncodeError) -> EncodeError {
        match &self.error {
            Some(latched) => latched.clone(),
            None => {
                debug!(error = %err, "tbin encoder failed");
                self.error = Some(err.clone());
                err
            }
        }
    }

    #[inline]
    fn check(&self) -> EncodeResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    #[inline]
    fn put_uvarint(&mut self, n: u64) {
        self.written += write_uvarint(&mut self.out, n);
    }

    #[inline]
    fn put_all(&mut self, buf: &[u8]) {
        self.out.anticipate(buf.len());
        self.written += self.out.push_all(buf);
    }

    fn put_tag(&mut self, tag: u32) -> EncodeResult<()> {
        self.check()?;
        self.put_uvarint(u64::from(tag));
        Ok(())
    }

    pub fn write_uvarint(&mut self, n: u64) -> EncodeResult<()> {
        self.check()?;
        self.put_uvarint(n);
        Ok(())
    }

    /// Writes a length or count, which the format limits to 32 bits.
    pub fn write_size(&mut self, n: usize) -> EncodeResult<()> {
        self.check()?;
        match u32::try_from(n) {
            Ok(n) => {
                self.put_uvarint(u64::from(n));
                Ok(())
            }
            Err(_) => Err(self.fail(EncodeError::Unsupported(format!(
                "length {n} exceeds the 32-bit limit"
            )))),
        }
    }

    pub fn write_bool(&mut self, b: bool) -> EncodeResult<()> {
        self.write_uvarint(u64::from(b))
    }

    pub fn write_int8(&mut self, n: i8) -> EncodeResult<()> {
        self.write_int32(i32::from(n))
    }

    pub fn write_int16(&mut self, n: i16) -> EncodeResult<()> {
        self.write_int32(i32::from(n))
    }

    pub fn write_int32(&mut self, n: i32) -> EncodeResult<()> {
        self.write_uvarint(u64::from(zigzag32(n)))
    }

    pub fn write_int64(&mut self, n: i64) -> EncodeResult<()> {
        self.write_uvarint(zigzag64(n))
    }

    pub fn write_float32(&mut self, x: f32) -> EncodeResult<()> {
        self.check()?;
        self.written += self.out.push_many(x.to_be_bytes());
        Ok(())
    }

    pub fn write_float64(&mut self, x: f64) -> EncodeResult<()> {
        self.check()?;
        self.written += self.out.push_many(x.to_be_bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, b: &[u8]) -> EncodeResult<()> {
        self.write_size(b.len())?;
        self.put_all(b);
        Ok(())
    }

    pub fn write_string(&mut self, s: &str) -> EncodeResult<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Writes the id of a symbol, followed by its name the first time the
    /// symbol occurs in the stream.
    pub fn write_symbol(&mut self, name: &str) -> EncodeResult<()> {
        self.check()?;
        let (id, fresh) = self.session.intern_symbol(name);
        self.put_uvarint(u64::from(id));
        if fresh {
            self.write_string(name)?;
        }
        Ok(())
    }

    pub fn write_timestamp(&mut self, ts: &Timestamp) -> EncodeResult<()> {
        self.write_float64(ts.seconds_since_epoch())
    }

    pub fn write_uuid(&mut self, u: &Uuid) -> EncodeResult<()> {
        self.check()?;
        self.written += self.out.push_many(*u.as_bytes());
        Ok(())
    }

    /// Writes the tag for a shape, first writing its definition (and those
    /// of any shapes it is built from) if the stream has not seen it yet.
    pub fn write_type(&mut self, sig: &Signature) -> EncodeResult<()> {
        self.check()?;
        let tag = self.compile(sig)?;
        self.put_tag(tag)
    }

    fn compile(&mut self, sig: &Signature) -> EncodeResult<u32> {
        if !sig.needs_definition() {
            return Ok(sig.tag());
        }
        let key = sig.key();
        if let Some(tag) = self.session.tag_of(&key) {
            return Ok(tag);
        }
        let mut def: Vec<u8> = Vec::new();
        let mut depth = 0;
        match sig {
            Signature::Array(Some(items)) => {
                def.push_one(tag::DEF_ARRAY as u8);
                let items = self.compile_ref(items, &mut depth)?;
                write_uvarint(&mut def, u64::from(items));
            }
            Signature::Map(Some((keys, items))) => {
                def.push_one(tag::DEF_MAP as u8);
                let keys = self.compile_ref(keys, &mut depth)?;
                write_uvarint(&mut def, u64::from(keys));
                let items = self.compile_ref(items, &mut depth)?;
                write_uvarint(&mut def, u64::from(items));
            }
            Signature::Struct(Some(fields)) => {
                def.push_one(tag::DEF_STRUCT as u8);
                write_uvarint(&mut def, fields.len() as u64);
                for f in fields {
                    write_uvarint(&mut def, f.name.len() as u64);
                    def.push_all(f.name.as_bytes());
                    let ftag = if f.optional {
                        self.compile(&f.ty)?;
                        tag::ANY
                    } else {
                        self.compile_ref(&f.ty, &mut depth)?
                    };
                    write_uvarint(&mut def, u64::from(ftag));
                }
            }
            Signature::Union(variants) => {
                def.push_one(tag::DEF_UNION as u8);
                write_uvarint(&mut def, variants.len() as u64);
                for v in variants {
                    let vtag = self.compile_ref(v, &mut depth)?;
                    write_uvarint(&mut def, u64::from(vtag));
                }
            }
            Signature::Enum(symbols) => {
                def.push_one(tag::DEF_ENUM as u8);
                write_uvarint(&mut def, symbols.len() as u64);
                for s in symbols {
                    write_uvarint(&mut def, s.len() as u64);
                    def.push_all(s.as_bytes());
                }
            }
            _ => return Ok(sig.tag()),
        }
        match self.session.define(key, Arc::new(sig.clone()), depth + 1) {
            Ok(tag) => {
                self.put_tag(tag)?;
                self.put_all(&def);
                Ok(tag)
            }
            Err(key) => Err(self.fail(EncodeError::Unsupported(format!(
                "recursive definition of {key}"
            )))),
        }
    }

    /// Compiles a shape referenced from a definition, raising `depth` to
    /// the shape's own depth.
    fn compile_ref(&mut self, sig: &Signature, depth: &mut usize) -> EncodeResult<u32> {
        let tag = self.compile(sig)?;
        *depth = (*depth).max(self.session.shape_depth(tag));
        Ok(tag)
    }

    pub fn encode_null(&mut self) -> EncodeResult<()> {
        self.put_tag(tag::NULL)
    }

    pub fn encode_bool(&mut self, b: bool) -> EncodeResult<()> {
        self.put_tag(tag::BOOL)?;
        self.write_bool(b)
    }

    pub fn encode_int8(&mut self, n: i8) -> EncodeResult<()> {
        self.put_tag(tag::INT8)?;
        self.write_int8(n)
    }

    pub fn encode_int16(&mut self, n: i16) -> EncodeResult<()> {
        self.put_tag(tag::INT16)?;
        self.write_int16(n)
    }

    pub fn encode_int32(&mut self, n: i32) -> EncodeResult<()> {
        self.put_tag(tag::INT32)?;
        self.write_int32(n)
    }

    pub fn encode_int64(&mut self, n: i64) -> EncodeResult<()> {
        self.put_tag(tag::INT64)?;
        self.write_int64(n)
    }

    pub fn encode_float32(&mut self, x: f32) -> EncodeResult<()> {
        self.put_tag(tag::FLOAT32)?;
        self.write_float32(x)
    }

    pub fn encode_float64(&mut self, x: f64) -> EncodeResult<()> {
        self.put_tag(tag::FLOAT64)?;
        self.write_float64(x)
    }

    pub fn encode_bytes(&mut self, b: &[u8]) -> EncodeResult<()> {
        self.put_tag(tag::BYTES)?;
        self.write_bytes(b)
    }

    /// Strings of up to 31 bytes carry their length in the tag.
    pub fn encode_string(&mut self, s: &str) -> EncodeResult<()> {
        let n = s.len();
        if n <= tag::TINY_STR_MAX_LEN {
            self.put_tag(tag::TINY_STR | n as u32)?;
            self.put_all(s.as_bytes());
            Ok(())
        } else {
            self.put_tag(tag::STRING)?;
            self.write_string(s)
        }
    }

    pub fn encode_symbol(&mut self, name: &str) -> EncodeResult<()> {
        self.put_tag(tag::SYMBOL)?;
        self.write_symbol(name)
    }

    pub fn encode_timestamp(&mut self, ts: &Timestamp) -> EncodeResult<()> {
        self.put_tag(tag::TIMESTAMP)?;
        self.write_timestamp(ts)
    }

    pub fn encode_uuid(&mut self, u: &Uuid) -> EncodeResult<()> {
        self.put_tag(tag::UUID)?;
        self.write_uuid(u)
    }

    fn encode_entries(&mut self, entries: &IndexMap<String, Value>, symbolic: bool) -> EncodeResult<()> {
        self.write_size(entries.len())?;
        for (k, v) in entries {
            if symbolic {
                self.write_symbol(k)?;
            } else {
                self.encode_string(k)?;
            }
            self.encode_value(v)?;
        }
        Ok(())
    }

    /// Encodes a dynamic value in its generic, fully-tagged form.
    pub fn encode_value(&mut self, v: &Value) -> EncodeResult<()> {
        match v {
            Value::Null => self.encode_null(),
            Value::Bool(b) => self.encode_bool(*b),
            Value::Int8(n) => self.encode_int8(*n),
            Value::Int16(n) => self.encode_int16(*n),
            Value::Int32(n) => self.encode_int32(*n),
            Value::Int64(n) => self.encode_int64(*n),
            Value::Float32(x) => self.encode_float32(*x),
            Value::Float64(x) => self.encode_float64(*x),
            Value::Bytes(b) => self.encode_bytes(b),
            Value::String(s) => self.encode_string(s),
            Value::Symbol(s) => self.encode_symbol(s.as_str()),
            Value::Timestamp(ts) => self.encode_timestamp(ts),
            Value::Uuid(u) => self.encode_uuid(u),
            Value::Array(items) => {
                self.put_tag(tag::ARRAY)?;
                self.write_size(items.len())?;
                items.iter().try_for_each(|item| self.encode_value(item))
            }
            Value::Map(entries) => {
                self.put_tag(tag::MAP)?;
                self.encode_entries(entries, false)
            }
            Value::Struct(entries) => {
                self.put_tag(tag::STRUCT)?;
                self.encode_entries(entries, true)
            }
        }
    }

    /// Encodes a value of a statically-known type, tagged.
    pub fn encode<T: Marshal + ?Sized>(&mut self, value: &T) -> EncodeResult<()> {
        value.marshal(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tbin::signature::FieldSignature;
    use crate::value::{parse_uuid, Symbol};

    fn encoded(f: impl FnOnce(&mut Encoder<'_>) -> EncodeResult<()>) -> Vec<u8> {
        let mut session = Session::new();
        let mut enc = Encoder::new(&mut session);
        f(&mut enc).unwrap();
        enc.take_bytes()
    }

    #[test]
    fn primitives() {
        assert_eq!(encoded(|e| e.encode_null()), [24, 0]);
        assert_eq!(encoded(|e| e.encode_bool(true)), [24, 1, 1]);
        assert_eq!(encoded(|e| e.encode_int8(-23)), [24, 2, 45]);
        assert_eq!(encoded(|e| e.encode_int8(127)), [24, 2, 254, 1]);
        assert_eq!(encoded(|e| e.encode_int16(-32768)), [24, 3, 255, 255, 3]);
        assert_eq!(encoded(|e| e.encode_int32(i32::MIN)), [24, 4, 255, 255, 255, 255, 15]);
        assert_eq!(
            encoded(|e| e.encode_int64(i64::MAX)),
            [24, 5, 254, 255, 255, 255, 255, 255, 255, 255, 255, 1]
        );
        assert_eq!(encoded(|e| e.encode_float32(23.57)), [24, 6, 65, 188, 143, 92]);
        assert_eq!(
            encoded(|e| e.encode_float64(23.57)),
            [24, 7, 64, 55, 145, 235, 133, 30, 184, 82]
        );
        assert_eq!(encoded(|e| e.encode_bytes(&[1, 2, 3, 4, 5])), [24, 8, 5, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn tiny_string_boundary() {
        assert_eq!(encoded(|e| e.encode_string("")), [24, 32]);
        assert_eq!(encoded(|e| e.encode_string("foo")), [24, 35, 102, 111, 111]);
        let tiny = "*can* fit into the tiny format";
        let bytes = encoded(|e| e.encode_string(tiny));
        assert_eq!(bytes[1], 0x20 | 30);
        let max = "x".repeat(31);
        assert_eq!(encoded(|e| e.encode_string(&max))[1], 0x3f);
        let big = "x".repeat(32);
        assert_eq!(&encoded(|e| e.encode_string(&big))[..3], [24, 9, 32]);
        let multibyte = "tiny 姚冀清";
        assert_eq!(encoded(|e| e.encode_string(multibyte))[1], 46);
    }

    #[test]
    fn timestamp_and_uuid() {
        let ts = Timestamp::parse("2015-05-16T19:50:21.002Z").unwrap();
        assert_eq!(
            encoded(|e| e.encode_timestamp(&ts)),
            [24, 10, 65, 213, 85, 231, 223, 64, 32, 197]
        );
        let u = parse_uuid("373ab4c4-fc05-11e4-a198-14109fe4729f").unwrap();
        assert_eq!(
            encoded(|e| e.encode_uuid(&u)),
            [24, 12, 55, 58, 180, 196, 252, 5, 17, 228, 161, 152, 20, 16, 159, 228, 114, 159]
        );
    }

    #[test]
    fn symbols_are_reused() {
        let bytes = encoded(|e| {
            e.encode_symbol("foo")?;
            e.encode_symbol("bar")?;
            e.encode_symbol("foo")?;
            e.encode_symbol("bar")
        });
        assert_eq!(bytes, [24, 11, 0, 3, 102, 111, 111, 11, 1, 3, 98, 97, 114, 11, 0, 11, 1]);
    }

    #[test]
    fn generic_containers() {
        assert_eq!(encoded(|e| e.encode_value(&Value::Array(vec![]))), [24, 13, 0]);
        assert_eq!(
            encoded(|e| e.encode_value(&Value::array([Value::Int32(23)]))),
            [24, 13, 1, 4, 46]
        );
        assert_eq!(
            encoded(|e| e.encode_value(&Value::map([("foo", Value::Int32(23))]))),
            [24, 14, 1, 35, 102, 111, 111, 4, 46]
        );
        assert_eq!(
            encoded(|e| e.encode_value(&Value::structure([("foo", Value::Int32(23))]))),
            [24, 15, 1, 0, 3, 102, 111, 111, 4, 46]
        );
        let sym = Value::Symbol(Symbol::from("foo"));
        assert_eq!(encoded(|e| e.encode_value(&sym)), [24, 11, 0, 3, 102, 111, 111]);
    }

    #[test]
    fn definitions_are_written_once() {
        let point = Signature::structure(vec![
            FieldSignature::new("x", Signature::Int32),
            FieldSignature::new("y", Signature::Int32),
        ]);
        let bytes = encoded(|e| {
            e.write_type(&point)?;
            e.write_int32(23)?;
            e.write_int32(57)?;
            e.write_type(&point)?;
            e.write_int32(1)?;
            e.write_int32(2)
        });
        assert_eq!(
            bytes,
            [0x18, 0x40, 0x13, 0x02, 0x01, 0x78, 0x04, 0x01, 0x79, 0x04, 0x40, 0x2e, 0x72, 0x40, 0x02, 0x04]
        );
    }

    #[test]
    fn optional_field_shapes_defined_first() {
        let sig = Signature::structure(vec![
            FieldSignature::new("a", Signature::Int32),
            FieldSignature::optional_of("n", Signature::array(Signature::String)),
        ]);
        let mut session = Session::new();
        let bytes = {
            let mut enc = Encoder::new(&mut session);
            enc.write_type(&sig).unwrap();
            enc.take_bytes()
        };
        assert_eq!(
            bytes,
            [0x18, 0x40, 0x11, 0x09, 0x41, 0x13, 0x02, 0x01, 0x61, 0x04, 0x01, 0x6e, 0x10, 0x41]
        );
        assert_eq!(session.shape_depth(0x40), 1);
        assert_eq!(session.shape_depth(0x41), 1);
    }

    #[test]
    fn typed_map_and_array() {
        let msi = Signature::map(Signature::String, Signature::Int32);
        let bytes = encoded(|e| {
            e.write_type(&msi)?;
            e.write_size(1)?;
            e.write_string("foo")?;
            e.write_int32(23)
        });
        assert_eq!(bytes, [24, 64, 18, 9, 4, 64, 1, 3, 102, 111, 111, 46]);

        let ai = Signature::array(Signature::Int32);
        let bytes = encoded(|e| {
            e.write_type(&ai)?;
            e.write_size(5)?;
            (1..=5).try_for_each(|n| e.write_int32(n))
        });
        assert_eq!(bytes, [24, 64, 17, 4, 64, 5, 2, 4, 6, 8, 10]);
    }

    #[test]
    fn errors_latch() {
        let mut session = Session::new();
        let mut enc = Encoder::new(&mut session);
        let err = enc.fail(EncodeError::custom("first"));
        assert_eq!(err.to_string(), "first");
        enc.fail(EncodeError::custom("second"));
        assert_eq!(enc.error().unwrap().to_string(), "first");
        assert!(enc.encode_null().is_err());
        assert_eq!(enc.bytes(), [24]);
    }

    #[test]
    fn continued_stream_skips_header() {
        let mut session = Session::new();
        let first = {
            let mut enc = Encoder::new(&mut session);
            enc.encode_symbol("foo").unwrap();
            enc.take_bytes()
        };
        let mut enc = Encoder::new(&mut session);
        enc.encode_symbol("foo").unwrap();
        assert_eq!(first, [24, 11, 0, 3, 102, 111, 111]);
        assert_eq!(enc.bytes(), [11, 0]);
    }

    #[test]
    fn counting_target() {
        let mut session = Session::new();
        let mut enc = Encoder::with_target(&mut session, std::io::sink());
        enc.encode_string("foo").unwrap();
        assert_eq!(enc.written(), 5);
    }
}
