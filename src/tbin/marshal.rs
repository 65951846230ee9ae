//! Traits for types with a static TBin layout
//!
//! A type implementing [`Marshal`] knows its [`Signature`] up front and can
//! write its values untagged within that layout; [`Unmarshal`] is the
//! reading-side counterpart, driven by the signature the *stream* declares,
//! which need not coincide with the reader's own.
//!
//! Both traits are implemented here for the primitive types, for the value
//! types of [`crate::value`], and for the standard containers. Structs and
//! enums derive them through `#[derive(Marshal, Unmarshal)]`.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use indexmap::IndexMap;

use super::decoder::{Decoder, PREALLOC_LIMIT};
use super::encoder::Encoder;
use super::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use super::parse::Parser;
use super::signature::Signature;
use super::target::Target;
use crate::value::{Bytes, Symbol, Timestamp, Uuid, Value};

pub trait Marshal {
    /// Layout of every value of this type.
    fn signature() -> Signature;

    /// Writes `self` untagged, laid out according to [`signature`](Marshal::signature).
    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()>;

    /// Writes `self` preceded by its tag.
    fn marshal<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_type(&Self::signature())?;
        self.marshal_value(enc)
    }
}

pub trait Unmarshal: Sized {
    /// Reads a value the stream lays out according to `sig`.
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self>;

    /// The value a `Null` in the stream stands for, if there is one.
    fn unmarshal_null() -> Option<Self> {
        None
    }

    /// Reads a tagged value.
    fn unmarshal<P: Parser>(dec: &mut Decoder<'_, P>) -> DecodeResult<Self> {
        let sig = dec.read_type()?;
        Self::unmarshal_value(dec, &sig)
    }
}

macro_rules! integer_impls {
    ($($t:ty => $sig:ident, $write:ident;)*) => {
        $(
            impl Marshal for $t {
                fn signature() -> Signature {
                    Signature::$sig
                }

                fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
                    enc.$write(*self)
                }
            }

            impl Unmarshal for $t {
                fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
                    if let Some(v) = dec.read_indirect(sig, stringify!($sig))? {
                        return Ok(v);
                    }
                    let n = dec.read_integer(sig, stringify!($sig))?;
                    <$t>::try_from(n).map_err(|_| {
                        dec.fail(DecodeError::Overflow {
                            target: stringify!($sig),
                            value: n,
                        })
                    })
                }
            }
        )*
    };
}

integer_impls! {
    i8 => Int8, write_int8;
    i16 => Int16, write_int16;
    i32 => Int32, write_int32;
    i64 => Int64, write_int64;
}

impl Marshal for bool {
    fn signature() -> Signature {
        Signature::Bool
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_bool(*self)
    }
}

impl Unmarshal for bool {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(v) = dec.read_indirect(sig, "Bool")? {
            return Ok(v);
        }
        match sig {
            Signature::Bool => dec.read_bool(),
            _ => Err(dec.mismatch("Bool", sig)),
        }
    }
}

impl Marshal for f32 {
    fn signature() -> Signature {
        Signature::Float32
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_float32(*self)
    }
}

impl Unmarshal for f32 {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(v) = dec.read_indirect(sig, "Float32")? {
            return Ok(v);
        }
        match sig {
            Signature::Float32 => dec.read_float32(),
            _ => Err(dec.mismatch("Float32", sig)),
        }
    }
}

impl Marshal for f64 {
    fn signature() -> Signature {
        Signature::Float64
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_float64(*self)
    }
}

impl Unmarshal for f64 {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(v) = dec.read_indirect(sig, "Float64")? {
            return Ok(v);
        }
        match sig {
            Signature::Float32 => dec.read_float32().map(f64::from),
            Signature::Float64 => dec.read_float64(),
            _ => Err(dec.mismatch("Float64", sig)),
        }
    }
}

impl Marshal for str {
    fn signature() -> Signature {
        Signature::String
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_string(self)
    }

    fn marshal<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.encode_string(self)
    }
}

impl Marshal for String {
    fn signature() -> Signature {
        Signature::String
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_string(self)
    }

    fn marshal<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.encode_string(self)
    }
}

impl Unmarshal for String {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(v) = dec.read_indirect(sig, "String")? {
            return Ok(v);
        }
        dec.read_text(sig, "String")
    }
}

impl Marshal for Symbol {
    fn signature() -> Signature {
        Signature::Symbol
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_symbol(self.as_str())
    }
}

impl Unmarshal for Symbol {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(v) = dec.read_indirect(sig, "Symbol")? {
            return Ok(v);
        }
        dec.read_text(sig, "Symbol").map(Symbol::from)
    }
}

impl Marshal for Bytes {
    fn signature() -> Signature {
        Signature::Bytes
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_bytes(self.as_slice())
    }
}

impl Unmarshal for Bytes {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(v) = dec.read_indirect(sig, "Bytes")? {
            return Ok(v);
        }
        match sig {
            Signature::Bytes => dec.read_bytes().map(Bytes),
            _ => Err(dec.mismatch("Bytes", sig)),
        }
    }
}

impl Marshal for Timestamp {
    fn signature() -> Signature {
        Signature::Timestamp
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_timestamp(self)
    }
}

impl Unmarshal for Timestamp {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(v) = dec.read_indirect(sig, "Timestamp")? {
            return Ok(v);
        }
        match sig {
            Signature::Timestamp => dec.read_timestamp(),
            _ => Err(dec.mismatch("Timestamp", sig)),
        }
    }
}

impl Marshal for Uuid {
    fn signature() -> Signature {
        Signature::Uuid
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.write_uuid(self)
    }
}

impl Unmarshal for Uuid {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(v) = dec.read_indirect(sig, "UUID")? {
            return Ok(v);
        }
        match sig {
            Signature::Uuid => dec.read_uuid(),
            _ => Err(dec.mismatch("UUID", sig)),
        }
    }
}

impl Marshal for Value {
    fn signature() -> Signature {
        Signature::Any
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.encode_value(self)
    }

    fn marshal<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        enc.encode_value(self)
    }
}

impl Unmarshal for Value {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        dec.read_value(sig)
    }

    fn unmarshal_null() -> Option<Self> {
        Some(Value::Null)
    }
}

/// Items of type `Any` carry their own tags; all others are written bare.
fn marshal_item<T: Marshal + ?Sized, U: Target>(item: &T, tagged: bool, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
    if tagged {
        item.marshal(enc)
    } else {
        item.marshal_value(enc)
    }
}

impl<T: Marshal> Marshal for [T] {
    fn signature() -> Signature {
        match T::signature() {
            Signature::Any => Signature::Array(None),
            items => Signature::array(items),
        }
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        let tagged = T::signature() == Signature::Any;
        enc.write_size(self.len())?;
        self.iter().try_for_each(|item| marshal_item(item, tagged, enc))
    }
}

impl<T: Marshal> Marshal for Vec<T> {
    fn signature() -> Signature {
        <[T]>::signature()
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        self.as_slice().marshal_value(enc)
    }
}

impl<T: Unmarshal> Unmarshal for Vec<T> {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        if let Some(v) = dec.read_indirect(sig, "Array")? {
            return Ok(v);
        }
        match sig {
            Signature::Array(items) => {
                let n = dec.read_size()?;
                let mut out = Vec::with_capacity(n.min(PREALLOC_LIMIT));
                for _ in 0..n {
                    out.push(match items {
                        Some(items) => T::unmarshal_value(dec, items)?,
                        None => T::unmarshal(dec)?,
                    });
                }
                Ok(out)
            }
            _ => Err(dec.mismatch("Array", sig)),
        }
    }
}

impl<T: Marshal> Marshal for Option<T> {
    fn signature() -> Signature {
        T::signature()
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        match self {
            Some(v) => v.marshal_value(enc),
            None => Err(enc.fail(EncodeError::Unsupported(format!(
                "null in a position of type {}",
                T::signature()
            )))),
        }
    }

    fn marshal<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        match self {
            Some(v) => v.marshal(enc),
            None => enc.encode_null(),
        }
    }
}

impl<T: Unmarshal> Unmarshal for Option<T> {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        match sig {
            Signature::Null => Ok(None),
            _ => T::unmarshal_value(dec, sig).map(Some),
        }
    }

    fn unmarshal_null() -> Option<Self> {
        Some(None)
    }
}

impl<T: Marshal + ?Sized> Marshal for Box<T> {
    fn signature() -> Signature {
        T::signature()
    }

    fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        self.as_ref().marshal_value(enc)
    }

    fn marshal<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
        self.as_ref().marshal(enc)
    }
}

impl<T: Unmarshal> Unmarshal for Box<T> {
    fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
        T::unmarshal_value(dec, sig).map(Box::new)
    }

    fn unmarshal_null() -> Option<Self> {
        T::unmarshal_null().map(Box::new)
    }
}

/// Types usable as map keys: string-like values
pub trait MapKey: Marshal + Unmarshal + From<String> + AsRef<str> {}

impl MapKey for String {}

impl MapKey for Symbol {}

fn map_signature<K: MapKey, V: Marshal>() -> Signature {
    match V::signature() {
        Signature::Any => Signature::Map(None),
        items => Signature::map(K::signature(), items),
    }
}

fn marshal_entries<'a, K, V, U, I>(len: usize, entries: I, enc: &mut Encoder<'_, U>) -> EncodeResult<()>
where
    K: MapKey + 'a,
    V: Marshal + 'a,
    U: Target,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    let tagged = V::signature() == Signature::Any;
    enc.write_size(len)?;
    for (k, v) in entries {
        marshal_item(k, tagged, enc)?;
        marshal_item(v, tagged, enc)?;
    }
    Ok(())
}

fn unmarshal_entries<P, K, V, F>(dec: &mut Decoder<'_, P>, sig: &Signature, mut insert: F) -> DecodeResult<()>
where
    P: Parser,
    K: MapKey,
    V: Unmarshal,
    F: FnMut(K, V),
{
    dec.read_fields(sig, "Map", |dec, name, ty| {
        // Null entries are dropped unless `V` has a value for them.
        if let Some(v) = dec.read_field::<V>(ty)?.or_else(V::unmarshal_null) {
            insert(K::from(name.to_owned()), v);
        }
        Ok(true)
    })
}

macro_rules! map_impls {
    ($($map:ident < K $(: $kbound:ident $(+ $kbounds:ident)*)? >;)*) => {
        $(
            impl<K, V> Marshal for $map<K, V>
            where
                K: MapKey $(+ $kbound $(+ $kbounds)*)?,
                V: Marshal,
            {
                fn signature() -> Signature {
                    map_signature::<K, V>()
                }

                fn marshal_value<U: Target>(&self, enc: &mut Encoder<'_, U>) -> EncodeResult<()> {
                    marshal_entries(self.len(), self.iter(), enc)
                }
            }

            impl<K, V> Unmarshal for $map<K, V>
            where
                K: MapKey $(+ $kbound $(+ $kbounds)*)?,
                V: Unmarshal,
            {
                fn unmarshal_value<P: Parser>(dec: &mut Decoder<'_, P>, sig: &Signature) -> DecodeResult<Self> {
                    if let Some(v) = dec.read_indirect(sig, "Map")? {
                        return Ok(v);
                    }
                    let mut out = $map::new();
                    unmarshal_entries(dec, sig, |k: K, v: V| {
                        out.insert(k, v);
                    })?;
                    Ok(out)
                }
            }
        )*
    };
}

map_impls! {
    IndexMap<K: Hash + Eq>;
    HashMap<K: Hash + Eq>;
    BTreeMap<K: Ord>;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tbin::parse::SliceParser;
    use crate::tbin::session::Session;

    fn marshal<T: Marshal + ?Sized>(v: &T) -> Vec<u8> {
        let mut session = Session::new();
        let mut enc = Encoder::new(&mut session);
        enc.encode(v).unwrap();
        enc.take_bytes()
    }

    fn unmarshal<T: Unmarshal>(bytes: &[u8]) -> DecodeResult<T> {
        let mut session = Session::new();
        let mut dec = Decoder::new(&mut session, SliceParser::new(bytes))?;
        let v = dec.decode()?;
        dec.finish()?;
        Ok(v)
    }

    #[test]
    fn string_array() {
        let v = vec![String::from("one"), String::from("two"), String::from("three")];
        let bytes = marshal(&v);
        assert_eq!(
            bytes,
            [24, 64, 17, 9, 64, 3, 3, 111, 110, 101, 3, 116, 119, 111, 5, 116, 104, 114, 101, 101]
        );
        assert_eq!(unmarshal::<Vec<String>>(&bytes).unwrap(), v);
        assert_eq!(
            unmarshal::<Value>(&bytes).unwrap(),
            Value::array(["one", "two", "three"].map(Value::from))
        );
    }

    #[test]
    fn maps() {
        let mut msi = IndexMap::new();
        msi.insert(String::from("foo"), 23i32);
        let bytes = marshal(&msi);
        assert_eq!(bytes, [24, 64, 18, 9, 4, 64, 1, 3, 102, 111, 111, 46]);
        let back: BTreeMap<String, i64> = unmarshal(&bytes).unwrap();
        assert_eq!(back.get("foo"), Some(&23));

        let mut msa: HashMap<String, Value> = HashMap::new();
        msa.insert(String::from("foo"), Value::Int32(23));
        let bytes = marshal(&msa);
        assert_eq!(bytes, [24, 14, 1, 35, 102, 111, 111, 4, 46]);
        assert_eq!(unmarshal::<HashMap<String, Value>>(&bytes).unwrap(), msa);
        let syms: IndexMap<Symbol, i32> = unmarshal(&bytes).unwrap();
        assert_eq!(syms.get("foo"), Some(&23));
    }

    #[test]
    fn struct_decodes_as_map() {
        let bytes = [0x18, 0x40, 0x13, 0x02, 0x01, 0x78, 0x04, 0x01, 0x79, 0x04, 0x40, 0x2e, 0x72];
        let m: IndexMap<String, i32> = unmarshal(&bytes).unwrap();
        assert_eq!(m.get("x"), Some(&23));
        assert_eq!(m.get("y"), Some(&57));
    }

    #[test]
    fn options() {
        assert_eq!(marshal(&None::<i32>), [24, 0]);
        assert_eq!(marshal(&Some(23i32)), [24, 4, 46]);
        assert_eq!(unmarshal::<Option<i32>>(&[24, 0]).unwrap(), None);
        assert_eq!(unmarshal::<Option<i32>>(&[24, 4, 46]).unwrap(), Some(23));
        assert!(matches!(
            unmarshal::<i32>(&[24, 0]),
            Err(DecodeError::TypeMismatch { .. })
        ));

        let mut session = Session::new();
        let mut enc = Encoder::new(&mut session);
        let err = vec![Some(1i32), None].marshal(&mut enc).unwrap_err();
        assert!(matches!(err, EncodeError::Unsupported(_)));
    }

    #[test]
    fn integer_widths() {
        let bytes = marshal(&300i32);
        assert_eq!(unmarshal::<i64>(&bytes).unwrap(), 300);
        assert_eq!(unmarshal::<i16>(&bytes).unwrap(), 300);
        assert!(matches!(
            unmarshal::<i8>(&bytes),
            Err(DecodeError::Overflow { target: "Int8", value: 300 })
        ));
        assert!(matches!(
            unmarshal::<i32>(&marshal("x")),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn text_from_symbols() {
        let bytes = marshal(&Symbol::from("abc"));
        assert_eq!(bytes, [24, 11, 0, 3, 97, 98, 99]);
        assert_eq!(unmarshal::<String>(&bytes).unwrap(), "abc");
        assert_eq!(unmarshal::<Symbol>(&marshal("abc")).unwrap(), Symbol::from("abc"));
    }

    #[test]
    fn values_pass_through() {
        let v = Value::structure([
            ("a", Value::Int64(-1)),
            ("b", Value::array([Value::Bool(true), Value::Null])),
        ]);
        let bytes = marshal(&v);
        assert_eq!(unmarshal::<Value>(&bytes).unwrap(), v);
        assert_eq!(unmarshal::<Vec<Value>>(&marshal(&vec![Value::Null])).unwrap(), [Value::Null]);
    }

    #[test]
    fn boxed_and_bytes() {
        let b = Box::new(Bytes(vec![1, 2, 3]));
        let bytes = marshal(&b);
        assert_eq!(bytes, [24, 8, 3, 1, 2, 3]);
        assert_eq!(unmarshal::<Box<Bytes>>(&bytes).unwrap(), b);
        let f: f64 = unmarshal(&marshal(&1.5f32)).unwrap();
        assert_eq!(f, 1.5);
    }
}
