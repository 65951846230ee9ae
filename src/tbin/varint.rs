//! Base-128 varints and zigzag mapping
//!
//! Unsigned varints are little-endian groups of seven bits, the high bit of
//! each byte flagging a continuation. Signed integers are zigzag-mapped
//! first, so that values of small magnitude stay short regardless of sign.

use super::error::{DecodeError, DecodeResult};
use super::parse::Parser;
use super::target::Target;

#[inline]
#[must_use]
pub const fn zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
#[must_use]
pub const fn unzigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

#[inline]
#[must_use]
pub const fn zigzag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
#[must_use]
pub const fn unzigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Appends `n` as an unsigned varint, returning the number of bytes written.
pub fn write_uvarint<U: Target>(buf: &mut U, mut n: u64) -> usize {
    let mut written = 0;
    while n >= 0x80 {
        written += buf.push_one((n as u8) | 0x80);
        n >>= 7;
    }
    written + buf.push_one(n as u8)
}

/// Number of bytes `n` occupies as an unsigned varint.
#[cfg(test)]
const fn uvarint_len(n: u64) -> usize {
    let mut len = 1;
    let mut n = n >> 7;
    while n != 0 {
        len += 1;
        n >>= 7;
    }
    len
}

fn read_uvarint<P: Parser>(p: &mut P, max_bits: u32) -> DecodeResult<u64> {
    let start = p.offset();
    let mut n = 0u64;
    let mut shift = 0u32;
    while shift < max_bits {
        let b = p.consume_byte()?;
        n |= u64::from(b & 0x7f) << shift;
        if b & 0x80 == 0 {
            return Ok(n);
        }
        shift += 7;
    }
    Err(DecodeError::BadVarint { offset: start })
}

/// Reads an unsigned varint of at most five bytes.
pub fn read_uvarint32<P: Parser>(p: &mut P) -> DecodeResult<u32> {
    let start = p.offset();
    let n = read_uvarint(p, 32)?;
    u32::try_from(n).map_err(|_| DecodeError::BadVarint { offset: start })
}

/// Reads an unsigned varint of at most ten bytes.
pub fn read_uvarint64<P: Parser>(p: &mut P) -> DecodeResult<u64> {
    read_uvarint(p, 64)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tbin::parse::SliceParser;
    use proptest::prelude::*;

    #[test]
    fn zigzag_mapping() {
        assert_eq!(zigzag32(0), 0);
        assert_eq!(zigzag32(-1), 1);
        assert_eq!(zigzag32(23), 46);
        assert_eq!(zigzag32(-23), 45);
        assert_eq!(zigzag32(i32::MAX), 0xffff_fffe);
        assert_eq!(zigzag32(i32::MIN), 0xffff_ffff);
        assert_eq!(zigzag64(i64::MIN), u64::MAX);
    }

    #[test]
    fn varint_bytes() {
        let mut buf = Vec::new();
        assert_eq!(write_uvarint(&mut buf, u64::from(zigzag32(i32::MAX))), 5);
        assert_eq!(buf, [254, 255, 255, 255, 15]);
        buf.clear();
        write_uvarint(&mut buf, zigzag64(i64::MIN));
        assert_eq!(buf, [255, 255, 255, 255, 255, 255, 255, 255, 255, 1]);
        assert_eq!(uvarint_len(zigzag64(i64::MIN)), 10);
    }

    #[test]
    fn overlong_varint() {
        let mut p = SliceParser::new(&[0xff, 0xff, 0xff, 0xff, 0xff, 0x01]);
        assert!(matches!(read_uvarint32(&mut p), Err(DecodeError::BadVarint { offset: 0 })));
        let mut p = SliceParser::new(&[0xff, 0xff, 0xff, 0xff, 0x1f]);
        assert!(matches!(read_uvarint32(&mut p), Err(DecodeError::BadVarint { .. })));
        let mut p = SliceParser::new(&[0x80]);
        assert!(matches!(read_uvarint32(&mut p), Err(DecodeError::Truncated { .. })));
    }

    proptest! {
        #[test]
        fn zigzag32_roundtrip(n in any::<i32>()) {
            let mut buf = Vec::new();
            let len = write_uvarint(&mut buf, u64::from(zigzag32(n)));
            prop_assert_eq!(len, buf.len());
            let mut p = SliceParser::new(&buf);
            prop_assert_eq!(unzigzag32(read_uvarint32(&mut p).unwrap()), n);
        }

        #[test]
        fn zigzag64_roundtrip(n in any::<i64>()) {
            let mut buf = Vec::new();
            write_uvarint(&mut buf, zigzag64(n));
            prop_assert_eq!(uvarint_len(zigzag64(n)), buf.len());
            let mut p = SliceParser::new(&buf);
            prop_assert_eq!(unzigzag64(read_uvarint64(&mut p).unwrap()), n);
        }
    }
}
