//! Wire tags
//!
//! Every tagged value in a TBin stream starts with an unsigned varint tag.
//! Tags below [`FIRST_USER`] are fixed; tags from `FIRST_USER` up are bound
//! to shapes as the stream defines them.

pub const NULL: u32 = 0x00;
pub const BOOL: u32 = 0x01;
pub const INT8: u32 = 0x02;
pub const INT16: u32 = 0x03;
pub const INT32: u32 = 0x04;
pub const INT64: u32 = 0x05;
pub const FLOAT32: u32 = 0x06;
pub const FLOAT64: u32 = 0x07;
pub const BYTES: u32 = 0x08;
pub const STRING: u32 = 0x09;
/// Float64 seconds since the Unix epoch
pub const TIMESTAMP: u32 = 0x0a;
/// Varint id, followed by the name on first occurrence
pub const SYMBOL: u32 = 0x0b;
/// 16 raw bytes
pub const UUID: u32 = 0x0c;
pub const ARRAY: u32 = 0x0d;
pub const MAP: u32 = 0x0e;
pub const STRUCT: u32 = 0x0f;
/// Type of a position whose values carry their own tags
pub const ANY: u32 = 0x10;
pub const DEF_ARRAY: u32 = 0x11;
pub const DEF_MAP: u32 = 0x12;
pub const DEF_STRUCT: u32 = 0x13;
pub const DEF_UNION: u32 = 0x14;
pub const DEF_ENUM: u32 = 0x15;
pub const UNION: u32 = 0x16;
pub const ENUM: u32 = 0x17;

pub const CURRENT_VERSION: u32 = 1;
/// `0001 1xxx`, where `xxx` is the version minus one
pub const VERSION: u32 = 0x18;
pub const VERSION_MASK: u32 = 0xf8;
pub const VERSION_DATA_MASK: u32 = 0x07;
pub const CURRENT_VERSION_TAG: u32 = VERSION + (CURRENT_VERSION - 1);

/// `001x xxxx`, followed by up to 31 bytes of UTF-8
pub const TINY_STR: u32 = 0x20;
pub const TINY_STR_MASK: u32 = 0xe0;
pub const TINY_STR_DATA_MASK: u32 = 0x1f;
pub const TINY_STR_MAX_LEN: usize = TINY_STR_DATA_MASK as usize;

pub const FIRST_USER: u32 = 0x40;

#[inline]
#[must_use]
pub const fn is_tiny_str(tag: u32) -> bool {
    tag & TINY_STR_MASK == TINY_STR
}

/// Human-readable name of a fixed tag, or its hex form.
pub fn tag_name(tag: u32) -> String {
    if is_tiny_str(tag) {
        return String::from("String");
    }
    let name = match tag {
        NULL => "Null",
        BOOL => "Bool",
        INT8 => "Int8",
        INT16 => "Int16",
        INT32 => "Int32",
        INT64 => "Int64",
        FLOAT32 => "Float32",
        FLOAT64 => "Float64",
        BYTES => "Bytes",
        STRING => "String",
        TIMESTAMP => "Timestamp",
        SYMBOL => "Symbol",
        UUID => "UUID",
        ARRAY => "Array",
        MAP => "Map",
        STRUCT => "Struct",
        ANY => "Any",
        UNION => "Union",
        ENUM => "Enum",
        _ => return format!("{tag:#04x}"),
    };
    String::from(name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(tag_name(UUID), "UUID");
        assert_eq!(tag_name(0x23), "String");
        assert_eq!(tag_name(0x41), "0x41");
        assert_eq!(CURRENT_VERSION_TAG, 0x18);
    }
}
