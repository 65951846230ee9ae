/// Byte-oriented sink that an [`Encoder`](super::Encoder) appends to
///
/// It is convenient to think of `Target` as an analogue of
/// [`std::io::Write`] whose `push_XXX` methods are infallible and total;
/// the returned `usize` is the number of bytes appended, used only for
/// book-keeping on the caller side.
///
/// All implementors of `Target` must define these methods as infallible and total.
pub trait Target {
    /// Amortizes the cost of appending `extra` more bytes over the push
    /// operations that follow.
    ///
    /// For buffers with a notion of capacity, such as `Vec<u8>`, this reserves
    /// space; for others it is a no-op.
    fn anticipate(&mut self, extra: usize);

    /// Returns a fresh object of the `Self` type with an initially empty buffer.
    fn create() -> Self;

    /// Appends a single byte; the return value must be `1`.
    fn push_one(&mut self, b: u8) -> usize;

    /// Appends the bytes of a known-length array; the return value must be `N`.
    ///
    /// ```ignore
    /// x.push_many(*b"tbin") === x.push_one(b't') + x.push_one(b'b') + x.push_one(b'i') + x.push_one(b'n')
    /// ```
    fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize;

    /// Appends the bytes of an arbitrary slice; the return value must be the
    /// length of the slice.
    fn push_all(&mut self, buf: &[u8]) -> usize;
}

/// Alias for `std::io::Sink`, used to count the bytes an encoding would
/// take without storing them.
pub type ByteCounter = std::io::Sink;

impl Target for ByteCounter {
    #[inline(always)]
    fn anticipate(&mut self, _: usize) {}

    #[inline]
    fn create() -> Self {
        std::io::sink()
    }

    #[inline(always)]
    fn push_one(&mut self, _: u8) -> usize {
        1
    }

    #[inline(always)]
    fn push_many<const N: usize>(&mut self, _: [u8; N]) -> usize {
        N
    }

    #[inline(always)]
    fn push_all(&mut self, buf: &[u8]) -> usize {
        buf.len()
    }
}

impl Target for Vec<u8> {
    #[inline]
    fn anticipate(&mut self, extra: usize) {
        self.reserve(extra)
    }

    #[inline]
    fn create() -> Self {
        Self::new()
    }

    #[inline]
    fn push_one(&mut self, b: u8) -> usize {
        self.push(b);
        1
    }

    #[inline]
    fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize {
        self.extend(&arr);
        N
    }

    #[inline]
    fn push_all(&mut self, buf: &[u8]) -> usize {
        self.extend_from_slice(buf);
        buf.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counter_agrees_with_vec() {
        let mut v = Vec::create();
        let mut c = ByteCounter::create();
        let n = v.push_one(0x18) + v.push_many(*b"tbin") + v.push_all(&[1, 2, 3]);
        let m = c.push_one(0x18) + c.push_many(*b"tbin") + c.push_all(&[1, 2, 3]);
        assert_eq!(n, v.len());
        assert_eq!(n, m);
    }
}
