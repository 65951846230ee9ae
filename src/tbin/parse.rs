//! Byte sources for the decoder
//!
//! # Parser
//!
//! A [`Parser`] is a stateful, non-backtracking view over a sequence of
//! bytes: a byte can only be viewed by consuming it, and only after every
//! byte before it has been consumed. Two implementations are provided:
//!   * [`SliceParser`], over a borrowed byte-slice
//!   * [`ReadParser`], over any [`std::io::Read`]
//!
//! The fixed-width `take_X` methods are big-endian, which is the byte order
//! TBin uses for floating-point values.

use std::io::{self, Read};

use super::error::{DecodeError, DecodeResult};

/// Stateful, zero-lookahead source of bytes.
///
/// The following properties should be respected by each implementation:
///
/// * A fresh parser has `offset() == 0`.
/// * `offset()` increases by exactly `n` after a successful `consume(n)`.
/// * A call that fails because the input ran out reports
///   [`DecodeError::Truncated`]; one that fails for any other I/O reason
///   reports [`DecodeError::Io`].
pub trait Parser {
    /// Number of bytes consumed so far.
    fn offset(&self) -> usize;

    /// Consumes and returns a single byte.
    fn consume_byte(&mut self) -> DecodeResult<u8>;

    /// Consumes and returns exactly `nbytes` bytes.
    ///
    /// # Invariants
    ///
    /// This method **MUST** return `Ok(s)` when and only when `nbytes` bytes
    /// were available, in which case `s.len() == nbytes`.
    fn consume(&mut self, nbytes: usize) -> DecodeResult<&[u8]>;

    /// Tests whether the input is exhausted, without consuming anything.
    fn at_end(&mut self) -> DecodeResult<bool>;

    /// Consumes `N` bytes and returns them in array-form
    fn consume_arr<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.consume(N)?);
        Ok(arr)
    }

    /// Consumes four bytes and returns the corresponding big-endian `f32`
    #[inline]
    fn take_f32(&mut self) -> DecodeResult<f32> {
        self.consume_arr::<4>().map(f32::from_be_bytes)
    }

    /// Consumes eight bytes and returns the corresponding big-endian `f64`
    #[inline]
    fn take_f64(&mut self) -> DecodeResult<f64> {
        self.consume_arr::<8>().map(f64::from_be_bytes)
    }
}

/// Parser over a borrowed byte-slice
#[derive(Clone, Debug)]
pub struct SliceParser<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> SliceParser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remainder(&self) -> &'a [u8] {
        &self.buf[self.offset..]
    }
}

impl<'a> Parser for SliceParser<'a> {
    #[inline]
    fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    fn consume_byte(&mut self) -> DecodeResult<u8> {
        match self.buf.get(self.offset) {
            Some(&b) => {
                self.offset += 1;
                Ok(b)
            }
            None => Err(DecodeError::Truncated {
                offset: self.offset,
                requested: 1,
            }),
        }
    }

    fn consume(&mut self, nbytes: usize) -> DecodeResult<&[u8]> {
        let start = self.offset;
        match start.checked_add(nbytes) {
            Some(end) if end <= self.buf.len() => {
                self.offset = end;
                Ok(&self.buf[start..end])
            }
            _ => Err(DecodeError::Truncated {
                offset: start,
                requested: nbytes,
            }),
        }
    }

    #[inline]
    fn at_end(&mut self) -> DecodeResult<bool> {
        Ok(self.offset >= self.buf.len())
    }
}

/// Largest single read issued by [`ReadParser::consume`].
const READ_CHUNK: usize = 8 * 1024;

/// Parser over an arbitrary reader
///
/// Reads are unbuffered beyond what each `consume` call requires; wrap the
/// reader in a [`std::io::BufReader`] when it is backed by a file or socket.
#[derive(Debug)]
pub struct ReadParser<R> {
    inner: R,
    scratch: Vec<u8>,
    peeked: Option<u8>,
    offset: usize,
}

impl<R: Read> ReadParser<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            scratch: Vec::new(),
            peeked: None,
            offset: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn truncated(&self, requested: usize) -> DecodeError {
        DecodeError::Truncated {
            offset: self.offset,
            requested,
        }
    }
}

impl<R: Read> Parser for ReadParser<R> {
    #[inline]
    fn offset(&self) -> usize {
        self.offset
    }

    fn consume_byte(&mut self) -> DecodeResult<u8> {
        if let Some(b) = self.peeked.take() {
            self.offset += 1;
            return Ok(b);
        }
        let mut b = [0u8; 1];
        match self.inner.read_exact(&mut b) {
            Ok(()) => {
                self.offset += 1;
                Ok(b[0])
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(self.truncated(1)),
            Err(e) => Err(e.into()),
        }
    }

    fn consume(&mut self, nbytes: usize) -> DecodeResult<&[u8]> {
        self.scratch.clear();
        if nbytes == 0 {
            return Ok(&self.scratch);
        }
        if let Some(b) = self.peeked.take() {
            self.scratch.push(b);
        }
        // Lengths come from the stream, so the buffer only grows as bytes arrive.
        while self.scratch.len() < nbytes {
            let start = self.scratch.len();
            let step = (nbytes - start).min(READ_CHUNK);
            self.scratch.resize(start + step, 0);
            match self.inner.read_exact(&mut self.scratch[start..]) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.scratch.clear();
                    return Err(self.truncated(nbytes));
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.offset += nbytes;
        Ok(&self.scratch)
    }

    fn at_end(&mut self) -> DecodeResult<bool> {
        if self.peeked.is_some() {
            return Ok(false);
        }
        let mut b = [0u8; 1];
        loop {
            match self.inner.read(&mut b) {
                Ok(0) => return Ok(true),
                Ok(_) => {
                    self.peeked = Some(b[0]);
                    return Ok(false);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
