use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use super::signature::Signature;
use super::tag;

/// Per-stream codec state
///
/// A session remembers which symbols and shapes a stream has introduced so
/// far, and whether its header has been written (or read). Symbol ids and
/// user tags are positions in insertion order: the `n`-th symbol has id `n`,
/// the `n`-th shape is bound to tag `0x40 + n`.
///
/// A session belongs to exactly one stream and one direction; successive
/// encoders (or decoders) over the same session continue the same stream.
#[derive(Default, Debug)]
pub struct Session {
    started: bool,
    symbols: IndexSet<String>,
    shapes: IndexMap<String, Shape>,
}

#[derive(Debug)]
struct Shape {
    sig: Arc<Signature>,
    depth: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the stream header has already been written or read.
    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn start(&mut self) {
        self.started = true;
    }

    #[inline]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn symbol(&self, id: u32) -> Option<&str> {
        self.symbols.get_index(id as usize).map(String::as_str)
    }

    pub fn symbol_id(&self, name: &str) -> Option<u32> {
        self.symbols.get_index_of(name).map(|ix| ix as u32)
    }

    /// Interns `name`, returning its id and whether it is new to the stream.
    pub(crate) fn intern_symbol(&mut self, name: &str) -> (u32, bool) {
        if let Some(id) = self.symbol_id(name) {
            return (id, false);
        }
        let (ix, _) = self.symbols.insert_full(name.to_owned());
        trace!(symbol = name, id = ix, "interned symbol");
        (ix as u32, true)
    }

    /// Shape bound to a user tag.
    pub fn shape(&self, tag: u32) -> Option<&Arc<Signature>> {
        let ix = tag.checked_sub(tag::FIRST_USER)?;
        self.shapes.get_index(ix as usize).map(|(_, shape)| &shape.sig)
    }

    /// Nesting depth of the shape bound to a tag: one more than the deepest
    /// shape it is built from, where fixed shapes count as zero.
    pub fn shape_depth(&self, tag: u32) -> usize {
        tag.checked_sub(tag::FIRST_USER)
            .and_then(|ix| self.shapes.get_index(ix as usize))
            .map_or(0, |(_, shape)| shape.depth)
    }

    /// User tag bound to the shape with the given key.
    pub fn tag_of(&self, key: &str) -> Option<u32> {
        self.shapes
            .get_index_of(key)
            .map(|ix| tag::FIRST_USER + ix as u32)
    }

    /// The tag the next definition will be bound to.
    #[inline]
    pub fn next_tag(&self) -> u32 {
        tag::FIRST_USER + self.shapes.len() as u32
    }

    /// Binds `sig` to the next user tag, unless a shape with the same key is
    /// already bound, in which case the key is returned as the error.
    pub(crate) fn define(&mut self, key: String, sig: Arc<Signature>, depth: usize) -> Result<u32, String> {
        if self.shapes.contains_key(&key) {
            return Err(key);
        }
        let tag = self.next_tag();
        trace!(tag, shape = %key, depth, "defined shape");
        self.shapes.insert(key, Shape { sig, depth });
        Ok(tag)
    }

    /// Forgets all stream state, so that the session can start a new stream.
    pub fn reset(&mut self) {
        self.started = false;
        self.symbols.clear();
        self.shapes.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tags_follow_definition_order() {
        let mut s = Session::new();
        let point = Arc::new(Signature::enumeration(["A"]));
        assert_eq!(s.define(point.key(), point.clone(), 1), Ok(0x40));
        let arr = Arc::new(Signature::array(Signature::String));
        assert_eq!(s.define(arr.key(), arr, 1), Ok(0x41));
        assert_eq!(s.define(point.key(), point, 1), Err(String::from("Enum<A>")));
        assert_eq!(s.tag_of("Array<String>"), Some(0x41));
        assert_eq!(**s.shape(0x40).unwrap(), Signature::enumeration(["A"]));
        assert!(s.shape(0x42).is_none());
        assert!(s.shape(0x04).is_none());
        assert_eq!(s.shape_depth(0x41), 1);
        assert_eq!(s.shape_depth(0x04), 0);
    }

    #[test]
    fn symbols_intern_once() {
        let mut s = Session::new();
        assert_eq!(s.intern_symbol("foo"), (0, true));
        assert_eq!(s.intern_symbol("bar"), (1, true));
        assert_eq!(s.intern_symbol("foo"), (0, false));
        assert_eq!(s.symbol(1), Some("bar"));
        s.reset();
        assert_eq!(s.symbol_count(), 0);
        assert!(!s.is_started());
    }
}
