//! Interned-name string type

use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

/// A symbolic name, distinguished from an ordinary string so that the TBin
/// codec can intern it against the session symbol table.
///
/// `Symbol` borrows as `str`, so a `HashMap<Symbol, V>` can be queried with
/// a plain `&str` key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[repr(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Symbol {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<Symbol> for String {
    fn from(sym: Symbol) -> Self {
        sym.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn symbol_map_lookup() {
        let one = Symbol::from("one");
        let one_again = Symbol::new(String::from("one"));
        let two = Symbol::from("two");
        let mut m: HashMap<Symbol, &str> = HashMap::new();
        m.insert(one.clone(), "This is one");
        assert_eq!(m.len(), 1);
        assert_eq!(m[&one], "This is one");
        assert_eq!(m[&one_again], "This is one");
        assert!(m.contains_key("one"));
        assert!(!m.contains_key(&two));
    }
}
