//! RDL schema text: parsing, construction, checking and printing
//!
//! The entry point for text is [`parse_rdl`], or [`Parser`] when includes
//! must be resolved. Includes are loaded through an [`IncludeLoader`], which
//! any `FnMut(&str) -> io::Result<String>` closure implements; [`DirLoader`]
//! reads them relative to a directory.

use std::io;
use std::path::{Path, PathBuf};

pub mod builder;
pub mod check;
pub mod compare;
mod error;
pub mod lexer;
pub mod parser;
pub mod rdl_schema;
pub mod unparse;

pub use self::compare::compare_schemas;
pub use self::error::{ParseError, ParseErrorKind, ParseResult};
pub use self::parser::Parser;
pub use self::rdl_schema::rdl_schema;
pub use self::unparse::unparse_rdl;

use crate::model::Schema;

/// Source of included RDL text
pub trait IncludeLoader {
    fn load(&mut self, name: &str) -> io::Result<String>;
}

impl<F> IncludeLoader for F
where
    F: FnMut(&str) -> io::Result<String>,
{
    fn load(&mut self, name: &str) -> io::Result<String> {
        self(name)
    }
}

/// Loads includes as files relative to a base directory
#[derive(Clone, Debug)]
pub struct DirLoader {
    base: PathBuf,
}

impl DirLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl IncludeLoader for DirLoader {
    fn load(&mut self, name: &str) -> io::Result<String> {
        std::fs::read_to_string(self.base.join(name))
    }
}

/// Parses self-contained RDL text; any `include` fails.
pub fn parse_rdl(text: &str) -> ParseResult<Schema> {
    Parser::new(text).parse()
}

/// Parses an RDL file, resolving includes relative to its directory.
pub fn parse_rdl_file(path: impl AsRef<Path>) -> ParseResult<Schema> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|err| ParseError {
        file: None,
        line: 0,
        column: 0,
        kind: ParseErrorKind::IncludeFailed {
            name: name.clone(),
            reason: err.to_string(),
        },
    })?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Parser::new(&text)
        .with_file_name(name)
        .with_loader(DirLoader::new(dir))
        .parse()
}
