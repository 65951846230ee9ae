//! Recursive-descent parser from RDL text to a [`Schema`]
//!
//! Types are checked as they are declared, through the same
//! [`TypeChecker`] the builder uses in paranoid mode, so the first
//! structural violation is reported at the position of the offending
//! declaration.

use std::mem;

use tracing::debug;

use super::check::{is_annotation, TypeChecker};
use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::lexer::{Lexer, Token, TokenKind};
use super::IncludeLoader;
use crate::error::SchemaError;
use crate::model::{
    Annotations, ArrayTypeDef, BaseType, BytesTypeDef, EnumElementDef, EnumTypeDef, ExceptionDef,
    MapTypeDef, Number, NumberTypeDef, Resource, ResourceAuth, ResourceInput, ResourceOutput,
    Schema, StringTypeDef, StructFieldDef, StructTypeDef, Type, TypeDef, UnionTypeDef,
};
use crate::value::Value;

/// Option literal, before interpretation against its option key
#[derive(Clone, Debug)]
enum Literal {
    Str(String),
    Num(String),
    Ident(String),
    List(Vec<Literal>),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Num(s) | Literal::Ident(s) => f.write_str(s),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Clone, Debug)]
struct Opt {
    key: String,
    value: Option<Literal>,
    line: usize,
    column: usize,
}

/// Parenthesized `key[=literal]` list, consumed key by key
#[derive(Default, Debug)]
struct Options {
    items: Vec<Opt>,
}

const RESTRICTIONS: [&str; 7] = ["pattern", "values", "minsize", "maxsize", "min", "max", "size"];

impl Options {
    fn take(&mut self, key: &str) -> Option<Opt> {
        let ix = self
            .items
            .iter()
            .position(|o| o.key.eq_ignore_ascii_case(key))?;
        Some(self.items.remove(ix))
    }

    fn append(&mut self, other: Options) {
        self.items.extend(other.items);
    }

    fn take_annotations(&mut self) -> Annotations {
        let (annos, rest): (Vec<Opt>, Vec<Opt>) =
            mem::take(&mut self.items).into_iter().partition(|o| o.key.starts_with("x_"));
        self.items = rest;
        annos
            .into_iter()
            .map(|o| {
                let val = match o.value {
                    None => String::new(),
                    Some(Literal::Str(s) | Literal::Num(s) | Literal::Ident(s)) => s,
                    Some(lit @ Literal::List(_)) => lit.to_string(),
                };
                (o.key, val)
            })
            .collect()
    }

    fn has_restrictions(&self) -> bool {
        self.items.iter().any(|o| {
            RESTRICTIONS
                .iter()
                .any(|r| o.key.eq_ignore_ascii_case(r))
        })
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct Parser<'l> {
    lexer: Lexer,
    lookahead: Option<Token>,
    last_line: usize,
    leading: Vec<String>,
    trailing: Option<(usize, String)>,
    file: Option<String>,
    includes: Vec<String>,
    depth: usize,
    loader: Option<Box<dyn IncludeLoader + 'l>>,
    checker: TypeChecker,
    schema: Schema,
}

impl<'l> Parser<'l> {
    pub fn new(text: &str) -> Self {
        Self {
            lexer: Lexer::new(text),
            lookahead: None,
            last_line: 0,
            leading: Vec::new(),
            trailing: None,
            file: None,
            includes: Vec::new(),
            depth: 0,
            loader: None,
            checker: TypeChecker::new(),
            schema: Schema::default(),
        }
    }

    /// Sets the callback used to resolve `include` statements.
    pub fn with_loader(mut self, loader: impl IncludeLoader + 'l) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Names the top-level text, for error positions and include cycle detection.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.includes.push(name.clone());
        self.file = Some(name);
        self
    }

    pub fn parse(mut self) -> ParseResult<Schema> {
        self.statements()?;
        Ok(self.schema)
    }

    // ---- token plumbing ----

    fn error_at(&self, line: usize, column: usize, kind: ParseErrorKind) -> ParseError {
        ParseError {
            file: self.file.clone(),
            line,
            column,
            kind,
        }
    }

    fn schema_error(&self, line: usize, column: usize, err: SchemaError) -> ParseError {
        self.error_at(line, column, ParseErrorKind::Schema(err))
    }

    fn lex(&mut self) -> ParseResult<Option<Token>> {
        let file = &self.file;
        self.lexer.next_token().map_err(|mut err| {
            err.file = file.clone();
            err
        })
    }

    /// Files a comment as leading or trailing, by the line it appears on.
    fn file_comment(&mut self, line: usize, text: String) {
        if self.last_line > 0 && line == self.last_line {
            match &mut self.trailing {
                Some((l, prev)) if *l == line => {
                    prev.push(' ');
                    prev.push_str(&text);
                }
                slot => *slot = Some((line, text)),
            }
        } else if !text.is_empty() {
            self.leading.push(text);
        }
    }

    fn peek(&mut self) -> ParseResult<Option<&Token>> {
        loop {
            if self.lookahead.is_none() {
                self.lookahead = self.lex()?;
            }
            match self.lookahead.take() {
                Some(Token {
                    kind: TokenKind::Comment(text),
                    line,
                    ..
                }) => self.file_comment(line, text),
                other => {
                    self.lookahead = other;
                    return Ok(self.lookahead.as_ref());
                }
            }
        }
    }

    fn next(&mut self) -> ParseResult<Option<Token>> {
        self.peek()?;
        let tok = self.lookahead.take();
        if let Some(t) = &tok {
            self.last_line = t.line;
        }
        Ok(tok)
    }

    fn eof(&self, expected: &str) -> ParseError {
        let (line, column) = self.lexer.position();
        self.error_at(
            line,
            column,
            ParseErrorKind::UnexpectedEof {
                expected: expected.to_owned(),
            },
        )
    }

    fn unexpected(&self, tok: &Token, expected: &str) -> ParseError {
        self.error_at(
            tok.line,
            tok.column,
            ParseErrorKind::UnexpectedToken {
                expected: expected.to_owned(),
                found: tok.kind.to_string(),
            },
        )
    }

    fn expect_next(&mut self, expected: &str) -> ParseResult<Token> {
        match self.next()? {
            Some(tok) => Ok(tok),
            None => Err(self.eof(expected)),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> ParseResult<(String, usize, usize)> {
        let tok = self.expect_next(expected)?;
        match tok.kind {
            TokenKind::Ident(s) => Ok((s, tok.line, tok.column)),
            _ => Err(self.unexpected(&tok, expected)),
        }
    }

    fn expect_str(&mut self, expected: &str) -> ParseResult<String> {
        let tok = self.expect_next(expected)?;
        match tok.kind {
            TokenKind::Str(s) => Ok(s),
            _ => Err(self.unexpected(&tok, expected)),
        }
    }

    fn expect_punct(&mut self, c: char) -> ParseResult<()> {
        let expected = format!("'{c}'");
        let tok = self.expect_next(&expected)?;
        if tok.kind == TokenKind::Punct(c) {
            Ok(())
        } else {
            Err(self.unexpected(&tok, &expected))
        }
    }

    fn peek_is(&mut self, c: char) -> ParseResult<bool> {
        Ok(matches!(self.peek()?, Some(Token { kind: TokenKind::Punct(p), .. }) if *p == c))
    }

    fn eat(&mut self, c: char) -> ParseResult<bool> {
        if self.peek_is(c)? {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat_separator(&mut self) -> ParseResult<()> {
        if !self.eat(';')? {
            self.eat(',')?;
        }
        Ok(())
    }

    fn take_leading(&mut self) -> Option<String> {
        if self.leading.is_empty() {
            None
        } else {
            Some(mem::take(&mut self.leading).join(" "))
        }
    }

    /// Returns a comment on the same line as the last consumed token.
    fn take_trailing(&mut self) -> ParseResult<Option<String>> {
        let line = self.last_line;
        self.peek()?;
        Ok(match self.trailing.take() {
            Some((l, text)) if l == line => Some(text),
            _ => None,
        })
    }

    // ---- literals and options ----

    fn literal(&mut self) -> ParseResult<Literal> {
        let tok = self.expect_next("literal value")?;
        match tok.kind {
            TokenKind::Str(s) => Ok(Literal::Str(s)),
            TokenKind::Number(s) => Ok(Literal::Num(s)),
            TokenKind::Ident(s) => Ok(Literal::Ident(s)),
            TokenKind::Punct('[') => {
                let mut items = Vec::new();
                if self.eat(']')? {
                    return Ok(Literal::List(items));
                }
                loop {
                    items.push(self.literal()?);
                    let sep = self.expect_next("',' or ']'")?;
                    match sep.kind {
                        TokenKind::Punct(',') => continue,
                        TokenKind::Punct(']') => break,
                        _ => return Err(self.unexpected(&sep, "',' or ']'")),
                    }
                }
                Ok(Literal::List(items))
            }
            _ => Err(self.unexpected(&tok, "literal value")),
        }
    }

    fn options(&mut self) -> ParseResult<Options> {
        let mut opts = Options::default();
        if !self.eat('(')? {
            return Ok(opts);
        }
        if self.eat(')')? {
            return Ok(opts);
        }
        loop {
            let (key, line, column) = self.expect_ident("option name")?;
            let value = if self.eat('=')? {
                Some(self.literal()?)
            } else {
                None
            };
            opts.items.push(Opt {
                key,
                value,
                line,
                column,
            });
            let sep = self.expect_next("',' or ')'")?;
            match sep.kind {
                TokenKind::Punct(',') => continue,
                TokenKind::Punct(')') => break,
                _ => return Err(self.unexpected(&sep, "',' or ')'")),
            }
        }
        Ok(opts)
    }

    fn bad_value(&self, opt: &Opt) -> ParseError {
        self.error_at(
            opt.line,
            opt.column,
            ParseErrorKind::BadOptionValue {
                option: opt.key.clone(),
                value: opt
                    .value
                    .as_ref()
                    .map_or_else(|| String::from("(none)"), Literal::to_string),
            },
        )
    }

    fn opt_flag(&self, opt: Option<Opt>) -> ParseResult<bool> {
        match opt {
            None => Ok(false),
            Some(o) => match &o.value {
                None => Ok(true),
                Some(Literal::Ident(s)) if s == "true" => Ok(true),
                Some(Literal::Ident(s)) if s == "false" => Ok(false),
                _ => Err(self.bad_value(&o)),
            },
        }
    }

    fn opt_string(&self, opt: Option<Opt>) -> ParseResult<Option<String>> {
        match opt {
            None => Ok(None),
            Some(o) => match &o.value {
                Some(Literal::Str(s) | Literal::Ident(s)) => Ok(Some(s.clone())),
                _ => Err(self.bad_value(&o)),
            },
        }
    }

    fn opt_i32(&self, opt: Option<Opt>) -> ParseResult<Option<i32>> {
        match opt {
            None => Ok(None),
            Some(o) => match &o.value {
                Some(Literal::Num(s)) => s.parse().map(Some).map_err(|_| self.bad_value(&o)),
                _ => Err(self.bad_value(&o)),
            },
        }
    }

    fn opt_strings(&self, opt: Option<Opt>) -> ParseResult<Option<Vec<String>>> {
        match opt {
            None => Ok(None),
            Some(o) => match &o.value {
                Some(Literal::Str(s)) => Ok(Some(vec![s.clone()])),
                Some(Literal::List(items)) => items
                    .iter()
                    .map(|item| match item {
                        Literal::Str(s) | Literal::Ident(s) => Ok(s.clone()),
                        _ => Err(self.bad_value(&o)),
                    })
                    .collect::<ParseResult<Vec<_>>>()
                    .map(Some),
                _ => Err(self.bad_value(&o)),
            },
        }
    }

    fn opt_number(&self, opt: Option<Opt>, base: BaseType) -> ParseResult<Option<Number>> {
        match opt {
            None => Ok(None),
            Some(o) => match &o.value {
                Some(Literal::Num(s)) => Number::parse_as(base, s)
                    .map(Some)
                    .ok_or_else(|| self.bad_value(&o)),
                _ => Err(self.bad_value(&o)),
            },
        }
    }

    /// Interprets a `default=` literal for a value of the given base type.
    fn opt_default(&self, opt: Option<Opt>, base: Option<BaseType>) -> ParseResult<Option<Value>> {
        match opt {
            None => Ok(None),
            Some(o) => match &o.value {
                Some(lit) => literal_value(lit, base)
                    .map(Some)
                    .ok_or_else(|| self.bad_value(&o)),
                None => Err(self.bad_value(&o)),
            },
        }
    }

    /// Fails on the first option nothing claimed.
    fn finish_options(&self, opts: Options, context: &str) -> ParseResult<()> {
        match opts.items.first() {
            None => Ok(()),
            Some(o) => Err(self.error_at(
                o.line,
                o.column,
                ParseErrorKind::UnknownOption {
                    option: o.key.clone(),
                    context: context.to_owned(),
                },
            )),
        }
    }

    // ---- statements ----

    fn statements(&mut self) -> ParseResult<()> {
        loop {
            let tok = match self.next()? {
                Some(tok) => tok,
                None => {
                    self.leading.clear();
                    return Ok(());
                }
            };
            let word = match &tok.kind {
                TokenKind::Ident(w) => w.clone(),
                TokenKind::Punct(';') => continue,
                _ => return Err(self.unexpected(&tok, "statement")),
            };
            let top = self.depth == 0;
            match word.as_str() {
                "type" => self.type_decl()?,
                "resource" => self.resource_decl()?,
                "include" => {
                    self.leading.clear();
                    let name = self.expect_str("include file name")?;
                    self.include(name, tok.line, tok.column)?;
                }
                "name" | "namespace" | "version" | "base" | "comment" => {
                    let comment = self.take_leading();
                    self.header_statement(&word, top, comment)?;
                }
                w if w.starts_with("x_") => {
                    let key = w.to_owned();
                    self.leading.clear();
                    let value = if self.eat('=')? {
                        self.expect_str("annotation value")?
                    } else {
                        String::new()
                    };
                    if !is_annotation(&key) {
                        return Err(self.schema_error(
                            tok.line,
                            tok.column,
                            SchemaError::BadAnnotation(key),
                        ));
                    }
                    if top {
                        self.schema.annotations.insert(key, value);
                    }
                }
                _ => return Err(self.unexpected(&tok, "statement")),
            }
            self.eat(';')?;
        }
    }

    fn header_statement(
        &mut self,
        word: &str,
        top: bool,
        comment: Option<String>,
    ) -> ParseResult<()> {
        let value = match word {
            "name" | "namespace" => self.expect_ident(word)?.0,
            "base" | "comment" => self.expect_str(word)?,
            _ => {
                let tok = self.expect_next("version number")?;
                match &tok.kind {
                    TokenKind::Number(s) => {
                        let v = s.parse::<i32>().map_err(|_| {
                            self.error_at(tok.line, tok.column, ParseErrorKind::BadNumber(s.clone()))
                        })?;
                        if top {
                            self.schema.version = Some(v);
                        }
                    }
                    _ => return Err(self.unexpected(&tok, "version number")),
                }
                String::new()
            }
        };
        if !top {
            return Ok(());
        }
        if let Some(c) = comment {
            append_comment(&mut self.schema.comment, c);
        }
        match word {
            "name" => self.schema.name = Some(value),
            "namespace" => self.schema.namespace = Some(value),
            "base" => self.schema.base = Some(value),
            "comment" => append_comment(&mut self.schema.comment, value),
            _ => {}
        }
        Ok(())
    }

    fn include(&mut self, name: String, line: usize, column: usize) -> ParseResult<()> {
        if self.includes.contains(&name) {
            return Err(self.error_at(line, column, ParseErrorKind::CircularInclude(name)));
        }
        let text = match self.loader.as_mut() {
            Some(loader) => loader.load(&name).map_err(|err| err.to_string()),
            None => Err(String::from("no include loader configured")),
        }
        .map_err(|reason| {
            self.error_at(
                line,
                column,
                ParseErrorKind::IncludeFailed {
                    name: name.clone(),
                    reason,
                },
            )
        })?;
        debug!(include = name.as_str(), "resolving include");

        let saved_lexer = mem::replace(&mut self.lexer, Lexer::new(&text));
        let saved_lookahead = self.lookahead.take();
        let saved_file = mem::replace(&mut self.file, Some(name.clone()));
        let saved_leading = mem::take(&mut self.leading);
        let saved_line = mem::replace(&mut self.last_line, 0);
        self.includes.push(name);
        self.depth += 1;

        let res = self.statements();

        self.depth -= 1;
        self.includes.pop();
        self.lexer = saved_lexer;
        self.lookahead = saved_lookahead;
        self.file = saved_file;
        self.leading = saved_leading;
        self.last_line = saved_line;
        self.trailing = None;
        res
    }

    // ---- types ----

    /// Reads `Name` or `Name<Arg, ...>`, canonicalizing base keywords.
    fn type_ref(&mut self) -> ParseResult<(String, Vec<String>, usize, usize)> {
        let (name, line, column) = self.expect_ident("type reference")?;
        let mut args = Vec::new();
        if self.eat('<')? {
            loop {
                let (arg, _, _) = self.expect_ident("type argument")?;
                args.push(canonical(arg));
                let sep = self.expect_next("',' or '>'")?;
                match sep.kind {
                    TokenKind::Punct(',') => continue,
                    TokenKind::Punct('>') => break,
                    _ => return Err(self.unexpected(&sep, "',' or '>'")),
                }
            }
        }
        Ok((canonical(name), args, line, column))
    }

    fn resolve(&self, name: &str, context: &str, line: usize, column: usize) -> ParseResult<BaseType> {
        self.checker.resolve(name).ok_or_else(|| {
            self.schema_error(
                line,
                column,
                SchemaError::UnknownType {
                    context: context.to_owned(),
                    name: name.to_owned(),
                },
            )
        })
    }

    /// Follows aliases from `name` to the first definition with its own shape.
    fn shaped(&self, name: &str) -> Option<&Type> {
        let mut cur = self.schema.find_type(name)?;
        for _ in 0..=self.schema.types.len() {
            match cur {
                Type::Alias(def) => cur = self.schema.find_type(&def.supertype)?,
                other => return Some(other),
            }
        }
        None
    }

    fn add_type(&mut self, t: Type, line: usize, column: usize) -> ParseResult<()> {
        self.checker
            .admit(&t)
            .map_err(|err| self.schema_error(line, column, err))?;
        self.schema.types.push(t);
        Ok(())
    }

    fn type_decl(&mut self) -> ParseResult<()> {
        let comment = self.take_leading();
        let (name, line, column) = self.expect_ident("type name")?;
        let (sup, args, sline, scol) = self.type_ref()?;
        let base = self.resolve(&sup, &name, sline, scol)?;
        let mut opts = self.options()?;
        let has_body = self.peek_is('{')?;

        let mut def = TypeDef::new(sup.clone(), name.clone());
        def.annotations = opts.take_annotations();
        let user_super = BaseType::from_keyword(&sup).is_none();

        let t = if user_super && opts.is_empty() && !has_body && args.is_empty() {
            Type::Alias(def)
        } else {
            match base {
                BaseType::Struct => {
                    let closed = self.opt_flag(opts.take("closed"))?;
                    self.finish_options(opts, "struct")?;
                    let fields = if has_body {
                        self.struct_body(&name)?
                    } else {
                        Vec::new()
                    };
                    Type::Struct(StructTypeDef {
                        def,
                        fields,
                        closed,
                    })
                }
                BaseType::Enum => {
                    self.finish_options(opts, "enum")?;
                    let elements = if has_body {
                        self.enum_body()?
                    } else {
                        Vec::new()
                    };
                    Type::Enum(EnumTypeDef { def, elements })
                }
                _ => {
                    if has_body {
                        if let Some(tok) = self.next()? {
                            return Err(self.unexpected(&tok, "end of type declaration"));
                        }
                    }
                    self.restricted(def, base, &args, opts)?
                }
            }
        };
        let mut t = t;
        if !has_body {
            self.eat(';')?;
            if let Some(trailing) = self.take_trailing()? {
                if let Some(d) = t.def_mut() {
                    append_comment(&mut d.comment, trailing);
                }
            }
        }
        if let (Some(c), Some(d)) = (comment, t.def_mut()) {
            d.comment = Some(match d.comment.take() {
                Some(rest) => format!("{c} {rest}"),
                None => c,
            });
        }
        self.add_type(t, line, column)
    }

    /// Builds a non-struct, non-enum type from its restriction options.
    fn restricted(
        &self,
        def: TypeDef,
        base: BaseType,
        args: &[String],
        mut opts: Options,
    ) -> ParseResult<Type> {
        let inherited = self.shaped(&def.supertype);
        let t = match base {
            BaseType::String => Type::String(StringTypeDef {
                pattern: self.opt_string(opts.take("pattern"))?,
                values: self.opt_strings(opts.take("values"))?,
                min_size: self.opt_i32(opts.take("minsize"))?,
                max_size: self.opt_i32(opts.take("maxsize"))?,
                def,
            }),
            BaseType::Bytes => Type::Bytes(BytesTypeDef {
                size: self.opt_i32(opts.take("size"))?,
                min_size: self.opt_i32(opts.take("minsize"))?,
                max_size: self.opt_i32(opts.take("maxsize"))?,
                def,
            }),
            b if b.is_numeric() => Type::Number(NumberTypeDef {
                min: self.opt_number(opts.take("min"), b)?,
                max: self.opt_number(opts.take("max"), b)?,
                def,
            }),
            BaseType::Array => {
                let items = match (args.first(), inherited) {
                    (Some(items), _) => items.clone(),
                    (None, Some(Type::Array(parent))) => parent.items.clone(),
                    _ => String::from("Any"),
                };
                Type::Array(ArrayTypeDef {
                    items,
                    size: self.opt_i32(opts.take("size"))?,
                    min_size: self.opt_i32(opts.take("minsize"))?,
                    max_size: self.opt_i32(opts.take("maxsize"))?,
                    def,
                })
            }
            BaseType::Map => {
                let (keys, items) = match (args, inherited) {
                    ([keys, items, ..], _) => (keys.clone(), items.clone()),
                    ([keys], _) => (keys.clone(), String::from("Any")),
                    ([], Some(Type::Map(parent))) => (parent.keys.clone(), parent.items.clone()),
                    _ => (String::from("String"), String::from("Any")),
                };
                Type::Map(MapTypeDef {
                    keys,
                    items,
                    size: self.opt_i32(opts.take("size"))?,
                    min_size: self.opt_i32(opts.take("minsize"))?,
                    max_size: self.opt_i32(opts.take("maxsize"))?,
                    def,
                })
            }
            BaseType::Union => {
                let variants = match (args.is_empty(), inherited) {
                    (true, Some(Type::Union(parent))) => parent.variants.clone(),
                    _ => args.to_vec(),
                };
                Type::Union(UnionTypeDef { def, variants })
            }
            _ => Type::Alias(def),
        };
        self.finish_options(opts, base.name())?;
        Ok(t)
    }

    fn struct_body(&mut self, owner: &str) -> ParseResult<Vec<StructFieldDef>> {
        self.expect_punct('{')?;
        let mut fields = Vec::new();
        loop {
            if self.eat('}')? {
                break;
            }
            let comment = self.take_leading();
            let (ty, args, line, column) = self.type_ref()?;
            let mut opts = self.options()?;
            let (fname, fline, fcol) = self.expect_ident("field name")?;
            opts.append(self.options()?);
            self.eat_separator()?;

            let base = if ty == owner {
                BaseType::Struct
            } else {
                self.resolve(&ty, &format!("{owner}.{fname}"), line, column)?
            };
            let mut field = StructFieldDef::new(fname.clone(), ty.clone());
            field.comment = comment;
            field.optional = self.opt_flag(opts.take("optional"))?;
            field.default = self.opt_default(opts.take("default"), Some(base))?;
            field.annotations = opts.take_annotations();

            if opts.has_restrictions() {
                let synth_name = format!("{owner}_{fname}");
                let t = self.restricted(TypeDef::new(ty, synth_name.clone()), base, &args, opts)?;
                debug!(ty = synth_name.as_str(), "synthesized field type");
                self.add_type(t, fline, fcol)?;
                field.ty = synth_name;
            } else {
                self.finish_options(opts, "struct field")?;
                match (base, args.as_slice()) {
                    (BaseType::Array, [items, ..]) => field.items = Some(items.clone()),
                    (BaseType::Map, [keys, items, ..]) => {
                        field.keys = Some(keys.clone());
                        field.items = Some(items.clone());
                    }
                    (BaseType::Map, [keys]) => field.keys = Some(keys.clone()),
                    _ => {}
                }
            }
            if let Some(trailing) = self.take_trailing()? {
                append_comment(&mut field.comment, trailing);
            }
            fields.push(field);
        }
        self.leading.clear();
        Ok(fields)
    }

    fn enum_body(&mut self) -> ParseResult<Vec<EnumElementDef>> {
        self.expect_punct('{')?;
        let mut elements = Vec::new();
        loop {
            if self.eat('}')? {
                break;
            }
            let comment = self.take_leading();
            let (symbol, _, _) = self.expect_ident("enum symbol")?;
            let mut opts = self.options()?;
            let annotations = opts.take_annotations();
            self.finish_options(opts, "enum element")?;
            self.eat_separator()?;
            let mut elem = EnumElementDef {
                symbol,
                comment,
                annotations,
            };
            if let Some(trailing) = self.take_trailing()? {
                append_comment(&mut elem.comment, trailing);
            }
            elements.push(elem);
        }
        self.leading.clear();
        Ok(elements)
    }

    // ---- resources ----

    fn resource_decl(&mut self) -> ParseResult<()> {
        let mut comment = self.take_leading();
        let (ty, args, line, column) = self.type_ref()?;
        if !args.is_empty() {
            return Err(self.error_at(
                line,
                column,
                ParseErrorKind::UnexpectedToken {
                    expected: String::from("simple type name"),
                    found: String::from("generic arguments"),
                },
            ));
        }
        let (method, _, _) = self.expect_ident("method")?;
        let path = self.expect_str("resource path")?;
        let mut r = Resource::new(ty, method.to_ascii_uppercase(), path);
        let mut opts = self.options()?;
        r.name = self.opt_string(opts.take("name"))?;
        r.is_async = opts
            .take("async")
            .map(|o| self.opt_flag(Some(o)))
            .transpose()?;
        r.annotations = opts.take_annotations();
        self.finish_options(opts, "resource")?;

        self.expect_punct('{')?;
        loop {
            if self.eat('}')? {
                break;
            }
            let tok = self.expect_next("resource body")?;
            let word = match &tok.kind {
                TokenKind::Ident(w) => w.clone(),
                TokenKind::Punct(';') => continue,
                _ => return Err(self.unexpected(&tok, "resource body")),
            };
            match word.to_ascii_lowercase().as_str() {
                "authenticate" => {
                    self.leading.clear();
                    r.auth.get_or_insert_with(ResourceAuth::default).authenticate = true;
                }
                "authorize" => {
                    self.leading.clear();
                    let auth = self.authorize()?;
                    let slot = r.auth.get_or_insert_with(ResourceAuth::default);
                    slot.action = auth.action;
                    slot.resource = auth.resource;
                    slot.domain = auth.domain;
                }
                "expected" => {
                    self.leading.clear();
                    r.expected = self.code()?;
                    while self.eat(',')? {
                        let alt = self.code()?;
                        r.alternatives.push(alt);
                    }
                }
                "exceptions" => {
                    self.leading.clear();
                    self.exceptions(&mut r)?;
                }
                kw @ ("consumes" | "produces" | "accept" | "content-type") => {
                    self.leading.clear();
                    let (text, trailing) = self.lexer.raw_line();
                    let media: Vec<String> = text
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect();
                    if matches!(kw, "consumes" | "content-type") {
                        r.consumes.extend(media);
                    } else {
                        r.produces.extend(media);
                    }
                    if let Some(c) = trailing {
                        append_comment(&mut comment, c);
                    }
                }
                _ => {
                    self.lookahead = Some(tok);
                    self.resource_param(&mut r)?;
                }
            }
            self.eat(';')?;
        }
        self.leading.clear();
        r.comment = comment;

        let path_params: Vec<String> = r.path_params().into_iter().map(str::to_owned).collect();
        let query_params: Vec<(String, String)> = r
            .query_params()
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        for input in r.inputs.iter_mut() {
            if path_params.contains(&input.name) {
                input.path_param = true;
            }
            if let Some((key, _)) = query_params.iter().find(|(_, p)| *p == input.name) {
                input.query_param = Some(key.clone());
            }
        }
        self.checker
            .admit_resource(&r)
            .map_err(|err| self.schema_error(line, column, err))?;
        self.schema.resources.push(r);
        Ok(())
    }

    fn code(&mut self) -> ParseResult<String> {
        let tok = self.expect_next("response code")?;
        match tok.kind {
            TokenKind::Ident(s) | TokenKind::Number(s) => Ok(s),
            _ => Err(self.unexpected(&tok, "response code")),
        }
    }

    fn authorize(&mut self) -> ParseResult<ResourceAuth> {
        self.expect_punct('(')?;
        let action = self.expect_str("authorized action")?;
        self.expect_punct(',')?;
        let resource = self.expect_str("authorized resource")?;
        let mut domain = None;
        if self.eat(',')? {
            let (key, line, column) = self.expect_ident("domain")?;
            if !key.eq_ignore_ascii_case("domain") {
                return Err(self.error_at(
                    line,
                    column,
                    ParseErrorKind::UnknownOption {
                        option: key,
                        context: String::from("authorize"),
                    },
                ));
            }
            self.expect_punct('=')?;
            domain = Some(self.expect_str("domain")?);
        }
        self.expect_punct(')')?;
        Ok(ResourceAuth {
            authenticate: false,
            action: Some(action),
            resource: Some(resource),
            domain,
        })
    }

    fn exceptions(&mut self, r: &mut Resource) -> ParseResult<()> {
        self.expect_punct('{')?;
        loop {
            if self.eat('}')? {
                break;
            }
            let mut comment = self.take_leading();
            let (ty, _, _, _) = self.type_ref()?;
            let code = self.code()?;
            self.eat_separator()?;
            if let Some(trailing) = self.take_trailing()? {
                append_comment(&mut comment, trailing);
            }
            r.exceptions.insert(code, ExceptionDef { ty, comment });
        }
        self.leading.clear();
        Ok(())
    }

    fn resource_param(&mut self, r: &mut Resource) -> ParseResult<()> {
        let mut comment = self.take_leading();
        let (ty, args, line, column) = self.type_ref()?;
        if !args.is_empty() {
            return Err(self.error_at(
                line,
                column,
                ParseErrorKind::UnexpectedToken {
                    expected: String::from("simple type name"),
                    found: String::from("generic arguments"),
                },
            ));
        }
        let base = self.resolve(&ty, &r.path, line, column)?;
        let (name, _, _) = self.expect_ident("parameter name")?;
        let mut opts = self.options()?;
        let annotations = opts.take_annotations();
        let out = self.opt_flag(opts.take("out"))?;
        let optional = self.opt_flag(opts.take("optional"))?;
        let header = self.opt_string(opts.take("header"))?;
        self.eat(';')?;
        if let Some(trailing) = self.take_trailing()? {
            append_comment(&mut comment, trailing);
        }
        if out {
            self.finish_options(opts, "resource output")?;
            r.outputs.push(ResourceOutput {
                name,
                ty,
                header: header.unwrap_or_default(),
                comment,
                optional,
                annotations,
            });
        } else {
            let input = ResourceInput {
                default: self.opt_default(opts.take("default"), Some(base))?,
                pattern: self.opt_string(opts.take("pattern"))?,
                flag: self.opt_flag(opts.take("flag"))?,
                context: self.opt_string(opts.take("context"))?,
                name,
                ty,
                comment,
                path_param: false,
                query_param: None,
                header,
                optional,
                annotations,
            };
            self.finish_options(opts, "resource input")?;
            r.inputs.push(input);
        }
        Ok(())
    }
}

fn canonical(name: String) -> String {
    match BaseType::from_keyword(&name) {
        Some(b) => b.name().to_owned(),
        None => name,
    }
}

fn append_comment(slot: &mut Option<String>, text: String) {
    match slot {
        Some(prev) => {
            prev.push(' ');
            prev.push_str(&text);
        }
        None => *slot = Some(text),
    }
}

/// Converts a default literal to a value, typed by the declared base where known.
fn literal_value(lit: &Literal, base: Option<BaseType>) -> Option<Value> {
    Some(match lit {
        Literal::Str(s) => Value::String(s.clone()),
        Literal::Ident(s) if s == "true" => Value::Bool(true),
        Literal::Ident(s) if s == "false" => Value::Bool(false),
        Literal::Ident(s) => Value::String(s.clone()),
        Literal::Num(text) => match base {
            Some(b) if b.is_numeric() => Number::parse_as(b, text)?.into(),
            _ => {
                if let Ok(n) = text.parse::<i32>() {
                    Value::Int32(n)
                } else if let Ok(n) = text.parse::<i64>() {
                    Value::Int64(n)
                } else {
                    Value::Float64(text.parse().ok()?)
                }
            }
        },
        Literal::List(items) => Value::Array(
            items
                .iter()
                .map(|item| literal_value(item, None))
                .collect::<Option<Vec<_>>>()?,
        ),
    })
}
