//! Protobuf schema model and text parser.
//!
//! Parses proto2/proto3 text into a descriptor model that keeps what the
//! compatibility rules need: field numbers, labels, wire types, real vs
//! synthetic oneofs, and reserved ranges. The canonical form is the
//! normalized textual descriptor re-emitted from the model.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::{ParseError, ResolvedReference};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Proto2,
    Proto3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtoSchema {
    pub syntax: Syntax,
    pub package: Option<String>,
    pub imports: Vec<String>,
    pub options: Vec<(String, String)>,
    pub messages: Vec<ProtoMessage>,
    pub enums: Vec<ProtoEnum>,
    /// Parsed reference files, searched during type resolution.
    pub dependencies: Vec<ProtoSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtoMessage {
    pub name: String,
    pub fields: Vec<ProtoField>,
    pub oneofs: Vec<ProtoOneof>,
    pub messages: Vec<ProtoMessage>,
    pub enums: Vec<ProtoEnum>,
    pub reserved_numbers: Vec<(u32, u32)>,
    pub reserved_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtoOneof {
    pub name: String,
    /// Synthetic oneofs back proto3 `optional` fields and are invisible to
    /// the compatibility rules.
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtoField {
    pub name: String,
    pub number: u32,
    pub label: FieldLabel,
    pub field_type: FieldType,
    pub oneof: Option<usize>,
    pub options: Vec<String>,
}

impl ProtoField {
    /// The oneof index if the field sits in a real (non-synthetic) oneof.
    pub fn real_oneof(&self, message: &ProtoMessage) -> Option<usize> {
        self.oneof
            .filter(|index| !message.oneofs[*index].synthetic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Singular,
    Optional,
    Required,
    Repeated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Named(String),
    Map(Box<FieldType>, Box<FieldType>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed32,
    Fixed64,
    LengthDelimited,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtoEnum {
    pub name: String,
    pub values: Vec<(String, i64)>,
}

/// Lookup structure over every message and enum reachable from a schema,
/// including its dependencies, keyed by dotted fullname.
pub struct ProtoIndex<'a> {
    messages: BTreeMap<String, &'a ProtoMessage>,
    enums: BTreeSet<String>,
}

impl ProtoSchema {
    pub fn index(&self) -> ProtoIndex<'_> {
        let mut index = ProtoIndex {
            messages: BTreeMap::new(),
            enums: BTreeSet::new(),
        };
        self.collect(&mut index);
        index
    }

    fn collect<'a>(&'a self, index: &mut ProtoIndex<'a>) {
        let prefix = self.package.clone().unwrap_or_default();
        for message in &self.messages {
            collect_message(message, &prefix, index);
        }
        for en in &self.enums {
            index.enums.insert(join_name(&prefix, &en.name));
        }
        for dependency in &self.dependencies {
            dependency.collect(index);
        }
    }

    pub fn message(&self, name: &str) -> Option<&ProtoMessage> {
        self.messages.iter().find(|message| message.name == name)
    }
}

fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn collect_message<'a>(message: &'a ProtoMessage, prefix: &str, index: &mut ProtoIndex<'a>) {
    let fullname = join_name(prefix, &message.name);
    for nested in &message.messages {
        collect_message(nested, &fullname, index);
    }
    for en in &message.enums {
        index.enums.insert(join_name(&fullname, &en.name));
    }
    index.messages.insert(fullname, message);
}

impl<'a> ProtoIndex<'a> {
    /// Resolve a possibly relative type name: exact match first, then by
    /// dotted-suffix.
    pub fn message(&self, name: &str) -> Option<&'a ProtoMessage> {
        let name = name.trim_start_matches('.');
        if let Some(message) = self.messages.get(name) {
            return Some(*message);
        }
        let suffix = format!(".{}", name);
        self.messages
            .iter()
            .find(|(fullname, _)| fullname.ends_with(&suffix))
            .map(|(_, message)| *message)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        let name = name.trim_start_matches('.');
        if self.enums.contains(name) {
            return true;
        }
        let suffix = format!(".{}", name);
        self.enums.iter().any(|fullname| fullname.ends_with(&suffix))
    }

    /// The wire type a field of `field_type` uses on the wire.
    pub fn wire_type(&self, field_type: &FieldType) -> WireType {
        match field_type {
            FieldType::Int32
            | FieldType::Int64
            | FieldType::Uint32
            | FieldType::Uint64
            | FieldType::Sint32
            | FieldType::Sint64
            | FieldType::Bool => WireType::Varint,
            FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => WireType::Fixed32,
            FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => WireType::Fixed64,
            FieldType::String | FieldType::Bytes | FieldType::Map(_, _) => {
                WireType::LengthDelimited
            }
            FieldType::Named(name) => {
                if self.is_enum(name) {
                    WireType::Varint
                } else {
                    WireType::LengthDelimited
                }
            }
        }
    }
}

pub fn parse(raw: &str, references: &[ResolvedReference]) -> Result<ProtoSchema, ParseError> {
    let mut dependencies = Vec::with_capacity(references.len());
    for reference in references {
        let parsed = parse_file(&reference.schema).map_err(|err| ParseError::Protobuf {
            line: 0,
            message: format!("reference '{}': {}", reference.name, err),
        })?;
        dependencies.push(parsed);
    }

    let mut schema = parse_file(raw)?;
    schema.dependencies = dependencies;
    Ok(schema)
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(u64),
    Symbol(char),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("'{}'", s),
            Token::Str(s) => format!("\"{}\"", s),
            Token::Int(n) => n.to_string(),
            Token::Symbol(c) => format!("'{}'", c),
        }
    }
}

fn lex(raw: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' => {
                chars.next();
                match chars.peek() {
                    Some('/') => {
                        for c in chars.by_ref() {
                            if c == '\n' {
                                line += 1;
                                break;
                            }
                        }
                    }
                    Some('*') => {
                        chars.next();
                        let mut prev = ' ';
                        let mut closed = false;
                        for c in chars.by_ref() {
                            if c == '\n' {
                                line += 1;
                            }
                            if prev == '*' && c == '/' {
                                closed = true;
                                break;
                            }
                            prev = c;
                        }
                        if !closed {
                            return Err(ParseError::Protobuf {
                                line,
                                message: "unterminated block comment".into(),
                            });
                        }
                    }
                    _ => {
                        return Err(ParseError::Protobuf {
                            line,
                            message: "unexpected '/'".into(),
                        });
                    }
                }
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    if c == '\n' {
                        break;
                    }
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            value.push('\\');
                            value.push(escaped);
                        }
                        continue;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(ParseError::Protobuf {
                        line,
                        message: "unterminated string literal".into(),
                    });
                }
                tokens.push((Token::Str(value), line));
            }
            c if c.is_ascii_digit() => {
                let mut value = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '.' {
                        value.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Floats and hex literals only show up in option values,
                // which are carried as raw text; treat them as idents.
                match value.parse::<u64>() {
                    Ok(n) => tokens.push((Token::Int(n), line)),
                    Err(_) => tokens.push((Token::Ident(value), line)),
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut value = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        value.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((Token::Ident(value), line));
            }
            '{' | '}' | '[' | ']' | '(' | ')' | '<' | '>' | '=' | ';' | ',' | '.' | '-' => {
                tokens.push((Token::Symbol(c), line));
                chars.next();
            }
            other => {
                return Err(ParseError::Protobuf {
                    line,
                    message: format!("unexpected character '{}'", other),
                });
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, line)| *line)
            .unwrap_or(1)
    }

    fn fail<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError::Protobuf {
            line: self.line(),
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_symbol(&mut self, symbol: char) -> bool {
        if self.peek() == Some(&Token::Symbol(symbol)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<(), ParseError> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            let found = self
                .peek()
                .map(Token::describe)
                .unwrap_or_else(|| "end of input".into());
            self.fail(format!("expected '{}', found {}", symbol, found))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.next() {
            Some(Token::Ident(s)) => Ok(s),
            Some(other) => {
                self.pos -= 1;
                self.fail(format!("expected identifier, found {}", other.describe()))
            }
            None => self.fail("expected identifier, found end of input"),
        }
    }

    fn expect_int(&mut self) -> Result<u64, ParseError> {
        match self.next() {
            Some(Token::Int(n)) => Ok(n),
            Some(other) => {
                self.pos -= 1;
                self.fail(format!("expected integer, found {}", other.describe()))
            }
            None => self.fail("expected integer, found end of input"),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(s),
            Some(other) => {
                self.pos -= 1;
                self.fail(format!(
                    "expected string literal, found {}",
                    other.describe()
                ))
            }
            None => self.fail("expected string literal, found end of input"),
        }
    }

    /// A possibly dotted, possibly leading-dot type name.
    fn qualified_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        if self.eat_symbol('.') {
            name.push('.');
        }
        name.push_str(&self.expect_ident()?);
        while self.eat_symbol('.') {
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }
        Ok(name)
    }

    /// Capture raw token text until (but not including) the terminator.
    fn raw_until(&mut self, terminator: char) -> Result<String, ParseError> {
        let mut out = String::new();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return self.fail(format!("expected '{}'", terminator)),
                Some(Token::Symbol(c)) if *c == terminator && depth == 0 => return Ok(out),
                Some(token) => {
                    match token {
                        Token::Symbol('{') | Token::Symbol('(') | Token::Symbol('[') => depth += 1,
                        Token::Symbol('}') | Token::Symbol(')') | Token::Symbol(']') => {
                            depth = depth.saturating_sub(1)
                        }
                        _ => {}
                    }
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    match token {
                        Token::Ident(s) => out.push_str(s),
                        Token::Int(n) => out.push_str(&n.to_string()),
                        Token::Str(s) => {
                            out.push('"');
                            out.push_str(s);
                            out.push('"');
                        }
                        Token::Symbol(c) => out.push(*c),
                    }
                    self.pos += 1;
                }
            }
        }
    }

    fn skip_block(&mut self) -> Result<(), ParseError> {
        self.expect_symbol('{')?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next() {
                Some(Token::Symbol('{')) => depth += 1,
                Some(Token::Symbol('}')) => depth -= 1,
                Some(_) => {}
                None => return self.fail("unterminated block"),
            }
        }
        Ok(())
    }
}

fn parse_file(raw: &str) -> Result<ProtoSchema, ParseError> {
    let tokens = lex(raw)?;
    let mut parser = Parser { tokens, pos: 0 };

    let mut schema = ProtoSchema {
        syntax: Syntax::Proto2,
        package: None,
        imports: Vec::new(),
        options: Vec::new(),
        messages: Vec::new(),
        enums: Vec::new(),
        dependencies: Vec::new(),
    };

    if parser.peek() == Some(&Token::Ident("syntax".to_string())) {
        parser.next();
        parser.expect_symbol('=')?;
        let value = parser.expect_string()?;
        schema.syntax = match value.as_str() {
            "proto2" => Syntax::Proto2,
            "proto3" => Syntax::Proto3,
            other => return parser.fail(format!("unsupported syntax '{}'", other)),
        };
        parser.expect_symbol(';')?;
    }

    while let Some(token) = parser.peek() {
        match token {
            Token::Symbol(';') => {
                parser.next();
            }
            Token::Ident(keyword) => match keyword.as_str() {
                "package" => {
                    parser.next();
                    if schema.package.is_some() {
                        return parser.fail("duplicate package statement");
                    }
                    schema.package = Some(parser.qualified_name()?);
                    parser.expect_symbol(';')?;
                }
                "import" => {
                    parser.next();
                    // `public` / `weak` qualifiers don't change resolution here.
                    if matches!(parser.peek(), Some(Token::Ident(s)) if s == "public" || s == "weak")
                    {
                        parser.next();
                    }
                    schema.imports.push(parser.expect_string()?);
                    parser.expect_symbol(';')?;
                }
                "option" => {
                    parser.next();
                    let raw = parser.raw_until(';')?;
                    parser.expect_symbol(';')?;
                    match raw.split_once(" = ") {
                        Some((name, value)) => {
                            schema.options.push((name.to_string(), value.to_string()))
                        }
                        None => return parser.fail(format!("malformed option '{}'", raw)),
                    }
                }
                "message" => {
                    parser.next();
                    let message = parse_message(&mut parser, schema.syntax)?;
                    schema.messages.push(message);
                }
                "enum" => {
                    parser.next();
                    schema.enums.push(parse_enum(&mut parser)?);
                }
                "service" | "extend" => {
                    parser.next();
                    parser.qualified_name()?;
                    parser.skip_block()?;
                }
                other => {
                    return parser.fail(format!("unexpected '{}' at file scope", other));
                }
            },
            other => {
                let found = other.describe();
                return parser.fail(format!("unexpected {} at file scope", found));
            }
        }
    }

    Ok(schema)
}

fn parse_message(parser: &mut Parser, syntax: Syntax) -> Result<ProtoMessage, ParseError> {
    let name = parser.expect_ident()?;
    parser.expect_symbol('{')?;

    let mut message = ProtoMessage {
        name,
        fields: Vec::new(),
        oneofs: Vec::new(),
        messages: Vec::new(),
        enums: Vec::new(),
        reserved_numbers: Vec::new(),
        reserved_names: Vec::new(),
    };

    loop {
        match parser.peek() {
            None => return parser.fail("unterminated message"),
            Some(Token::Symbol('}')) => {
                parser.next();
                break;
            }
            Some(Token::Symbol(';')) => {
                parser.next();
            }
            Some(Token::Ident(keyword)) => match keyword.as_str() {
                "message" => {
                    parser.next();
                    let nested = parse_message(parser, syntax)?;
                    message.messages.push(nested);
                }
                "enum" => {
                    parser.next();
                    message.enums.push(parse_enum(parser)?);
                }
                "oneof" => {
                    parser.next();
                    parse_oneof(parser, syntax, &mut message)?;
                }
                "reserved" => {
                    parser.next();
                    parse_reserved(parser, &mut message)?;
                }
                "extensions" => {
                    parser.next();
                    parser.raw_until(';')?;
                    parser.expect_symbol(';')?;
                }
                "option" => {
                    parser.next();
                    parser.raw_until(';')?;
                    parser.expect_symbol(';')?;
                }
                "extend" => {
                    parser.next();
                    parser.qualified_name()?;
                    parser.skip_block()?;
                }
                _ => {
                    let field = parse_field(parser, syntax, None, &mut message)?;
                    message.fields.push(field);
                }
            },
            Some(other) => {
                let found = other.describe();
                return parser.fail(format!("unexpected {} in message", found));
            }
        }
    }

    validate_message(parser, &message)?;
    Ok(message)
}

fn validate_message(parser: &Parser, message: &ProtoMessage) -> Result<(), ParseError> {
    let mut numbers = HashSet::new();
    let mut names = HashSet::new();
    for field in &message.fields {
        if !numbers.insert(field.number) {
            return parser.fail(format!(
                "message '{}' uses field number {} more than once",
                message.name, field.number
            ));
        }
        if !names.insert(field.name.as_str()) {
            return parser.fail(format!(
                "message '{}' declares field '{}' more than once",
                message.name, field.name
            ));
        }
        for (low, high) in &message.reserved_numbers {
            if field.number >= *low && field.number <= *high {
                return parser.fail(format!(
                    "field '{}' uses reserved number {}",
                    field.name, field.number
                ));
            }
        }
        if message
            .reserved_names
            .iter()
            .any(|reserved| reserved == &field.name)
        {
            return parser.fail(format!("field '{}' uses a reserved name", field.name));
        }
    }
    Ok(())
}

fn parse_oneof(
    parser: &mut Parser,
    syntax: Syntax,
    message: &mut ProtoMessage,
) -> Result<(), ParseError> {
    let name = parser.expect_ident()?;
    message.oneofs.push(ProtoOneof {
        name,
        synthetic: false,
    });
    let index = message.oneofs.len() - 1;

    parser.expect_symbol('{')?;
    loop {
        match parser.peek() {
            None => return parser.fail("unterminated oneof"),
            Some(Token::Symbol('}')) => {
                parser.next();
                return Ok(());
            }
            Some(Token::Symbol(';')) => {
                parser.next();
            }
            Some(Token::Ident(keyword)) if keyword == "option" => {
                parser.next();
                parser.raw_until(';')?;
                parser.expect_symbol(';')?;
            }
            Some(_) => {
                let field = parse_field(parser, syntax, Some(index), message)?;
                message.fields.push(field);
            }
        }
    }
}

fn parse_reserved(parser: &mut Parser, message: &mut ProtoMessage) -> Result<(), ParseError> {
    loop {
        match parser.peek() {
            Some(Token::Str(_)) => {
                let name = parser.expect_string()?;
                message.reserved_names.push(name);
            }
            Some(Token::Int(_)) => {
                let low = parser.expect_int()? as u32;
                let mut high = low;
                if matches!(parser.peek(), Some(Token::Ident(s)) if s == "to") {
                    parser.next();
                    match parser.peek() {
                        Some(Token::Ident(s)) if s == "max" => {
                            parser.next();
                            high = 536_870_911;
                        }
                        _ => high = parser.expect_int()? as u32,
                    }
                }
                message.reserved_numbers.push((low, high));
            }
            _ => return parser.fail("malformed reserved statement"),
        }
        if parser.eat_symbol(',') {
            continue;
        }
        parser.expect_symbol(';')?;
        return Ok(());
    }
}

fn parse_field(
    parser: &mut Parser,
    syntax: Syntax,
    oneof: Option<usize>,
    message: &mut ProtoMessage,
) -> Result<ProtoField, ParseError> {
    let mut label = FieldLabel::Singular;
    if oneof.is_none() {
        if let Some(Token::Ident(keyword)) = parser.peek() {
            match keyword.as_str() {
                "optional" => {
                    label = FieldLabel::Optional;
                    parser.next();
                }
                "required" => {
                    if syntax == Syntax::Proto3 {
                        return parser.fail("'required' is not allowed in proto3");
                    }
                    label = FieldLabel::Required;
                    parser.next();
                }
                "repeated" => {
                    label = FieldLabel::Repeated;
                    parser.next();
                }
                _ => {}
            }
        }
    }

    let field_type = parse_field_type(parser)?;
    let name = parser.expect_ident()?;
    parser.expect_symbol('=')?;
    let number = parser.expect_int()?;
    if number == 0 || number > 536_870_911 || (19_000..=19_999).contains(&number) {
        return parser.fail(format!("field number {} is out of range", number));
    }

    let mut options = Vec::new();
    if parser.eat_symbol('[') {
        options.push(parser.raw_until(']')?);
        parser.expect_symbol(']')?;
    }
    parser.expect_symbol(';')?;

    // proto3 `optional` is sugar for a single-field synthetic oneof.
    let mut oneof = oneof;
    if syntax == Syntax::Proto3 && label == FieldLabel::Optional && oneof.is_none() {
        message.oneofs.push(ProtoOneof {
            name: format!("_{}", name),
            synthetic: true,
        });
        oneof = Some(message.oneofs.len() - 1);
    }

    Ok(ProtoField {
        name,
        number: number as u32,
        label,
        field_type,
        oneof,
        options,
    })
}

fn parse_field_type(parser: &mut Parser) -> Result<FieldType, ParseError> {
    let scalar = |name: &str| -> Option<FieldType> {
        Some(match name {
            "double" => FieldType::Double,
            "float" => FieldType::Float,
            "int32" => FieldType::Int32,
            "int64" => FieldType::Int64,
            "uint32" => FieldType::Uint32,
            "uint64" => FieldType::Uint64,
            "sint32" => FieldType::Sint32,
            "sint64" => FieldType::Sint64,
            "fixed32" => FieldType::Fixed32,
            "fixed64" => FieldType::Fixed64,
            "sfixed32" => FieldType::Sfixed32,
            "sfixed64" => FieldType::Sfixed64,
            "bool" => FieldType::Bool,
            "string" => FieldType::String,
            "bytes" => FieldType::Bytes,
            _ => return None,
        })
    };

    match parser.peek() {
        Some(Token::Ident(keyword)) if keyword == "map" => {
            parser.next();
            parser.expect_symbol('<')?;
            let key = parse_field_type(parser)?;
            parser.expect_symbol(',')?;
            let value = parse_field_type(parser)?;
            parser.expect_symbol('>')?;
            Ok(FieldType::Map(Box::new(key), Box::new(value)))
        }
        Some(Token::Ident(keyword)) => {
            if let Some(field_type) = scalar(keyword) {
                parser.next();
                Ok(field_type)
            } else {
                Ok(FieldType::Named(parser.qualified_name()?))
            }
        }
        Some(Token::Symbol('.')) => Ok(FieldType::Named(parser.qualified_name()?)),
        _ => parser.fail("expected a field type"),
    }
}

fn parse_enum(parser: &mut Parser) -> Result<ProtoEnum, ParseError> {
    let name = parser.expect_ident()?;
    parser.expect_symbol('{')?;

    let mut values = Vec::new();
    loop {
        match parser.peek() {
            None => return parser.fail("unterminated enum"),
            Some(Token::Symbol('}')) => {
                parser.next();
                break;
            }
            Some(Token::Symbol(';')) => {
                parser.next();
            }
            Some(Token::Ident(keyword)) if keyword == "option" || keyword == "reserved" => {
                parser.next();
                parser.raw_until(';')?;
                parser.expect_symbol(';')?;
            }
            Some(Token::Ident(_)) => {
                let value_name = parser.expect_ident()?;
                parser.expect_symbol('=')?;
                let negative = parser.eat_symbol('-');
                let magnitude = parser.expect_int()? as i64;
                let value = if negative { -magnitude } else { magnitude };
                if parser.eat_symbol('[') {
                    parser.raw_until(']')?;
                    parser.expect_symbol(']')?;
                }
                parser.expect_symbol(';')?;
                values.push((value_name, value));
            }
            Some(other) => {
                let found = other.describe();
                return parser.fail(format!("unexpected {} in enum", found));
            }
        }
    }

    Ok(ProtoEnum { name, values })
}

// ---------------------------------------------------------------------------
// Canonical emission
// ---------------------------------------------------------------------------

impl ProtoSchema {
    /// The normalized textual descriptor: deterministic whitespace, sorted
    /// imports, declared order everywhere else.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        match self.syntax {
            Syntax::Proto2 => out.push_str("syntax = \"proto2\";\n"),
            Syntax::Proto3 => out.push_str("syntax = \"proto3\";\n"),
        }
        if let Some(package) = &self.package {
            out.push_str(&format!("package {};\n", package));
        }
        let mut imports = self.imports.clone();
        imports.sort();
        for import in imports {
            out.push_str(&format!("import \"{}\";\n", import));
        }
        for (name, value) in &self.options {
            out.push_str(&format!("option {} = {};\n", name, value));
        }
        for message in &self.messages {
            write_message(message, &mut out, 0);
        }
        for en in &self.enums {
            write_enum(en, &mut out, 0);
        }
        out
    }

    pub fn normalized(&self) -> String {
        self.canonical()
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn type_name(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Double => "double".into(),
        FieldType::Float => "float".into(),
        FieldType::Int32 => "int32".into(),
        FieldType::Int64 => "int64".into(),
        FieldType::Uint32 => "uint32".into(),
        FieldType::Uint64 => "uint64".into(),
        FieldType::Sint32 => "sint32".into(),
        FieldType::Sint64 => "sint64".into(),
        FieldType::Fixed32 => "fixed32".into(),
        FieldType::Fixed64 => "fixed64".into(),
        FieldType::Sfixed32 => "sfixed32".into(),
        FieldType::Sfixed64 => "sfixed64".into(),
        FieldType::Bool => "bool".into(),
        FieldType::String => "string".into(),
        FieldType::Bytes => "bytes".into(),
        FieldType::Named(name) => name.clone(),
        FieldType::Map(key, value) => {
            format!("map<{}, {}>", type_name(key), type_name(value))
        }
    }
}

fn write_field_line(field: &ProtoField, out: &mut String, depth: usize, in_oneof: bool) {
    indent(out, depth);
    if !in_oneof {
        match field.label {
            FieldLabel::Optional => out.push_str("optional "),
            FieldLabel::Required => out.push_str("required "),
            FieldLabel::Repeated => out.push_str("repeated "),
            FieldLabel::Singular => {}
        }
    }
    out.push_str(&type_name(&field.field_type));
    out.push(' ');
    out.push_str(&field.name);
    out.push_str(&format!(" = {}", field.number));
    if !field.options.is_empty() {
        out.push_str(&format!(" [{}]", field.options.join(", ")));
    }
    out.push_str(";\n");
}

fn write_message(message: &ProtoMessage, out: &mut String, depth: usize) {
    indent(out, depth);
    out.push_str(&format!("message {} {{\n", message.name));

    if !message.reserved_numbers.is_empty() {
        indent(out, depth + 1);
        let ranges: Vec<String> = message
            .reserved_numbers
            .iter()
            .map(|(low, high)| {
                if low == high {
                    low.to_string()
                } else {
                    format!("{} to {}", low, high)
                }
            })
            .collect();
        out.push_str(&format!("reserved {};\n", ranges.join(", ")));
    }
    if !message.reserved_names.is_empty() {
        indent(out, depth + 1);
        let names: Vec<String> = message
            .reserved_names
            .iter()
            .map(|name| format!("\"{}\"", name))
            .collect();
        out.push_str(&format!("reserved {};\n", names.join(", ")));
    }

    for field in &message.fields {
        let in_real_oneof = field.real_oneof(message).is_some();
        if !in_real_oneof {
            write_field_line(field, out, depth + 1, false);
        }
    }

    for (index, oneof) in message.oneofs.iter().enumerate() {
        if oneof.synthetic {
            continue;
        }
        indent(out, depth + 1);
        out.push_str(&format!("oneof {} {{\n", oneof.name));
        for field in &message.fields {
            if field.oneof == Some(index) {
                write_field_line(field, out, depth + 2, true);
            }
        }
        indent(out, depth + 1);
        out.push_str("}\n");
    }

    for nested in &message.messages {
        write_message(nested, out, depth + 1);
    }
    for en in &message.enums {
        write_enum(en, out, depth + 1);
    }

    indent(out, depth);
    out.push_str("}\n");
}

fn write_enum(en: &ProtoEnum, out: &mut String, depth: usize) {
    indent(out, depth);
    out.push_str(&format!("enum {} {{\n", en.name));
    for (name, value) in &en.values {
        indent(out, depth + 1);
        out.push_str(&format!("{} = {};\n", name, value));
    }
    indent(out, depth);
    out.push_str("}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: &str = r#"
        syntax = "proto3";
        package acme.people;

        // A person record.
        message Person {
          string name = 1;
          optional int32 age = 2;
          repeated string emails = 3;
          oneof contact {
            string phone = 4;
            string pager = 5;
          }
          map<string, string> tags = 6;
        }
    "#;

    #[test]
    fn parses_proto3_with_oneof_and_map() {
        let schema = parse(PERSON, &[]).unwrap();
        assert_eq!(schema.syntax, Syntax::Proto3);
        assert_eq!(schema.package.as_deref(), Some("acme.people"));

        let person = schema.message("Person").unwrap();
        assert_eq!(person.fields.len(), 6);

        // proto3 optional produces a synthetic oneof, the declared one is real.
        let synthetic: Vec<&ProtoOneof> =
            person.oneofs.iter().filter(|o| o.synthetic).collect();
        assert_eq!(synthetic.len(), 1);
        assert_eq!(synthetic[0].name, "_age");
        assert!(person.oneofs.iter().any(|o| !o.synthetic && o.name == "contact"));

        let age = person.fields.iter().find(|f| f.name == "age").unwrap();
        assert!(age.real_oneof(person).is_none());
        let phone = person.fields.iter().find(|f| f.name == "phone").unwrap();
        assert!(phone.real_oneof(person).is_some());
    }

    #[test]
    fn canonical_emission_is_idempotent() {
        let schema = parse(PERSON, &[]).unwrap();
        let canonical = schema.canonical();
        let reparsed = parse(&canonical, &[]).unwrap();
        assert_eq!(reparsed.canonical(), canonical);
    }

    #[test]
    fn required_is_rejected_in_proto3() {
        let err = parse(
            "syntax = \"proto3\";\nmessage M { required int32 a = 1; }",
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("proto3"));
    }

    #[test]
    fn duplicate_field_numbers_are_rejected() {
        let err = parse(
            "syntax = \"proto3\";\nmessage M { int32 a = 1; int32 b = 1; }",
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn reserved_numbers_are_enforced() {
        let err = parse(
            "syntax = \"proto3\";\nmessage M { reserved 2, 9 to 11; int32 a = 10; }",
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn errors_carry_the_line_number() {
        let err = parse("syntax = \"proto3\";\nmessage M {\n  int32 = 1;\n}", &[]).unwrap_err();
        match err {
            ParseError::Protobuf { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn imported_types_resolve_through_the_index() {
        let address = ResolvedReference {
            name: "acme/address.proto".into(),
            schema_type: crate::types::SchemaType::Protobuf,
            schema: "syntax = \"proto3\";\npackage acme.common;\nmessage Address { string street = 1; }".into(),
        };
        let schema = parse(
            "syntax = \"proto3\";\npackage acme.people;\nimport \"acme/address.proto\";\nmessage Person { acme.common.Address address = 1; }",
            &[address],
        )
        .unwrap();

        let index = schema.index();
        assert!(index.message("acme.common.Address").is_some());
        assert!(index.message("Address").is_some());
        assert_eq!(
            index.wire_type(&FieldType::Named("acme.common.Address".into())),
            WireType::LengthDelimited
        );
    }
}
