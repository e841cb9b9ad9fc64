use std::fmt;
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, hex_digit1, one_of, satisfy};
use nom::combinator::{cut, map, map_res, not, opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{pair, preceded};
use nom::IResult;

use crate::error::{Error, ErrorKind, Location, Result};
use crate::parser::{DirectiveName, Mnemonic};

const PUNCTUATION: &str = "#,()[]:+-*/<>=!&|^~";

/// Explicit or inferred bit width of a numeric literal.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum NumericType {
    #[default]
    Unknown,
    Byte,
    Word,
    Long,
}

impl NumericType {
    fn for_bits(bits: usize) -> Self {
        match bits {
            0..=8 => NumericType::Byte,
            9..=16 => NumericType::Word,
            17..=24 => NumericType::Long,
            _ => NumericType::Unknown,
        }
    }

    pub fn bytes(self) -> Option<usize> {
        match self {
            NumericType::Unknown => None,
            NumericType::Byte => Some(1),
            NumericType::Word => Some(2),
            NumericType::Long => Some(3),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Punctuation {
    Char(char),
    /// `::`
    Scope,
}

impl fmt::Display for Punctuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Punctuation::Char(c) => write!(f, "{}", c),
            Punctuation::Scope => write!(f, "::"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum TokenValue {
    Identifier(String),
    Literal(i32),
    Mnemonic(Mnemonic),
    DirectiveName(DirectiveName),
    Punctuation(Punctuation),
    EndOfLine,
}

/// A lexed token.
///
/// Equality compares only the value, never the location or literal width,
/// so tests can build expected tokens without positions.
#[derive(Debug, Clone)]
pub struct Token {
    value: TokenValue,
    location: Location,
    numeric_type: NumericType,
}

impl Token {
    pub fn new(value: TokenValue, location: Location) -> Self {
        Token {
            value,
            location,
            numeric_type: NumericType::Unknown,
        }
    }

    pub fn literal(value: i32, numeric_type: NumericType, location: Location) -> Self {
        Token {
            value: TokenValue::Literal(value),
            location,
            numeric_type,
        }
    }

    pub fn value(&self) -> &TokenValue {
        &self.value
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn numeric_type(&self) -> NumericType {
        self.numeric_type
    }

    pub fn identifier(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_punctuation(&self, c: char) -> bool {
        self.value == TokenValue::Punctuation(Punctuation::Char(c))
    }

    pub fn is_end_of_line(&self) -> bool {
        self.value == TokenValue::EndOfLine
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Token {}

impl PartialEq<TokenValue> for Token {
    fn eq(&self, other: &TokenValue) -> bool {
        self.value == *other
    }
}

impl PartialEq<Mnemonic> for Token {
    fn eq(&self, other: &Mnemonic) -> bool {
        self.value == TokenValue::Mnemonic(*other)
    }
}

impl PartialEq<DirectiveName> for Token {
    fn eq(&self, other: &DirectiveName) -> bool {
        self.value == TokenValue::DirectiveName(*other)
    }
}

impl PartialEq<char> for Token {
    fn eq(&self, other: &char) -> bool {
        self.is_punctuation(*other)
    }
}

impl From<TokenValue> for Token {
    fn from(value: TokenValue) -> Self {
        Token::new(value, Location::default())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TokenValue::Identifier(name) => write!(f, "identifier \"{}\"", name),
            TokenValue::Literal(v) => write!(f, "literal {}", v),
            TokenValue::Mnemonic(m) => write!(f, "mnemonic {}", m),
            TokenValue::DirectiveName(d) => write!(f, "directive {}", d),
            TokenValue::Punctuation(p) => write!(f, "'{}'", p),
            TokenValue::EndOfLine => write!(f, "end of line"),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn valid_word(i: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(i)
}

fn hex_literal(i: &str) -> IResult<&str, (i32, NumericType)> {
    preceded(
        char('$'),
        cut(map_res(hex_digit1, |digits: &str| {
            i32::from_str_radix(digits, 16).map(|v| (v, NumericType::for_bits(digits.len() * 4)))
        })),
    )(i)
}

fn binary_literal(i: &str) -> IResult<&str, (i32, NumericType)> {
    preceded(
        char('%'),
        cut(map_res(
            recognize(many0(one_of("01"))),
            |digits: &str| {
                i32::from_str_radix(digits, 2).map(|v| (v, NumericType::for_bits(digits.len())))
            },
        )),
    )(i)
}

fn decimal_literal(i: &str) -> IResult<&str, (i32, NumericType)> {
    map_res(digit1, |digits: &str| {
        digits.parse::<i32>().map(|v| (v, NumericType::Unknown))
    })(i)
}

fn width_suffix(i: &str) -> IResult<&str, NumericType> {
    preceded(
        char('.'),
        alt((
            value(NumericType::Byte, one_of("bB")),
            value(NumericType::Word, one_of("wW")),
            value(NumericType::Long, one_of("lL")),
        )),
    )(i)
}

fn literal(i: &str) -> IResult<&str, (i32, NumericType)> {
    let (i, (v, inferred)) = alt((hex_literal, binary_literal, decimal_literal))(i)?;
    let (i, explicit) = opt(width_suffix)(i)?;
    let (i, _) = cut(not(satisfy(|c| is_word_char(c) || c == '.')))(i)?;
    Ok((i, (v, explicit.unwrap_or(inferred))))
}

fn word(i: &str) -> IResult<&str, TokenValue> {
    map(valid_word, |w| match Mnemonic::from_name(w) {
        Some(m) => TokenValue::Mnemonic(m),
        None => TokenValue::Identifier(w.to_owned()),
    })(i)
}

fn directive(i: &str) -> IResult<&str, TokenValue> {
    map_res(recognize(preceded(char('.'), valid_word)), |name| {
        DirectiveName::from_str(name).map(TokenValue::DirectiveName)
    })(i)
}

fn punctuation(i: &str) -> IResult<&str, TokenValue> {
    map(
        alt((
            value(Punctuation::Scope, tag("::")),
            map(one_of(PUNCTUATION), Punctuation::Char),
        )),
        TokenValue::Punctuation,
    )(i)
}

fn lex_error(rest: &str, location: Location) -> Error {
    let chunk: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
    let kind = match rest.chars().next() {
        Some(c) if c == '$' || c == '%' || c.is_ascii_digit() => {
            ErrorKind::Lex(format!("malformed numeric literal \"{}\"", chunk))
        }
        Some('.') => {
            let name: String = rest
                .chars()
                .skip(1)
                .take_while(|&c| is_word_char(c))
                .collect();
            ErrorKind::UnknownName {
                kind: "directive",
                name: format!(".{}", name),
            }
        }
        Some(c) => ErrorKind::Lex(format!("unexpected character '{}'", c)),
        None => ErrorKind::Lex("unexpected end of line".to_owned()),
    };
    Error::new(kind).at(&location)
}

/// Lexes one line of source.  `location` is where the line starts; each
/// token's offset is relative to it.  The result always ends with a single
/// `EndOfLine` token, even for an empty line.
pub fn tokenize(text: &str, location: &Location) -> Result<Vec<Token>> {
    let base = location.offset.unwrap_or(0);
    let mut tokens = Vec::new();
    let mut rest = text;
    loop {
        rest = rest.trim_start();
        let here = location.with_offset(base + text.len() - rest.len());
        if rest.is_empty() || rest.starts_with(';') {
            tokens.push(Token::new(TokenValue::EndOfLine, here));
            return Ok(tokens);
        }
        if let Ok((next, (v, numeric_type))) = literal(rest) {
            tokens.push(Token::literal(v, numeric_type, here));
            rest = next;
            continue;
        }
        match alt((word, directive, punctuation))(rest) {
            Ok((next, value)) => {
                tokens.push(Token::new(value, here));
                rest = next;
            }
            Err(_) => return Err(lex_error(rest, here)),
        }
    }
}
