use crate::error::{Error, ErrorKind, Location, LocationExt, Result};

pub use directive::{Directive, DirectiveArgument, DirectiveKind, DirectiveName};
pub use instruction::mnemonic::Mnemonic;
pub use instruction::operand::{AddressingMode, Argument, SymbolTable};
pub use instruction::Instruction;
pub use token::{tokenize, NumericType, Punctuation, Token, TokenValue};

mod directive;
mod instruction;
mod token;

/// One element of a source line.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LineItem {
    Instruction(Instruction),
    Directive(Directive),
    Label(String),
}

/// The items parsed from one source line, with the line's location.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Statement {
    pub items: Vec<LineItem>,
    pub location: Location,
}

/// Cursor over the tokens of one line.
pub(crate) struct TokenStream<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        TokenStream {
            tokens,
            position: 0,
        }
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.position + n)
    }

    pub fn peek_value(&self) -> Option<&'a TokenValue> {
        self.peek().map(Token::value)
    }

    pub fn advance(&mut self) -> Option<&'a Token> {
        let token = self.peek();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Consumes the punctuation character `c` if it comes next.
    pub fn eat(&mut self, c: char) -> bool {
        let found = self.peek().map_or(false, |t| t.is_punctuation(c));
        if found {
            self.position += 1;
        }
        found
    }

    pub fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", c)))
        }
    }

    /// Consumes a register name (`A`, `X`, `Y` or `S`) if it comes next.
    pub fn eat_register(&mut self, register: &str) -> bool {
        let found = self
            .peek()
            .and_then(Token::identifier)
            .map_or(false, |name| name.eq_ignore_ascii_case(register));
        if found {
            self.position += 1;
        }
        found
    }

    pub fn at_end(&self) -> bool {
        self.peek().map_or(true, Token::is_end_of_line)
    }

    pub fn expect_end(&mut self) -> Result<()> {
        if self.at_end() {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected("end of line"))
        }
    }

    pub fn location(&self) -> Location {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.location().clone())
            .unwrap_or_default()
    }

    pub fn unexpected(&self, wanted: &str) -> Error {
        let found = match self.peek() {
            Some(token) => token.to_string(),
            None => "end of input".to_owned(),
        };
        Error::new(ErrorKind::Syntax(format!("expected {}, found {}", wanted, found)))
            .at(&self.location())
    }
}

pub(crate) fn is_register(name: &str) -> bool {
    ["A", "X", "Y", "S"]
        .iter()
        .any(|r| r.eq_ignore_ascii_case(name))
}

/// A single operand value: a literal, a symbol, or a signed literal.
/// The width is only known for unsigned literals.
pub(crate) fn parse_argument(stream: &mut TokenStream) -> Result<(Argument, NumericType)> {
    let negate = stream.eat('-');
    let signed = negate || stream.eat('+');
    let token = match stream.peek() {
        Some(token) => token,
        None => return Err(stream.unexpected("an operand")),
    };
    let parsed = match token.value() {
        TokenValue::Literal(v) if negate => (Argument::new(-v), NumericType::Unknown),
        TokenValue::Literal(v) if signed => (Argument::new(*v), NumericType::Unknown),
        TokenValue::Literal(v) => (Argument::new(*v), token.numeric_type()),
        TokenValue::Identifier(name) if !signed && !is_register(name) => {
            (Argument::symbol(name), NumericType::Unknown)
        }
        _ => return Err(stream.unexpected("an operand")),
    };
    stream.advance();
    Ok(parsed)
}

/// Parses the tokens of one statement:
///
/// ```text
/// [label ':'] [mnemonic operands | directive arguments] EOL
/// name .EQU value
/// ```
pub fn assemble_tokens(tokens: &[Token]) -> Result<Vec<LineItem>> {
    let mut stream = TokenStream::new(tokens);
    let mut items = Vec::new();

    if let Some(TokenValue::Identifier(name)) = stream.peek_value() {
        let next = stream.peek_nth(1).map(Token::value);
        match next {
            Some(TokenValue::Punctuation(Punctuation::Char(':')))
            | Some(TokenValue::Punctuation(Punctuation::Scope)) => {
                stream.advance();
                stream.advance();
            }
            Some(TokenValue::DirectiveName(DirectiveName::Equ)) => {
                stream.advance();
            }
            _ => {
                stream.advance();
                return Err(stream.unexpected("':' after label"));
            }
        }
        items.push(LineItem::Label(name.clone()));
    }

    match stream.peek_value() {
        Some(TokenValue::Mnemonic(_)) => {
            items.push(LineItem::Instruction(Instruction::parse(&mut stream)?))
        }
        Some(TokenValue::DirectiveName(name)) => {
            let location = stream.location();
            if *name == DirectiveName::Equ && !matches!(items.first(), Some(LineItem::Label(_))) {
                return Err(Error::new(ErrorKind::Syntax(
                    ".EQU needs a name to define".to_owned(),
                ))
                .at(&location));
            }
            items.push(LineItem::Directive(Directive::parse(&mut stream)?))
        }
        _ => {}
    }

    stream.expect_end()?;
    Ok(items)
}

pub fn parse_line(text: &str, location: &Location) -> Result<Statement> {
    let tokens = tokenize(text, location)?;
    let items = assemble_tokens(&tokens).at(location)?;
    Ok(Statement {
        items,
        location: location.clone(),
    })
}

pub fn parse(source: &str, path: &str) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    let mut offset = 0;
    for line in source.split('\n') {
        let location = Location::new(path, offset);
        offset += line.len() + 1;
        let statement = parse_line(line.trim_end_matches('\r'), &location)?;
        if !statement.items.is_empty() {
            statements.push(statement);
        }
    }
    Ok(statements)
}
