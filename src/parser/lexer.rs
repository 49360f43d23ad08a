use itertools::{Itertools, PeekingNext};

use crate::error::{ParseError, ParseErrorKind};

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Equals,
    Or,
    Reference(String),
    Literal(String),
}

/// A token and the 1-based column it starts at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub column: usize,
}

fn escaped_char(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '0' => Some('\0'),
        '"' => Some('"'),
        '\\' => Some('\\'),
        _ => None,
    }
}

/// Resolves backslash escapes in `text` with the same rules as quoted
/// literals.
pub fn unescape(text: &str) -> Result<String> {
    let mut chars = text.chars().enumerate();
    let mut result = String::with_capacity(text.len());

    while let Some((index, c)) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some((_, next)) => result.push(
                escaped_char(next).ok_or_else(|| {
                    ParseError::new(ParseErrorKind::UnknownEscape(next)).at_column(index + 1)
                })?,
            ),
            // A lone trailing backslash has nothing to escape
            None => result.push('\\'),
        }
    }

    Ok(result)
}

pub fn lex_literal(line: &mut impl PeekingNext<Item = (usize, char)>) -> Result<Token> {
    // Consume open quote
    let open = match line.next() {
        Some((index, _)) => index + 1,
        None => return Err(ParseError::new(ParseErrorKind::UnterminatedLiteral)),
    };
    let unterminated = || ParseError::new(ParseErrorKind::UnterminatedLiteral).at_column(open);

    let mut text = String::new();
    loop {
        text.extend(
            line.peeking_take_while(|&(_, c)| c != '"' && c != '\\')
                .map(|(_, c)| c),
        );

        match line.next() {
            Some((_, '"')) => return Ok(Token::Literal(text)),
            Some((index, _)) => {
                let (_, c) = line.next().ok_or_else(unterminated)?;
                let escaped = escaped_char(c).ok_or_else(|| {
                    ParseError::new(ParseErrorKind::UnknownEscape(c)).at_column(index + 1)
                })?;
                text.push(escaped);
            }
            None => return Err(unterminated()),
        }
    }
}

pub fn lex_reference(line: &mut impl PeekingNext<Item = (usize, char)>) -> Token {
    Token::Reference(
        line.peeking_take_while(|&(_, c)| !c.is_whitespace())
            .map(|(_, c)| c)
            .collect(),
    )
}

pub fn lex_line(line: &str) -> Result<Vec<Lexeme>> {
    let mut lexemes = Vec::new();
    let mut chars = line.chars().enumerate().peekable();

    while let Some(&(index, c)) = chars.peek() {
        let column = index + 1;
        let token = match c {
            '=' => {
                chars.next();
                Token::Equals
            }
            '|' => {
                chars.next();
                Token::Or
            }
            '"' => lex_literal(&mut chars)?,
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            _ => lex_reference(&mut chars),
        };
        lexemes.push(Lexeme { token, column });
    }

    Ok(lexemes)
}
