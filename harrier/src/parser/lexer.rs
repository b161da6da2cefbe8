//! A lexer for the SMT-LIB-flavored surface syntax.

use super::ParserError;
use crate::Error;
use rug::{ops::Pow, Integer, Rational};
use std::{
    fmt,
    io::{self, BufRead},
    str::FromStr,
};

/// A token in the surface syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// The `(` token.
    OpenParen,

    /// The `)` token.
    CloseParen,

    /// A symbol: a non-empty sequence of letters, digits, or any of these characters: `+`, `-`,
    /// `/`, `*`, `=`, `%`, `?`, `!`, `.`, `$`, `_`, `~`, `&`, `^`, `<`, `>`, or `@`.
    Symbol(String),

    /// A keyword: a symbol preceded by `:`, stored without the `:`.
    Keyword(String),

    /// An integer numeral literal.
    Numeral(Integer),

    /// A decimal literal, stored as an exact rational.
    Decimal(Rational),

    /// The end of the input.
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::OpenParen => write!(f, "("),
            Token::CloseParen => write!(f, ")"),
            Token::Symbol(s) => write!(f, "{}", s),
            Token::Keyword(k) => write!(f, ":{}", k),
            Token::Numeral(n) => write!(f, "{}", n),
            Token::Decimal(r) => write!(f, "{}", r),
            Token::Eof => write!(f, "<EOF>"),
        }
    }
}

/// Returns `true` if the character is a valid symbol character.
pub fn is_symbol_character(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "+-/*=%?!.$_~&^<>@".contains(ch)
}

/// Represents a position (line and column numbers) in the source input.
pub type Position = (usize, usize);

/// A lexer over anything that implements `BufRead`. Input is consumed one line at a time; the
/// current line is kept as a character buffer with a cursor into it.
pub struct Lexer<R> {
    input: R,
    line: Vec<char>,
    cursor: usize,
    exhausted: bool,
    position: Position,
}

impl<R: BufRead> Lexer<R> {
    /// Constructs a new `Lexer`. This can fail on an IO error while reading the first line.
    pub fn new(input: R) -> io::Result<Self> {
        let mut lexer = Lexer {
            input,
            line: Vec::new(),
            cursor: 0,
            exhausted: false,
            position: (0, 0),
        };
        lexer.advance_line()?;
        Ok(lexer)
    }

    /// The character under the cursor, if any. `None` at the end of a line means the input is
    /// exhausted, because `advance` always refills the buffer first.
    fn peek(&self) -> Option<char> {
        self.line.get(self.cursor).copied()
    }

    /// Moves the cursor one character forward, refilling the line buffer when it runs out.
    fn advance(&mut self) -> io::Result<()> {
        self.cursor += 1;
        self.position.1 += 1;
        while self.cursor >= self.line.len() && !self.exhausted {
            self.advance_line()?;
        }
        Ok(())
    }

    /// Discards the rest of the current line and reads the next one.
    fn advance_line(&mut self) -> io::Result<()> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            self.exhausted = true;
            self.line.clear();
        } else {
            self.line = buf.chars().collect();
            self.position.0 += 1;
            self.position.1 = 1;
        }
        self.cursor = 0;
        Ok(())
    }

    /// Advances past whitespace and `;` comments.
    fn skip_trivia(&mut self) -> io::Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.advance()?,
                Some(';') => self.advance_line()?,
                _ => return Ok(()),
            }
        }
    }

    /// Collects characters into a string while the predicate holds.
    fn take_while<P: Fn(char) -> bool>(&mut self, predicate: P) -> io::Result<String> {
        let mut result = String::new();
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            result.push(c);
            self.advance()?;
        }
        Ok(result)
    }

    /// Reads the next token from the input.
    pub fn next_token(&mut self) -> Result<(Token, Position), Error> {
        self.skip_trivia()?;
        let start = self.position;
        let token = match self.peek() {
            None => Token::Eof,
            Some('(') => {
                self.advance()?;
                Token::OpenParen
            }
            Some(')') => {
                self.advance()?;
                Token::CloseParen
            }
            Some(':') => {
                self.advance()?;
                Token::Keyword(self.take_while(is_symbol_character)?)
            }
            Some(c) if c.is_ascii_digit() => self.read_number()?,
            Some(c) if is_symbol_character(c) => Token::Symbol(self.take_while(is_symbol_character)?),
            Some(other) => return Err(Error::Parser(ParserError::UnexpectedChar(other), start)),
        };
        Ok((token, start))
    }

    /// Reads a numeral or a decimal. A decimal `i.f` with `n` fractional digits denotes the
    /// rational `i·10ⁿ + f / 10ⁿ`.
    fn read_number(&mut self) -> Result<Token, Error> {
        let int_part = self.take_while(|c| c.is_ascii_digit())?;
        if self.peek() != Some('.') {
            let value = Integer::from_str(&int_part).expect("sequence of digits");
            return Ok(Token::Numeral(value));
        }

        self.advance()?;
        let frac_part = self.take_while(|c| c.is_ascii_digit())?;
        if frac_part.is_empty() {
            return Err(Error::Parser(ParserError::EofInToken, self.position));
        }
        let denom = Integer::from(10u32).pow(frac_part.len() as u32);
        let numer: Integer = (int_part + &frac_part).parse().expect("sequence of digits");
        Ok(Token::Decimal(Rational::from((numer, denom))))
    }
}
