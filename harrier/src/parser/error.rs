use crate::ast::{Rc, Sort, Term};
use rug::Integer;
use std::fmt;
use thiserror::Error;

/// The error type for the lexer and parser.
#[derive(Debug, Error)]
pub enum ParserError {
    /// The lexer encountered an unexpected character.
    #[error("unexpected character: '{0}'")]
    UnexpectedChar(char),

    /// The lexer encountered the end of the input while reading a token.
    #[error("unexpected EOF in token")]
    EofInToken,

    /// The parser encountered an unexpected token.
    #[error("unexpected token: '{0}'")]
    UnexpectedToken(super::Token),

    /// The parser encountered an unknown symbol.
    #[error("unknown symbol: '{0}'")]
    UndefinedIden(String),

    /// The parser encountered an unknown sort.
    #[error("unknown sort: '{0}'")]
    UndefinedSort(String),

    /// A symbol was declared twice.
    #[error("identifier '{0}' is already defined")]
    RedefinedIden(String),

    /// An operator was applied to the wrong number of arguments.
    #[error("expected {expected} arguments, got {got}")]
    WrongNumberOfArgs { expected: ExpectedArity, got: usize },

    /// A term had an unexpected sort.
    #[error("expected term of sort {expected}, got '{got}'")]
    SortError { expected: Sort, got: Rc<Term> },

    /// The arguments of an arithmetic operator mix incompatible sorts.
    #[error("arguments of '{0}' mix incompatible sorts")]
    IncompatibleSorts(String),

    /// A modulus that is not a positive integer.
    #[error("invalid modulus: '{0}'")]
    InvalidModulus(Integer),

    /// Division of numerals by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// `/` applied to something other than numerals. The toolkit has no division operator; the
    /// syntax only exists to write rational constants.
    #[error("'/' is only supported between numerals")]
    DivisionOfNonNumerals,

    /// A term that is not of an arithmetic sort appeared under an arithmetic operator.
    #[error("expected term of arithmetic sort, got '{0}'")]
    ExpectedArithmeticTerm(Rc<Term>),

    /// The `cancel` command expects a comparison atom.
    #[error("expected comparison atom, got '{0}'")]
    ExpectedComparison(Rc<Term>),

    /// Application of a symbol that is not a function.
    #[error("'{0}' is not a function")]
    NotAFunction(Rc<Term>),
}

/// The number of arguments an operator expects.
#[derive(Debug)]
pub enum ExpectedArity {
    Exactly(usize),
    AtLeast(usize),
}

impl fmt::Display for ExpectedArity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExpectedArity::Exactly(n) => write!(f, "{}", n),
            ExpectedArity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}
