use crate::ast::{Rc, Term};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriterError {
    /// The cancellation token was tripped by the enclosing framework. Rewriting is pure, so the
    /// caller can safely discard the partial work.
    #[error("rewriting was cancelled")]
    Cancelled,

    /// A structural contract was violated by the caller, e.g. cancelling monomials over a
    /// non-arithmetic term.
    #[error("term '{0}' is not a valid operand for this operation")]
    BadOperand(Rc<Term>),
}
