//! The abstract syntax tree (AST) for arithmetic expressions.
//!
//! Terms are stored in a hash-consed DAG managed by a [`PrimitivePool`]: structurally equal terms
//! share one allocation, so equality is pointer equality and the normalizer can compare and hash
//! terms in constant time.

#[macro_use]
mod macros;
pub mod pool;
mod printer;
mod rc;
mod term;
#[cfg(test)]
mod tests;

pub use pool::{PrimitivePool, TermPool};
pub use rc::Rc;
pub use term::{Constant, Operator, Sort, Term};
