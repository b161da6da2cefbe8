#![deny(clippy::self_named_module_files)]
#![warn(clippy::branches_sharing_code)]
#![warn(clippy::cloned_instead_of_copied)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::equatable_if_let)]
#![warn(clippy::explicit_into_iter_loop)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::from_iter_instead_of_collect)]
#![warn(clippy::get_unwrap)]
#![warn(clippy::if_not_else)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::inconsistent_struct_constructor)]
#![warn(clippy::inefficient_to_string)]
#![warn(clippy::items_after_statements)]
#![warn(clippy::manual_assert)]
#![warn(clippy::manual_ok_or)]
#![warn(clippy::map_unwrap_or)]
#![warn(clippy::match_wildcard_for_single_variants)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::str_to_string)]
#![warn(clippy::unnecessary_wraps)]
#![warn(clippy::unnested_or_patterns)]

#[macro_use]
pub mod ast;
pub mod numeric;
pub mod parser;
pub mod rewriter;
pub mod tactic;

use ast::{PrimitivePool, Rc, Term};
use parser::{Command, Parser, ParserError, Position};
use rewriter::{PolyRewriter, RewriterConfig, RewriterError};
use std::io;
use thiserror::Error;

pub type HarrierResult<T> = Result<T, Error>;

/// The options that control how terms are normalized.
#[derive(Debug, Clone)]
pub struct HarrierOptions {
    /// If `true`, nested applications of `+` and `*` are flattened before normalization. When
    /// disabled, sum-of-monomials distribution is disabled as well.
    pub flat: bool,

    /// If `true`, products of sums are distributed into sums of monomials, subject to the
    /// `som_blowup` budget. Enabling this disables `hoist_mul`.
    pub som: bool,

    /// The maximum multiplicative expansion factor permitted during distribution: a product of
    /// arity `n` may expand to at most `som_blowup * n` monomials, and is otherwise left
    /// undistributed.
    pub som_blowup: u32,

    /// If `true`, multiplicative factors shared between summands are extracted: `x*y + x*z`
    /// becomes `x*(y + z)`.
    pub hoist_mul: bool,

    /// If `true`, summands shared between both branches of an `ite` summand (or, for all-numeral
    /// branches, their gcd) are hoisted out of the `ite`.
    pub hoist_ite: bool,

    /// If `true`, the children of `+` are sorted under the monomial order.
    pub sort_sums: bool,

    /// If `true`, the ordinal monomial order is selected and comparison atoms are normalized
    /// with every non-constant monomial on the left-hand side. If `false`, the structural term
    /// order is used and monomials keep their side.
    pub arith_ineq_lhs: bool,

    /// If `true`, repeated multiplicative factors are grouped under `^`: `x*x*y` becomes
    /// `x^2*y`. When disabled, integer powers are instead expanded into products.
    pub use_power: bool,
}

impl Default for HarrierOptions {
    fn default() -> Self {
        Self {
            flat: true,
            som: false,
            som_blowup: 10,
            hoist_mul: false,
            hoist_ite: false,
            sort_sums: false,
            arith_ineq_lhs: false,
            use_power: false,
        }
    }
}

impl HarrierOptions {
    /// Constructs a new `HarrierOptions` with the default values.
    pub fn new() -> Self {
        Self::default()
    }
}

fn wrap_parser_error_message(e: &ParserError, pos: &Position) -> String {
    format!("parser error: {} (on line {}, column {})", e, pos.0, pos.1)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{}", wrap_parser_error_message(.0, .1))]
    Parser(ParserError, Position),

    #[error(transparent)]
    Rewriter(#[from] RewriterError),
}

/// Normalizes a single term to its canonical form under the given options.
pub fn simplify_term(
    pool: &mut PrimitivePool,
    term: &Rc<Term>,
    options: &HarrierOptions,
) -> HarrierResult<Rc<Term>> {
    let config = RewriterConfig::from(options);
    let mut rewriter = PolyRewriter::new(pool, config);
    Ok(rewriter.rewrite(term)?)
}

/// Runs a full script: every `simplify` and `cancel` command produces one output term (for
/// `cancel`, the rebuilt atom).
pub fn run_script<T: io::BufRead>(
    input: T,
    options: &HarrierOptions,
) -> HarrierResult<Vec<Rc<Term>>> {
    let mut pool = PrimitivePool::new();
    let commands = Parser::new(&mut pool, input)?.parse_script()?;
    let config = RewriterConfig::from(options);
    let mut results = Vec::with_capacity(commands.len());
    for command in commands {
        let mut rewriter = PolyRewriter::new(&mut pool, config.clone());
        match command {
            Command::Simplify(term) => results.push(rewriter.rewrite(&term)?),
            Command::Cancel(term) => {
                let term = rewriter.rewrite(&term)?;
                let result = rewriter.cancel_atom(&term).unwrap_or(term);
                results.push(result);
            }
        }
    }
    Ok(results)
}
