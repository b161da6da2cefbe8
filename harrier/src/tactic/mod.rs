//! A small tactic combinator framework.
//!
//! A [`Goal`] carries a set of assertions; a [`Tactic`] transforms one goal into zero or more
//! subgoals, or fails. The normalizer is exposed as [`SimplifyTactic`]; the combinators in this
//! module compose tactics sequentially, by alternation, and in parallel. Parallel combinators
//! give every worker a private clone of the term pool and translate the winner's result back
//! into the caller's pool, so the hash-consing invariant is never shared across threads.

mod combinators;

pub use combinators::{
    and_then, annotate, cleanup, cond, fail_if, fail_if_branching, if_no_models, if_no_proofs,
    if_no_unsat_cores, or_else, par, par_and_then, repeat, skip_if_failed, try_for, using_params,
};

use crate::{
    ast::{PrimitivePool, Rc, Sort, Term, TermPool},
    rewriter::{gcd_test, CancellationToken, PolyRewriter, RewriterConfig, RewriterError},
    HarrierOptions,
};
use thiserror::Error;

/// A set of assertions to be processed, together with the feature flags of the enclosing solver.
///
/// A goal with no assertions is trivially satisfiable; a goal containing `false` is trivially
/// unsatisfiable. Either state is called *decided*.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    assertions: Vec<Rc<Term>>,
    pub proofs_enabled: bool,
    pub unsat_core_enabled: bool,
    pub models_enabled: bool,
}

impl Goal {
    pub fn new(proofs_enabled: bool, unsat_core_enabled: bool, models_enabled: bool) -> Self {
        Self {
            assertions: Vec::new(),
            proofs_enabled,
            unsat_core_enabled,
            models_enabled,
        }
    }

    pub fn assertions(&self) -> &[Rc<Term>] {
        &self.assertions
    }

    /// Adds an assertion to the goal. `true` is dropped; `false` makes the goal inconsistent,
    /// discarding everything else.
    pub fn assert(&mut self, term: Rc<Term>) {
        if self.is_decided_unsat() || term.is_bool_true() {
            return;
        }
        if term.is_bool_false() {
            self.assertions.clear();
        }
        self.assertions.push(term);
    }

    pub fn is_decided_sat(&self) -> bool {
        self.assertions.is_empty()
    }

    pub fn is_decided_unsat(&self) -> bool {
        self.assertions.iter().any(|t| t.is_bool_false())
    }

    pub fn is_decided(&self) -> bool {
        self.is_decided_sat() || self.is_decided_unsat()
    }

    /// An empty goal with the same feature flags.
    fn derived(&self) -> Self {
        Self::new(
            self.proofs_enabled,
            self.unsat_core_enabled,
            self.models_enabled,
        )
    }

    /// Re-adds every assertion into `pool`. Used to move a goal produced in a worker's private
    /// pool back into the caller's pool.
    fn translate_into(&self, pool: &mut PrimitivePool) -> Self {
        Self {
            assertions: self.assertions.iter().map(|a| pool.translate(a)).collect(),
            proofs_enabled: self.proofs_enabled,
            unsat_core_enabled: self.unsat_core_enabled,
            models_enabled: self.models_enabled,
        }
    }
}

#[derive(Debug, Error)]
pub enum TacticError {
    #[error("tactic '{0}' is not applicable to the goal")]
    NotApplicable(&'static str),

    #[error("tactic '{0}' timed out")]
    Timeout(&'static str),

    #[error("tactic '{0}' produced {1} subgoals")]
    Branching(&'static str, usize),

    #[error(transparent)]
    Rewriter(#[from] RewriterError),
}

impl TacticError {
    /// Failures that alternation combinators may recover from. Cancellations and rewriter errors
    /// are rethrown unchanged.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TacticError::NotApplicable(_) | TacticError::Timeout(_) | TacticError::Branching(..)
        )
    }
}

pub type TacticResult = Result<Vec<Goal>, TacticError>;

pub trait Tactic: Send + Sync {
    fn name(&self) -> &'static str;

    /// Applies the tactic to a goal. The cancellation token is checked cooperatively; a tripped
    /// token surfaces as `TacticError::Rewriter(RewriterError::Cancelled)`.
    fn apply(&self, pool: &mut PrimitivePool, goal: &Goal, cancel: &CancellationToken)
        -> TacticResult;

    /// Reconfigures the tactic. Combinators forward the options to their whole subtree.
    fn updt_options(&mut self, _options: &HarrierOptions) {}
}

/// The tactic that leaves the goal unchanged.
pub struct Skip;

impl Tactic for Skip {
    fn name(&self) -> &'static str {
        "skip"
    }

    fn apply(&self, _: &mut PrimitivePool, goal: &Goal, _: &CancellationToken) -> TacticResult {
        Ok(vec![goal.clone()])
    }
}

/// The tactic that always fails.
pub struct Fail;

impl Tactic for Fail {
    fn name(&self) -> &'static str {
        "fail"
    }

    fn apply(&self, _: &mut PrimitivePool, _: &Goal, _: &CancellationToken) -> TacticResult {
        Err(TacticError::NotApplicable(self.name()))
    }
}

/// The tactic wrapping the polynomial rewriter: every assertion is normalized, and integer
/// equalities that the gcd test refutes close the goal as unsatisfiable.
pub struct SimplifyTactic {
    options: HarrierOptions,
}

impl SimplifyTactic {
    pub fn new(options: HarrierOptions) -> Self {
        Self { options }
    }
}

impl Default for SimplifyTactic {
    fn default() -> Self {
        Self::new(HarrierOptions::default())
    }
}

impl Tactic for SimplifyTactic {
    fn name(&self) -> &'static str {
        "simplify"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        let config = RewriterConfig::from(&self.options);
        let mut rewriter = PolyRewriter::new(pool, config).with_cancel(cancel.clone());
        let rewritten = goal
            .assertions()
            .iter()
            .map(|a| rewriter.rewrite(a))
            .collect::<Result<Vec<_>, RewriterError>>()?;
        drop(rewriter);

        let mut result = goal.derived();
        for term in rewritten {
            let refuted = match_term!((= l r) = &term).is_some_and(|(l, r)| {
                pool.sort(l).as_sort() == Some(&Sort::Int) && !gcd_test(l, r)
            });
            if refuted {
                let f = pool.bool_false();
                result.assert(f);
            } else {
                result.assert(term);
            }
        }
        Ok(vec![result])
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        self.options = options.clone();
    }
}
