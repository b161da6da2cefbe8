//! The polynomial rewriter.
//!
//! This module implements a bottom-up normalizer for arithmetic terms built from `+`, `*`, unary
//! and n-ary `-`, and integer `^`, over exact rational constants. It reduces such terms to a
//! canonical sum of monomials: nested sums and products are flattened, constants are folded into
//! a single leading coefficient, monomials with equal power products are merged, and the summands
//! are sorted under a total monomial order.
//!
//! Each local rewrite rule returns a [`RewriteStatus`] telling the driver how much more work the
//! result needs. This is the module's central control channel: a rule does exactly one local
//! transformation and delegates the rest upward, so the driver never recurses into subterms that
//! are already canonical.

mod cancel;
mod error;
mod hoist;
mod order;

pub use cancel::gcd_test;
pub use error::RewriterError;
pub use order::MonomialOrd;

use crate::{
    ast::{Operator, PrimitivePool, Rc, Sort, Term, TermPool},
    numeric, HarrierOptions,
};
use ahash::AHashSet;
use indexmap::IndexMap;
use rug::Rational;
use std::sync::{
    atomic::{AtomicBool, Ordering as AtomicOrdering},
    Arc,
};

/// The result of applying a single rewrite rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStatus {
    /// The result is fully canonical; no further work is needed.
    Done,

    /// The result needs one more rewriting step applied to its root.
    Rewrite1,

    /// The result needs rewriting steps applied to its top two levels.
    Rewrite2,

    /// The result must be rewritten again to a fixed point.
    RewriteFull,

    /// The rule declined to rewrite; the caller assembles the default application itself.
    Failed,
}

type Step = (RewriteStatus, Option<Rc<Term>>);

fn done(t: Rc<Term>) -> Step {
    (RewriteStatus::Done, Some(t))
}

fn failed() -> Step {
    (RewriteStatus::Failed, None)
}

/// A cooperative cancellation flag, checked between rewrite steps. Cloning the token shares the
/// flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// The configuration of a [`PolyRewriter`]. This is usually derived from [`HarrierOptions`],
/// which applies the dependencies between options.
#[derive(Debug, Clone)]
pub struct RewriterConfig {
    /// Flatten nested applications of `+` and `*`.
    pub flat: bool,

    /// Distribute products over sums (the "sum of monomials" form).
    pub som: bool,

    /// The maximum expansion factor allowed when distributing products over sums.
    pub som_blowup: u32,

    /// Extract factors shared between summands.
    pub hoist_mul: bool,

    /// Extract summands (or an integer gcd) shared between the branches of an `ite` summand.
    pub hoist_ite: bool,

    /// Sort the children of `+`.
    pub sort_sums: bool,

    /// Use the structural term order instead of the ordinal order.
    pub ast_order: bool,

    /// Group repeated multiplicative factors under `^`.
    pub use_power: bool,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            flat: true,
            som: false,
            som_blowup: 10,
            hoist_mul: false,
            hoist_ite: false,
            sort_sums: false,
            ast_order: true,
            use_power: false,
        }
    }
}

impl From<&HarrierOptions> for RewriterConfig {
    fn from(options: &HarrierOptions) -> Self {
        let mut config = Self {
            flat: options.flat,
            som: options.som,
            som_blowup: options.som_blowup,
            hoist_mul: options.hoist_mul,
            hoist_ite: options.hoist_ite,
            sort_sums: options.sort_sums,
            ast_order: !options.arith_ineq_lhs,
            use_power: options.use_power,
        };
        if !config.flat {
            config.som = false;
        }
        if config.som {
            config.hoist_mul = false;
        }
        config
    }
}

/// The polynomial rewriter.
///
/// The rewriter borrows the term pool for the duration of a call and returns freshly constructed
/// terms through it; terms are never mutated. The only mutable state it owns are scratch buffers
/// (reset, not reallocated, at each top-level entry) and the sort of the coefficients currently
/// being folded.
pub struct PolyRewriter<'a> {
    pool: &'a mut PrimitivePool,
    config: RewriterConfig,
    curr_sort: Sort,
    cancel: Option<CancellationToken>,

    // Scratch state for `mk_nflat_add` and `cancel_monomials`
    expr2pos: IndexMap<Rc<Term>, usize>,
    visited: AHashSet<Rc<Term>>,
    multiple: AHashSet<Rc<Term>>,
}

impl<'a> PolyRewriter<'a> {
    pub fn new(pool: &'a mut PrimitivePool, config: RewriterConfig) -> Self {
        Self {
            pool,
            config,
            curr_sort: Sort::Int,
            cancel: None,
            expr2pos: IndexMap::new(),
            visited: AHashSet::new(),
            multiple: AHashSet::new(),
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }

    /// Rewrites a term bottom-up to its canonical form.
    pub fn rewrite(&mut self, term: &Rc<Term>) -> Result<Rc<Term>, RewriterError> {
        self.check_cancel()?;
        match term.as_ref() {
            Term::Op(op, args) => {
                let args = args
                    .iter()
                    .map(|a| self.rewrite(a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.apply(*op, args)
            }
            Term::App(f, args) => {
                let args = args
                    .iter()
                    .map(|a| self.rewrite(a))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.pool.add(Term::App(f.clone(), args)))
            }
            _ => Ok(term.clone()),
        }
    }

    /// Rewrites only the top `depth` levels of a term, assuming everything below is already in
    /// normal form.
    fn rewrite_shallow(&mut self, term: &Rc<Term>, depth: u32) -> Result<Rc<Term>, RewriterError> {
        if depth == 0 {
            return Ok(term.clone());
        }
        match term.as_ref() {
            Term::Op(op, args) => {
                let args = if depth > 1 {
                    args.iter()
                        .map(|a| self.rewrite_shallow(a, depth - 1))
                        .collect::<Result<Vec<_>, _>>()?
                } else {
                    args.to_vec()
                };
                self.apply(*op, args)
            }
            _ => Ok(term.clone()),
        }
    }

    /// Applies the local rule for `op` and finishes the result according to the returned status.
    fn apply(&mut self, op: Operator, args: Vec<Rc<Term>>) -> Result<Rc<Term>, RewriterError> {
        self.check_cancel()?;
        let (status, result) = self.step(op, &args);
        match (status, result) {
            (RewriteStatus::Failed, _) => Ok(self.pool.add(Term::Op(op, args))),
            (RewriteStatus::Done, Some(r)) => Ok(r),
            (RewriteStatus::Rewrite1, Some(r)) => self.rewrite_shallow(&r, 1),
            (RewriteStatus::Rewrite2, Some(r)) => self.rewrite_shallow(&r, 2),
            (RewriteStatus::RewriteFull, Some(r)) => self.rewrite(&r),
            (_, None) => unreachable!("rewrite rule returned no result"),
        }
    }

    /// The single-step rule dispatch. Children are assumed to be already rewritten.
    fn step(&mut self, op: Operator, args: &[Rc<Term>]) -> Step {
        match op {
            Operator::Add | Operator::Mult if args.len() == 1 => done(args[0].clone()),
            Operator::Add if args.len() >= 2 => {
                self.set_curr_sort(args);
                if self.config.flat {
                    self.mk_flat_add(args)
                } else {
                    self.mk_nflat_add(args)
                }
            }
            Operator::Mult if args.len() >= 2 => {
                self.set_curr_sort(args);
                if self.config.flat {
                    self.mk_flat_mul(args)
                } else {
                    self.mk_nflat_mul(args)
                }
            }
            Operator::Sub if args.len() == 1 => {
                self.set_curr_sort(args);
                self.mk_uminus(&args[0])
            }
            Operator::Sub if args.len() >= 2 => {
                self.set_curr_sort(args);
                self.mk_sub(args)
            }
            Operator::Pow if args.len() == 2 => {
                self.set_curr_sort(&args[..1]);
                self.mk_pow(&args[0], &args[1])
            }
            op if op.is_comparison() && args.len() == 2 => self.step_comparison(op, args),
            _ => failed(),
        }
    }

    /// Normalizes an atom `lhs ⋈ rhs` by folding constant comparisons and cancelling monomials
    /// that occur on both sides.
    fn step_comparison(&mut self, op: Operator, args: &[Rc<Term>]) -> Step {
        if let (Some(a), Some(b)) = (args[0].as_number(), args[1].as_number()) {
            let value = match op {
                Operator::Equals => a == b,
                Operator::LessThan => a < b,
                Operator::LessEq => a <= b,
                Operator::GreaterThan => a > b,
                Operator::GreaterEq => a >= b,
                _ => unreachable!(),
            };
            return done(self.pool.bool_constant(value));
        }
        let sort = self.pool.sort(&args[0]);
        if !sort.as_sort().is_some_and(Sort::is_arithmetic) {
            return failed();
        }
        // When the ordinal order is selected (`arith_ineq_lhs`), atoms are normalized with every
        // non-constant monomial moved to the left-hand side
        let move_to_lhs = !self.config.ast_order;
        match self.cancel_monomials(&args[0], &args[1], move_to_lhs) {
            Some((lhs, rhs)) => {
                if lhs.is_number() && rhs.is_number() {
                    // Both sides collapsed to constants, so the atom folds to a boolean
                    self.step_comparison(op, &[lhs, rhs])
                } else {
                    done(self.pool.add(Term::Op(op, vec![lhs, rhs])))
                }
            }
            None => failed(),
        }
    }

    fn mk_uminus(&mut self, arg: &Rc<Term>) -> Step {
        if let Some(a) = arg.as_number() {
            let mut a = -a;
            numeric::normalize(&mut a, &self.curr_sort);
            let t = self.mk_numeral(a);
            done(t)
        } else {
            let t = self.mk_mul_coeff(Rational::from(-1), arg.clone());
            (RewriteStatus::Rewrite1, Some(t))
        }
    }

    fn mk_sub(&mut self, args: &[Rc<Term>]) -> Step {
        let mut new_args = Vec::with_capacity(args.len());
        new_args.push(args[0].clone());
        for arg in &args[1..] {
            if arg.is_zero() {
                continue;
            }
            let minus_one = self.mk_numeral(Rational::from(-1));
            let t = self.mk_mul_app(vec![minus_one, arg.clone()]);
            new_args.push(t);
        }
        let t = self.mk_add_app(new_args);
        (RewriteStatus::Rewrite2, Some(t))
    }

    fn mk_pow(&mut self, base: &Rc<Term>, exp: &Rc<Term>) -> Step {
        let Some(k) = exp.as_integer() else {
            return failed();
        };
        if k == 1 {
            return done(base.clone());
        }
        if let Some(b) = base.as_number() {
            // Constant folding; 0^0 is left alone
            if !(b.is_zero() && k == 0) && k >= 0 {
                if let Some(k) = k.to_u32() {
                    let mut c = Rational::from(1);
                    for _ in 0..k {
                        c *= &b;
                    }
                    numeric::normalize(&mut c, &self.curr_sort);
                    return done(self.mk_numeral(c));
                }
            }
            return failed();
        }
        if self.config.use_power || k < 2 {
            // Canonical as is (or a symbolic corner we leave alone)
            return failed();
        }
        let Some(k) = k.to_usize() else {
            return failed();
        };
        let t = self.mk_mul_app(vec![base.clone(); k]);
        (RewriteStatus::Rewrite2, Some(t))
    }

    // ---------------------------------------------------------------- multiplication

    fn mk_flat_mul(&mut self, args: &[Rc<Term>]) -> Step {
        // Only try to apply flattening if the term is not already in one of the flat monomial
        // forms `(* c x)` or `(* c (* x_1 ... x_n))`
        let in_monomial_form = args.len() == 2
            && args[0].is_number()
            && !matches!(args[1].as_ref(), Term::Op(Operator::Mult, inner) if inner[0].is_number());
        if !in_monomial_form && args.iter().any(|a| a.is_mul()) {
            let mut flat_args = Vec::with_capacity(args.len());
            for arg in args {
                if arg.is_mul() {
                    // The stack handles inputs like (* (* c (* xs)) (* d (* ys)))
                    let mut todo = vec![arg.clone()];
                    while let Some(curr) = todo.pop() {
                        match curr.as_ref() {
                            Term::Op(Operator::Mult, inner) => {
                                todo.extend(inner.iter().rev().cloned());
                            }
                            _ => flat_args.push(curr),
                        }
                    }
                } else {
                    flat_args.push(arg.clone());
                }
            }
            let (status, result) = self.mk_nflat_mul(&flat_args);
            if status == RewriteStatus::Failed {
                let t = self.mk_mul_app(flat_args);
                return done(t);
            }
            return (status, result);
        }
        self.mk_nflat_mul(args)
    }

    fn mk_nflat_mul(&mut self, args: &[Rc<Term>]) -> Step {
        debug_assert!(args.len() >= 2);
        // Cheap case: (* c x) with c a folded non-trivial numeral and x an atom
        if args.len() == 2
            && args[0]
                .as_number()
                .is_some_and(|a| a != 0 && a != 1 && self.is_normalized(&a))
            && is_arith_atom(&args[1])
        {
            return failed();
        }

        let mut c = Rational::from(1);
        let mut num_coeffs = 0usize;
        let mut num_add = 0usize;
        let mut var: Option<&Rc<Term>> = None;
        for arg in args {
            if let Some(a) = arg.as_number() {
                num_coeffs += 1;
                c *= a;
            } else {
                var = Some(arg);
                if arg.is_add() {
                    num_add += 1;
                }
            }
        }
        numeric::normalize(&mut c, &self.curr_sort);

        // (* c_1 ... c_n) --> c_1*...*c_n
        if num_coeffs == args.len() {
            let t = self.mk_numeral(c);
            return done(t);
        }

        // (* s ... 0 ... r) --> 0
        if c == 0 {
            let t = self.mk_numeral(c);
            return done(t);
        }

        if num_coeffs == args.len() - 1 {
            let var = var.expect("one non-numeric argument").clone();
            // (* c_1 ... c_n x) --> x  if c_1*...*c_n == 1
            if c == 1 {
                return done(var);
            }

            if let Term::Op(Operator::Mult, inner) = var.as_ref() {
                // Apply basic simplification even when flattening is not enabled:
                // (* c1 (* c2 x)) --> (* c1*c2 x)
                if inner.len() == 2 && inner[0].is_number() {
                    let c_prime = inner[0].as_number().expect("numeral");
                    let rest = inner[1].clone();
                    c *= c_prime;
                    numeric::normalize(&mut c, &self.curr_sort);
                    let t = self.mk_mul_coeff(c, rest);
                    return (RewriteStatus::Rewrite1, Some(t));
                }
                // The argument is a power product; the flat path deals with it
                return failed();
            }

            if !var.is_add() {
                if args.len() == 2
                    && args[1] == var
                    && args[0].as_number().is_some_and(|a| a == c)
                {
                    // Already simplified
                    return failed();
                }
                // (* c_1 ... c_n x) --> (* c_1*...*c_n x)
                let t = self.mk_mul_coeff(c, var);
                return done(t);
            }

            // (* c_1 ... c_n (+ t_1 ... t_m)) --> (+ (* c t_1) ... (* c t_m))
            let Term::Op(Operator::Add, summands) = var.as_ref() else {
                unreachable!()
            };
            let summands = summands.clone();
            let mut new_add_args = Vec::with_capacity(summands.len());
            for s in summands {
                let t = self.mk_mul_coeff(c.clone(), s);
                new_add_args.push(t);
            }
            let t = self.mk_add_app(new_add_args);
            return (RewriteStatus::Rewrite2, Some(t));
        }

        if num_coeffs > 1 || (num_coeffs == 1 && !args[0].is_number()) {
            // Fold the numerals together and put the coefficient first
            let non_numeric: Vec<_> = args.iter().filter(|a| !a.is_number()).cloned().collect();
            let t = self.mk_mul_app(non_numeric);
            let t = self.mk_mul_coeff(c, t);
            return (RewriteStatus::Rewrite2, Some(t));
        }

        debug_assert!(num_coeffs <= args.len() - 2);

        if !self.config.som || num_add == 0 {
            let ord = MonomialOrd::new(&self.config);
            let mut new_args = Vec::with_capacity(args.len());
            let mut ordered = true;
            {
                let pool = &*self.pool;
                let mut prev: Option<&Rc<Term>> = None;
                for arg in args {
                    if arg.is_number() {
                        continue;
                    }
                    if let Some(p) = prev {
                        if ord.lt(pool, arg, p) {
                            ordered = false;
                        }
                    }
                    new_args.push(arg.clone());
                    prev = Some(arg);
                }
                if ordered && num_coeffs == 0 && !self.config.use_power {
                    return failed();
                }
                if !ordered {
                    new_args.sort_by(|a, b| ord.compare(pool, a, b));
                }
            }
            debug_assert!(new_args.len() >= 2);
            let t = self.mk_mul_app(new_args);
            let t = self.mk_mul_coeff(c, t);
            return done(t);
        }

        // Sum of monomials: distribute the product over the sums, under a budget. Every non-sum
        // factor is treated as a sum with a single element.
        let sums: Vec<&[Rc<Term>]> = args
            .iter()
            .map(|arg| match arg.as_ref() {
                Term::Op(Operator::Add, summands) => summands.as_slice(),
                _ => std::slice::from_ref(arg),
            })
            .collect();
        let sizes: Vec<usize> = sums.iter().map(|s| s.len()).collect();
        let budget = self.config.som_blowup as usize * args.len();
        let mut it = vec![0usize; sums.len()];
        let mut sum = Vec::new();
        loop {
            if sum.len() > budget {
                return failed();
            }
            let product: Vec<_> = sums.iter().zip(&it).map(|(s, &i)| s[i].clone()).collect();
            let t = self.mk_mul_app(product);
            sum.push(t);
            if !product_iterator_next(&sizes, &mut it) {
                break;
            }
        }
        let t = self.mk_add_app(sum);
        (RewriteStatus::Rewrite2, Some(t))
    }

    // ---------------------------------------------------------------- addition

    fn mk_flat_add(&mut self, args: &[Rc<Term>]) -> Step {
        if args.iter().any(|a| a.is_add()) {
            let mut flat_args = Vec::with_capacity(args.len());
            for arg in args {
                // All rewrites are depth one, so a single level of splicing is enough
                match arg.as_ref() {
                    Term::Op(Operator::Add, inner) => flat_args.extend(inner.iter().cloned()),
                    _ => flat_args.push(arg.clone()),
                }
            }
            let (status, result) = self.mk_nflat_add(&flat_args);
            if status == RewriteStatus::Failed {
                let t = self.mk_add_app(flat_args);
                return done(t);
            }
            return (status, result);
        }
        self.mk_nflat_add(args)
    }

    fn mk_nflat_add(&mut self, args: &[Rc<Term>]) -> Step {
        debug_assert!(args.len() >= 2);
        let ord = MonomialOrd::new(&self.config);
        let mut c = Rational::new();
        let mut num_coeffs = 0usize;
        let mut has_multiple = false;
        let mut ordered = true;
        self.visited.clear();
        self.multiple.clear();
        {
            let pool = &*self.pool;
            let mut prev: Option<&Rc<Term>> = None;
            for (i, arg) in args.iter().enumerate() {
                if let Some(a) = arg.as_number() {
                    num_coeffs += 1;
                    c += a;
                    ordered = !self.config.sort_sums || i == 0;
                } else if self.config.sort_sums && ordered {
                    if let Some(p) = prev {
                        if ord.lt(pool, arg, p) {
                            ordered = false;
                        }
                    }
                    prev = Some(arg);
                }

                let pp = get_power_product(arg);
                if self.visited.contains(pp) {
                    self.multiple.insert(pp.clone());
                    has_multiple = true;
                } else {
                    self.visited.insert(pp.clone());
                }
            }
        }
        numeric::normalize(&mut c, &self.curr_sort);

        if has_multiple {
            // Expensive case: compute the coefficient of every power product that occurs more
            // than once
            let mut coeffs: Vec<Rational> = Vec::new();
            self.expr2pos.clear();
            for arg in args {
                if arg.is_number() {
                    continue;
                }
                let (pp, a) = get_power_product_with_coeff(arg);
                if !self.multiple.contains(pp) {
                    continue;
                }
                match self.expr2pos.entry(pp.clone()) {
                    indexmap::map::Entry::Occupied(e) => coeffs[*e.get()] += a,
                    indexmap::map::Entry::Vacant(e) => {
                        e.insert(coeffs.len());
                        coeffs.push(a);
                    }
                }
            }

            let mut new_args: Vec<Rc<Term>> = Vec::with_capacity(args.len() + 1);
            if !c.is_zero() {
                let t = self.mk_numeral(c.clone());
                new_args.push(t);
            }
            // Copy power products with non-zero merged coefficients, each at its first occurrence
            self.visited.clear();
            for arg in args {
                if arg.is_number() {
                    continue;
                }
                let pp = get_power_product(arg);
                if !self.multiple.contains(pp) {
                    new_args.push(arg.clone());
                } else if !self.visited.contains(pp) {
                    let pp = pp.clone();
                    self.visited.insert(pp.clone());
                    let pos = self.expr2pos[&pp];
                    let mut a = coeffs[pos].clone();
                    numeric::normalize(&mut a, &self.curr_sort);
                    if !a.is_zero() {
                        let t = self.mk_mul_coeff(a, pp);
                        new_args.push(t);
                    }
                }
            }
            if self.config.sort_sums {
                let skip = usize::from(!c.is_zero());
                let pool = &*self.pool;
                new_args[skip..].sort_by(|a, b| ord.compare(pool, a, b));
            }
            let result = self.mk_add_app(new_args);
            if let Some(t) = self.hoist_multiplication(&result) {
                return (RewriteStatus::RewriteFull, Some(t));
            }
            if let Some(t) = self.hoist_ite(&result) {
                return (RewriteStatus::RewriteFull, Some(t));
            }
            done(result)
        } else {
            if ordered && !self.config.hoist_mul && !self.config.hoist_ite {
                if num_coeffs == 0 {
                    return failed();
                }
                if num_coeffs == 1 && args[0].as_number().is_some_and(|a| a != 0 && a == c) {
                    return failed();
                }
            }
            let mut new_args: Vec<Rc<Term>> = Vec::with_capacity(args.len());
            if !c.is_zero() {
                let t = self.mk_numeral(c.clone());
                new_args.push(t);
            }
            for arg in args {
                if !arg.is_number() {
                    new_args.push(arg.clone());
                }
            }
            if !ordered {
                let skip = usize::from(!c.is_zero());
                let pool = &*self.pool;
                new_args[skip..].sort_by(|a, b| ord.compare(pool, a, b));
            }
            let result = self.mk_add_app(new_args);
            if let Some(t) = self.hoist_multiplication(&result) {
                return (RewriteStatus::RewriteFull, Some(t));
            }
            if let Some(t) = self.hoist_ite(&result) {
                return (RewriteStatus::RewriteFull, Some(t));
            }
            done(result)
        }
    }

    // ---------------------------------------------------------------- constructors

    /// The structural `+` constructor: collapses the trivial arities but performs no
    /// simplification.
    pub fn mk_add_app(&mut self, args: Vec<Rc<Term>>) -> Rc<Term> {
        match args.len() {
            0 => self.mk_numeral(Rational::new()),
            1 => args[0].clone(),
            _ => self.pool.add(Term::Op(Operator::Add, args)),
        }
    }

    /// The structural `*` constructor. Besides collapsing trivial arities, this folds runs of
    /// equal bases into `^` applications when power grouping is enabled, and keeps a leading
    /// numeral in coefficient position.
    pub fn mk_mul_app(&mut self, args: Vec<Rc<Term>>) -> Rc<Term> {
        match args.len() {
            0 => self.mk_numeral(Rational::from(1)),
            1 => args[0].clone(),
            _ if self.config.use_power => {
                let mut new_args: Vec<Rc<Term>> = Vec::with_capacity(args.len());
                let (mut prev, mut k_prev) = get_power_body(&args[0]);
                for arg in &args[1..] {
                    let (body, k) = get_power_body(arg);
                    if body == prev {
                        k_prev += k;
                    } else {
                        let t = self.push_power(prev, k_prev);
                        new_args.push(t);
                        prev = body;
                        k_prev = k;
                    }
                }
                let t = self.push_power(prev, k_prev);
                new_args.push(t);
                if new_args.len() == 1 {
                    return new_args[0].clone();
                }
                if new_args.len() > 2 {
                    if let Some(a) = new_args[0].as_number() {
                        let rest = self.mk_mul_app(new_args[1..].to_vec());
                        return self.mk_mul_coeff(a, rest);
                    }
                }
                self.pool.add(Term::Op(Operator::Mult, new_args))
            }
            _ => {
                if args.len() > 2 {
                    if let Some(a) = args[0].as_number() {
                        let rest = self.mk_mul_app(args[1..].to_vec());
                        return self.mk_mul_coeff(a, rest);
                    }
                }
                self.pool.add(Term::Op(Operator::Mult, args))
            }
        }
    }

    /// Multiplies a term by a rational coefficient: `1 · t` is `t`, `c · 0` is `0`, and anything
    /// else becomes a two-argument product with the coefficient first.
    pub fn mk_mul_coeff(&mut self, c: Rational, arg: Rc<Term>) -> Rc<Term> {
        if c == 1 || arg.is_zero() {
            arg
        } else {
            let num = self.mk_numeral(c);
            self.mk_mul_app(vec![num, arg])
        }
    }

    fn push_power(&mut self, body: Rc<Term>, k: Rational) -> Rc<Term> {
        if k == 1 {
            body
        } else {
            let exp = self.pool.add(Term::new_numeral(k, &Sort::Int));
            self.pool.add(Term::Op(Operator::Pow, vec![body, exp]))
        }
    }

    fn mk_numeral(&mut self, mut c: Rational) -> Rc<Term> {
        numeric::normalize(&mut c, &self.curr_sort);
        self.pool.add(Term::new_numeral(c, &self.curr_sort))
    }

    /// The sort of the coefficients of the operation being rewritten: the join of the operand
    /// sorts. A modular sort wins over everything (numerals are plain integers even in modular
    /// terms), `Real` wins over `Int`.
    fn set_curr_sort(&mut self, args: &[Rc<Term>]) {
        let mut result = Sort::Int;
        for arg in args {
            match self.pool.sort(arg).as_sort() {
                Some(m @ Sort::Mod(_)) => {
                    self.curr_sort = m.clone();
                    return;
                }
                Some(Sort::Real) => result = Sort::Real,
                _ => (),
            }
        }
        self.curr_sort = result;
    }

    /// Whether a numeral is already in the normal form of the current sort. The canonical-form
    /// fast paths must not fire on a coefficient that normalization would still change.
    fn is_normalized(&self, a: &Rational) -> bool {
        let mut n = a.clone();
        numeric::normalize(&mut n, &self.curr_sort);
        n == *a
    }

    fn check_cancel(&self) -> Result<(), RewriterError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(RewriterError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// `t = (^ b k)` with an integer `k > 1` yields `(b, k)`; any other term is its own power body
/// with exponent one.
fn get_power_body(t: &Rc<Term>) -> (Rc<Term>, Rational) {
    if let Term::Op(Operator::Pow, args) = t.as_ref() {
        if let [base, exp] = args.as_slice() {
            if let Some(k) = exp.as_number() {
                if k.is_integer() && k > 1 {
                    return (base.clone(), k);
                }
            }
        }
    }
    (t.clone(), Rational::from(1))
}

/// The power product of a monomial: the second argument of `(* c pp)`, or the term itself.
fn get_power_product(t: &Rc<Term>) -> &Rc<Term> {
    if let Term::Op(Operator::Mult, args) = t.as_ref() {
        if args.len() == 2 && args[0].is_number() {
            return &args[1];
        }
    }
    t
}

/// Like [`get_power_product`], but also extracts the coefficient (one if absent).
fn get_power_product_with_coeff(t: &Rc<Term>) -> (&Rc<Term>, Rational) {
    if let Term::Op(Operator::Mult, args) = t.as_ref() {
        if args.len() == 2 {
            if let Some(a) = args[0].as_number() {
                return (&args[1], a);
            }
        }
    }
    (t, Rational::from(1))
}

/// Returns `true` if the term is atomic with respect to arithmetic: a variable, an uninterpreted
/// application, or an operation outside the arithmetic family.
fn is_arith_atom(t: &Term) -> bool {
    match t {
        Term::Var(..) | Term::App(..) => true,
        Term::Op(op, _) => !op.is_arithmetic(),
        Term::Const(_) | Term::Sort(_) => false,
    }
}

/// Advances the odometer over the cartesian product of sets with the given sizes. Returns `false`
/// when the iteration is complete.
fn product_iterator_next(sizes: &[usize], it: &mut [usize]) -> bool {
    for i in (0..it.len()).rev() {
        it[i] += 1;
        if it[i] < sizes[i] {
            return true;
        }
        it[i] = 0;
    }
    false
}

#[cfg(test)]
mod tests;
