//! Monomial cancellation for `lhs ⋈ rhs` atoms, and the linear-integer gcd test.

use super::{get_power_product, get_power_product_with_coeff, MonomialOrd, PolyRewriter};
use crate::ast::{Operator, Rc, Term, TermPool};
use crate::numeric;
use rug::Rational;

/// The summands of a term viewed as a sum: the children of a `+`, or the term itself.
fn get_monomials(t: &Rc<Term>) -> &[Rc<Term>] {
    match t.as_ref() {
        Term::Op(Operator::Add, args) => args.as_slice(),
        _ => std::slice::from_ref(t),
    }
}

impl PolyRewriter<'_> {
    /// Normalizes a comparison atom by cancelling its monomials with every non-constant monomial
    /// moved to the left-hand side. Returns `None` if the term is not a binary comparison, or if
    /// cancelling would change nothing.
    pub fn cancel_atom(&mut self, term: &Rc<Term>) -> Option<Rc<Term>> {
        let (op, args) = term.as_op()?;
        if !op.is_comparison() || args.len() != 2 {
            return None;
        }
        let (lhs, rhs) = (args[0].clone(), args[1].clone());
        let (new_lhs, new_rhs) = self.cancel_monomials(&lhs, &rhs, true)?;
        Some(self.pool.add(Term::Op(op, vec![new_lhs, new_rhs])))
    }

    /// Cancels monomials that occur on both sides of `lhs ⋈ rhs`.
    ///
    /// For each power product appearing on either side, the signed coefficients are summed
    /// (positive on the left, negative on the right). When `move_to_lhs` is set, all non-constant
    /// monomials end up on the left-hand side and the constant on the right; otherwise monomials
    /// keep their side and only those with a zero net coefficient disappear.
    ///
    /// Returns `None` when no change would be made, in which case the caller keeps the original
    /// atom.
    pub fn cancel_monomials(
        &mut self,
        lhs: &Rc<Term>,
        rhs: &Rc<Term>,
        move_to_lhs: bool,
    ) -> Option<(Rc<Term>, Rc<Term>)> {
        let operands = [lhs.clone(), rhs.clone()];
        self.set_curr_sort(&operands);
        let ord = MonomialOrd::new(&self.config);
        let lhs_monomials = get_monomials(lhs);
        let rhs_monomials = get_monomials(rhs);

        self.visited.clear();
        self.multiple.clear();
        let mut has_multiple = false;
        let mut c = Rational::new();
        let mut num_coeffs = 0usize;

        for arg in lhs_monomials {
            if let Some(a) = arg.as_number() {
                c += a;
                num_coeffs += 1;
            } else {
                self.visited.insert(get_power_product(arg).clone());
            }
        }

        if move_to_lhs && num_coeffs == 0 && rhs.is_number() {
            return None;
        }

        for arg in rhs_monomials {
            if let Some(a) = arg.as_number() {
                c -= a;
                num_coeffs += 1;
            } else {
                let pp = get_power_product(arg);
                if self.visited.contains(pp) {
                    self.multiple.insert(pp.clone());
                    has_multiple = true;
                }
            }
        }

        numeric::normalize(&mut c, &self.curr_sort);

        if !has_multiple && num_coeffs <= 1 {
            if move_to_lhs {
                if rhs.is_number() {
                    return None;
                }
            } else if num_coeffs == 0 || rhs.is_number() {
                return None;
            }
        }

        // Net coefficients of the power products that occur on both sides
        let mut coeffs: Vec<Rational> = Vec::new();
        self.expr2pos.clear();
        for arg in lhs_monomials {
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
        for arg in rhs_monomials {
            if arg.is_number() {
                continue;
            }
            let (pp, a) = get_power_product_with_coeff(arg);
            if !self.multiple.contains(pp) {
                continue;
            }
            let pos = self.expr2pos[pp];
            coeffs[pos] -= a;
        }

        let mut new_lhs: Vec<Rc<Term>> = Vec::new();
        // Power products with a non-zero net coefficient stay on the left, each at its first
        // occurrence
        self.visited.clear();
        for arg in lhs_monomials {
            if arg.is_number() {
                continue;
            }
            let pp = get_power_product(arg);
            if !self.multiple.contains(pp) {
                new_lhs.push(arg.clone());
            } else if !self.visited.contains(pp) {
                let pp = pp.clone();
                self.visited.insert(pp.clone());
                let pos = self.expr2pos[&pp];
                let a = coeffs[pos].clone();
                if !a.is_zero() {
                    let t = self.mk_mul_coeff(a, pp);
                    new_lhs.push(t);
                }
            }
        }

        let mut new_rhs: Vec<Rc<Term>> = Vec::new();
        for arg in rhs_monomials {
            if arg.is_number() {
                continue;
            }
            let (pp, mut a) = get_power_product_with_coeff(arg);
            if self.multiple.contains(pp) {
                // Already accounted for on the left-hand side
                continue;
            }
            if move_to_lhs {
                if !a.is_zero() {
                    if a == -1 {
                        new_lhs.push(pp.clone());
                    } else {
                        let pp = pp.clone();
                        a = -a;
                        debug_assert!(a != 1);
                        let num = self.mk_numeral(a);
                        let t = self.mk_mul_app(vec![num, pp]);
                        new_lhs.push(t);
                    }
                }
            } else {
                new_rhs.push(arg.clone());
            }
        }

        let c_at_rhs = if move_to_lhs {
            if self.config.sort_sums {
                let pool = &*self.pool;
                new_lhs.sort_by(|a, b| ord.compare(pool, a, b));
            }
            true
        } else {
            // The constant also goes right when one of the sides has become trivial
            new_rhs.is_empty() || !new_lhs.is_empty()
        };

        if c_at_rhs {
            c = -c;
            numeric::normalize(&mut c, &self.curr_sort);
        }

        // Insert the constant on the appropriate side, unless it is zero and that side has other
        // summands
        let insert_c_lhs = !c_at_rhs && (new_lhs.is_empty() || !c.is_zero());
        let insert_c_rhs = c_at_rhs && (new_rhs.is_empty() || !c.is_zero());
        if insert_c_lhs {
            let t = self.mk_numeral(c.clone());
            new_lhs.insert(0, t);
        }
        if insert_c_rhs {
            let t = self.mk_numeral(c.clone());
            new_rhs.insert(0, t);
        }

        let lhs_result = self.mk_add_app(new_lhs);
        let rhs_result = self.mk_add_app(new_rhs);
        Some((lhs_result, rhs_result))
    }
}

/// A soundness test for linear integer (in)equalities: computes the gcd `g` of the coefficients
/// of all non-constant monomials and the net constant `offset` (left side positive, right side
/// negative), and checks whether `g` divides `offset`.
///
/// Returns `true` when nothing can be concluded (including any non-integer monomial or
/// coefficient). A `false` result means `lhs = rhs` has no integer solution.
pub fn gcd_test(lhs: &Rc<Term>, rhs: &Rc<Term>) -> bool {
    let mut g = Rational::new();
    let mut offset = Rational::new();

    let mut test = |positive: bool, e: &Rc<Term>| -> bool {
        if let Some(c) = e.as_signed_number() {
            if !c.is_integer() {
                return false;
            }
            if positive {
                offset += c;
            } else {
                offset -= c;
            }
            return true;
        }
        if let Term::Op(Operator::Mult, args) = e.as_ref() {
            if args.len() == 2 {
                if let Some(c) = args[0].as_signed_number() {
                    if !c.is_integer() || c.is_zero() {
                        return false;
                    }
                    g = numeric::gcd(&numeric::abs(&c), &g);
                    return g != 1;
                }
            }
        }
        false
    };

    for arg in get_monomials(lhs) {
        if !test(true, arg) {
            return true;
        }
    }
    for arg in get_monomials(rhs) {
        if !test(false, arg) {
            return true;
        }
    }
    drop(test);

    offset.is_zero() || g.is_zero() || numeric::divides(&g, &offset)
}
