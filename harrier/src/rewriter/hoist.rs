//! The hoisting transformations: extraction of factors shared between summands, and of summands
//! (or an integer gcd) shared between the branches of an `ite`.

use super::PolyRewriter;
use crate::ast::{Operator, Rc, Term, TermPool};
use crate::numeric;
use ahash::AHashMap;
use indexmap::IndexSet;
use rug::Rational;

/// Splices every nested application of `op` in `t` into `buf`, iteratively: a matching element is
/// replaced by its first argument and the remaining arguments are appended.
fn flatten_into(op: Operator, t: &Rc<Term>, buf: &mut Vec<Rc<Term>>) {
    buf.push(t.clone());
    let mut i = 0;
    while i < buf.len() {
        let args = match buf[i].as_ref() {
            Term::Op(o, args) if *o == op => args.clone(),
            _ => {
                i += 1;
                continue;
            }
        };
        buf[i] = args[0].clone();
        buf.extend(args[1..].iter().cloned());
    }
}

fn is_nontrivial_gcd(g: &Rational) -> bool {
    *g >= 2
}

impl PolyRewriter<'_> {
    /// Extracts multiplicative factors shared between two summands of `sum`, rewriting
    /// `x·common + y·common` into `common · (x + y)`.
    ///
    /// Factor matching is left-to-right and pairwise: the first summand sharing a factor with an
    /// earlier one is merged with it, and both are then excluded from further matching. This
    /// deliberately does not search for a maximal multiset intersection; the cheap variant keeps
    /// the output stable under repeated rewriting.
    ///
    /// Returns `None` if no merge happened. A returned term must be rewritten to a fixed point.
    pub(super) fn hoist_multiplication(&mut self, sum: &Rc<Term>) -> Option<Rc<Term>> {
        if !self.config.hoist_mul {
            return None;
        }
        let mut adds = Vec::new();
        flatten_into(Operator::Add, sum, &mut adds);
        let mut valid = vec![true; adds.len()];
        let mut mul_map: AHashMap<Rc<Term>, usize> = AHashMap::new();
        let mut change = false;
        for k in 0..adds.len() {
            let mut muls = Vec::new();
            flatten_into(Operator::Mult, &adds[k], &mut muls);
            for factor in muls {
                if factor.is_number() {
                    continue;
                }
                match mul_map.get(&factor).copied() {
                    Some(j) if valid[j] && j != k => {
                        self.set_curr_sort(std::slice::from_ref(&adds[k]));
                        adds[j] = self.merge_muls(&adds[j].clone(), &adds[k].clone());
                        adds[k] = self.mk_numeral(Rational::new());
                        valid[j] = false;
                        valid[k] = false;
                        change = true;
                        break;
                    }
                    _ => {
                        mul_map.insert(factor, k);
                    }
                }
            }
        }
        if !change {
            return None;
        }
        Some(self.mk_add_app(adds))
    }

    /// Merges two summands that share at least one factor: the common prefix of their factor
    /// lists (matched pairwise, left to right) is extracted, and the leftovers are added.
    fn merge_muls(&mut self, x: &Rc<Term>, y: &Rc<Term>) -> Rc<Term> {
        let mut m1 = Vec::new();
        let mut m2 = Vec::new();
        flatten_into(Operator::Mult, x, &mut m1);
        flatten_into(Operator::Mult, y, &mut m2);
        let mut k = 0;
        for i in 0..m1.len() {
            let factor = m1[i].clone();
            if let Some(j) = (k..m2.len()).find(|&j| m2[j] == factor) {
                m1.swap(i, k);
                m2.swap(j, k);
                k += 1;
            }
        }
        debug_assert!(k > 0);
        let rest1 = self.mk_mul_app(m1[k..].to_vec());
        let rest2 = self.mk_mul_app(m2[k..].to_vec());
        let merged = self.mk_add_app(vec![rest1, rest2]);
        m1.truncate(k);
        m1.push(merged);
        self.mk_mul_app(m1)
    }

    /// Hoists out of an `ite` summand either the summands shared by all of its leaves, or, when
    /// every leaf is an integer numeral, their gcd.
    ///
    /// Returns `None` if nothing was hoisted. A returned term must be rewritten to a fixed point.
    pub(super) fn hoist_ite(&mut self, sum: &Rc<Term>) -> Option<Rc<Term>> {
        if !self.config.hoist_ite {
            return None;
        }
        let mut adds = Vec::new();
        flatten_into(Operator::Add, sum, &mut adds);
        let mut change = false;
        for summand in &mut adds {
            if !summand.is_ite() {
                continue;
            }
            let mut shared = IndexSet::new();
            let mut state = LeafState::default();
            if !collect_leaves(summand, &mut shared, &mut state) {
                continue;
            }
            // A gcd can only be hoisted when every leaf is an integer; shared summands only when
            // none is. Mixed leaves hoist nothing.
            let (g, shared) = if state.symbolic_leaves == 0 && is_nontrivial_gcd(&state.gcd) {
                (state.gcd, IndexSet::new())
            } else if state.int_leaves == 0 && !shared.is_empty() {
                (Rational::from(1), shared)
            } else {
                continue;
            };

            let leaf_owner = summand.clone();
            self.set_curr_sort(std::slice::from_ref(&leaf_owner));
            let stripped = self.apply_hoist(&leaf_owner, &g, &shared);
            let mut parts = Vec::with_capacity(shared.len() + 1);
            if is_nontrivial_gcd(&g) {
                let g = self.mk_numeral(g);
                parts.push(self.mk_mul_app(vec![stripped, g]));
            } else {
                parts.push(stripped);
                parts.extend(shared.iter().cloned());
            }
            let hoisted = self.mk_add_app(parts);
            if hoisted != *summand {
                *summand = hoisted;
                change = true;
            }
        }
        if !change {
            return None;
        }
        Some(self.mk_add_app(adds))
    }

    /// Rebuilds an `ite` leaf with the hoisted parts removed: integer leaves are divided by the
    /// gcd, other leaves are stripped of the shared summands.
    fn apply_hoist(&mut self, t: &Rc<Term>, g: &Rational, shared: &IndexSet<Rc<Term>>) -> Rc<Term> {
        if let Term::Op(Operator::Ite, args) = t.as_ref() {
            if let [cond, then_leaf, else_leaf] = args.as_slice() {
                let cond = cond.clone();
                let (then_leaf, else_leaf) = (then_leaf.clone(), else_leaf.clone());
                let then_leaf = self.apply_hoist(&then_leaf, g, shared);
                let else_leaf = self.apply_hoist(&else_leaf, g, shared);
                return self
                    .pool
                    .add(Term::Op(Operator::Ite, vec![cond, then_leaf, else_leaf]));
            }
        }
        if is_nontrivial_gcd(g) {
            if let Some(k) = t.as_integer() {
                return self.mk_numeral(Rational::from(k) / g);
            }
        }
        let mut addends = Vec::new();
        flatten_into(Operator::Add, t, &mut addends);
        addends.retain(|a| !shared.contains(a));
        self.mk_add_app(addends)
    }
}

#[derive(Debug, Default)]
struct LeafState {
    gcd: Rational,
    int_leaves: usize,
    symbolic_leaves: usize,
}

/// Walks the leaves of an `ite` tree, intersecting the addend sets of symbolic leaves into
/// `shared` and folding integer leaves into a running gcd. Returns `false` if hoisting must be
/// abandoned: a leaf with repeated addends would make the shared set unsound.
fn collect_leaves(t: &Rc<Term>, shared: &mut IndexSet<Rc<Term>>, state: &mut LeafState) -> bool {
    if let Term::Op(Operator::Ite, args) = t.as_ref() {
        if let [_, then_leaf, else_leaf] = args.as_slice() {
            return collect_leaves(then_leaf, shared, state)
                && collect_leaves(else_leaf, shared, state);
        }
    }
    if let Some(k) = t.as_integer() {
        let k = numeric::abs(&Rational::from(k));
        state.gcd = numeric::gcd(&state.gcd, &k);
        state.int_leaves += 1;
        return true;
    }
    let mut addends = Vec::new();
    flatten_into(Operator::Add, t, &mut addends);
    // Repeated addends within one leaf make set intersection unsound
    let set: IndexSet<Rc<Term>> = addends.iter().cloned().collect();
    if set.len() != addends.len() {
        return false;
    }
    if state.symbolic_leaves == 0 {
        *shared = set;
    } else {
        shared.retain(|a| set.contains(a));
    }
    state.symbolic_leaves += 1;
    !shared.is_empty()
}
