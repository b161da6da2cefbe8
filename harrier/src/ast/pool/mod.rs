//! This module implements `TermPool`, a structure that stores terms and implements hash consing.

mod storage;

use super::{Operator, Rc, Sort, Term};
use ahash::AHashMap;
use storage::Storage;

pub trait TermPool {
    /// Returns the term corresponding to the boolean constant `true`.
    fn bool_true(&self) -> Rc<Term>;

    /// Returns the term corresponding to the boolean constant `false`.
    fn bool_false(&self) -> Rc<Term>;

    /// Returns the term corresponding to the boolean constant determined by `value`.
    fn bool_constant(&self, value: bool) -> Rc<Term> {
        match value {
            true => self.bool_true(),
            false => self.bool_false(),
        }
    }

    /// Interns a term: returns the pool's unique allocation for it, creating one if the term was
    /// never seen before. The term's sort is computed and cached as a side effect.
    fn add(&mut self, term: Term) -> Rc<Term>;

    /// Interns every term in the vector.
    fn add_all(&mut self, terms: Vec<Term>) -> Vec<Rc<Term>> {
        terms.into_iter().map(|t| self.add(t)).collect()
    }

    /// The sort of a term that was previously added to this pool, as a sort term. Sorts are
    /// assumed well formed; a sort term is its own sort.
    fn sort(&self, term: &Rc<Term>) -> Rc<Term>;

    /// Returns the node identifier of the given term.
    ///
    /// Identifiers are unique within a pool, stable for the lifetime of the pool, and fit in 32
    /// bits. The ordinal monomial order uses them as tie breakers.
    fn id(&self, term: &Rc<Term>) -> u32;
}

/// The owner of all term allocations.
///
/// Adding the same `Term` twice yields the same allocation, which is what lets [`Rc`] compare
/// and hash terms by pointer. The pool also caches every term's sort and assigns every term a
/// stable node identifier.
///
/// The pool is `Clone`: a clone shares the existing allocations (they are `Arc`s) but has an
/// independent storage, so parallel workers can each grow a private copy without any
/// synchronization and translate their results back afterwards.
#[derive(Debug, Clone)]
pub struct PrimitivePool {
    storage: Storage,
    sorts_cache: AHashMap<Rc<Term>, Rc<Term>>,
    bool_true: Rc<Term>,
    bool_false: Rc<Term>,
}

impl Default for PrimitivePool {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimitivePool {
    /// Constructs a new `PrimitivePool`. This new pool will already contain the boolean constants
    /// `true` and `false`.
    pub fn new() -> Self {
        let mut storage = Storage::default();
        let mut sorts_cache = AHashMap::new();
        let bool_sort = storage.add(Term::Sort(Sort::Bool));
        let bool_true = storage.add(Term::new_bool(true));
        let bool_false = storage.add(Term::new_bool(false));

        sorts_cache.insert(bool_sort.clone(), bool_sort.clone());
        sorts_cache.insert(bool_true.clone(), bool_sort.clone());
        sorts_cache.insert(bool_false.clone(), bool_sort);

        Self {
            storage,
            sorts_cache,
            bool_true,
            bool_false,
        }
    }

    /// Takes a term from another pool and adds it (and all its subterms) to this pool, returning
    /// the allocation that lives in this pool.
    ///
    /// This restores the hash-consing invariant for results produced by a worker with a private
    /// pool clone: after translation, structurally equal terms are pointer equal again.
    pub fn translate(&mut self, term: &Rc<Term>) -> Rc<Term> {
        // Fast path: a structurally equal term already lives in this pool
        if let Some(existing) = self.storage.get(term.as_ref()) {
            return existing.clone();
        }
        let new = match term.as_ref() {
            Term::Const(_) => term.as_ref().clone(),
            Term::Var(name, sort) => {
                let sort = self.translate(sort);
                Term::Var(name.clone(), sort)
            }
            Term::App(f, args) => {
                let f = self.translate(f);
                let args = args.iter().map(|a| self.translate(a)).collect();
                Term::App(f, args)
            }
            Term::Op(op, args) => {
                let args = args.iter().map(|a| self.translate(a)).collect();
                Term::Op(*op, args)
            }
            Term::Sort(s) => Term::Sort(match s {
                Sort::Function(args) => {
                    Sort::Function(args.iter().map(|a| self.translate(a)).collect())
                }
                other => other.clone(),
            }),
        };
        self.add(new)
    }

    /// Computes the sort of a term and adds it to the sort cache.
    fn compute_sort(&mut self, term: &Rc<Term>) -> Rc<Term> {
        if let Some(s) = self.sorts_cache.get(term) {
            return s.clone();
        }

        let result: Sort = match term.as_ref() {
            Term::Const(c) => c.sort(),
            Term::Var(_, sort) => sort.as_sort().expect("variable sort").clone(),
            Term::Op(op, args) => match op {
                Operator::True
                | Operator::False
                | Operator::Not
                | Operator::And
                | Operator::Or
                | Operator::Equals
                | Operator::LessThan
                | Operator::GreaterThan
                | Operator::LessEq
                | Operator::GreaterEq => Sort::Bool,
                Operator::Ite => {
                    let s = self.compute_sort(&args[1]);
                    s.as_sort().expect("sort term").clone()
                }
                Operator::Add | Operator::Sub | Operator::Mult | Operator::Pow => {
                    self.arithmetic_join(args)
                }
            },
            Term::App(f, _) => {
                let f_sort = self.compute_sort(f);
                match f_sort.as_sort() {
                    Some(Sort::Function(sorts)) => sorts
                        .last()
                        .and_then(|s| s.as_sort())
                        .expect("function return sort")
                        .clone(),
                    // We assume that the function is correctly sorted
                    _ => unreachable!(),
                }
            }
            Term::Sort(sort) => sort.clone(),
        };
        let sorted_term = self.storage.add(Term::Sort(result));
        self.sorts_cache
            .insert(sorted_term.clone(), sorted_term.clone());
        self.sorts_cache.insert(term.clone(), sorted_term.clone());
        sorted_term
    }

    /// The sort of an arithmetic operator application: a modular sort wins over everything,
    /// `Real` wins over `Int`.
    fn arithmetic_join(&mut self, args: &[Rc<Term>]) -> Sort {
        let mut result = Sort::Int;
        for a in args {
            let s = self.compute_sort(a);
            match s.as_sort() {
                Some(m @ Sort::Mod(_)) => return m.clone(),
                Some(Sort::Real) => result = Sort::Real,
                _ => (),
            }
        }
        result
    }
}

impl TermPool for PrimitivePool {
    fn bool_true(&self) -> Rc<Term> {
        self.bool_true.clone()
    }

    fn bool_false(&self) -> Rc<Term> {
        self.bool_false.clone()
    }

    fn add(&mut self, term: Term) -> Rc<Term> {
        let term = self.storage.add(term);
        self.compute_sort(&term);
        term
    }

    fn sort(&self, term: &Rc<Term>) -> Rc<Term> {
        self.sorts_cache[term].clone()
    }

    fn id(&self, term: &Rc<Term>) -> u32 {
        match self.storage.index_of(term.as_ref()) {
            Some(i) => i as u32,
            // Terms from a foreign pool have no index here; this only happens if a caller skips
            // `translate`, and a stable answer is still better than a panic
            None => u32::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut pool = PrimitivePool::new();
        let int_sort = pool.add(Term::Sort(Sort::Int));
        let a = pool.add(Term::new_var("a", int_sort.clone()));
        let b = pool.add(Term::new_var("b", int_sort));
        let two = pool.add(Term::new_int(2));

        let first = pool.add(Term::Op(Operator::Add, vec![a.clone(), b.clone()]));
        let second = pool.add(Term::Op(Operator::Add, vec![a.clone(), b.clone()]));
        assert_eq!(first, second);

        let product = pool.add(Term::Op(Operator::Mult, vec![two.clone(), first.clone()]));
        let again = pool.add(Term::Op(Operator::Mult, vec![two, second]));
        assert_eq!(product, again);

        // Identical terms share an allocation, so ids must agree too
        assert_eq!(pool.id(&product), pool.id(&again));
        assert_ne!(pool.id(&a), pool.id(&b));
    }

    #[test]
    fn test_sort_computation() {
        let mut pool = PrimitivePool::new();
        let int_sort = pool.add(Term::Sort(Sort::Int));
        let real_sort = pool.add(Term::Sort(Sort::Real));
        let a = pool.add(Term::new_var("a", int_sort.clone()));
        let x = pool.add(Term::new_var("x", real_sort.clone()));

        let sum = pool.add(Term::Op(Operator::Add, vec![a.clone(), a.clone()]));
        assert_eq!(pool.sort(&sum), int_sort);

        let mixed = pool.add(Term::Op(Operator::Add, vec![a.clone(), x]));
        assert_eq!(pool.sort(&mixed), real_sort);

        let cmp = pool.add(Term::Op(Operator::LessEq, vec![a.clone(), sum]));
        assert_eq!(pool.sort(&cmp).as_sort(), Some(&Sort::Bool));

        let modular_sort = pool.add(Term::Sort(Sort::Mod(7.into())));
        let m = pool.add(Term::new_var("m", modular_sort.clone()));
        let scaled = pool.add(Term::Op(Operator::Mult, vec![a, m]));
        assert_eq!(pool.sort(&scaled), modular_sort);
    }

    #[test]
    fn test_translate() {
        let mut pool = PrimitivePool::new();
        let int_sort = pool.add(Term::Sort(Sort::Int));
        let a = pool.add(Term::new_var("a", int_sort));

        let mut private = pool.clone();
        let two = private.add(Term::new_int(2));
        let product = private.add(Term::Op(Operator::Mult, vec![two, a.clone()]));

        let translated = pool.translate(&product);
        let direct = {
            let two = pool.add(Term::new_int(2));
            pool.add(Term::Op(Operator::Mult, vec![two, a]))
        };
        assert_eq!(translated, direct);
    }
}
