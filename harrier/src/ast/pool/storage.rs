//* Conceptually the pool maps a `Term` to the `Rc<Term>` that owns its unique allocation. A
//* plain hash map would hold two copies of every term (one in the key, one behind the `Rc`), so
//* we instead keep a set of `Rc<Term>`s that can be probed with a borrowed `&Term`: key and
//* value collapse into one object. An insertion-ordered set has a second advantage: the index a
//* term receives on insertion is stable (terms are never removed), and doubles as the term's
//* node identifier.

use crate::ast::{Rc, Term};
use indexmap::IndexSet;
use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

/// `ast::Rc` hashes and compares by pointer, so an `IndexSet<Rc<Term>>` could not be probed with
/// a `&Term` (and implementing `Borrow<Term>` for `Rc<Term>` directly would be unsound, since
/// the `Borrow` contract requires `Hash` and `Eq` to agree with the borrowed form). This wrapper
/// restores by-value semantics, which makes `Borrow<Term>` legal and lets the set deduplicate
/// structurally equal terms.
#[derive(Debug, Clone, Eq)]
struct ValueKey(Rc<Term>);

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state);
    }
}

impl Borrow<Term> for ValueKey {
    fn borrow(&self) -> &Term {
        self.0.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Storage(IndexSet<ValueKey>);

impl Storage {
    /// Returns the unique allocation for `term`, creating it if this is the first time the term
    /// is seen.
    pub fn add(&mut self, term: Term) -> Rc<Term> {
        match self.0.get(&term) {
            Some(ValueKey(t)) => t.clone(),
            None => {
                let result = Rc::new(term);
                self.0.insert(ValueKey(result.clone()));
                result
            }
        }
    }

    pub fn get(&self, term: &Term) -> Option<&Rc<Term>> {
        self.0.get(term).map(|ValueKey(t)| t)
    }

    /// The insertion index of a term, which serves as its node identifier.
    pub fn index_of(&self, term: &Term) -> Option<usize> {
        self.0.get_index_of(term)
    }

    // Only used to inspect the pool contents in the hash consing tests
    #[cfg(test)]
    pub fn into_vec(self) -> Vec<Rc<Term>> {
        self.0.into_iter().map(|ValueKey(t)| t).collect()
    }
}
