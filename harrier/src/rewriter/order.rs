use super::{get_power_product, RewriterConfig};
use crate::ast::{Operator, PrimitivePool, Rc, Term, TermPool};
use std::cmp::Ordering;

/// The total order used to sort the children of `+` (and the factors of `*`).
///
/// Two comparators are available, selected by configuration:
///
/// - The *AST order* compares the power products of the two terms structurally: by term kind,
///   then operator, then arity, then child-wise. A monomial `(* c pp)` sorts where its power
///   product `pp` would, so changing a coefficient never moves a monomial.
/// - The *ordinal order* maps each term to a signed integer (numerals to -1, monomials to the
///   node identifier of their power product, everything else to its own identifier) and compares
///   the ordinals.
///
/// Both comparators break remaining ties by node identifier, which makes them total: the sort and
/// the "already sorted" check always agree, so rewriting the same term twice cannot flip the
/// order of its children.
#[derive(Debug, Clone, Copy)]
pub struct MonomialOrd {
    ast_order: bool,
    use_power: bool,
}

impl MonomialOrd {
    pub(super) fn new(config: &RewriterConfig) -> Self {
        Self {
            ast_order: config.ast_order,
            use_power: config.use_power,
        }
    }

    pub fn compare(&self, pool: &PrimitivePool, a: &Rc<Term>, b: &Rc<Term>) -> Ordering {
        let result = if self.ast_order {
            let a = self.power_body(get_power_product(a));
            let b = self.power_body(get_power_product(b));
            structural_cmp(a, b)
        } else {
            self.ordinal(pool, a).cmp(&self.ordinal(pool, b))
        };
        result.then_with(|| pool.id(a).cmp(&pool.id(b)))
    }

    /// Under power grouping, `(^ b k)` sorts where its base would.
    fn power_body<'t>(&self, t: &'t Rc<Term>) -> &'t Rc<Term> {
        if self.use_power {
            if let Term::Op(Operator::Pow, args) = t.as_ref() {
                if args[1].as_integer().is_some_and(|k| k > 1) {
                    return &args[0];
                }
            }
        }
        t
    }

    pub fn lt(&self, pool: &PrimitivePool, a: &Rc<Term>, b: &Rc<Term>) -> bool {
        self.compare(pool, a, b) == Ordering::Less
    }

    fn ordinal(&self, pool: &PrimitivePool, t: &Rc<Term>) -> i64 {
        if t.is_number() {
            return -1;
        }
        if let Term::Op(Operator::Mult, args) = t.as_ref() {
            if args[0].is_number() {
                return i64::from(pool.id(&args[1]));
            }
            return i64::from(pool.id(t));
        }
        if self.use_power {
            if let Term::Op(Operator::Pow, args) = t.as_ref() {
                if args[1].as_integer().is_some_and(|k| k > 1) {
                    return i64::from(pool.id(&args[0]));
                }
            }
        }
        i64::from(pool.id(t))
    }
}

fn kind_rank(t: &Term) -> u8 {
    match t {
        Term::Const(_) => 0,
        Term::Var(..) => 1,
        Term::App(..) => 2,
        Term::Op(..) => 3,
        Term::Sort(_) => 4,
    }
}

/// A total structural order on terms: kind, then head, then arity, then child-wise recursion.
/// Pointer-equal terms compare equal without any traversal.
fn structural_cmp(a: &Rc<Term>, b: &Rc<Term>) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match kind_rank(a).cmp(&kind_rank(b)) {
        Ordering::Equal => (),
        other => return other,
    }
    match (a.as_ref(), b.as_ref()) {
        (Term::Const(x), Term::Const(y)) => {
            let (x, y) = (x.as_rational(), y.as_rational());
            x.cmp(&y)
        }
        (Term::Var(x, _), Term::Var(y, _)) => x.cmp(y),
        (Term::App(f, xs), Term::App(g, ys)) => structural_cmp(f, g)
            .then_with(|| xs.len().cmp(&ys.len()))
            .then_with(|| children_cmp(xs, ys)),
        (Term::Op(f, xs), Term::Op(g, ys)) => f
            .cmp(g)
            .then_with(|| xs.len().cmp(&ys.len()))
            .then_with(|| children_cmp(xs, ys)),
        // Sorts are rare in sorting positions; the identifier tie break resolves them
        (Term::Sort(_), Term::Sort(_)) => Ordering::Equal,
        _ => unreachable!("terms of equal kind rank"),
    }
}

fn children_cmp(xs: &[Rc<Term>], ys: &[Rc<Term>]) -> Ordering {
    for (x, y) in xs.iter().zip(ys) {
        match structural_cmp(x, y) {
            Ordering::Equal => (),
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::pool::PrimitivePool;
    use crate::parser::tests::parse_terms;

    const DEFINITIONS: &str = "
        (declare-const a Int)
        (declare-const b Int)
        (declare-const x Int)
        (declare-const y Int)
    ";

    #[test]
    fn test_ast_order() {
        let config = RewriterConfig::default();
        let ord = MonomialOrd::new(&config);
        let mut pool = PrimitivePool::new();

        // Monomials sort by their power product, so `(* 2 x)` goes where `x` would
        let cases = [
            ("a", "b"),
            ("a", "(* 2 b)"),
            ("(* 2 a)", "b"),
            ("(* 5 a)", "(* 2 b)"),
            ("x", "(* x y)"),
            ("(* a b)", "(* a x)"),
        ];
        for (smaller, greater) in cases {
            let [s, g] = parse_terms(&mut pool, DEFINITIONS, [smaller, greater]);
            assert!(ord.lt(&pool, &s, &g), "expected {} < {}", s, g);
            assert!(!ord.lt(&pool, &g, &s), "expected !({} < {})", g, s);
        }
    }

    #[test]
    fn test_ordinal_order() {
        let config = RewriterConfig {
            ast_order: false,
            ..Default::default()
        };
        let ord = MonomialOrd::new(&config);
        let mut pool = PrimitivePool::new();

        // Numerals come first, and a monomial shares the ordinal of its power product
        let [one, x, scaled] = parse_terms(&mut pool, DEFINITIONS, ["1", "x", "(* 2 x)"]);
        assert!(ord.lt(&pool, &one, &x));
        assert!(ord.lt(&pool, &one, &scaled));

        let ordinal_x = ord.ordinal(&pool, &x);
        assert_eq!(ordinal_x, ord.ordinal(&pool, &scaled));

        // The identifier tie break keeps the order total
        assert!(ord.lt(&pool, &x, &scaled) || ord.lt(&pool, &scaled, &x));
    }

    #[test]
    fn test_order_is_transitive() {
        let config = RewriterConfig::default();
        let ord = MonomialOrd::new(&config);
        let mut pool = PrimitivePool::new();
        let [a, b, c] = parse_terms(&mut pool, DEFINITIONS, ["(* 2 a)", "(* a b)", "(* b x)"]);
        assert!(ord.lt(&pool, &a, &b));
        assert!(ord.lt(&pool, &b, &c));
        assert!(ord.lt(&pool, &a, &c));
    }
}
