use crate::ast::{pool::PrimitivePool, TermPool};
use crate::parser::tests::parse_terms;

#[test]
fn test_term_sharing() {
    let definitions = "
        (declare-const a Int)
        (declare-const b Int)
    ";
    // Every pair parses to the same allocation, regardless of how the terms were written
    let shared = [
        ("(+ a b)", "(+ a b)"),
        ("(* 2 (+ a b))", "(* 2 (+ a b))"),
        ("(- 1)", "(- 1)"),
    ];
    let mut pool = PrimitivePool::new();
    for (x, y) in shared {
        let [x, y] = parse_terms(&mut pool, definitions, [x, y]);
        assert_eq!(x, y);
        assert_eq!(pool.id(&x), pool.id(&y));
    }

    // Distinct terms get distinct identifiers
    let [x, y] = parse_terms(&mut pool, definitions, ["(+ a b)", "(+ b a)"]);
    assert_ne!(x, y);
    assert_ne!(pool.id(&x), pool.id(&y));
}

#[test]
fn test_signed_numerals() {
    let mut pool = PrimitivePool::new();
    let [a, b] = parse_terms(&mut pool, "", ["(- 5)", "(- 5.0)"]);
    assert_eq!(a.as_integer().unwrap(), -5);
    assert_eq!(b.as_number().unwrap(), -5);
    assert_ne!(a, b);

    // The parser folds negated numerals into constants, but a raw unary minus application is
    // still a signed number
    let [five] = parse_terms(&mut pool, "", ["5"]);
    let negated = build_term!(pool, (- {five}));
    assert_eq!(negated.as_signed_number().unwrap(), -5);
    assert_eq!(negated.as_number(), None);
}
