use super::*;
use crate::ast::pool::PrimitivePool;
use crate::parser::tests::parse_terms;
use crate::HarrierOptions;

const DEFINITIONS: &str = "
    (declare-const a Int)
    (declare-const b Int)
    (declare-const c Int)
    (declare-const x Int)
    (declare-const y Int)
    (declare-const z Int)
    (declare-const w Int)
    (declare-const u Int)
    (declare-const v Int)
    (declare-const p Bool)
    (declare-const r Real)
    (declare-const m (_ Mod 7))
    (declare-fun f (Int) Int)
";

fn run_tests(options: &HarrierOptions, cases: &[(&str, &str)]) {
    use colored::{Color, Colorize};

    let config = RewriterConfig::from(options);
    for &(input, expected) in cases {
        let mut pool = PrimitivePool::new();
        let [input_term, expected_term] = parse_terms(&mut pool, DEFINITIONS, [input, expected]);
        let mut rewriter = PolyRewriter::new(&mut pool, config.clone());
        let got = rewriter.rewrite(&input_term).unwrap();
        assert_eq!(
            expected_term, got,
            "simplifying `{}`: expected `{}`, got `{}`",
            input, expected_term, got
        );

        // The canonical form is a fixed point
        let again = rewriter.rewrite(&got).unwrap();
        assert_eq!(got, again, "`{}` is not a fixed point", got);

        println!("{} `{}`", "PASSED".bold().color(Color::Green), input);
    }
}

fn sorting() -> HarrierOptions {
    HarrierOptions {
        sort_sums: true,
        ..Default::default()
    }
}

#[test]
fn test_sums() {
    run_tests(
        &sorting(),
        &[
            ("(+ 1 x (+ 2 y) x)", "(+ 3 (* 2 x) y)"),
            ("(+ x 0)", "x"),
            ("(+ 0 0)", "0"),
            ("(+ 1 2 3)", "6"),
            ("(+ x (* 2 y) 1)", "(+ 1 x (* 2 y))"),
            ("(+ (+ a b) (+ c 1))", "(+ 1 a b c)"),
            // Merged monomials with a zero net coefficient disappear
            ("(+ x y (* (- 1) x))", "y"),
            ("(+ x (* (- 1) x))", "0"),
            // A sum with a single remaining monomial collapses to it
            ("(+ 0 (* 2 x))", "(* 2 x)"),
        ],
    );
}

#[test]
fn test_products() {
    run_tests(
        &sorting(),
        &[
            ("(* 2 (+ x y))", "(+ (* 2 x) (* 2 y))"),
            ("(* 2 3 x)", "(* 6 x)"),
            ("(* x 0 y)", "0"),
            ("(* 1 x)", "x"),
            ("(* 2 (* 3 x))", "(* 6 x)"),
            ("(* y x)", "(* x y)"),
            ("(* 2 x y)", "(* 2 (* x y))"),
            ("(* (* 2 x) (* 3 y))", "(* 6 (* x y))"),
            ("(* (- 1) (- 1) x)", "x"),
            // The coefficient of a monomial is folded even without flattening
            ("(+ (* 2 x y) (* 3 x y))", "(* 5 (* x y))"),
        ],
    );
}

#[test]
fn test_subtraction_and_negation() {
    run_tests(
        &sorting(),
        &[
            ("(- a b c)", "(+ a (* (- 1) b) (* (- 1) c))"),
            ("(- x x)", "0"),
            ("(- x 0)", "x"),
            ("(- (- x))", "x"),
            ("(- (+ x 1))", "(+ (- 1) (* (- 1) x))"),
            ("(- 0)", "0"),
            ("(- (+ x y) y)", "x"),
        ],
    );
}

#[test]
fn test_sum_of_monomials() {
    let options = HarrierOptions {
        som: true,
        sort_sums: true,
        ..Default::default()
    };
    run_tests(
        &options,
        &[
            ("(* (+ x 1) (+ x 2))", "(+ 2 (* 3 x) (* x x))"),
            ("(* (+ x y) z)", "(+ (* x z) (* y z))"),
            ("(* 2 (+ x y) 3)", "(+ (* 6 x) (* 6 y))"),
            ("(* (+ x 1) (- x 1))", "(+ (- 1) (* x x))"),
        ],
    );
}

#[test]
fn test_som_blowup_budget() {
    let options = HarrierOptions {
        som: true,
        sort_sums: true,
        ..Default::default()
    };
    let config = RewriterConfig::from(&options);

    // 5 * 5 = 25 products, over the budget of som_blowup * arity = 10 * 2; the product must be
    // left undistributed instead of expanding
    let mut pool = PrimitivePool::new();
    let [input] = parse_terms(
        &mut pool,
        DEFINITIONS,
        ["(* (+ a b c x y) (+ z w u v 1))"],
    );
    let mut rewriter = PolyRewriter::new(&mut pool, config.clone());
    let got = rewriter.rewrite(&input).unwrap();
    let (op, args) = got.as_op().unwrap();
    assert_eq!(op, crate::ast::Operator::Mult);
    assert!(args.iter().all(|a| a.is_add()));

    // 2 * 5 = 10 products, within the budget of 10 * 2
    let [input] = parse_terms(&mut pool, DEFINITIONS, ["(* (+ a b) (+ z w u v 1))"]);
    let mut rewriter = PolyRewriter::new(&mut pool, config);
    let got = rewriter.rewrite(&input).unwrap();
    assert!(got.is_add());
    assert_eq!(got.as_op().unwrap().1.len(), 10);
}

#[test]
fn test_power_grouping() {
    let options = HarrierOptions {
        use_power: true,
        sort_sums: true,
        ..Default::default()
    };
    run_tests(
        &options,
        &[
            ("(* x y x)", "(* (^ x 2) y)"),
            ("(* x x x)", "(^ x 3)"),
            ("(* x (^ x 2) y)", "(* (^ x 3) y)"),
            ("(* 2 x x)", "(* 2 (^ x 2))"),
            ("(^ x 1)", "x"),
            ("(^ 2 10)", "1024"),
        ],
    );
}

#[test]
fn test_power_expansion() {
    // Without power grouping, integer powers are expanded into products
    run_tests(
        &sorting(),
        &[
            ("(^ x 3)", "(* x x x)"),
            ("(^ x 1)", "x"),
            ("(^ 2 10)", "1024"),
            ("(^ (+ x 1) 1)", "(+ 1 x)"),
        ],
    );
}

#[test]
fn test_hoist_multiplication() {
    let options = HarrierOptions {
        hoist_mul: true,
        sort_sums: true,
        ..Default::default()
    };
    run_tests(
        &options,
        &[
            ("(+ (* 3 a b) (* 3 a c))", "(* 3 (* a (+ b c)))"),
            ("(+ (* a b) (* a c) x)", "(+ x (* a (+ b c)))"),
            // No shared factors, nothing to hoist
            ("(+ (* a b) (* x y))", "(+ (* a b) (* x y))"),
        ],
    );
}

#[test]
fn test_hoist_ite() {
    let options = HarrierOptions {
        hoist_ite: true,
        sort_sums: true,
        ..Default::default()
    };
    run_tests(
        &options,
        &[
            (
                "(+ 1 (ite p (+ a 1) (+ a 2)))",
                "(+ 1 a (ite p 1 2))",
            ),
            // All-numeral leaves hoist their gcd
            ("(+ (ite p 4 6) x)", "(+ x (* 2 (ite p 2 3)))"),
            // Mixed leaves hoist nothing
            ("(+ (ite p (+ a 1) 5) x)", "(+ x (ite p (+ 1 a) 5))"),
        ],
    );
}

#[test]
fn test_comparisons() {
    run_tests(
        &sorting(),
        &[
            ("(<= (+ x 1 y) (+ y 2))", "(<= x 1)"),
            ("(= (+ x x 1) (+ x 1))", "(= x 0)"),
            ("(< 1 2)", "true"),
            ("(>= 1 2)", "false"),
            ("(= x x)", "true"),
            ("(<= (+ x 3) (+ y 5))", "(<= x (+ 2 y))"),
        ],
    );
}

#[test]
fn test_modular_sorts() {
    run_tests(
        &sorting(),
        &[
            // Coefficients of modular sort are reduced into [0, n)
            ("(* 4 (+ m 5))", "(+ 6 (* 4 m))"),
            ("(+ m (* 6 m))", "0"),
            ("(+ m m m m m m m)", "0"),
            ("(- m)", "(* 6 m)"),
        ],
    );
}

#[test]
fn test_atoms_are_left_alone() {
    run_tests(
        &sorting(),
        &[
            ("(* 2 x)", "(* 2 x)"),
            ("(+ 2 x)", "(+ 2 x)"),
            ("(f (+ 2 x 1))", "(f (+ 3 x))"),
            ("(* 2 (f x))", "(* 2 (f x))"),
            ("(ite p x y)", "(ite p x y)"),
            ("x", "x"),
            ("7", "7"),
        ],
    );
}

#[test]
fn test_no_flattening() {
    let options = HarrierOptions {
        flat: false,
        sort_sums: true,
        ..Default::default()
    };
    run_tests(
        &options,
        &[
            // Nested sums survive, but local simplifications still apply
            ("(+ x (+ y z))", "(+ x (+ y z))"),
            ("(* 2 (* 3 x))", "(* 6 x)"),
            ("(+ 1 2)", "3"),
        ],
    );
}

#[test]
fn test_canonical_forms_are_shared() {
    // Inputs that differ only by associativity, commutativity and numeric folding produce
    // pointer-equal results in one pool
    let groups: &[&[&str]] = &[
        &["(+ x (* 2 y) 1)", "(+ 1 (* y 2) x)", "(+ (+ 1 x) (* 2 y))"],
        &["(* 2 x y)", "(* x (* 2 y))", "(* y 2 x)"],
        &["(- x y)", "(+ x (* (- 1) y))"],
    ];
    let options = sorting();
    let config = RewriterConfig::from(&options);
    for group in groups {
        let mut pool = PrimitivePool::new();
        let mut results = Vec::new();
        for &input in *group {
            let [term] = parse_terms(&mut pool, DEFINITIONS, [input]);
            let mut rewriter = PolyRewriter::new(&mut pool, config.clone());
            results.push(rewriter.rewrite(&term).unwrap());
        }
        for window in results.windows(2) {
            assert_eq!(window[0], window[1]);
        }
    }
}

#[test]
fn test_order_stability() {
    // Swapping two arguments of an input `+` produces the same output
    let options = sorting();
    let config = RewriterConfig::from(&options);
    let mut pool = PrimitivePool::new();
    let [first, second] = parse_terms(
        &mut pool,
        DEFINITIONS,
        ["(+ (* 2 b) a (* 3 c))", "(+ a (* 2 b) (* 3 c))"],
    );
    let mut rewriter = PolyRewriter::new(&mut pool, config);
    let first = rewriter.rewrite(&first).unwrap();
    let second = rewriter.rewrite(&second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cancellation_token() {
    let options = sorting();
    let config = RewriterConfig::from(&options);
    let mut pool = PrimitivePool::new();
    let [term] = parse_terms(&mut pool, DEFINITIONS, ["(+ 1 x (+ 2 y) x)"]);
    let token = CancellationToken::new();
    token.cancel();
    let mut rewriter = PolyRewriter::new(&mut pool, config).with_cancel(token);
    assert!(matches!(
        rewriter.rewrite(&term),
        Err(RewriterError::Cancelled)
    ));
}

#[test]
fn test_cancel_monomials() {
    let options = sorting();
    let config = RewriterConfig::from(&options);
    let mut pool = PrimitivePool::new();
    let [atom, expected] = parse_terms(
        &mut pool,
        DEFINITIONS,
        ["(<= (+ 3 x) (+ y 5))", "(<= (+ x (* (- 1) y)) 2)"],
    );
    let mut rewriter = PolyRewriter::new(&mut pool, config);
    let atom = rewriter.rewrite(&atom).unwrap();
    let moved = rewriter.cancel_atom(&atom).unwrap();
    assert_eq!(expected, moved);

    // Applying the move twice is a no-op
    assert!(rewriter.cancel_atom(&moved).is_none());
}

#[test]
fn test_gcd_test() {
    let cases = [
        // 2x + 4y = 1 has no integer solution
        ("(+ (* 2 x) (* 4 y))", "1", false),
        ("(+ (* 2 x) (* 4 y))", "6", true),
        ("(+ (* 2 x) 3)", "(* 2 y)", false),
        // A coefficient of one makes the gcd trivial
        ("(+ (* 2 x) y)", "1", true),
        // Non-integer monomials are inconclusive
        ("(* (/ 1 2) r)", "1", true),
    ];
    for (lhs, rhs, expected) in cases {
        let mut pool = PrimitivePool::new();
        let [lhs, rhs] = parse_terms(&mut pool, DEFINITIONS, [lhs, rhs]);
        assert_eq!(gcd_test(&lhs, &rhs), expected, "gcd_test({}, {})", lhs, rhs);
    }
}

#[test]
fn test_invariants() {
    // Rewriting arbitrary arithmetic terms yields terms satisfying the structural invariants of
    // the canonical form
    let inputs = [
        "(+ 1 x (+ 2 y) x)",
        "(* (+ x 1) (+ x 2) (+ y 3))",
        "(- (* 2 x y) (* x y 2) 1)",
        "(* x y x z y)",
        "(+ (* 2 x) (* 3 x) (* (- 5) x))",
        "(* 0 (+ x y z))",
        "(- (- (- x)))",
    ];
    for use_power in [false, true] {
        for som in [false, true] {
            let options = HarrierOptions {
                som,
                use_power,
                sort_sums: true,
                ..Default::default()
            };
            let config = RewriterConfig::from(&options);
            for input in inputs {
                let mut pool = PrimitivePool::new();
                let [term] = parse_terms(&mut pool, DEFINITIONS, [input]);
                let mut rewriter = PolyRewriter::new(&mut pool, config.clone());
                let got = rewriter.rewrite(&term).unwrap();
                assert_invariants(&config, &got);
            }
        }
    }
}

/// Checks the structural invariants of canonical forms: no nested `+`/`*`, at most one numeral
/// per application (in leading position, and non-trivial in products), no zero summands or unit
/// factors, and `^` only under power grouping.
fn assert_invariants(config: &RewriterConfig, t: &Rc<Term>) {
    match t.as_ref() {
        Term::Op(Operator::Add, args) => {
            assert!(args.len() >= 2, "uncollapsed sum: {}", t);
            for (i, arg) in args.iter().enumerate() {
                assert!(!arg.is_add(), "nested sum: {}", t);
                assert!(!arg.is_zero(), "zero summand: {}", t);
                if arg.is_number() {
                    assert_eq!(i, 0, "numeral not in leading position: {}", t);
                }
                assert_invariants(config, arg);
            }
        }
        Term::Op(Operator::Mult, args) => {
            assert!(args.len() >= 2, "uncollapsed product: {}", t);
            for (i, arg) in args.iter().enumerate() {
                assert!(!arg.is_mul() || (i == 1 && args.len() == 2), "nested product: {}", t);
                assert!(!arg.is_zero(), "zero factor: {}", t);
                assert!(!arg.is_one(), "unit factor: {}", t);
                if arg.is_number() {
                    assert_eq!(i, 0, "coefficient not in leading position: {}", t);
                }
                assert_invariants(config, arg);
            }
        }
        Term::Op(Operator::Pow, args) => {
            assert!(config.use_power, "power without power grouping: {}", t);
            let k = args[1].as_integer().expect("integer exponent");
            assert!(k >= 2, "trivial exponent: {}", t);
            assert_invariants(config, &args[0]);
        }
        Term::Op(_, args) => {
            for arg in args {
                assert_invariants(config, arg);
            }
        }
        Term::App(_, args) => {
            for arg in args {
                assert_invariants(config, arg);
            }
        }
        _ => (),
    }
}
