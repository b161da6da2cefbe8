//! Printing terms in SMT-LIB surface syntax.

use super::{Constant, Sort, Term};
use rug::{Integer, Rational};
use std::fmt;

fn write_integer(f: &mut fmt::Formatter, i: &Integer) -> fmt::Result {
    if *i < 0 {
        write!(f, "(- {})", Integer::from(-i))
    } else {
        write!(f, "{}", i)
    }
}

fn write_rational(f: &mut fmt::Formatter, r: &Rational) -> fmt::Result {
    if *r < 0 {
        write!(f, "(- ")?;
        write_rational(f, &Rational::from(-r))?;
        write!(f, ")")
    } else if r.is_integer() {
        write!(f, "{}.0", r.numer())
    } else {
        write!(f, "(/ {} {})", r.numer(), r.denom())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constant::Integer(i) => write_integer(f, i),
            Constant::Real(r) => write_rational(f, r),
        }
    }
}

// Terms print identically in debug and display position; the surface syntax is unambiguous
impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Const(c) => write!(f, "{}", c),
            Term::Var(name, _) => write!(f, "{}", name),
            Term::App(func, args) => {
                write!(f, "({}", func)?;
                for a in args {
                    write!(f, " {}", a)?;
                }
                write!(f, ")")
            }
            Term::Op(op, args) if args.is_empty() => write!(f, "{}", op),
            Term::Op(op, args) => {
                write!(f, "({}", op)?;
                for a in args {
                    write!(f, " {}", a)?;
                }
                write!(f, ")")
            }
            Term::Sort(sort) => write!(f, "{}", sort),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Sort::Function(args) => {
                write!(f, "(->")?;
                for a in args {
                    write!(f, " {}", a)?;
                }
                write!(f, ")")
            }
            Sort::Atom(name) => write!(f, "{}", name),
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Real => write!(f, "Real"),
            Sort::Mod(n) => write!(f, "(_ Mod {})", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::pool::PrimitivePool;
    use crate::parser::tests::parse_terms;

    #[test]
    fn test_print_term() {
        let definitions = "
            (declare-const x Int)
            (declare-const y Real)
            (declare-fun f (Int) Int)
        ";
        let cases = [
            "(+ 1 x)",
            "(* 2 x (f x))",
            "(* (- 1) x)",
            "(<= (+ x 1) (* 2 x))",
            "(ite (< x 0) (- x) x)",
        ];
        let mut pool = PrimitivePool::new();
        for case in cases {
            let [term] = parse_terms(&mut pool, definitions, [case]);
            assert_eq!(case, format!("{}", term));
        }
        let [real] = parse_terms(&mut pool, definitions, ["(+ 1.5 y)"]);
        assert_eq!("(+ (/ 3 2) y)", format!("{}", real));
    }
}
