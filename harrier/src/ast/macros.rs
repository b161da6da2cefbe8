/// Destructures an operation term against an s-expression-shaped pattern. Matching nested
/// `Op`/`Vec`/`Rc` layers by hand is noisy; this macro takes a pattern like `(* c (+ x y))` and
/// produces an `Option` of a tuple tree whose leaves are `&Rc<Term>`s bound to the pattern
/// variables, or `None` when the shape does not match.
macro_rules! match_term {
    (true = $var:expr) => {
        if $var.is_bool_true() { Some(()) } else { None }
    };
    (false = $var:expr) => {
        if $var.is_bool_false() { Some(()) } else { None }
    };
    ($bind:ident = $var:expr) => { Some($var) };
    (($op:tt $($args:tt)+) = $var:expr) => {{
        if let $crate::ast::Term::Op(match_term!(@GET_VARIANT $op), args) =
            &$var as &$crate::ast::Term
        {
            match_term!(@ARGS ($($args)+) = args.as_slice())
        } else {
            None
        }
    }};

    (@ARGS (...) = $var:expr) => { Some($var) };
    (@ARGS ($arg:tt) = $var:expr) => {
        match_term!(@ARGS_IDENT (arg1: $arg) = $var)
    };
    (@ARGS ($arg1:tt $arg2:tt) = $var:expr) => {
        match_term!(@ARGS_IDENT (arg1: $arg1, arg2: $arg2) = $var)
    };
    (@ARGS ($arg1:tt $arg2:tt $arg3:tt) = $var:expr) => {
        match_term!(@ARGS_IDENT (arg1: $arg1, arg2: $arg2, arg3: $arg3) = $var)
    };
    (@ARGS_IDENT ( $($name:ident : $arg:tt),* ) = $var:expr) => {
        if let [$($name),*] = $var {
            #[allow(unused_parens)]
            #[allow(clippy::manual_map)]
            match ($(match_term!($arg = $name)),*) {
                ($(Some($name)),*) => Some(($($name),*)),
                _ => None,
            }
        } else {
            None
        }
    };
    (@GET_VARIANT not)  => { $crate::ast::Operator::Not };
    (@GET_VARIANT and)  => { $crate::ast::Operator::And };
    (@GET_VARIANT or)   => { $crate::ast::Operator::Or };
    (@GET_VARIANT =)    => { $crate::ast::Operator::Equals };
    (@GET_VARIANT ite)  => { $crate::ast::Operator::Ite };
    (@GET_VARIANT +)    => { $crate::ast::Operator::Add };
    (@GET_VARIANT -)    => { $crate::ast::Operator::Sub };
    (@GET_VARIANT *)    => { $crate::ast::Operator::Mult };
    (@GET_VARIANT ^)    => { $crate::ast::Operator::Pow };
    (@GET_VARIANT <)    => { $crate::ast::Operator::LessThan };
    (@GET_VARIANT >)    => { $crate::ast::Operator::GreaterThan };
    (@GET_VARIANT <=)   => { $crate::ast::Operator::LessEq };
    (@GET_VARIANT >=)   => { $crate::ast::Operator::GreaterEq };
}

/// Builds a term from an s-expression-shaped pattern, adding every constructed subterm to the
/// pool. Braced positions splice in already-built terms. Convenient for tests and small
/// rewrites; for bulk construction prefer calling `TermPool::add` directly.
macro_rules! build_term {
    ($pool:expr, {$terminal:expr}) => { $terminal };
    ($pool:expr, ($op:tt $($args:tt)+)) => {{
        let term = $crate::ast::Term::Op(
            match_term!(@GET_VARIANT $op),
            vec![ $(build_term!($pool, $args)),+ ],
        );
        $pool.add(term)
    }};
}

/// Generates `FromStr` and `Display` impls for a fieldless enum from a variant-to-string table.
macro_rules! impl_str_conversion_traits {
    ($enum_name:ident { $($variant:ident: $str:literal),* $(,)? }) => {
        impl std::str::FromStr for $enum_name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($str => Ok($enum_name::$variant),)*
                    _ => Err(()),
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let s = match self {
                    $($enum_name::$variant => $str,)*
                };
                write!(f, "{}", s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{pool::PrimitivePool, TermPool};
    use crate::parser::tests::{parse_term, parse_terms};

    #[test]
    fn test_match_term() {
        let mut pool = PrimitivePool::new();
        let [term] = parse_terms(
            &mut pool,
            "(declare-const x Int) (declare-const y Int)",
            ["(* 2 (+ x y))"],
        );
        let (two, (x, y)) = match_term!((* two (+ x y)) = &term).unwrap();
        assert_eq!(two.as_integer().unwrap(), 2);
        assert_eq!(x.as_var().unwrap(), "x");
        assert_eq!(y.as_var().unwrap(), "y");

        let term = parse_term(&mut pool, "(ite true (+ 1 2) 0)");
        let (_, (a, b), c) = match_term!((ite true (+ a b) c) = &term).unwrap();
        assert_eq!(a.as_integer().unwrap(), 1);
        assert_eq!(b.as_integer().unwrap(), 2);
        assert_eq!(c.as_integer().unwrap(), 0);
    }

    #[test]
    fn test_build_term() {
        let mut pool = PrimitivePool::new();
        let definitions = "(declare-const a Int) (declare-const b Int)";
        let [a, b, expected] = parse_terms(&mut pool, definitions, ["a", "b", "(+ a (* 2 b))"]);

        let two = pool.add(crate::ast::Term::new_int(2));
        let got = build_term!(pool, (+ {a} (* {two} {b})));
        assert_eq!(expected, got);
    }
}
