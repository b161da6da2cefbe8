use super::Rc;
use rug::{Integer, Rational};

/// A term in the expression DAG.
///
/// Terms are immutable and hash consed; most convenience methods live here, with a few more on
/// [`Rc<Term>`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A numeric constant.
    Const(Constant),

    /// A variable: an identifier together with its sort.
    Var(String, Rc<Term>),

    /// An application of an uninterpreted function. Opaque to the normalizer, which treats such
    /// applications as atoms.
    App(Rc<Term>, Vec<Rc<Term>>),

    /// An application of a built-in operator.
    Op(Operator, Vec<Rc<Term>>),

    /// A sort, represented as a term so that sorts can live in the pool and share allocations.
    Sort(Sort),
}

/// The sort of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    /// The sort of a function: parameter sorts followed by the return sort.
    Function(Vec<Rc<Term>>),

    /// A sort introduced by a `declare-sort` command.
    Atom(String),

    /// The booleans.
    Bool,

    /// The integers.
    Int,

    /// The reals.
    Real,

    /// The ring of integers modulo `n`, written `(_ Mod n)`. Coefficient normalization reduces
    /// numerals of this sort into the interval `[0, n)`.
    Mod(Integer),
}

impl Sort {
    /// Returns `true` if the sort is one the arithmetic operators accept.
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Sort::Int | Sort::Real | Sort::Mod(_))
    }
}

/// A numeric constant. Integer and real constants are distinct terms even when their values
/// coincide: `3` and `3.0` do not share an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Integer(Integer),
    Real(Rational),
}

/// The operator of an operation term.
///
/// The variant order is meaningful: the structural term order compares operators by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// The `true` boolean constant.
    True,

    /// The `false` boolean constant.
    False,

    /// The `not` operator.
    Not,

    /// The `and` operator.
    And,

    /// The `or` operator.
    Or,

    /// The `=` operator.
    Equals,

    /// The `ite` operator.
    Ite,

    // Arithmetic
    /// The `+` operator.
    Add,

    /// The `-` operator, both unary negation and n-ary subtraction.
    Sub,

    /// The `*` operator.
    Mult,

    /// The `^` operator.
    Pow,

    /// The `<` operator.
    LessThan,

    /// The `>` operator.
    GreaterThan,

    /// The `<=` operator.
    LessEq,

    /// The `>=` operator.
    GreaterEq,
}

impl_str_conversion_traits!(Operator {
    True: "true",
    False: "false",

    Not: "not",
    And: "and",
    Or: "or",
    Equals: "=",
    Ite: "ite",

    Add: "+",
    Sub: "-",
    Mult: "*",
    Pow: "^",
    LessThan: "<",
    GreaterThan: ">",
    LessEq: "<=",
    GreaterEq: ">=",
});

impl Operator {
    /// Whether the operator belongs to the arithmetic family. Operation terms outside this
    /// family (like `ite`) are atoms as far as the normalizer is concerned.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Sub | Operator::Mult | Operator::Pow
        )
    }

    /// Whether the operator is equality or one of the order relations.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Equals
                | Operator::LessThan
                | Operator::GreaterThan
                | Operator::LessEq
                | Operator::GreaterEq
        )
    }
}

impl Term {
    pub fn new_bool(value: impl Into<bool>) -> Self {
        let op = match value.into() {
            true => Operator::True,
            false => Operator::False,
        };
        Term::Op(op, Vec::new())
    }

    pub fn new_int(value: impl Into<Integer>) -> Self {
        Term::Const(Constant::Integer(value.into()))
    }

    pub fn new_real(value: impl Into<Rational>) -> Self {
        Term::Const(Constant::Real(value.into()))
    }

    pub fn new_var(name: impl Into<String>, sort: Rc<Term>) -> Self {
        Term::Var(name.into(), sort)
    }

    /// A numeral of the given sort: an integer constant for `Int` and `Mod` sorts, a real
    /// constant otherwise.
    pub fn new_numeral(value: Rational, sort: &Sort) -> Self {
        match sort {
            Sort::Int | Sort::Mod(_) if value.is_integer() => {
                Term::Const(Constant::Integer(value.numer().clone()))
            }
            _ => Term::Const(Constant::Real(value)),
        }
    }

    /// Whether the term is a numeric constant.
    pub fn is_number(&self) -> bool {
        matches!(self, Term::Const(_))
    }

    /// The value of a numeric constant as a rational, or `None` for any other term.
    pub fn as_number(&self) -> Option<Rational> {
        match self {
            Term::Const(c) => Some(c.as_rational()),
            _ => None,
        }
    }

    /// Like [`Term::as_number`], but also accepts a numeric constant under a unary `-`, negating
    /// its value. Useful for inspecting terms that have not been normalized, where `(- 5)` may
    /// still appear as an application rather than as a negative constant.
    pub fn as_signed_number(&self) -> Option<Rational> {
        match match_term!((- x) = self) {
            Some(x) => x.as_number().map(|r| -r),
            None => self.as_number(),
        }
    }

    /// The value of a constant with an integral value (whether it is an integer or a real
    /// constant), or `None`.
    pub fn as_integer(&self) -> Option<Integer> {
        match self {
            Term::Const(Constant::Integer(i)) => Some(i.clone()),
            Term::Const(Constant::Real(r)) if r.is_integer() => Some(r.numer().clone()),
            _ => None,
        }
    }

    /// Whether the term is the numeral zero.
    pub fn is_zero(&self) -> bool {
        self.as_number().is_some_and(|r| r == 0)
    }

    /// Whether the term is the numeral one.
    pub fn is_one(&self) -> bool {
        self.as_number().is_some_and(|r| r == 1)
    }

    /// Whether the term is an application of `+`.
    pub fn is_add(&self) -> bool {
        matches!(self, Term::Op(Operator::Add, _))
    }

    /// Whether the term is an application of `*`.
    pub fn is_mul(&self) -> bool {
        matches!(self, Term::Op(Operator::Mult, _))
    }

    /// Whether the term is an application of `^`.
    pub fn is_power(&self) -> bool {
        matches!(self, Term::Op(Operator::Pow, _))
    }

    /// Whether the term is an `ite`.
    pub fn is_ite(&self) -> bool {
        matches!(self, Term::Op(Operator::Ite, _))
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Term::Const(_))
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_, _))
    }

    /// The name of a variable, or `None` for any other term.
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Term::Var(name, _) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_sort(&self) -> bool {
        matches!(self, Term::Sort(_))
    }

    /// The sort a sort term carries, or `None` for any other term.
    pub fn as_sort(&self) -> Option<&Sort> {
        match self {
            Term::Sort(s) => Some(s),
            _ => None,
        }
    }

    /// The operator and arguments of an operation term, or `None` for any other term.
    pub fn as_op(&self) -> Option<(Operator, &[Rc<Term>])> {
        match self {
            Term::Op(op, args) => Some((*op, args.as_slice())),
            _ => None,
        }
    }

    /// Whether the term is the boolean constant `true`.
    pub fn is_bool_true(&self) -> bool {
        *self == Term::Op(Operator::True, Vec::new())
    }

    /// Whether the term is the boolean constant `false`.
    pub fn is_bool_false(&self) -> bool {
        *self == Term::Op(Operator::False, Vec::new())
    }
}

impl Constant {
    pub fn sort(&self) -> Sort {
        match self {
            Constant::Integer(_) => Sort::Int,
            Constant::Real(_) => Sort::Real,
        }
    }

    pub fn as_rational(&self) -> Rational {
        match self {
            Constant::Integer(i) => i.clone().into(),
            Constant::Real(r) => r.clone(),
        }
    }
}
