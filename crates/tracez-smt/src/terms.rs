//! Solver-agnostic terms of a trace feasibility query.
//!
//! The fragment is quantifier-free integer arithmetic with Boolean
//! connectives, which is all a branch predicate or reachability goal needs.

/// Integer operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
        }
    }
}

/// Comparisons. `Eq` also relates two Booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtTerm {
    Var(String),
    Int(i64),
    Bool(bool),
    Arith(ArithOp, Box<SmtTerm>, Box<SmtTerm>),
    Cmp(CmpOp, Box<SmtTerm>, Box<SmtTerm>),
    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),
    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::Int(n)
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::Bool(b)
    }

    pub fn arith(op: ArithOp, lhs: SmtTerm, rhs: SmtTerm) -> Self {
        SmtTerm::Arith(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn cmp(op: CmpOp, lhs: SmtTerm, rhs: SmtTerm) -> Self {
        SmtTerm::Cmp(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn add(self, other: SmtTerm) -> Self {
        Self::arith(ArithOp::Add, self, other)
    }

    pub fn sub(self, other: SmtTerm) -> Self {
        Self::arith(ArithOp::Sub, self, other)
    }

    pub fn mul(self, other: SmtTerm) -> Self {
        Self::arith(ArithOp::Mul, self, other)
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        Self::cmp(CmpOp::Eq, self, other)
    }

    pub fn lt(self, other: SmtTerm) -> Self {
        Self::cmp(CmpOp::Lt, self, other)
    }

    pub fn le(self, other: SmtTerm) -> Self {
        Self::cmp(CmpOp::Le, self, other)
    }

    pub fn gt(self, other: SmtTerm) -> Self {
        Self::cmp(CmpOp::Gt, self, other)
    }

    pub fn ge(self, other: SmtTerm) -> Self {
        Self::cmp(CmpOp::Ge, self, other)
    }

    pub fn and(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::And(terms)
    }

    pub fn or(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(terms)
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn implies(self, other: SmtTerm) -> Self {
        SmtTerm::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: SmtTerm, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    /// Direct subterms, left to right.
    pub fn children(&self) -> Vec<&SmtTerm> {
        match self {
            SmtTerm::Var(_) | SmtTerm::Int(_) | SmtTerm::Bool(_) => Vec::new(),
            SmtTerm::Arith(_, l, r) | SmtTerm::Cmp(_, l, r) | SmtTerm::Implies(l, r) => {
                vec![l.as_ref(), r.as_ref()]
            }
            SmtTerm::And(terms) | SmtTerm::Or(terms) => terms.iter().collect(),
            SmtTerm::Not(inner) => vec![inner.as_ref()],
            SmtTerm::Ite(c, t, e) => vec![c.as_ref(), t.as_ref(), e.as_ref()],
        }
    }

    /// Node count, used to log query size.
    pub fn size(&self) -> usize {
        1 + self.children().into_iter().map(SmtTerm::size).sum::<usize>()
    }

    /// True if any product occurs, which moves the query out of linear
    /// arithmetic.
    pub fn is_nonlinear(&self) -> bool {
        matches!(self, SmtTerm::Arith(ArithOp::Mul, ..))
            || self.children().into_iter().any(SmtTerm::is_nonlinear)
    }
}
