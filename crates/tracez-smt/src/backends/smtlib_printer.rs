use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Print an SmtTerm as SMT-LIB2.
pub fn to_smtlib(term: &SmtTerm) -> String {
    match term {
        SmtTerm::Var(name) => symbol(name),
        SmtTerm::Int(n) => {
            if *n < 0 {
                format!("(- {})", n.unsigned_abs())
            } else {
                n.to_string()
            }
        }
        SmtTerm::Bool(b) => b.to_string(),
        SmtTerm::Arith(op, lhs, rhs) => binary(op.symbol(), lhs, rhs),
        SmtTerm::Cmp(op, lhs, rhs) => binary(op.symbol(), lhs, rhs),
        SmtTerm::And(terms) => nary("and", "true", terms),
        SmtTerm::Or(terms) => nary("or", "false", terms),
        SmtTerm::Not(inner) => format!("(not {})", to_smtlib(inner)),
        SmtTerm::Implies(lhs, rhs) => binary("=>", lhs, rhs),
        SmtTerm::Ite(cond, then, els) => format!(
            "(ite {} {} {})",
            to_smtlib(cond),
            to_smtlib(then),
            to_smtlib(els)
        ),
    }
}

/// A name as an SMT-LIB symbol: bare when it is a simple symbol, otherwise
/// wrapped in `|...|`.
pub fn symbol(name: &str) -> String {
    const EXTRA: &str = "~!@$%^&*_-+=<>.?/";
    let simple = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || EXTRA.contains(c))
        && name.chars().next().is_some_and(|c| !c.is_ascii_digit());
    if simple && !is_reserved(name) {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        "true" | "false" | "and" | "or" | "not" | "ite" | "let" | "assert" | "exists" | "forall"
            | "_" | "!" | "as" | "par"
    )
}

fn binary(op: &str, lhs: &SmtTerm, rhs: &SmtTerm) -> String {
    format!("({op} {} {})", to_smtlib(lhs), to_smtlib(rhs))
}

fn nary(op: &str, unit: &str, terms: &[SmtTerm]) -> String {
    match terms {
        [] => unit.to_string(),
        [single] => to_smtlib(single),
        _ => {
            let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
            format!("({op} {})", inner.join(" "))
        }
    }
}

/// Print a sort as SMT-LIB2.
pub fn sort_to_smtlib(sort: &SmtSort) -> &'static str {
    match sort {
        SmtSort::Bool => "Bool",
        SmtSort::Int => "Int",
    }
}
