use tracez_ir::Sort;

/// SMT sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtSort {
    Bool,
    Int,
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmtSort::Bool => write!(f, "Bool"),
            SmtSort::Int => write!(f, "Int"),
        }
    }
}

impl From<Sort> for SmtSort {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Int => SmtSort::Int,
            Sort::Bool => SmtSort::Bool,
        }
    }
}
