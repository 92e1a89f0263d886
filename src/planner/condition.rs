//! Typed query conditions
//!
//! Conditions arrive already parsed: column names, comparison operators and
//! typed operands. Evaluation against a row uses the same comparison the
//! index does, so both paths agree on every value.

use std::cmp::Ordering;
use std::fmt;

use super::errors::{QueryError, QueryResult};
use crate::table::Schema;
use crate::types::{Operand, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    pub fn holds(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
        }
    }

    /// `>` and `>=`
    pub fn is_lower_bound(&self) -> bool {
        matches!(self, CompareOp::Gt | CompareOp::Ge)
    }

    /// `<` and `<=`
    pub fn is_upper_bound(&self) -> bool {
        matches!(self, CompareOp::Lt | CompareOp::Le)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: CompareOp,
        operand: Operand,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(column: impl Into<String>, op: CompareOp, operand: impl Into<Operand>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            operand: operand.into(),
        }
    }

    pub fn lt(column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(column, CompareOp::Lt, operand)
    }

    pub fn le(column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(column, CompareOp::Le, operand)
    }

    pub fn gt(column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(column, CompareOp::Gt, operand)
    }

    pub fn ge(column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(column, CompareOp::Ge, operand)
    }

    pub fn equal(column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(column, CompareOp::Eq, operand)
    }

    pub fn not_equal(column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(column, CompareOp::Ne, operand)
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Condition::Not(Box::new(self))
    }

    /// Distinct columns referenced, in first-use order
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Compare { column, .. } => {
                if !out.contains(&column.as_str()) {
                    out.push(column);
                }
            }
            Condition::And(a, b) | Condition::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
            Condition::Not(c) => c.collect_columns(out),
        }
    }

    /// Checks that every column exists and accepts its operand.
    pub fn validate(&self, schema: &Schema) -> QueryResult<()> {
        match self {
            Condition::Compare { column, operand, .. } => {
                let desc = schema
                    .column(column)
                    .ok_or_else(|| QueryError::UnknownColumn(column.clone()))?;
                if !desc.ty.accepts(operand) {
                    return Err(QueryError::TypeMismatch {
                        column: column.clone(),
                        ty: desc.ty,
                        operand: format!("{} {}", operand.kind_name(), operand),
                    });
                }
                Ok(())
            }
            Condition::And(a, b) | Condition::Or(a, b) => {
                a.validate(schema)?;
                b.validate(schema)
            }
            Condition::Not(c) => c.validate(schema),
        }
    }

    /// Evaluates against one row. `lookup` returns the row's value for a
    /// column; conditions are validated beforehand.
    pub fn eval<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<Value>,
    {
        match self {
            Condition::Compare { column, op, operand } => lookup(column)
                .and_then(|v| v.cmp_operand(operand))
                .map_or(false, |ord| op.holds(ord)),
            Condition::And(a, b) => a.eval(lookup) && b.eval(lookup),
            Condition::Or(a, b) => a.eval(lookup) || b.eval(lookup),
            Condition::Not(c) => !c.eval(lookup),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { column, op, operand } => write!(f, "({} {} {})", column, op, operand),
            Condition::And(a, b) => write!(f, "({} & {})", a, b),
            Condition::Or(a, b) => write!(f, "({} | {})", a, b),
            Condition::Not(c) => write!(f, "~{}", c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementType;

    fn row(v: i32) -> impl Fn(&str) -> Option<Value> {
        move |col| (col == "x").then_some(Value::Int32(v))
    }

    #[test]
    fn test_eval_operators() {
        let lookup = row(5);
        assert!(Condition::lt("x", 6).eval(&lookup));
        assert!(!Condition::lt("x", 5).eval(&lookup));
        assert!(Condition::le("x", 5).eval(&lookup));
        assert!(Condition::ge("x", 5.0).eval(&lookup));
        assert!(!Condition::gt("x", 5).eval(&lookup));
        assert!(Condition::not_equal("x", 4).eval(&lookup));
        assert!(Condition::gt("x", 1).and(Condition::lt("x", 9)).eval(&lookup));
        assert!(Condition::equal("x", 1).or(Condition::equal("x", 5)).eval(&lookup));
        assert!(!Condition::equal("x", 5).negate().eval(&lookup));
    }

    #[test]
    fn test_validate() {
        let schema = Schema::default()
            .with_column("x", ElementType::Int32)
            .with_column("s", ElementType::String { itemsize: 3 });
        Condition::equal("x", 1).and(Condition::equal("s", "ab")).validate(&schema).unwrap();

        let err = Condition::equal("y", 1).validate(&schema).unwrap_err();
        assert_eq!(err.code(), "COLDEX_QUERY_UNKNOWN_COLUMN");
        let err = Condition::equal("s", 1).validate(&schema).unwrap_err();
        assert_eq!(err.code(), "COLDEX_QUERY_TYPE_MISMATCH");
    }

    #[test]
    fn test_columns_and_display() {
        let c = Condition::gt("a", 1).and(Condition::lt("b", 2).or(Condition::lt("a", 0)));
        assert_eq!(c.columns(), vec!["a", "b"]);
        assert_eq!(Condition::le("a", 3).to_string(), "(a <= 3)");
    }
}
