//! WHERE clause evaluation under SQL three-valued logic.
//!
//! Column references are bound to row positions once per statement
//! ([Scope::bind]); the bound tree is then evaluated against every row
//! without touching names again.

use std::cmp::Ordering;

use crate::ast::{ColumnRef, ComparisonOp, Expr, Operand};
use crate::error::QueryError;
use crate::table::Table;
use crate::value::{Comparable, Value};

/// Result of a predicate: SQL's TRUE, FALSE or UNKNOWN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    /// FALSE wins, then UNKNOWN.
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    /// TRUE wins, then UNKNOWN.
    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    pub fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }

    pub fn is_true(self) -> bool {
        self == Truth::True
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b { Truth::True } else { Truth::False }
    }
}

/// One column of a (possibly joined) row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeColumn {
    pub table: String,
    pub column: String,
    /// `table.column` when the column name occurs in several tables of the
    /// scope, the bare name otherwise.
    pub label: String,
}

/// The columns visible to a statement, laid out in row order: every column of
/// the first table, then every column of the second, and so on.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub tables: Vec<String>,
    pub columns: Vec<ScopeColumn>,
}

impl Scope {
    pub fn new(tables: &[Table]) -> Self {
        let shared = |column: &str| tables.iter().filter(|t| t.has_column(column)).count() > 1;

        let mut columns = Vec::new();
        for table in tables {
            for col in &table.columns {
                let label = if shared(&col.name) {
                    format!("{}.{}", table.name, col.name)
                } else {
                    col.name.clone()
                };
                columns.push(ScopeColumn {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    label,
                });
            }
        }
        Self {
            tables: tables.iter().map(|t| t.name.clone()).collect(),
            columns,
        }
    }

    /// Position of a column reference in the row.
    ///
    /// # Errors
    /// - [QueryError::UnspecifiedTable] if the qualifier names no table in scope.
    /// - [QueryError::ColumnNotFound] if no table in scope has the column, or
    ///   the qualifying table does not.
    /// - [QueryError::AmbiguousColumnReference] if the bare name belongs to
    ///   several tables.
    pub fn resolve(&self, reference: &ColumnRef) -> Result<usize, QueryError> {
        if let Some(table) = &reference.table {
            if !self.tables.iter().any(|t| t == table) {
                return Err(QueryError::UnspecifiedTable(table.clone()));
            }
        }

        let mut found = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.column == reference.column);

        match &reference.table {
            Some(table) => found
                .find(|(_, c)| &c.table == table)
                .map(|(idx, _)| idx)
                .ok_or_else(|| QueryError::ColumnNotFound(reference.to_string())),
            None => {
                let (idx, _) = found
                    .next()
                    .ok_or_else(|| QueryError::ColumnNotFound(reference.column.clone()))?;
                if found.next().is_some() {
                    return Err(QueryError::AmbiguousColumnReference(
                        reference.column.clone(),
                    ));
                }
                Ok(idx)
            }
        }
    }

    /// Resolves every column reference of `expr`.
    pub fn bind(&self, expr: &Expr) -> Result<BoundExpr, QueryError> {
        Ok(match expr {
            Expr::Comparison { left, op, right } => BoundExpr::Comparison {
                left: self.bind_operand(left)?,
                op: *op,
                right: self.bind_operand(right)?,
            },
            Expr::IsNull { operand, negated } => BoundExpr::IsNull {
                operand: self.bind_operand(operand)?,
                negated: *negated,
            },
            Expr::Not(inner) => BoundExpr::Not(Box::new(self.bind(inner)?)),
            Expr::And { left, right } => BoundExpr::And(
                Box::new(self.bind(left)?),
                Box::new(self.bind(right)?),
            ),
            Expr::Or { left, right } => BoundExpr::Or(
                Box::new(self.bind(left)?),
                Box::new(self.bind(right)?),
            ),
        })
    }

    fn bind_operand(&self, operand: &Operand) -> Result<BoundOperand, QueryError> {
        match operand {
            Operand::Literal(value) => Ok(BoundOperand::Literal(value.clone())),
            Operand::Column(reference) => self.resolve(reference).map(BoundOperand::Column),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundOperand {
    Literal(Value),
    Column(usize),
}

impl BoundOperand {
    fn value<'a>(&'a self, row: &'a [Value]) -> &'a Value {
        match self {
            BoundOperand::Literal(value) => value,
            BoundOperand::Column(idx) => &row[*idx],
        }
    }
}

/// An [Expr] whose column references are row positions.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Comparison {
        left: BoundOperand,
        op: ComparisonOp,
        right: BoundOperand,
    },
    IsNull {
        operand: BoundOperand,
        negated: bool,
    },
    Not(Box<BoundExpr>),
    And(Box<BoundExpr>, Box<BoundExpr>),
    Or(Box<BoundExpr>, Box<BoundExpr>),
}

impl BoundExpr {
    /// Evaluates the predicate against one row laid out like the [Scope] it
    /// was bound in.
    ///
    /// # Errors
    /// [QueryError::IncomparableOperands] when both sides of a comparison are
    /// non-null and of different inferred types.
    pub fn evaluate(&self, row: &[Value]) -> Result<Truth, QueryError> {
        match self {
            BoundExpr::Comparison { left, op, right } => {
                compare(left.value(row), *op, right.value(row))
            }
            BoundExpr::IsNull { operand, negated } => {
                let is_null = operand.value(row).is_null();
                Ok(Truth::from(is_null != *negated))
            }
            BoundExpr::Not(inner) => Ok(inner.evaluate(row)?.not()),
            BoundExpr::And(left, right) => Ok(left.evaluate(row)?.and(right.evaluate(row)?)),
            BoundExpr::Or(left, right) => Ok(left.evaluate(row)?.or(right.evaluate(row)?)),
        }
    }
}

/// Compares two values.
///
/// # SQL NULL Semantics
/// If either side is `NULL` the answer is UNKNOWN, for every operator.
///
/// Otherwise both sides must infer to the same type (integer, date or text);
/// text operands are converted to that type before comparing.
pub fn compare(left: &Value, op: ComparisonOp, right: &Value) -> Result<Truth, QueryError> {
    let (kind, other) = match (left.comparable(), right.comparable()) {
        (Some(l), Some(r)) => (l, r),
        _ => return Ok(Truth::Unknown),
    };
    if kind != other {
        return Err(QueryError::IncomparableOperands);
    }

    let ordering = match kind {
        Comparable::Int => left.to_int().cmp(&right.to_int()),
        Comparable::Date => left.to_date().cmp(&right.to_date()),
        Comparable::Text => text_of(left).cmp(&text_of(right)),
    };

    let holds = match op {
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::LtEq => ordering != Ordering::Greater,
        ComparisonOp::Gt => ordering == Ordering::Greater,
        ComparisonOp::GtEq => ordering != Ordering::Less,
        ComparisonOp::Eq => ordering == Ordering::Equal,
        ComparisonOp::NotEq => ordering != Ordering::Equal,
    };
    Ok(Truth::from(holds))
}

fn text_of(value: &Value) -> String {
    value.to_string()
}
