//! Multi-table SELECT: cartesian product, filtering and projection.

use crate::ast::ColumnsSelect;
use crate::error::QueryError;
use crate::eval::{BoundExpr, Scope};
use crate::value::Value;

/// Represents the result of a successful `SELECT` query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column headers, in output order.
    pub columns: Vec<String>,
    /// The actual data, returned as a vector of rows, where each row is a vector of [Value].
    pub rows: Vec<Vec<Value>>,
}

/// Which scope positions a query emits, and under which headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub indices: Vec<usize>,
    pub headers: Vec<String>,
}

impl Projection {
    /// Resolves the select list against the scope.
    ///
    /// `*` emits every scope column under its scope label. An explicit item
    /// is headed `table.column` when it was written qualified, and by the
    /// bare column name otherwise.
    pub fn resolve(scope: &Scope, columns: &ColumnsSelect) -> Result<Self, QueryError> {
        match columns {
            ColumnsSelect::Star => Ok(Self {
                indices: (0..scope.columns.len()).collect(),
                headers: scope.columns.iter().map(|c| c.label.clone()).collect(),
            }),
            ColumnsSelect::Columns(refs) => {
                let mut indices = Vec::with_capacity(refs.len());
                let mut headers = Vec::with_capacity(refs.len());
                for reference in refs {
                    indices.push(scope.resolve(reference)?);
                    headers.push(reference.to_string());
                }
                Ok(Self { indices, headers })
            }
        }
    }

    pub fn apply(&self, row: &[Value]) -> Vec<Value> {
        self.indices.iter().map(|&i| row[i].clone()).collect()
    }
}

/// Every combination of one row per relation, concatenated in relation
/// order. The first relation is the outermost loop.
pub fn cartesian_product(relations: &[Vec<Vec<Value>>]) -> Vec<Vec<Value>> {
    relations.iter().fold(vec![Vec::new()], |acc, relation| {
        acc.iter()
            .flat_map(|prefix| {
                relation.iter().map(move |row| {
                    let mut joined = Vec::with_capacity(prefix.len() + row.len());
                    joined.extend_from_slice(prefix);
                    joined.extend_from_slice(row);
                    joined
                })
            })
            .collect()
    })
}

/// Joins `relations`, keeps the rows for which `predicate` is TRUE and
/// projects them.
pub fn execute(
    relations: &[Vec<Vec<Value>>],
    predicate: Option<&BoundExpr>,
    projection: &Projection,
) -> Result<QueryResult, QueryError> {
    let mut rows = Vec::new();
    for row in cartesian_product(relations) {
        let keep = match predicate {
            Some(expr) => expr.evaluate(&row)?.is_true(),
            None => true,
        };
        if keep {
            rows.push(projection.apply(&row));
        }
    }
    Ok(QueryResult {
        columns: projection.headers.clone(),
        rows,
    })
}
