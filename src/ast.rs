use std::collections::BTreeSet;

use crate::{ColumnDef, Value};

/// One structured command, as produced by the parser or built by hand.
#[derive(Debug, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    DropTable(String),
    DescribeTable(String),
    ShowTables,
    InsertInto(InsertInto),
    Delete(Delete),
    Select(Select),
    Exit,
}

#[derive(Debug, Default, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub not_null: BTreeSet<String>,
    /// Every `PRIMARY KEY (...)` clause written. More than one is an error.
    pub primary_keys: Vec<Vec<String>>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

/// `FOREIGN KEY (column) REFERENCES table (ref_column)`
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

#[derive(Debug, PartialEq)]
pub struct InsertInto {
    pub table: String,
    pub columns: Option<Vec<String>>,
    pub values: Vec<Value>,
}

#[derive(Debug, PartialEq)]
pub struct Delete {
    pub table: String,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, PartialEq)]
pub enum ColumnsSelect {
    Star,
    Columns(Vec<ColumnRef>),
}

#[derive(Debug, PartialEq)]
pub struct Select {
    pub columns: ColumnsSelect,
    pub tables: Vec<String>,
    pub where_clause: Option<Expr>,
}

/// A column named in a query, optionally qualified by its table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Column(ColumnRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
}

/// WHERE clause tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Comparison {
        left: Operand,
        op: ComparisonOp,
        right: Operand,
    },
    /// `operand IS NULL`, or `IS NOT NULL` when `negated`.
    IsNull { operand: Operand, negated: bool },
    Not(Box<Expr>),
    And { left: Box<Expr>, right: Box<Expr> },
    Or { left: Box<Expr>, right: Box<Expr> },
}
