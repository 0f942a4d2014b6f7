//! Error types for every statement the engine executes.

use std::io;

use thiserror::Error;

use crate::data_type::DataType;

/// Top-level error type. Each category can be matched on by the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("no such table: '{0}'")]
    TableNotFound(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Insert(#[from] InsertError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    /// Storage failures are the only errors a shell should not survive.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Storage(StorageError::Io(err))
    }
}

/// Errors raised while validating a `CREATE TABLE` definition.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("create table has failed: column '{0}' is defined more than once")]
    DuplicateColumnDefinition(String),

    #[error("create table has failed: char length of column '{0}' must be at least 1")]
    InvalidCharLength(String),

    #[error("create table has failed: primary key definition is duplicated")]
    DuplicatePrimaryKeyDefinition,

    #[error("create table has failed: '{0}' does not exist in column definition")]
    UnknownColumnInDefinition(String),

    #[error("create table has failed: '{0}' is not a valid table name")]
    InvalidTableName(String),

    #[error("create table has failed: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("create table has failed: foreign key references non existing table '{0}'")]
    ReferencedTableNotFound(String),

    #[error("create table has failed: foreign key references non existing column '{table}.{column}'")]
    ReferencedColumnNotFound { table: String, column: String },

    #[error("create table has failed: foreign key references non primary key column '{table}.{column}'")]
    ReferenceToNonPrimaryKey { table: String, column: String },

    #[error("create table has failed: foreign key '{column}' has type {local}, referenced column has type {referenced}")]
    ReferenceTypeMismatch {
        column: String,
        local: DataType,
        referenced: DataType,
    },
}

/// Errors raised when a statement would break a relational constraint.
#[derive(Debug, Error, PartialEq)]
pub enum IntegrityError {
    #[error("drop table has failed: '{0}' is referenced by other table")]
    TableIsReferenced(String),

    #[error("insertion has failed: referential integrity violation on '{column}' (no row in '{table}')")]
    ReferentialIntegrityViolation { column: String, table: String },

    #[error("insertion has failed: primary key duplication in '{0}'")]
    DuplicatePrimaryKey(String),

    #[error("insertion has failed: '{0}' is not nullable")]
    NotNullViolation(String),
}

/// Errors raised when the shape of inserted values does not fit the table.
#[derive(Debug, Error, PartialEq)]
pub enum InsertError {
    #[error("insertion has failed: expected {expected} values, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("insertion has failed: '{0}' does not exist")]
    UnknownColumn(String),

    #[error("insertion has failed: column '{0}' is listed more than once")]
    DuplicateColumn(String),

    #[error("insertion has failed: value for '{column}' does not match type {expected}")]
    TypeMismatch { column: String, expected: DataType },
}

/// Errors raised while resolving or evaluating a WHERE clause or projection.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("column reference '{0}' is ambiguous")]
    AmbiguousColumnReference(String),

    #[error("column '{0}' does not exist")]
    ColumnNotFound(String),

    #[error("table '{0}' is not specified in the FROM clause")]
    UnspecifiedTable(String),

    #[error("trying to compare incomparable columns or values")]
    IncomparableOperands,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupted data in '{namespace}': {reason}")]
    Corrupted { namespace: String, reason: String },

    #[error("store '{0}' does not exist")]
    MissingNamespace(String),
}

pub type Result<T> = std::result::Result<T, Error>;
