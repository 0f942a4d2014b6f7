//! A small relational database engine persisted to one file per table.
//!
//! SQL text goes through [tokenizer] and [parser] into an [ast::Statement];
//! [Database] checks it against the schemas in the [catalog] and runs it on
//! the [storage] namespaces.

pub mod ast;
pub mod catalog;
pub mod data_type;
pub mod database;
pub mod encoding;
pub mod error;
pub mod eval;
pub mod join;
pub mod parser;
pub mod record;
pub mod storage;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use data_type::DataType;
pub use database::{Database, DeleteCount, Outcome};
pub use error::{Error, Result};
pub use join::QueryResult;
pub use table::{ColumnDef, Table};
pub use value::Value;
