use std::collections::{BTreeMap, BTreeSet};

use crate::data_type::DataType;

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// The column a foreign key points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub column: String,
}

/// Schema of one relation as kept in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    /// Declaration order is the order of positional inserts and of `SELECT *`.
    pub columns: Vec<ColumnDef>,
    /// Always contains the primary-key columns.
    pub not_null: BTreeSet<String>,
    pub primary_key: Option<Vec<String>>,
    /// Local column -> referenced column, one foreign key per column.
    pub foreign_keys: BTreeMap<String, ForeignKeyTarget>,
    /// Tables holding a foreign key into this one.
    pub referenced_by: BTreeSet<String>,
}

impl Table {
    /// Builds a table with no constraints.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
            not_null: BTreeSet::new(),
            primary_key: None,
            foreign_keys: BTreeMap::new(),
            referenced_by: BTreeSet::new(),
        }
    }

    pub fn get_col(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_col(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn is_not_null(&self, column: &str) -> bool {
        self.not_null.contains(column)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key
            .as_ref()
            .is_some_and(|pk| pk.iter().any(|c| c == column))
    }

    pub fn is_foreign_key(&self, column: &str) -> bool {
        self.foreign_keys.contains_key(column)
    }

    /// `true` when `column` alone is this table's whole primary key, the only
    /// shape a foreign key may reference.
    pub fn is_sole_primary_key(&self, column: &str) -> bool {
        matches!(self.primary_key.as_deref(), Some([only]) if only == column)
    }

    /// Distinct names of the tables this table's foreign keys point at.
    pub fn referenced_tables(&self) -> BTreeSet<&str> {
        self.foreign_keys
            .values()
            .map(|target| target.table.as_str())
            .collect()
    }

    pub fn is_referenced(&self) -> bool {
        !self.referenced_by.is_empty()
    }

    pub fn add_reference(&mut self, table: &str) {
        self.referenced_by.insert(table.to_string());
    }

    pub fn remove_reference(&mut self, table: &str) -> bool {
        self.referenced_by.remove(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept() -> Table {
        let mut table = Table::new(
            "dept",
            vec![
                ColumnDef::new("id", DataType::Int),
                ColumnDef::new("name", DataType::Char(10)),
            ],
        );
        table.primary_key = Some(vec!["id".into()]);
        table.not_null.insert("id".into());
        table
    }

    #[test]
    fn test_table_creation() {
        let table = dept();
        assert_eq!(table.columns.len(), 2);
        assert!(!table.is_referenced());
        assert!(table.referenced_tables().is_empty());
    }

    #[test]
    fn test_get_col() {
        let table = dept();

        assert!(table.get_col("id").is_some());
        assert!(table.get_col("name").is_some());
        assert!(table.get_col("age").is_none());
        assert_eq!(table.position("name"), Some(1));
    }

    #[test]
    fn test_primary_key_helpers() {
        let mut table = dept();
        assert!(table.is_primary_key("id"));
        assert!(table.is_sole_primary_key("id"));
        assert!(!table.is_sole_primary_key("name"));

        table.primary_key = Some(vec!["id".into(), "name".into()]);
        assert!(table.is_primary_key("name"));
        assert!(!table.is_sole_primary_key("id"));
    }

    #[test]
    fn test_reference_bookkeeping() {
        let mut table = dept();
        table.add_reference("emp");
        table.add_reference("emp");
        assert!(table.is_referenced());
        assert_eq!(table.referenced_by.len(), 1);

        assert!(table.remove_reference("emp"));
        assert!(!table.remove_reference("emp"));
        assert!(!table.is_referenced());
    }

    #[test]
    fn test_referenced_tables_are_distinct() {
        let mut table = Table::new(
            "emp",
            vec![
                ColumnDef::new("boss", DataType::Int),
                ColumnDef::new("mentor", DataType::Int),
            ],
        );
        for column in ["boss", "mentor"] {
            table.foreign_keys.insert(
                column.into(),
                ForeignKeyTarget {
                    table: "person".into(),
                    column: "id".into(),
                },
            );
        }
        assert!(table.is_foreign_key("boss"));
        assert_eq!(table.referenced_tables().into_iter().collect::<Vec<_>>(), vec!["person"]);
    }
}
