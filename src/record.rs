use uuid::Uuid;

use crate::table::Table;
use crate::value::Value;

/// One row as kept in its table's store.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub table_name: String,
    /// Column/value pairs in schema order.
    pub data: Vec<(String, Value)>,
    /// Values at the primary-key columns, empty without a primary key.
    pub primary_value: Vec<Value>,
    /// Set when the insert of this row satisfied at least one foreign key.
    pub is_referencing: bool,
    /// Set once another row's foreign key points here. Never cleared, and
    /// while set the row cannot be deleted.
    pub is_referenced: bool,
}

impl Record {
    /// Builds a record from values already ordered like `table.columns`.
    pub fn new(table: &Table, values: Vec<Value>, is_referencing: bool) -> Self {
        let data: Vec<(String, Value)> = table
            .columns
            .iter()
            .map(|col| col.name.clone())
            .zip(values)
            .collect();
        let primary_value = table
            .primary_key
            .iter()
            .flatten()
            .map(|pk| {
                data.iter()
                    .find(|(name, _)| name == pk)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(Value::Null)
            })
            .collect();
        Self {
            table_name: table.name.clone(),
            data,
            primary_value,
            is_referencing,
            is_referenced: false,
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// The values laid out in `table`'s column order; missing columns read
    /// as NULL.
    pub fn row(&self, table: &Table) -> Vec<Value> {
        table
            .columns
            .iter()
            .map(|col| self.get(&col.name).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Storage key for this record: the primary-key tuple when there is one,
    /// a random identifier otherwise.
    pub fn storage_key(&self) -> Vec<u8> {
        if self.primary_value.is_empty() {
            random_key()
        } else {
            primary_key_bytes(&self.primary_value)
        }
    }
}

/// Canonical tuple text of primary-key values: `(1,)` for one value,
/// `(1, 'HR')` for several.
pub fn primary_key_bytes(values: &[Value]) -> Vec<u8> {
    let parts: Vec<String> = values.iter().map(Value::key_literal).collect();
    let text = match parts.as_slice() {
        [single] => format!("({single},)"),
        _ => format!("({})", parts.join(", ")),
    };
    text.into_bytes()
}

/// 128 random bits for rows of tables without a primary key.
pub fn random_key() -> Vec<u8> {
    Uuid::new_v4().as_bytes().to_vec()
}
