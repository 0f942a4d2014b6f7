use crate::encoding::{decode_table, encode_table};
use crate::error::{Error, Result, SchemaError, StorageError};
use crate::storage::Store;
use crate::table::Table;

/// Namespace holding every table schema.
pub const CATALOG_NAMESPACE: &str = "__catalog";

/// Prefix of namespaces the engine keeps for itself.
const RESERVED_PREFIX: &str = "__";

/// Table names double as file names: an ASCII letter or `_` followed by
/// letters, digits or `_`, never starting with the reserved prefix.
pub fn check_table_name(name: &str) -> std::result::Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(RESERVED_PREFIX);
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidTableName(name.to_string()))
    }
}

/// Catalog key of a table: the UTF-8 bytes of its lower-cased name.
pub fn catalog_key(name: &str) -> Vec<u8> {
    name.to_lowercase().into_bytes()
}

/// Schema access over an open catalog store, valid for one session.
pub struct Catalog<'s> {
    store: &'s mut Store,
}

impl<'s> Catalog<'s> {
    pub fn new(store: &'s mut Store) -> Self {
        Self { store }
    }

    pub fn get(&self, name: &str) -> Result<Option<Table>> {
        self.store
            .get(&catalog_key(name))
            .map(|bytes| {
                decode_table(bytes).map_err(|e| {
                    Error::from(StorageError::Corrupted {
                        namespace: CATALOG_NAMESPACE.to_string(),
                        reason: format!("schema of '{name}': {}", e.0),
                    })
                })
            })
            .transpose()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.exists(&catalog_key(name))
    }

    pub fn put(&mut self, table: &Table) {
        self.store.put(catalog_key(&table.name), encode_table(table));
    }

    pub fn delete(&mut self, name: &str) -> bool {
        self.store.delete(&catalog_key(name))
    }

    /// Every table name, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .store
            .scan()
            .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
            .collect();
        names.sort();
        names
    }
}
