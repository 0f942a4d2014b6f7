use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    ColumnDef, DataType, Value,
    ast::{CreateTable, Delete, InsertInto, Select, Statement},
    catalog::{CATALOG_NAMESPACE, Catalog, check_table_name},
    encoding::{decode_record, encode_record},
    error::{Error, InsertError, IntegrityError, Result, SchemaError, StorageError},
    eval::Scope,
    join::{self, Projection, QueryResult},
    parser,
    record::{Record, primary_key_bytes},
    storage::{OpenMode, Storage, Store},
    table::{ForeignKeyTarget, Table},
    value::Date,
};

/// The main entry point of the engine.
///
/// Owns the data directory. Every operation opens the namespaces it needs,
/// works on them and closes them again before returning, so a `Database`
/// holds no open store between statements.
#[derive(Debug)]
pub struct Database {
    storage: Storage,
}

/// What a successful statement produced.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    TableCreated(String),
    TableDropped(String),
    Described(Table),
    Tables(Vec<String>),
    Inserted,
    Deleted(DeleteCount),
    Rows(QueryResult),
    Exit,
}

/// Rows removed by a `DELETE`, and rows it had to keep because another row
/// references them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteCount {
    pub deleted: usize,
    pub skipped: usize,
}

impl Database {
    /// Opens (or creates) a database rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let storage = Storage::open(dir)?;
        debug!(dir = %storage.dir().display(), "database opened");
        Ok(Self { storage })
    }

    pub fn dir(&self) -> &Path {
        self.storage.dir()
    }

    /// Runs `f` against the catalog inside one open/close bracket.
    fn with_catalog<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Catalog<'_>) -> Result<T>,
    {
        self.storage
            .with_store(CATALOG_NAMESPACE, OpenMode::Create, |store| {
                f(&mut Catalog::new(store))
            })
    }

    fn schema(&self, name: &str) -> Result<Table> {
        self.with_catalog(|catalog| {
            catalog
                .get(name)?
                .ok_or_else(|| Error::TableNotFound(name.to_string()))
        })
    }

    // ─────────────────────────────────────────────────────────────
    // DDL
    // ─────────────────────────────────────────────────────────────

    /// Validates and registers a new table, returning its name.
    ///
    /// The table name is lower-cased and must be a plain identifier. Then
    /// checks run in a fixed order and the first violation is reported:
    /// column names, char lengths, the primary key, foreign-key columns,
    /// name clash with an existing table, then each foreign key's target.
    /// Nothing is written until every check has passed.
    pub fn create_table(&mut self, create: CreateTable) -> Result<String> {
        let CreateTable {
            name,
            columns,
            mut not_null,
            primary_keys,
            foreign_keys,
        } = create;

        let name = name.to_lowercase();
        check_table_name(&name)?;

        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(SchemaError::DuplicateColumnDefinition(col.name.clone()).into());
            }
        }

        if let Some(col) = columns.iter().find(|c| c.data_type == DataType::Char(0)) {
            return Err(SchemaError::InvalidCharLength(col.name.clone()).into());
        }

        let has_column = |name: &str| columns.iter().any(|c| c.name == name);

        if let Some(unknown) = not_null.iter().find(|c| !has_column(c.as_str())) {
            return Err(SchemaError::UnknownColumnInDefinition(unknown.clone()).into());
        }

        if primary_keys.len() > 1 {
            return Err(SchemaError::DuplicatePrimaryKeyDefinition.into());
        }
        let primary_key = primary_keys.into_iter().next();
        if let Some(pk) = &primary_key {
            if let Some(unknown) = pk.iter().find(|c| !has_column(c.as_str())) {
                return Err(SchemaError::UnknownColumnInDefinition(unknown.clone()).into());
            }
            not_null.extend(pk.iter().cloned());
        }

        if let Some(fk) = foreign_keys.iter().find(|fk| !has_column(fk.column.as_str())) {
            return Err(SchemaError::UnknownColumnInDefinition(fk.column.clone()).into());
        }

        let mut table = Table::new(name, columns);
        table.not_null = not_null;
        table.primary_key = primary_key;
        for fk in foreign_keys {
            table.foreign_keys.insert(
                fk.column,
                ForeignKeyTarget {
                    table: fk.ref_table.to_lowercase(),
                    column: fk.ref_column,
                },
            );
        }

        self.with_catalog(|catalog| {
            if catalog.contains(&table.name) {
                return Err(SchemaError::TableAlreadyExists(table.name.clone()).into());
            }

            let mut referenced: HashMap<String, Table> = HashMap::new();
            for (column, target) in &table.foreign_keys {
                if !referenced.contains_key(&target.table) {
                    let parent = catalog.get(&target.table)?.ok_or_else(|| {
                        SchemaError::ReferencedTableNotFound(target.table.clone())
                    })?;
                    referenced.insert(target.table.clone(), parent);
                }
                check_foreign_key(&table, column, target, &referenced[&target.table])?;
            }

            for parent in referenced.values_mut() {
                parent.add_reference(&table.name);
                catalog.put(parent);
            }
            catalog.put(&table);
            Ok(())
        })?;

        self.storage
            .with_store(&table.name, OpenMode::Create, |_| Ok(()))?;
        info!(table = %table.name, columns = table.columns.len(), "table created");
        Ok(table.name)
    }

    /// Removes a table that no other table references, returning its name.
    pub fn drop_table(&mut self, name: &str) -> Result<String> {
        let table = self.with_catalog(|catalog| {
            let table = catalog
                .get(name)?
                .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
            if table.is_referenced() {
                return Err(IntegrityError::TableIsReferenced(table.name.clone()).into());
            }

            for parent_name in table.referenced_tables() {
                match catalog.get(parent_name)? {
                    Some(mut parent) => {
                        parent.remove_reference(&table.name);
                        catalog.put(&parent);
                    }
                    None => warn!(
                        table = %table.name,
                        referenced = parent_name,
                        "referenced table missing from catalog"
                    ),
                }
            }
            catalog.delete(&table.name);
            Ok(table)
        })?;

        match self.storage.remove(&table.name) {
            Err(Error::Storage(StorageError::MissingNamespace(_))) => {
                warn!(table = %table.name, "table store already missing");
            }
            other => other?,
        }
        info!(table = %table.name, "table dropped");
        Ok(table.name)
    }

    pub fn describe_table(&self, name: &str) -> Result<Table> {
        self.schema(name)
    }

    /// Every table name, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.with_catalog(|catalog| Ok(catalog.list_names()))
    }

    // ─────────────────────────────────────────────────────────────
    // DML
    // ─────────────────────────────────────────────────────────────

    /// Inserts one row.
    ///
    /// Values are placed (by position or by the explicit column list), then
    /// checked for NULLs, then for types. Each non-null foreign key must find
    /// its parent row, which is marked as referenced on the spot. Finally the
    /// primary key must be new.
    ///
    /// Parents marked before a later failure stay marked.
    pub fn insert(&mut self, insert: InsertInto) -> Result<()> {
        let table = self.schema(&insert.table)?;
        let values = arrange_values(&table, insert.columns, insert.values)?;

        for (col, value) in table.columns.iter().zip(&values) {
            if value.is_null() && table.is_not_null(&col.name) {
                return Err(IntegrityError::NotNullViolation(col.name.clone()).into());
            }
        }

        let values = table
            .columns
            .iter()
            .zip(values)
            .map(|(col, value)| coerce(col, value))
            .collect::<Result<Vec<_>>>()?;

        let mut is_referencing = false;
        for (column, target) in &table.foreign_keys {
            let Some(value) = table.position(column).map(|i| &values[i]) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            self.mark_referenced(column, target, value)?;
            is_referencing = true;
        }

        let record = Record::new(&table, values, is_referencing);
        self.storage
            .with_store(&table.name, OpenMode::Existing, |store| {
                let key = record.storage_key();
                if !record.primary_value.is_empty() && store.exists(&key) {
                    return Err(IntegrityError::DuplicatePrimaryKey(table.name.clone()).into());
                }
                store.put(key, encode_record(&record));
                Ok(())
            })?;
        debug!(table = %table.name, "row inserted");
        Ok(())
    }

    /// Finds the parent row a foreign-key value points at and flags it.
    fn mark_referenced(&self, column: &str, target: &ForeignKeyTarget, value: &Value) -> Result<()> {
        let parent = self.schema(&target.table)?;
        self.storage
            .with_store(&parent.name, OpenMode::Existing, |store| {
                let (key, mut record) = find_parent(store, &parent, value)?
                    .ok_or_else(|| IntegrityError::ReferentialIntegrityViolation {
                        column: column.to_string(),
                        table: parent.name.clone(),
                    })?;
                if !record.is_referenced {
                    record.is_referenced = true;
                    store.put(key, encode_record(&record));
                    debug!(table = %parent.name, %value, "row marked as referenced");
                }
                Ok(())
            })
    }

    /// Deletes the rows for which `where_clause` is TRUE, or every row without
    /// one. Referenced rows are kept and counted as skipped.
    ///
    /// The predicate is resolved before any row is read and evaluated on every
    /// row before the first one is removed.
    pub fn delete(&mut self, delete: Delete) -> Result<DeleteCount> {
        let table = self.schema(&delete.table)?;
        let scope = Scope::new(std::slice::from_ref(&table));
        let predicate = delete
            .where_clause
            .as_ref()
            .map(|expr| scope.bind(expr))
            .transpose()?;

        let count = self
            .storage
            .with_store(&table.name, OpenMode::Existing, |store| {
                let mut count = DeleteCount::default();
                let mut doomed = Vec::new();
                for (key, bytes) in store.scan() {
                    let record = decode(&table.name, bytes)?;
                    let selected = match &predicate {
                        Some(expr) => expr.evaluate(&record.row(&table))?.is_true(),
                        None => true,
                    };
                    if !selected {
                        continue;
                    }
                    if record.is_referenced {
                        count.skipped += 1;
                    } else {
                        doomed.push(key.to_vec());
                    }
                }
                for key in doomed {
                    store.delete(&key);
                    count.deleted += 1;
                }
                Ok(count)
            })?;

        if count.skipped > 0 {
            warn!(
                table = %table.name,
                skipped = count.skipped,
                "referenced rows were not deleted"
            );
        }
        debug!(table = %table.name, deleted = count.deleted, "rows deleted");
        Ok(count)
    }

    /// Runs a SELECT over one or more tables.
    ///
    /// Tables are looked up first, then the select list, then the WHERE
    /// clause, and only then are rows read, so a bad query fails even on
    /// empty tables. Rows come back in key order of each table, the first
    /// table varying slowest.
    pub fn select(&self, select: &Select) -> Result<QueryResult> {
        let tables = self.with_catalog(|catalog| {
            select
                .tables
                .iter()
                .map(|name| {
                    catalog
                        .get(name)?
                        .ok_or_else(|| Error::TableNotFound(name.clone()))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let scope = Scope::new(&tables);
        let projection = Projection::resolve(&scope, &select.columns)?;
        let predicate = select
            .where_clause
            .as_ref()
            .map(|expr| scope.bind(expr))
            .transpose()?;

        let relations = tables
            .iter()
            .map(|table| self.load_rows(table))
            .collect::<Result<Vec<_>>>()?;

        let result = join::execute(&relations, predicate.as_ref(), &projection)?;
        debug!(tables = ?select.tables, rows = result.rows.len(), "select done");
        Ok(result)
    }

    /// Every row of `table`, ordered by storage key.
    fn load_rows(&self, table: &Table) -> Result<Vec<Vec<Value>>> {
        self.storage
            .with_store(&table.name, OpenMode::Existing, |store| {
                let mut entries: Vec<(&[u8], &[u8])> = store.scan().collect();
                entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
                entries
                    .into_iter()
                    .map(|(_, bytes)| decode(&table.name, bytes).map(|r| r.row(table)))
                    .collect()
            })
    }

    // ─────────────────────────────────────────────────────────────
    // Entry points
    // ─────────────────────────────────────────────────────────────

    /// Executes one already-parsed statement.
    pub fn execute_statement(&mut self, statement: Statement) -> Result<Outcome> {
        match statement {
            Statement::CreateTable(create) => self.create_table(create).map(Outcome::TableCreated),
            Statement::DropTable(name) => self.drop_table(&name).map(Outcome::TableDropped),
            Statement::DescribeTable(name) => self.describe_table(&name).map(Outcome::Described),
            Statement::ShowTables => self.list_tables().map(Outcome::Tables),
            Statement::InsertInto(insert) => self.insert(insert).map(|()| Outcome::Inserted),
            Statement::Delete(delete) => self.delete(delete).map(Outcome::Deleted),
            Statement::Select(select) => self.select(&select).map(Outcome::Rows),
            Statement::Exit => Ok(Outcome::Exit),
        }
    }

    /// Parses and executes one SQL statement.
    ///
    /// # Example
    /// ```
    /// use reldb::{Database, Value};
    /// let dir = tempfile::tempdir().unwrap();
    /// let mut db = Database::open(dir.path()).unwrap();
    /// db.execute("CREATE TABLE users (id INT, PRIMARY KEY (id))").unwrap();
    /// db.execute("INSERT INTO users VALUES (1)").unwrap();
    ///
    /// let result = db.query("SELECT * FROM users").unwrap();
    /// assert_eq!(result.rows[0][0], Value::Int(1));
    /// ```
    pub fn execute(&mut self, sql: &str) -> Result<Outcome> {
        let statement = parser::parse(sql)?;
        self.execute_statement(statement)
    }

    /// Parses and runs a SELECT statement.
    ///
    /// # Errors
    /// [Error::Syntax] if `sql` is some other kind of statement.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        match parser::parse(sql)? {
            Statement::Select(select) => self.select(&select),
            other => Err(Error::Syntax(format!(
                "expected a SELECT statement, got {other:?}"
            ))),
        }
    }
}

/// A foreign key must point at the referenced table's whole, single-column
/// primary key, and both columns must share a type.
fn check_foreign_key(
    table: &Table,
    column: &str,
    target: &ForeignKeyTarget,
    parent: &Table,
) -> Result<()> {
    let parent_col = parent
        .get_col(&target.column)
        .ok_or_else(|| SchemaError::ReferencedColumnNotFound {
            table: target.table.clone(),
            column: target.column.clone(),
        })?;
    if !parent.is_sole_primary_key(&target.column) {
        return Err(SchemaError::ReferenceToNonPrimaryKey {
            table: target.table.clone(),
            column: target.column.clone(),
        }
        .into());
    }
    let local = table
        .get_col(column)
        .map(|c| c.data_type)
        .ok_or_else(|| SchemaError::UnknownColumnInDefinition(column.to_string()))?;
    if local != parent_col.data_type {
        return Err(SchemaError::ReferenceTypeMismatch {
            column: column.to_string(),
            local,
            referenced: parent_col.data_type,
        }
        .into());
    }
    Ok(())
}

/// Lays the inserted values out in schema order.
fn arrange_values(
    table: &Table,
    columns: Option<Vec<String>>,
    values: Vec<Value>,
) -> Result<Vec<Value>> {
    let Some(columns) = columns else {
        if values.len() != table.columns.len() {
            return Err(InsertError::ColumnCountMismatch {
                expected: table.columns.len(),
                actual: values.len(),
            }
            .into());
        }
        return Ok(values);
    };

    if columns.len() != values.len() {
        return Err(InsertError::ColumnCountMismatch {
            expected: columns.len(),
            actual: values.len(),
        }
        .into());
    }
    if let Some(unknown) = columns.iter().find(|c| !table.has_column(c)) {
        return Err(InsertError::UnknownColumn(unknown.clone()).into());
    }
    for (i, column) in columns.iter().enumerate() {
        if columns[..i].contains(column) {
            return Err(InsertError::DuplicateColumn(column.clone()).into());
        }
    }

    let mut provided: HashMap<String, Value> = columns.into_iter().zip(values).collect();
    Ok(table
        .columns
        .iter()
        .map(|col| provided.remove(&col.name).unwrap_or(Value::Null))
        .collect())
}

/// Checks a value against its column type and brings it to the stored form:
/// text truncated to the column length, dates parsed.
fn coerce(col: &ColumnDef, value: Value) -> Result<Value> {
    let mismatch = || -> Error {
        InsertError::TypeMismatch {
            column: col.name.clone(),
            expected: col.data_type,
        }
        .into()
    };

    match (col.data_type, value) {
        (_, Value::Null) => Ok(Value::Null),
        (DataType::Int, Value::Int(i)) => Ok(Value::Int(i)),
        (DataType::Char(len), Value::Char(s)) => {
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                return Err(mismatch());
            }
            if s.chars().count() <= len as usize {
                Ok(Value::Char(s))
            } else {
                let truncated: String = s.chars().take(len as usize).collect();
                Ok(Value::Char(truncated.into()))
            }
        }
        (DataType::Char(len), Value::Date(d)) => {
            let text: String = d.to_string().chars().take(len as usize).collect();
            Ok(Value::Char(text.into()))
        }
        (DataType::Date, Value::Date(d)) => Ok(Value::Date(d)),
        (DataType::Date, Value::Char(s)) => Date::parse(&s).map(Value::Date).ok_or_else(mismatch),
        _ => Err(mismatch()),
    }
}

/// Looks up the parent row whose primary key is `value`. Foreign keys only
/// ever target a single-column primary key, so this is one key lookup.
fn find_parent(
    store: &Store,
    parent: &Table,
    value: &Value,
) -> Result<Option<(Vec<u8>, Record)>> {
    let key = primary_key_bytes(std::slice::from_ref(value));
    match store.get(&key) {
        Some(bytes) => Ok(Some((key, decode(&parent.name, bytes)?))),
        None => Ok(None),
    }
}

fn decode(table: &str, bytes: &[u8]) -> Result<Record> {
    decode_record(bytes).map_err(|e| {
        Error::from(StorageError::Corrupted {
            namespace: table.to_string(),
            reason: e.0,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ColumnRef, ColumnsSelect, ComparisonOp, Expr, ForeignKeyDef, Operand};
    use crate::error::QueryError;
    use tempfile::TempDir;

    fn open() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path()).unwrap();
        (dir, db)
    }

    fn int(i: i64) -> Value {
        Value::Int(i)
    }

    fn text(s: &str) -> Value {
        Value::Char(s.into())
    }

    fn run(db: &mut Database, sql: &str) -> Outcome {
        db.execute(sql)
            .unwrap_or_else(|e| panic!("{sql} failed: {e}"))
    }

    fn fails(db: &mut Database, sql: &str) -> Error {
        match db.execute(sql) {
            Ok(outcome) => panic!("{sql} should fail, got {outcome:?}"),
            Err(e) => e,
        }
    }

    /// dept(id PK, name) and emp(id PK, name, dept_id FK -> dept.id).
    fn company(db: &mut Database) {
        run(
            db,
            "CREATE TABLE dept (id INT, name CHAR(10), PRIMARY KEY (id))",
        );
        run(
            db,
            "CREATE TABLE emp (id INT, name CHAR(10) NOT NULL, dept_id INT, \
             PRIMARY KEY (id), FOREIGN KEY (dept_id) REFERENCES dept (id))",
        );
        run(db, "INSERT INTO dept VALUES (1, 'HR')");
        run(db, "INSERT INTO dept VALUES (2, 'IT')");
        run(db, "INSERT INTO emp VALUES (10, 'Ann', 1)");
        run(db, "INSERT INTO emp VALUES (11, 'Bob', NULL)");
    }

    // ─────────────────────────────────────────────────────────────
    // CREATE / DROP / DESCRIBE / SHOW
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn test_create_and_list_tables() {
        let (_dir, mut db) = open();
        assert_eq!(
            run(&mut db, "CREATE TABLE users (id INT)"),
            Outcome::TableCreated("users".into())
        );
        run(&mut db, "CREATE TABLE posts (id INT)");

        assert_eq!(
            run(&mut db, "SHOW TABLES"),
            Outcome::Tables(vec!["posts".into(), "users".into()])
        );
    }

    #[test]
    fn test_describe_records_constraints() {
        let (_dir, mut db) = open();
        company(&mut db);

        let Outcome::Described(emp) = run(&mut db, "DESC emp") else {
            panic!("expected a description");
        };
        assert_eq!(emp.primary_key, Some(vec!["id".to_string()]));
        assert!(emp.is_not_null("id"));
        assert!(emp.is_not_null("name"));
        assert!(!emp.is_not_null("dept_id"));
        assert_eq!(emp.foreign_keys["dept_id"].table, "dept");

        let dept = db.describe_table("dept").unwrap();
        assert!(dept.referenced_by.contains("emp"));
    }

    #[test]
    fn test_schema_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut db = Database::open(dir.path()).unwrap();
            company(&mut db);
        }
        let db = Database::open(dir.path()).unwrap();
        assert_eq!(db.list_tables().unwrap(), vec!["dept", "emp"]);
        assert_eq!(db.query("SELECT id FROM emp").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_create_validation_order() {
        let (_dir, mut db) = open();
        run(&mut db, "CREATE TABLE t (a INT, PRIMARY KEY (a))");

        // duplicate column beats everything after it
        let err = fails(
            &mut db,
            "CREATE TABLE t (a INT, a CHAR(0), PRIMARY KEY (a), PRIMARY KEY (a))",
        );
        assert!(matches!(
            err,
            Error::Schema(SchemaError::DuplicateColumnDefinition(ref c)) if c == "a"
        ));

        // char length before primary key
        let err = fails(
            &mut db,
            "CREATE TABLE t (a INT, b CHAR(0), PRIMARY KEY (a), PRIMARY KEY (b))",
        );
        assert!(matches!(
            err,
            Error::Schema(SchemaError::InvalidCharLength(ref c)) if c == "b"
        ));

        // duplicated primary key before the existence check
        let err = fails(
            &mut db,
            "CREATE TABLE t (a INT, PRIMARY KEY (a), PRIMARY KEY (a))",
        );
        assert_eq!(
            err.to_string(),
            SchemaError::DuplicatePrimaryKeyDefinition.to_string()
        );

        let err = fails(&mut db, "CREATE TABLE u (a INT, PRIMARY KEY (z))");
        assert!(matches!(
            err,
            Error::Schema(SchemaError::UnknownColumnInDefinition(ref c)) if c == "z"
        ));

        // unknown FK column before the table-exists check
        let err = fails(
            &mut db,
            "CREATE TABLE t (a INT, FOREIGN KEY (z) REFERENCES t (a))",
        );
        assert!(matches!(
            err,
            Error::Schema(SchemaError::UnknownColumnInDefinition(ref c)) if c == "z"
        ));

        let err = fails(&mut db, "CREATE TABLE t (a INT)");
        assert!(matches!(
            err,
            Error::Schema(SchemaError::TableAlreadyExists(ref t)) if t == "t"
        ));
    }

    #[test]
    fn test_foreign_key_validation() {
        let (_dir, mut db) = open();
        run(
            &mut db,
            "CREATE TABLE p (a INT, b INT, c CHAR(5), PRIMARY KEY (a))",
        );
        run(&mut db, "CREATE TABLE q (a INT, b INT, PRIMARY KEY (a, b))");

        let err = fails(&mut db, "CREATE TABLE x (f INT, FOREIGN KEY (f) REFERENCES nope (a))");
        assert!(matches!(
            err,
            Error::Schema(SchemaError::ReferencedTableNotFound(ref t)) if t == "nope"
        ));

        let err = fails(&mut db, "CREATE TABLE x (f INT, FOREIGN KEY (f) REFERENCES p (z))");
        assert!(matches!(
            err,
            Error::Schema(SchemaError::ReferencedColumnNotFound { ref column, .. }) if column == "z"
        ));

        let err = fails(&mut db, "CREATE TABLE x (f INT, FOREIGN KEY (f) REFERENCES p (b))");
        assert!(matches!(
            err,
            Error::Schema(SchemaError::ReferenceToNonPrimaryKey { .. })
        ));

        // part of a composite key is not enough
        let err = fails(&mut db, "CREATE TABLE x (f INT, FOREIGN KEY (f) REFERENCES q (a))");
        assert!(matches!(
            err,
            Error::Schema(SchemaError::ReferenceToNonPrimaryKey { .. })
        ));

        let err = fails(
            &mut db,
            "CREATE TABLE x (f CHAR(3), FOREIGN KEY (f) REFERENCES p (a))",
        );
        assert!(matches!(
            err,
            Error::Schema(SchemaError::ReferenceTypeMismatch {
                local: DataType::Char(3),
                referenced: DataType::Int,
                ..
            })
        ));
    }

    #[test]
    fn test_failed_create_writes_nothing() {
        let (_dir, mut db) = open();
        run(&mut db, "CREATE TABLE p (a INT, PRIMARY KEY (a))");

        // first FK is valid, second is not
        db.create_table(CreateTable {
            name: "x".into(),
            columns: vec![
                ColumnDef::new("f", DataType::Int),
                ColumnDef::new("g", DataType::Int),
            ],
            foreign_keys: vec![
                ForeignKeyDef {
                    column: "f".into(),
                    ref_table: "p".into(),
                    ref_column: "a".into(),
                },
                ForeignKeyDef {
                    column: "g".into(),
                    ref_table: "missing".into(),
                    ref_column: "a".into(),
                },
            ],
            ..Default::default()
        })
        .unwrap_err();

        assert!(!db.describe_table("p").unwrap().is_referenced());
        assert_eq!(db.list_tables().unwrap(), vec!["p"]);
    }

    #[test]
    fn test_table_names_are_normalized() {
        let (_dir, mut db) = open();
        run(&mut db, "CREATE TABLE t (a INT, PRIMARY KEY (a))");

        for name in [CATALOG_NAMESPACE, "../x", ""] {
            let err = db
                .create_table(CreateTable {
                    name: name.into(),
                    columns: vec![ColumnDef::new("a", DataType::Int)],
                    ..Default::default()
                })
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Schema(SchemaError::InvalidTableName(ref n)) if n == name
            ));
        }
        assert!(matches!(
            db.drop_table(CATALOG_NAMESPACE),
            Err(Error::TableNotFound(_))
        ));
        assert!(!db.dir().join("../x.db").exists());

        let name = db
            .create_table(CreateTable {
                name: "Child".into(),
                columns: vec![ColumnDef::new("a", DataType::Int)],
                foreign_keys: vec![ForeignKeyDef {
                    column: "a".into(),
                    ref_table: "T".into(),
                    ref_column: "a".into(),
                }],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(name, "child");
        assert_eq!(db.list_tables().unwrap(), vec!["child", "t"]);
        assert!(db.describe_table("t").unwrap().referenced_by.contains("child"));

        run(&mut db, "INSERT INTO t VALUES (1)");
        run(&mut db, "INSERT INTO child VALUES (1)");
        assert_eq!(db.query("SELECT * FROM t").unwrap().rows, vec![vec![int(1)]]);
    }

    #[test]
    fn test_drop_table() {
        let (_dir, mut db) = open();
        company(&mut db);

        let err = fails(&mut db, "DROP TABLE dept");
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::TableIsReferenced(ref t)) if t == "dept"
        ));

        assert_eq!(
            run(&mut db, "DROP TABLE emp"),
            Outcome::TableDropped("emp".into())
        );
        assert!(!db.describe_table("dept").unwrap().is_referenced());
        assert!(!db.dir().join("emp.db").exists());

        run(&mut db, "DROP TABLE dept");
        assert!(db.list_tables().unwrap().is_empty());

        let err = fails(&mut db, "DROP TABLE dept");
        assert!(matches!(err, Error::TableNotFound(ref t) if t == "dept"));
    }

    // ─────────────────────────────────────────────────────────────
    // INSERT
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn test_insert_into_missing_table() {
        let (_dir, mut db) = open();
        let err = fails(&mut db, "INSERT INTO ghost VALUES (1)");
        assert!(matches!(err, Error::TableNotFound(ref t) if t == "ghost"));
    }

    #[test]
    fn test_insert_with_column_list() {
        let (_dir, mut db) = open();
        run(&mut db, "CREATE TABLE users (id INT, name CHAR(10), born DATE)");
        run(&mut db, "INSERT INTO users (name, id) VALUES ('Charlie', 3)");

        let result = db.query("SELECT * FROM users").unwrap();
        assert_eq!(result.columns, vec!["id", "name", "born"]);
        assert_eq!(result.rows, vec![vec![int(3), text("Charlie"), Value::Null]]);
    }

    #[test]
    fn test_insert_shape_errors() {
        let (_dir, mut db) = open();
        run(&mut db, "CREATE TABLE users (id INT, name CHAR(10))");

        let err = fails(&mut db, "INSERT INTO users VALUES (1)");
        assert!(matches!(
            err,
            Error::Insert(InsertError::ColumnCountMismatch { expected: 2, actual: 1 })
        ));

        let err = fails(&mut db, "INSERT INTO users (id, name) VALUES (1)");
        assert!(matches!(
            err,
            Error::Insert(InsertError::ColumnCountMismatch { .. })
        ));

        let err = fails(&mut db, "INSERT INTO users (id, age) VALUES (1, 2)");
        assert!(matches!(
            err,
            Error::Insert(InsertError::UnknownColumn(ref c)) if c == "age"
        ));

        let err = fails(&mut db, "INSERT INTO users (id, id) VALUES (1, 2)");
        assert!(matches!(
            err,
            Error::Insert(InsertError::DuplicateColumn(ref c)) if c == "id"
        ));
        assert!(db.query("SELECT * FROM users").unwrap().rows.is_empty());
    }

    #[test]
    fn test_insert_type_checks() {
        let (_dir, mut db) = open();
        run(&mut db, "CREATE TABLE t (i INT, c CHAR(3), d DATE)");

        for sql in [
            "INSERT INTO t VALUES ('1', 'abc', '2020-01-01')",
            "INSERT INTO t VALUES (1, '123', '2020-01-01')",
            "INSERT INTO t VALUES (1, 'abc', 'tomorrow')",
            "INSERT INTO t VALUES (1, 'abc', 20200101)",
        ] {
            let err = fails(&mut db, sql);
            assert!(
                matches!(err, Error::Insert(InsertError::TypeMismatch { .. })),
                "{sql}: {err}"
            );
        }

        run(&mut db, "INSERT INTO t VALUES (-4, 'abcdef', '2020-01-31')");
        let result = db.query("SELECT * FROM t").unwrap();
        assert_eq!(
            result.rows,
            vec![vec![
                int(-4),
                text("abc"),
                Value::Date(Date::parse("2020-01-31").unwrap()),
            ]]
        );
    }

    #[test]
    fn test_null_check_comes_before_type_check() {
        let (_dir, mut db) = open();
        run(
            &mut db,
            "CREATE TABLE t (i INT, c CHAR(3) NOT NULL, PRIMARY KEY (i))",
        );
        let err = fails(&mut db, "INSERT INTO t VALUES ('x', NULL)");
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::NotNullViolation(ref c)) if c == "c"
        ));
        let err = fails(&mut db, "INSERT INTO t VALUES (NULL, 'x')");
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::NotNullViolation(ref c)) if c == "i"
        ));
    }

    #[test]
    fn test_duplicate_primary_key() {
        let (_dir, mut db) = open();
        run(
            &mut db,
            "CREATE TABLE t (a INT, b CHAR(5), PRIMARY KEY (a, b))",
        );
        run(&mut db, "INSERT INTO t VALUES (1, 'x')");
        run(&mut db, "INSERT INTO t VALUES (1, 'y')");
        let err = fails(&mut db, "INSERT INTO t VALUES (1, 'x')");
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::DuplicatePrimaryKey(ref t)) if t == "t"
        ));
        assert_eq!(db.query("SELECT a FROM t").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_rows_without_primary_key_may_repeat() {
        let (_dir, mut db) = open();
        run(&mut db, "CREATE TABLE log (msg CHAR(10))");
        run(&mut db, "INSERT INTO log VALUES ('hi')");
        run(&mut db, "INSERT INTO log VALUES ('hi')");
        assert_eq!(db.query("SELECT * FROM log").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_referential_integrity_on_insert() {
        let (_dir, mut db) = open();
        company(&mut db);

        let err = fails(&mut db, "INSERT INTO emp VALUES (12, 'Cy', 9)");
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::ReferentialIntegrityViolation { ref table, .. })
                if table == "dept"
        ));
        assert_eq!(db.query("SELECT * FROM emp").unwrap().rows.len(), 2);
        assert_eq!(db.query("SELECT * FROM dept").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_is_null_without_null_rows() {
        let (_dir, mut db) = open();
        company(&mut db);
        run(&mut db, "DELETE FROM emp WHERE dept_id IS NULL");

        let result = db.query("SELECT * FROM emp WHERE dept_id IS NULL").unwrap();
        assert_eq!(result.columns, vec!["id", "name", "dept_id"]);
        assert!(result.rows.is_empty());
        assert_eq!(
            db.query("SELECT id FROM emp WHERE dept_id IS NOT NULL").unwrap().rows,
            vec![vec![int(10)]]
        );
    }

    #[test]
    fn test_reference_flag_survives_failed_insert() {
        let (_dir, mut db) = open();
        company(&mut db);

        // dept 2 gets flagged, then the duplicate key rejects the row
        let err = fails(&mut db, "INSERT INTO emp VALUES (10, 'Dup', 2)");
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::DuplicatePrimaryKey(_))
        ));
        let Outcome::Deleted(count) = run(&mut db, "DELETE FROM dept WHERE id = 2") else {
            panic!("expected a delete count");
        };
        assert_eq!(count, DeleteCount { deleted: 0, skipped: 1 });
    }

    // ─────────────────────────────────────────────────────────────
    // DELETE
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn test_delete_skips_referenced_rows() {
        let (_dir, mut db) = open();
        company(&mut db);

        assert_eq!(
            run(&mut db, "DELETE FROM dept"),
            Outcome::Deleted(DeleteCount { deleted: 1, skipped: 1 })
        );
        let rows = db.query("SELECT name FROM dept").unwrap().rows;
        assert_eq!(rows, vec![vec![text("HR")]]);

        // deleting the referencing row does not release the parent
        run(&mut db, "DELETE FROM emp WHERE dept_id = 1");
        assert_eq!(
            run(&mut db, "DELETE FROM dept"),
            Outcome::Deleted(DeleteCount { deleted: 0, skipped: 1 })
        );
    }

    #[test]
    fn test_delete_with_unknown_predicate() {
        let (_dir, mut db) = open();
        company(&mut db);

        // Bob's dept_id is NULL: UNKNOWN, so neither statement touches him.
        assert_eq!(
            run(&mut db, "DELETE FROM emp WHERE dept_id > 100"),
            Outcome::Deleted(DeleteCount::default())
        );
        assert_eq!(
            run(&mut db, "DELETE FROM emp WHERE NOT dept_id > 100"),
            Outcome::Deleted(DeleteCount { deleted: 1, skipped: 0 })
        );
        assert_eq!(
            run(&mut db, "DELETE FROM emp WHERE dept_id IS NULL"),
            Outcome::Deleted(DeleteCount { deleted: 1, skipped: 0 })
        );
    }

    #[test]
    fn test_delete_errors_delete_nothing() {
        let (_dir, mut db) = open();
        company(&mut db);

        let err = fails(&mut db, "DELETE FROM emp WHERE salary = 3");
        assert!(matches!(
            err,
            Error::Query(QueryError::ColumnNotFound(ref c)) if c == "salary"
        ));
        let err = fails(&mut db, "DELETE FROM emp WHERE dept.id = 3");
        assert!(matches!(
            err,
            Error::Query(QueryError::UnspecifiedTable(ref t)) if t == "dept"
        ));
        let err = fails(&mut db, "DELETE FROM emp WHERE name = 4");
        assert!(matches!(err, Error::Query(QueryError::IncomparableOperands)));

        assert_eq!(db.query("SELECT id FROM emp").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_delete_from_missing_table() {
        let (_dir, mut db) = open();
        let err = fails(&mut db, "DELETE FROM ghost");
        assert!(matches!(err, Error::TableNotFound(_)));
    }

    // ─────────────────────────────────────────────────────────────
    // SELECT
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn test_select_where_three_valued() {
        let (_dir, mut db) = open();
        company(&mut db);

        let names = |db: &Database, sql: &str| -> Vec<Value> {
            db.query(sql)
                .unwrap()
                .rows
                .into_iter()
                .map(|mut row| row.remove(0))
                .collect()
        };

        assert_eq!(names(&db, "SELECT name FROM emp WHERE dept_id = 1"), vec![text("Ann")]);
        assert_eq!(names(&db, "SELECT name FROM emp WHERE dept_id != 1"), vec![]);
        assert_eq!(
            names(&db, "SELECT name FROM emp WHERE dept_id = 1 OR dept_id IS NULL"),
            vec![text("Ann"), text("Bob")]
        );
        assert_eq!(
            names(&db, "SELECT name FROM emp WHERE NOT (dept_id = 1 AND id = 10)"),
            vec![text("Bob")]
        );
        assert_eq!(
            names(&db, "SELECT name FROM emp WHERE dept_id IS NOT NULL AND name <> 'Bob'"),
            vec![text("Ann")]
        );
    }

    #[test]
    fn test_select_join() {
        let (_dir, mut db) = open();
        company(&mut db);

        let result = db
            .query("SELECT emp.name, dept.name FROM emp, dept WHERE dept_id = dept.id")
            .unwrap();
        assert_eq!(result.columns, vec!["emp.name", "dept.name"]);
        assert_eq!(result.rows, vec![vec![text("Ann"), text("HR")]]);

        let result = db.query("SELECT * FROM dept, emp").unwrap();
        assert_eq!(
            result.columns,
            vec!["dept.id", "dept.name", "emp.id", "emp.name", "dept_id"]
        );
        assert_eq!(result.rows.len(), 4);
        assert_eq!(result.rows[0][0], int(1));
        assert_eq!(result.rows[0][2], int(10));
        assert_eq!(result.rows[1][2], int(11));
    }

    #[test]
    fn test_select_resolution_errors() {
        let (_dir, mut db) = open();
        company(&mut db);

        let err = db.query("SELECT id FROM emp, dept").unwrap_err();
        assert!(matches!(
            err,
            Error::Query(QueryError::AmbiguousColumnReference(ref c)) if c == "id"
        ));
        let err = db.query("SELECT emp.id FROM dept").unwrap_err();
        assert!(matches!(err, Error::Query(QueryError::UnspecifiedTable(_))));
        let err = db.query("SELECT dept.dept_id FROM emp, dept").unwrap_err();
        assert!(matches!(err, Error::Query(QueryError::ColumnNotFound(_))));
        let err = db.query("SELECT * FROM emp, nowhere").unwrap_err();
        assert!(matches!(err, Error::TableNotFound(ref t) if t == "nowhere"));
    }

    #[test]
    fn test_errors_reported_on_empty_tables() {
        let (_dir, mut db) = open();
        run(&mut db, "CREATE TABLE a (x INT)");
        run(&mut db, "CREATE TABLE b (x INT)");

        let err = db.query("SELECT * FROM a, b WHERE x = 1").unwrap_err();
        assert!(matches!(
            err,
            Error::Query(QueryError::AmbiguousColumnReference(_))
        ));
    }

    #[test]
    fn test_date_comparisons() {
        let (_dir, mut db) = open();
        run(&mut db, "CREATE TABLE ev (id INT, at DATE)");
        run(&mut db, "INSERT INTO ev VALUES (1, '2021-05-01')");
        run(&mut db, "INSERT INTO ev VALUES (2, '2023-01-15')");

        let rows = db
            .query("SELECT id FROM ev WHERE at > '2022-01-01'")
            .unwrap()
            .rows;
        assert_eq!(rows, vec![vec![int(2)]]);

        let err = db.query("SELECT id FROM ev WHERE at = 'soon'").unwrap_err();
        assert!(matches!(err, Error::Query(QueryError::IncomparableOperands)));
    }

    #[test]
    fn test_statements_built_by_hand() {
        let (_dir, mut db) = open();
        db.execute_statement(Statement::CreateTable(CreateTable {
            name: "n".into(),
            columns: vec![ColumnDef::new("v", DataType::Int)],
            ..Default::default()
        }))
        .unwrap();
        db.execute_statement(Statement::InsertInto(InsertInto {
            table: "n".into(),
            columns: None,
            values: vec![int(5)],
        }))
        .unwrap();

        let outcome = db
            .execute_statement(Statement::Select(Select {
                columns: ColumnsSelect::Columns(vec![ColumnRef::qualified("n", "v")]),
                tables: vec!["n".into()],
                where_clause: Some(Expr::Comparison {
                    left: Operand::Column(ColumnRef::bare("v")),
                    op: ComparisonOp::GtEq,
                    right: Operand::Literal(int(5)),
                }),
            }))
            .unwrap();
        let Outcome::Rows(result) = outcome else {
            panic!("expected rows");
        };
        assert_eq!(result.columns, vec!["n.v"]);
        assert_eq!(result.rows, vec![vec![int(5)]]);

        assert_eq!(db.execute_statement(Statement::Exit).unwrap(), Outcome::Exit);
    }

    #[test]
    fn test_query_rejects_other_statements() {
        let (_dir, db) = open();
        assert!(matches!(db.query("SHOW TABLES"), Err(Error::Syntax(_))));
    }
}
