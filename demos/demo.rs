use reldb::ast::{CreateTable, ForeignKeyDef};
use reldb::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("reldb demo\n");

    let dir = tempfile::tempdir()?;
    let mut db = Database::open(dir.path())?;

    // Tables can be built by hand...
    db.create_table(CreateTable {
        name: "dept".into(),
        columns: vec![
            ColumnDef::new("id", DataType::Int),
            ColumnDef::new("name", DataType::Char(10)),
        ],
        primary_keys: vec![vec!["id".into()]],
        ..Default::default()
    })?;
    println!("Created table 'dept'");

    // ...or from SQL.
    db.execute(
        "CREATE TABLE emp (id INT, name CHAR(10) NOT NULL, hired DATE, dept_id INT, \
         PRIMARY KEY (id), FOREIGN KEY (dept_id) REFERENCES dept (id))",
    )?;
    println!("Created table 'emp'");

    for sql in [
        "INSERT INTO dept VALUES (1, 'HR')",
        "INSERT INTO dept VALUES (2, 'IT')",
        "INSERT INTO emp VALUES (10, 'Alice', '2021-03-01', 1)",
        "INSERT INTO emp VALUES (11, 'Bob', NULL, NULL)",
        "INSERT INTO emp (id, name, dept_id) VALUES (12, 'Charlie', 2)",
    ] {
        db.execute(sql)?;
    }
    println!("Inserted 5 rows\n");

    // Constraint violations are ordinary errors.
    if let Err(e) = db.execute("INSERT INTO emp VALUES (13, 'Dana', NULL, 9)") {
        println!("Rejected: {e}");
    }
    if let Err(e) = db.execute("DROP TABLE dept") {
        println!("Rejected: {e}\n");
    }

    let result = db.query(
        "SELECT emp.name, dept.name, hired FROM emp, dept \
         WHERE dept_id = dept.id AND (hired IS NULL OR hired > '2020-01-01')",
    )?;
    println!("{:<10} {:<10} {:<10}", "EMP", "DEPT", "HIRED");
    println!("{}", "-".repeat(32));
    for row in &result.rows {
        println!(
            "{:<10} {:<10} {:<10}",
            row[0].to_string(),
            row[1].to_string(),
            row[2].to_string()
        );
    }
    println!();

    if let Outcome::Deleted(count) = db.execute("DELETE FROM dept")? {
        println!(
            "DELETE FROM dept: {} deleted, {} kept (still referenced)",
            count.deleted, count.skipped
        );
    }

    let fk = ForeignKeyDef {
        column: "dept_id".into(),
        ref_table: "dept".into(),
        ref_column: "name".into(),
    };
    let badge = CreateTable {
        name: "badge".into(),
        columns: vec![ColumnDef::new("dept_id", DataType::Int)],
        foreign_keys: vec![fk],
        ..Default::default()
    };
    if let Err(e) = db.create_table(badge) {
        println!("Rejected: {e}\n");
    }

    println!("Tables in database:");
    for table_name in db.list_tables()? {
        println!("  - {}", table_name);
    }

    Ok(())
}
