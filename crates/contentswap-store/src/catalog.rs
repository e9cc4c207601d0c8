//! Catalog introspection
//!
//! Read-only queries over `sqlite_master` and the pragma functions. The swap
//! executor uses these as explicit preconditions ("does the live table exist
//! yet?") instead of issuing DDL and ignoring the failure.

use crate::errors::{from_rusqlite, Result};
use contentswap_core::quote_ident;
use rusqlite::{Connection, OptionalExtension};

/// Kind of schema object as recorded in `sqlite_master.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Index,
    Trigger,
    View,
}

impl ObjectKind {
    fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Table => "table",
            ObjectKind::Index => "index",
            ObjectKind::Trigger => "trigger",
            ObjectKind::View => "view",
        }
    }
}

/// One row of `sqlite_master`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaObject {
    pub kind: String,
    pub name: String,
    pub table: String,
    pub sql: Option<String>,
}

/// A foreign key declared on a table, as reported by `pragma_foreign_key_list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredForeignKey {
    pub target_table: String,
    pub source_column: String,
    /// `None` when the clause references the target's primary key implicitly
    pub target_column: Option<String>,
}

pub fn object_exists(conn: &Connection, kind: ObjectKind, name: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2",
            [kind.as_str(), name],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;
    Ok(found.is_some())
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    object_exists(conn, ObjectKind::Table, name)
}

pub fn trigger_exists(conn: &Connection, name: &str) -> Result<bool> {
    object_exists(conn, ObjectKind::Trigger, name)
}

/// Number of rows in a table
pub fn row_count(conn: &Connection, table: &str) -> Result<u64> {
    let count: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;
    Ok(count as u64)
}

/// The `CREATE TABLE` text of a table, if it exists
pub fn table_sql(conn: &Connection, name: &str) -> Result<Option<String>> {
    let sql: Option<Option<String>> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;
    Ok(sql.flatten())
}

fn objects_on_table(conn: &Connection, kind: ObjectKind, table: &str) -> Result<Vec<SchemaObject>> {
    let mut stmt = conn
        .prepare(
            "SELECT type, name, tbl_name, sql FROM sqlite_master
             WHERE type = ?1 AND tbl_name = ?2 AND sql IS NOT NULL
             ORDER BY name",
        )
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([kind.as_str(), table], |row| {
            Ok(SchemaObject {
                kind: row.get(0)?,
                name: row.get(1)?,
                table: row.get(2)?,
                sql: row.get(3)?,
            })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

/// Explicitly created indexes on a table (automatic indexes have no SQL)
pub fn explicit_indexes(conn: &Connection, table: &str) -> Result<Vec<SchemaObject>> {
    objects_on_table(conn, ObjectKind::Index, table)
}

pub fn triggers_on(conn: &Connection, table: &str) -> Result<Vec<SchemaObject>> {
    objects_on_table(conn, ObjectKind::Trigger, table)
}

/// Foreign keys declared on `table`
pub fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<DeclaredForeignKey>> {
    let mut stmt = conn
        .prepare(r#"SELECT "table", "from", "to" FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#)
        .map_err(from_rusqlite)?;
    let keys = stmt
        .query_map([table], |row| {
            Ok(DeclaredForeignKey {
                target_table: row.get(0)?,
                source_column: row.get(1)?,
                target_column: row.get(2)?,
            })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(keys)
}

/// Rows of `table` whose foreign keys into `parent` do not resolve
pub fn dangling_references(conn: &Connection, table: &str, parent: &str) -> Result<u64> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA foreign_key_check({})", quote_ident(table)))
        .map_err(from_rusqlite)?;
    let parents = stmt
        .query_map([], |row| row.get::<_, String>(2))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(parents.iter().filter(|p| p.as_str() == parent).count() as u64)
}

/// Every schema object, ordered, for before/after comparisons
pub fn schema_objects(conn: &Connection) -> Result<Vec<SchemaObject>> {
    let mut stmt = conn
        .prepare(
            "SELECT type, name, tbl_name, sql FROM sqlite_master
             WHERE name NOT LIKE 'sqlite_%'
             ORDER BY type, name",
        )
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SchemaObject {
                kind: row.get(0)?,
                name: row.get(1)?,
                table: row.get(2)?,
                sql: row.get(3)?,
            })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

/// Read an integer-valued pragma
pub fn pragma_flag(conn: &Connection, pragma: &str) -> Result<i64> {
    conn.pragma_query_value(None, pragma, |row| row.get(0))
        .map_err(from_rusqlite)
}
