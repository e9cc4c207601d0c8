// Shared fixtures for store integration tests
#![allow(dead_code)]

use contentswap_core::identity::{lesson_id, pattern_example_id, pattern_id, rule_id, step_id};
use contentswap_store::catalog::{self, SchemaObject};
use rusqlite::{params, Connection};
use std::sync::atomic::{AtomicUsize, Ordering};

static INDEX_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Definitions of the content tables, `{t}` standing for the physical name
const CONTENT_DDL: &[(&str, &str)] = &[
    (
        "patterns",
        "CREATE TABLE {t} (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL
        )",
    ),
    (
        "pattern_examples",
        "CREATE TABLE {t} (
            id TEXT PRIMARY KEY,
            pattern_id TEXT NOT NULL REFERENCES patterns(id),
            ordinal INTEGER NOT NULL,
            body TEXT NOT NULL DEFAULT ''
        )",
    ),
    (
        "rules",
        "CREATE TABLE {t} (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            body TEXT NOT NULL
        )",
    ),
    (
        "tour_lessons",
        "CREATE TABLE {t} (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL
        )",
    ),
    (
        "tour_steps",
        "CREATE TABLE {t} (
            id TEXT PRIMARY KEY,
            lesson_id TEXT NOT NULL REFERENCES tour_lessons(id),
            ordinal INTEGER NOT NULL,
            title TEXT NOT NULL
        )",
    ),
];

const CONTENT_INDEXES: &[(&str, &str)] = &[
    ("pattern_examples", "CREATE INDEX {i} ON {t} (pattern_id)"),
    ("tour_steps", "CREATE INDEX {i} ON {t} (lesson_id, ordinal)"),
];

/// In-memory database with migrations applied and no content tables
///
/// Foreign-key enforcement is off, as for a content loader writing staging
/// rows whose REFERENCES clauses name live tables.
pub fn setup_db() -> Connection {
    let mut conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    contentswap_store::migrations::apply_migrations(&mut conn).expect("migrations");
    conn.pragma_update(None, "foreign_keys", "OFF").unwrap();
    conn
}

/// Create `physical` with the definition of logical table `logical`
pub fn create_content_table(conn: &Connection, logical: &str, physical: &str) {
    let (_, ddl) = CONTENT_DDL
        .iter()
        .find(|(name, _)| *name == logical)
        .expect("unknown content table");
    conn.execute_batch(&ddl.replace("{t}", physical)).unwrap();
    for (_, index) in CONTENT_INDEXES.iter().filter(|(t, _)| *t == logical) {
        // Renamed tables keep their index names, so every index gets a fresh one
        let name = format!("idx_{}_{}", physical, INDEX_SEQ.fetch_add(1, Ordering::Relaxed));
        conn.execute_batch(&index.replace("{i}", &name).replace("{t}", physical))
            .unwrap();
    }
}

/// Create `T_staging` for every logical table listed
pub fn create_staging(conn: &Connection, logical: &[&str]) {
    for table in logical {
        create_content_table(conn, table, &format!("{}_staging", table));
    }
}

/// Tables that reference content but are never swapped
pub fn create_user_tables(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE user_tour_progress (
            user_id TEXT NOT NULL,
            step_id TEXT NOT NULL REFERENCES tour_steps(id),
            completed_at INTEGER,
            PRIMARY KEY (user_id, step_id)
        );
        CREATE TABLE user_pattern_bookmarks (
            user_id TEXT NOT NULL,
            pattern_id TEXT NOT NULL REFERENCES patterns(id),
            PRIMARY KEY (user_id, pattern_id)
        );",
    )
    .unwrap();
}

/// Insert `count` rules into `table`
pub fn seed_rules(conn: &Connection, table: &str, count: usize) {
    for n in 0..count {
        let slug = format!("rule-{}", n);
        conn.execute(
            &format!("INSERT INTO \"{}\" (id, slug, body) VALUES (?1, ?2, ?3)", table),
            params![rule_id(&slug).to_string(), slug, format!("body {}", n)],
        )
        .unwrap();
    }
}

/// Insert lessons and their steps into tables suffixed with `suffix`
/// (`""` for live, `"_staging"` for staging)
pub fn seed_tour(conn: &Connection, suffix: &str, lessons: &[(&str, u32)]) {
    for (slug, steps) in lessons {
        conn.execute(
            &format!(
                "INSERT INTO \"tour_lessons{}\" (id, slug, title) VALUES (?1, ?2, ?3)",
                suffix
            ),
            params![lesson_id(slug).to_string(), slug, format!("Lesson {}", slug)],
        )
        .unwrap();
        for ordinal in 1..=*steps {
            conn.execute(
                &format!(
                    "INSERT INTO \"tour_steps{}\" (id, lesson_id, ordinal, title) VALUES (?1, ?2, ?3, ?4)",
                    suffix
                ),
                params![
                    step_id(slug, ordinal).to_string(),
                    lesson_id(slug).to_string(),
                    ordinal,
                    format!("Step {}", ordinal)
                ],
            )
            .unwrap();
        }
    }
}

/// Insert patterns with `examples` examples each into tables suffixed with `suffix`
pub fn seed_patterns(conn: &Connection, suffix: &str, slugs: &[&str], examples: u32) {
    for slug in slugs {
        conn.execute(
            &format!(
                "INSERT INTO \"patterns{}\" (id, slug, title) VALUES (?1, ?2, ?3)",
                suffix
            ),
            params![pattern_id(slug).to_string(), slug, slug.to_uppercase()],
        )
        .unwrap();
        for ordinal in 1..=examples {
            conn.execute(
                &format!(
                    "INSERT INTO \"pattern_examples{}\" (id, pattern_id, ordinal, body) VALUES (?1, ?2, ?3, 'x')",
                    suffix
                ),
                params![
                    pattern_example_id(slug, ordinal).to_string(),
                    pattern_id(slug).to_string(),
                    ordinal
                ],
            )
            .unwrap();
        }
    }
}

pub fn count(conn: &Connection, table: &str) -> u64 {
    catalog::row_count(conn, table).unwrap()
}

pub fn table_exists(conn: &Connection, table: &str) -> bool {
    catalog::table_exists(conn, table).unwrap()
}

pub fn trigger_exists(conn: &Connection, trigger: &str) -> bool {
    catalog::trigger_exists(conn, trigger).unwrap()
}

pub fn snapshot(conn: &Connection) -> Vec<SchemaObject> {
    catalog::schema_objects(conn).unwrap()
}

pub fn foreign_keys_enabled(conn: &Connection) -> bool {
    catalog::pragma_flag(conn, "foreign_keys").unwrap() == 1
}
