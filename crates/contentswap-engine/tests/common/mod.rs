// Shared fixtures for engine integration tests
#![allow(dead_code)]

use contentswap_core::identity::{lesson_id, rule_id, step_id};
use rusqlite::{params, Connection};
use tempfile::TempDir;

const TOUR_LESSONS_DDL: &str = "CREATE TABLE tour_lessons_staging (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL
)";

const TOUR_STEPS_DDL: &str = "CREATE TABLE tour_steps_staging (
    id TEXT PRIMARY KEY,
    lesson_id TEXT NOT NULL REFERENCES tour_lessons(id),
    ordinal INTEGER NOT NULL,
    title TEXT NOT NULL
)";

const RULES_DDL: &str = "CREATE TABLE rules_staging (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    body TEXT NOT NULL
)";

const PATTERNS_DDL: &str = "CREATE TABLE patterns_staging (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL
);
CREATE TABLE pattern_examples_staging (
    id TEXT PRIMARY KEY,
    pattern_id TEXT NOT NULL REFERENCES patterns(id),
    ordinal INTEGER NOT NULL,
    body TEXT NOT NULL
)";

/// File-backed database configured the way the CLI configures it
pub fn setup_db() -> (TempDir, Connection) {
    let dir = TempDir::new().unwrap();
    let mut conn = contentswap_store::db::open(dir.path().join("content.db")).unwrap();
    contentswap_store::db::configure(&conn, std::time::Duration::from_millis(1000)).unwrap();
    contentswap_store::migrations::apply_migrations(&mut conn).unwrap();
    // Loaders write staging rows with enforcement off
    conn.pragma_update(None, "foreign_keys", "OFF").unwrap();
    (dir, conn)
}

pub fn create_user_progress(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE user_tour_progress (
            user_id TEXT NOT NULL,
            step_id TEXT NOT NULL REFERENCES tour_steps(id),
            PRIMARY KEY (user_id, step_id)
        )",
    )
    .unwrap();
}

/// First-ever staging tables for a group, before any promotion
pub fn bootstrap_staging(conn: &Connection, group: &str) {
    let ddl = match group {
        "tour" => format!("{};\n{}", TOUR_LESSONS_DDL, TOUR_STEPS_DDL),
        "rules" => RULES_DDL.to_string(),
        "patterns" => PATTERNS_DDL.to_string(),
        other => panic!("no fixture for group {}", other),
    };
    conn.execute_batch(&ddl).unwrap();
}

/// Load a tour of `lessons` lessons with `steps` steps each into staging
pub fn load_tour(conn: &Connection, lessons: u32, steps: u32) {
    for l in 1..=lessons {
        let slug = format!("lesson-{}", l);
        conn.execute(
            "INSERT INTO tour_lessons_staging (id, slug, title) VALUES (?1, ?2, ?3)",
            params![lesson_id(&slug).to_string(), slug, format!("Lesson {}", l)],
        )
        .unwrap();
        for s in 1..=steps {
            conn.execute(
                "INSERT INTO tour_steps_staging (id, lesson_id, ordinal, title) VALUES (?1, ?2, ?3, ?4)",
                params![
                    step_id(&slug, s).to_string(),
                    lesson_id(&slug).to_string(),
                    s,
                    format!("Step {}.{}", l, s)
                ],
            )
            .unwrap();
        }
    }
}

pub fn load_rules(conn: &Connection, count: usize) {
    for n in 0..count {
        let slug = format!("rule-{}", n);
        conn.execute(
            "INSERT INTO rules_staging (id, slug, body) VALUES (?1, ?2, 'body')",
            params![rule_id(&slug).to_string(), slug],
        )
        .unwrap();
    }
}

pub fn count(conn: &Connection, table: &str) -> u64 {
    contentswap_store::catalog::row_count(conn, table).unwrap()
}

/// Number of tables, triggers and indexes in the schema
pub fn object_counts(conn: &Connection) -> (i64, i64, i64) {
    let count_of = |kind: &str| -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1",
            [kind],
            |row| row.get(0),
        )
        .unwrap()
    };
    (count_of("table"), count_of("trigger"), count_of("index"))
}
