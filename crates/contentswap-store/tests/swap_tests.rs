// Integration tests for the swap executor
// Covers naming after a swap, write guards, retired tables and
// cross-boundary foreign keys.

mod common;

use common::*;
use contentswap_core::identity::step_id;
use contentswap_core::registry::SwapGroup;
use contentswap_store::catalog;
use contentswap_store::swap::{swap, SwapOptions, WriteGuard};
use rusqlite::Connection;

const RULES_TRIGGERS: [&str; 3] = [
    "rules_write_lock_insert",
    "rules_write_lock_update",
    "rules_write_lock_delete",
];

fn staged_rules(conn: &Connection, rows: usize) {
    create_staging(conn, &["rules"]);
    seed_rules(conn, "rules_staging", rows);
}

fn staged_tour(conn: &Connection, lessons: &[(&str, u32)]) {
    create_staging(conn, &["tour_lessons", "tour_steps"]);
    seed_tour(conn, "_staging", lessons);
}

#[test]
fn test_first_promotion_creates_live_tables() {
    // Given: staging exists, no live table yet
    let mut conn = setup_db();
    staged_rules(&conn, 3);

    // When: the group is swapped
    let outcome = swap(&mut conn, SwapGroup::Rules, &SwapOptions::default()).unwrap();

    // Then: staging became live and nothing was retired
    assert!(table_exists(&conn, "rules"));
    assert!(!table_exists(&conn, "rules_staging"));
    assert!(!table_exists(&conn, "rules_retired"));
    assert_eq!(count(&conn, "rules"), 3);
    assert_eq!(outcome.tables.len(), 1);
    assert!(!outcome.tables[0].had_live);
    assert!(outcome.retired_dropped.is_empty());
    assert_eq!(outcome.row_count(), 3);
    for trigger in RULES_TRIGGERS {
        assert!(trigger_exists(&conn, trigger), "missing {}", trigger);
    }
}

#[test]
fn test_second_promotion_replaces_live_content() {
    let mut conn = setup_db();
    staged_rules(&conn, 3);
    swap(&mut conn, SwapGroup::Rules, &SwapOptions::default()).unwrap();

    staged_rules(&conn, 5);
    let outcome = swap(&mut conn, SwapGroup::Rules, &SwapOptions::default()).unwrap();

    assert_eq!(count(&conn, "rules"), 5);
    assert!(outcome.tables[0].had_live);
    assert_eq!(outcome.retired_dropped, vec!["rules_retired".to_string()]);
    assert!(!table_exists(&conn, "rules_retired"));
    assert!(!table_exists(&conn, "rules_staging"));

    // Exactly one set of guard triggers, attached to the new live table
    let triggers = catalog::triggers_on(&conn, "rules").unwrap();
    let names: Vec<_> = triggers.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names.len(), 3);
    for trigger in RULES_TRIGGERS {
        assert!(names.contains(&trigger));
    }
}

#[test]
fn test_live_table_rejects_writes_after_swap() {
    let mut conn = setup_db();
    staged_rules(&conn, 2);
    swap(&mut conn, SwapGroup::Rules, &SwapOptions::default()).unwrap();

    let insert = conn
        .execute(
            "INSERT INTO rules (id, slug, body) VALUES ('x', 'x', 'x')",
            [],
        )
        .unwrap_err();
    assert!(insert
        .to_string()
        .contains("rules is live content; write to rules_staging instead"));

    assert!(conn.execute("UPDATE rules SET body = 'changed'", []).is_err());
    assert!(conn.execute("DELETE FROM rules", []).is_err());
    assert_eq!(count(&conn, "rules"), 2);
}

#[test]
fn test_guard_message_names_both_tables() {
    let guard = WriteGuard::new(SwapGroup::Tour.tables()[1]);
    assert_eq!(
        guard.message(),
        "tour_steps is live content; write to tour_steps_staging instead"
    );
}

#[test]
fn test_keep_retired_leaves_previous_tables() {
    let mut conn = setup_db();
    staged_tour(&conn, &[("intro", 2)]);
    swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap();

    staged_tour(&conn, &[("intro", 2), ("next", 1)]);
    let outcome = swap(
        &mut conn,
        SwapGroup::Tour,
        &SwapOptions { keep_retired: true },
    )
    .unwrap();

    assert_eq!(
        outcome.retired_kept,
        vec!["tour_lessons_retired".to_string(), "tour_steps_retired".to_string()]
    );
    assert_eq!(count(&conn, "tour_steps_retired"), 2);
    assert_eq!(count(&conn, "tour_steps"), 3);

    // Retired tables carry no guard triggers
    assert!(catalog::triggers_on(&conn, "tour_steps_retired")
        .unwrap()
        .is_empty());
}

#[test]
fn test_stale_retired_tables_are_cleared_next_time() {
    let mut conn = setup_db();
    staged_rules(&conn, 1);
    swap(&mut conn, SwapGroup::Rules, &SwapOptions::default()).unwrap();
    staged_rules(&conn, 2);
    swap(&mut conn, SwapGroup::Rules, &SwapOptions { keep_retired: true }).unwrap();
    assert!(table_exists(&conn, "rules_retired"));

    staged_rules(&conn, 3);
    let outcome = swap(&mut conn, SwapGroup::Rules, &SwapOptions::default()).unwrap();

    assert_eq!(outcome.stale_retired_dropped, vec!["rules_retired".to_string()]);
    assert_eq!(outcome.retired_dropped, vec!["rules_retired".to_string()]);
    assert!(!table_exists(&conn, "rules_retired"));
    assert_eq!(count(&conn, "rules"), 3);
}

#[test]
fn test_declared_reference_follows_the_new_live_table() {
    // Given: live tour content and a progress row pointing at a step
    let mut conn = setup_db();
    create_user_tables(&conn);
    staged_tour(&conn, &[("intro", 2)]);
    swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap();
    let step = step_id("intro", 2).to_string();
    conn.execute(
        "INSERT INTO user_tour_progress (user_id, step_id) VALUES ('u1', ?1)",
        [&step],
    )
    .unwrap();

    // When: the tour is reseeded with the same step plus new ones
    staged_tour(&conn, &[("intro", 3)]);
    let outcome = swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap();

    // Then: the clause still names the live table and the row resolves
    assert!(outcome.foreign_keys_rebuilt.is_empty());
    let keys = catalog::foreign_keys(&conn, "user_tour_progress").unwrap();
    assert_eq!(keys[0].target_table, "tour_steps");
    assert_eq!(
        catalog::dangling_references(&conn, "user_tour_progress", "tour_steps").unwrap(),
        0
    );
    let title: String = conn
        .query_row(
            "SELECT s.title FROM user_tour_progress p JOIN tour_steps s ON s.id = p.step_id",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(title, "Step 2");
}

#[test]
fn test_undeclared_reference_is_added() {
    // Given: a bookmarks table created without its foreign key
    let mut conn = setup_db();
    conn.execute_batch(
        "CREATE TABLE user_pattern_bookmarks (user_id TEXT NOT NULL, pattern_id TEXT NOT NULL);
         CREATE INDEX idx_bookmarks_user ON user_pattern_bookmarks (user_id);",
    )
    .unwrap();
    create_staging(&conn, &["patterns", "pattern_examples"]);
    seed_patterns(&conn, "_staging", &["builder", "visitor"], 2);

    // When: patterns are promoted
    let outcome = swap(&mut conn, SwapGroup::Patterns, &SwapOptions::default()).unwrap();

    // Then: the key exists and the table kept its index
    assert_eq!(
        outcome.foreign_keys_rebuilt,
        vec!["fk_user_pattern_bookmarks_pattern"]
    );
    let keys = catalog::foreign_keys(&conn, "user_pattern_bookmarks").unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].target_table, "patterns");
    assert_eq!(catalog::explicit_indexes(&conn, "user_pattern_bookmarks").unwrap().len(), 1);
}

#[test]
fn test_absent_reference_source_is_skipped() {
    let mut conn = setup_db();
    staged_tour(&conn, &[("intro", 1)]);

    let outcome = swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap();

    assert_eq!(outcome.foreign_keys_skipped, vec!["fk_user_tour_progress_step"]);
    assert!(!table_exists(&conn, "user_tour_progress"));
}

#[test]
fn test_connection_pragmas_are_restored() {
    let mut conn = setup_db();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    create_content_table(&conn, "rules", "rules_staging");
    seed_rules(&conn, "rules_staging", 1);

    swap(&mut conn, SwapGroup::Rules, &SwapOptions::default()).unwrap();

    assert!(foreign_keys_enabled(&conn));
    assert_eq!(catalog::pragma_flag(&conn, "legacy_alter_table").unwrap(), 0);
    assert!(conn.is_autocommit());
}

#[test]
fn test_staging_indexes_move_with_the_table() {
    let mut conn = setup_db();
    staged_tour(&conn, &[("intro", 1)]);

    swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap();

    let indexes = catalog::explicit_indexes(&conn, "tour_steps").unwrap();
    assert_eq!(indexes.len(), 1);
    assert!(indexes[0].name.starts_with("idx_tour_steps_staging_"));
}
