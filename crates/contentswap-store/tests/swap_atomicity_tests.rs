// Atomicity of the swap transaction
// A failure anywhere after the renames leaves every table, trigger and
// constraint exactly as it was before the swap started.

mod common;

use common::*;
use contentswap_core::identity::step_id;
use contentswap_core::registry::SwapGroup;
use contentswap_core::ExErrorKind;
use contentswap_store::recorder;
use contentswap_store::swap::{run_in_swap_transaction, swap, SwapOptions};
use rusqlite::Connection;

/// Live tour with one progress row on step ("intro", 3)
fn live_tour_with_progress() -> Connection {
    let mut conn = setup_db();
    create_user_tables(&conn);
    create_staging(&conn, &["tour_lessons", "tour_steps"]);
    seed_tour(&conn, "_staging", &[("intro", 3)]);
    swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap();
    conn.execute(
        "INSERT INTO user_tour_progress (user_id, step_id) VALUES ('u1', ?1)",
        [step_id("intro", 3).to_string()],
    )
    .unwrap();
    conn
}

#[test]
fn test_dangling_reference_rolls_back_everything() {
    // Given: new staging content that drops the step a user has completed
    let mut conn = live_tour_with_progress();
    create_staging(&conn, &["tour_lessons", "tour_steps"]);
    seed_tour(&conn, "_staging", &[("intro", 2)]);
    let before = snapshot(&conn);

    // When: the swap reaches foreign key restoration
    let err = swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap_err();

    // Then: the failure is a constraint violation naming the group
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    assert!(err.kind().is_transaction());
    assert_eq!(err.group(), Some("tour"));
    assert_eq!(err.table(), Some("user_tour_progress"));

    // And: the schema is byte-for-byte what it was
    assert_eq!(snapshot(&conn), before);
    assert_eq!(count(&conn, "tour_steps"), 3);
    assert_eq!(count(&conn, "tour_steps_staging"), 2);
    assert!(!table_exists(&conn, "tour_steps_retired"));

    // And: the old guards are still active
    let write = conn.execute("DELETE FROM tour_steps", []);
    assert!(write.is_err());
    assert!(conn.is_autocommit());
}

#[test]
fn test_rename_failure_midway_rolls_back_first_rename() {
    // Given: lessons staged but the steps staging table bypassed validation
    let mut conn = live_tour_with_progress();
    create_staging(&conn, &["tour_lessons"]);
    seed_tour_lessons_only(&conn);
    let before = snapshot(&conn);

    // When: the second rename fails
    let err = swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap_err();

    // Then: the first rename did not survive
    assert_eq!(err.kind(), ExErrorKind::Transaction);
    assert_eq!(err.op(), Some("rename_tables"));
    assert!(err.to_string().contains("tour_steps_staging"));
    assert_eq!(snapshot(&conn), before);
    assert!(table_exists(&conn, "tour_lessons"));
    assert!(table_exists(&conn, "tour_lessons_staging"));
    assert!(!table_exists(&conn, "tour_lessons_retired"));
}

#[test]
fn test_failed_body_discards_audit_record() {
    // Given: a swap whose transaction also writes the audit record
    let mut conn = live_tour_with_progress();
    create_staging(&conn, &["tour_lessons", "tour_steps"]);
    seed_tour(&conn, "_staging", &[("intro", 1)]);

    // When: the record is written first and the swap then fails
    let result = run_in_swap_transaction(&mut conn, SwapGroup::Tour, |tx| {
        recorder::record_promoted(tx, SwapGroup::Tour, 2, &serde_json::json!({}))?;
        contentswap_store::swap::execute_swap(tx, SwapGroup::Tour, &SwapOptions::default())
    });

    // Then: no record claims the failed content is live
    assert!(result.is_err());
    assert!(recorder::history(&conn, SwapGroup::Tour).unwrap().is_empty());
}

#[test]
fn test_connection_usable_after_rollback() {
    let mut conn = live_tour_with_progress();
    create_staging(&conn, &["tour_lessons", "tour_steps"]);
    seed_tour(&conn, "_staging", &[("intro", 2)]);
    swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap_err();

    // Operator fixes the content and reruns from scratch
    conn.execute(
        "INSERT INTO tour_steps_staging (id, lesson_id, ordinal, title) VALUES (?1, ?2, 3, 'Step 3')",
        [
            step_id("intro", 3).to_string(),
            contentswap_core::identity::lesson_id("intro").to_string(),
        ],
    )
    .unwrap();
    let outcome = swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap();

    assert_eq!(outcome.row_count(), 4);
    assert_eq!(count(&conn, "tour_steps"), 3);
}

#[test]
fn test_refused_before_begin_is_not_a_rollback() {
    // Given: staged content, but the caller already holds a transaction
    let mut conn = live_tour_with_progress();
    create_staging(&conn, &["tour_lessons", "tour_steps"]);
    seed_tour(&conn, "_staging", &[("intro", 3)]);
    conn.execute_batch("BEGIN").unwrap();
    let before = snapshot(&conn);

    // When
    let err = swap(&mut conn, SwapGroup::Tour, &SwapOptions::default()).unwrap_err();

    // Then: reported as a refusal, not as a rolled-back swap
    assert_eq!(err.kind(), ExErrorKind::Internal);
    assert!(!err.kind().is_transaction());
    assert_eq!(err.op(), Some("swap"));
    assert!(!err.to_string().contains("rolled back"));

    // And: the caller's transaction is untouched
    assert!(!conn.is_autocommit());
    assert_eq!(snapshot(&conn), before);
    conn.execute_batch("ROLLBACK").unwrap();
}

fn seed_tour_lessons_only(conn: &Connection) {
    conn.execute(
        "INSERT INTO tour_lessons_staging (id, slug, title) VALUES (?1, 'intro', 'Intro')",
        [contentswap_core::identity::lesson_id("intro").to_string()],
    )
    .unwrap();
}
