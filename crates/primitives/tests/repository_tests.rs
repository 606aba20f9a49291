//! Repository behavior across collections
//!
//! Scenario tests for the repository facades:
//!
//! 1. Suite pages: cursor walk, counts and aggregate from one snapshot
//! 2. DeleteAll and Delete idempotence with their change events
//! 3. Cross-collection writes (attachments linked from cases)
//! 4. Reopening an on-disk store

use std::sync::Arc;

use suitestore_core::{
    Attachment, AttachmentOwner, Case, CaseStatus, Document, LogLine, SequentialIds, Suite,
    SuitePatch, SuiteResult, SuiteStatus, Timestamp,
};
use suitestore_engine::{ChangeOp, Database, OverflowPolicy};
use suitestore_primitives::Repos;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn setup() -> Repos {
    Repos::with_builder(
        Database::builder()
            .id_generator(Arc::new(SequentialIds::new()))
            .overflow(OverflowPolicy::DropOldest),
    )
    .unwrap()
}

fn at(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

fn names(suites: &[Suite]) -> Vec<&str> {
    suites.iter().map(|s| s.name.as_str()).collect()
}

// ============================================================================
// Module 1: Suite pages
// ============================================================================

#[test]
fn test_suite_page_cursor_walk() {
    let repos = setup();
    let a = repos.suites.insert(Suite::new("A", at(100))).unwrap();
    repos.suites.insert(Suite::new("B", at(200))).unwrap();
    repos.suites.insert(Suite::new("C", at(50))).unwrap();

    let first = repos.suites.page(None, 2, false).unwrap();
    assert_eq!(names(&first.suites), vec!["B", "A"]);
    assert_eq!(first.next_id, Some(a.clone()));

    let second = repos.suites.page(Some(&a), 2, false).unwrap();
    assert_eq!(names(&second.suites), vec!["C"]);
    assert_eq!(second.next_id, None);
}

#[test]
fn test_suite_page_counts() {
    let repos = setup();
    let a = repos
        .suites
        .insert(Suite::new("a", at(1)).with_status(SuiteStatus::Running))
        .unwrap();
    repos
        .suites
        .insert(Suite::new("b", at(2)).with_status(SuiteStatus::Running))
        .unwrap();
    repos.suites.insert(Suite::new("c", at(3))).unwrap();
    repos.suites.finish(&a, SuiteResult::Passed, at(9)).unwrap();

    let page = repos.suites.page(None, 1, false).unwrap();
    assert_eq!(page.suites.len(), 1);
    assert_eq!(page.running_count, 1);
    assert_eq!(page.finished_count, 1);
    assert_eq!(page.agg.total_count, 3);
    assert_eq!(page.agg.running_count as u64, page.running_count);
    assert_eq!(page.agg.finished_count as u64, page.finished_count);
}

#[test]
fn test_suite_fuzzy_find() {
    let repos = setup();
    repos.suites.insert(Suite::new("nightly", at(1))).unwrap();
    repos.suites.insert(Suite::new("smoke", at(2))).unwrap();
    assert_eq!(names(&repos.suites.fuzzy_find("igh", false).unwrap()), vec!["nightly"]);
    assert!(repos.suites.fuzzy_find("zzz", true).unwrap().is_empty());
}

#[test]
fn test_suite_save_patch_events() {
    let repos = setup();
    let stream = repos.changes();
    let id = repos.suites.insert(Suite::new("a", at(1))).unwrap();
    repos
        .suites
        .save(
            &id,
            SuitePatch {
                tags: Some(["ci".to_string()].into_iter().collect()),
                ..SuitePatch::default()
            },
        )
        .unwrap();
    repos.suites.save_status(&id, SuiteStatus::Running).unwrap();

    let events = stream.drain();
    let ops: Vec<_> = events.iter().map(|e| e.op).collect();
    assert_eq!(ops, vec![ChangeOp::Insert, ChangeOp::Update, ChangeOp::Update]);
    let last: Suite = events[2].decode().unwrap();
    assert_eq!(last.status, SuiteStatus::Running);
    assert!(last.tags.contains("ci"));
    assert_eq!(last.entity.version, 2);
}

// ============================================================================
// Module 2: Soft delete
// ============================================================================

#[test]
fn test_delete_all_three_of_four() {
    let repos = setup();
    for n in 0..4 {
        repos.suites.insert(Suite::new(format!("s{}", n), at(n))).unwrap();
    }
    repos.suites.delete("1", at(500)).unwrap();
    let before = repos.suites.find("1").unwrap();
    let stream = repos.changes();

    assert_eq!(repos.suites.delete_all(at(900)).unwrap(), 3);

    let events = stream.drain();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.op == ChangeOp::Update));
    assert!(events.iter().all(|e| e.id() != Some("1")));

    let after = repos.suites.find("1").unwrap();
    assert_eq!(after.entity.deleted_at, before.entity.deleted_at);
    assert_eq!(after.entity.version, before.entity.version);
    for id in ["2", "3", "4"] {
        assert_eq!(repos.suites.find(id).unwrap().entity.deleted_at, Some(at(900)));
    }
}

#[test]
fn test_delete_twice_same_markers_one_event() {
    let repos = setup();
    let id = repos.cases.insert(Case::new("s", "c", at(1))).unwrap();
    let stream = repos.changes();

    assert!(repos.cases.delete(&id, at(10)).unwrap());
    let first = repos.cases.find(&id).unwrap();
    assert!(!repos.cases.delete(&id, at(20)).unwrap());
    let second = repos.cases.find(&id).unwrap();

    assert_eq!(first.entity.deleted_at, second.entity.deleted_at);
    assert_eq!(first.entity.version, second.entity.version);
    assert_eq!(stream.drain().len(), 1);
}

#[test]
fn test_set_on_deleted_keeps_markers() {
    let repos = setup();
    let id = repos.suites.insert(Suite::new("a", at(1))).unwrap();
    repos.suites.delete(&id, at(2)).unwrap();
    let renamed = repos
        .suites
        .save(
            &id,
            SuitePatch {
                name: Some("b".into()),
                ..SuitePatch::default()
            },
        )
        .unwrap();
    assert!(renamed.entity.deleted);
    assert_eq!(renamed.entity.deleted_at, Some(at(2)));
    assert_eq!(renamed.entity.version, 2);
    assert_eq!(repos.suites.aggregate().unwrap().total_count, 0);
}

// ============================================================================
// Module 3: Cross-collection writes
// ============================================================================

#[test]
fn test_attach_to_case_links_both_documents() {
    let repos = setup();
    let case_id = repos.cases.insert(Case::new("s", "c", at(1))).unwrap();
    let stream = repos.changes();

    let attachment = repos
        .attach_to_case(Attachment::new(
            AttachmentOwner::Case(case_id.clone()),
            "screen.png",
            "image/png",
            2048,
            at(5),
        ))
        .unwrap();

    let case = repos.cases.find(&case_id).unwrap();
    assert_eq!(case.attachments, vec![attachment.id().to_string()]);
    let owned = repos
        .attachments
        .find_by_owner(&AttachmentOwner::Case(case_id.clone()), false)
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(repos.attachments.aggregate().unwrap().total_size, 2048);

    let events = stream.drain();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].collection, Attachment::COLLECTION);
    assert_eq!(events[1].collection, Case::COLLECTION);
}

#[test]
fn test_attach_to_missing_case_rolls_back() {
    let repos = setup();
    let stream = repos.changes();
    let err = repos
        .attach_to_case(Attachment::new(
            AttachmentOwner::Case("404".into()),
            "log.txt",
            "text/plain",
            1,
            at(1),
        ))
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(repos.attachments.find_all(true).unwrap().is_empty());
    assert_eq!(repos.attachments.aggregate().unwrap().total_count, 0);
    assert!(stream.try_recv().is_none());
}

#[test]
fn test_owner_index_separates_suites_and_cases() {
    let repos = setup();
    repos
        .attachments
        .insert(Attachment::new(AttachmentOwner::Suite("7".into()), "a", "x", 1, at(1)))
        .unwrap();
    repos
        .attachments
        .insert(Attachment::new(AttachmentOwner::Case("7".into()), "b", "x", 1, at(2)))
        .unwrap();
    let suite_owned = repos
        .attachments
        .find_by_owner(&AttachmentOwner::Suite("7".into()), false)
        .unwrap();
    assert_eq!(suite_owned.len(), 1);
    assert_eq!(suite_owned[0].filename, "a");
}

#[test]
fn test_case_lifecycle_and_lookup() {
    let repos = setup();
    let suite_id = repos.suites.insert(Suite::new("s", at(1))).unwrap();
    let c1 = repos
        .cases
        .insert(Case::new(suite_id.as_str(), "one", at(2)).with_idx(0))
        .unwrap();
    repos
        .cases
        .insert(Case::new(suite_id.as_str(), "two", at(3)).with_idx(1))
        .unwrap();
    repos.cases.start(&c1, at(4)).unwrap();
    repos.cases.finish(&c1, CaseStatus::Passed, at(5)).unwrap();

    assert_eq!(repos.cases.find_by_suite(&suite_id, false).unwrap().len(), 2);
    assert_eq!(repos.cases.find_by_status(CaseStatus::Passed).unwrap().len(), 1);
    let page = repos.cases.page(None, 10, false).unwrap();
    assert_eq!(page.items[0].name, "two");

    repos
        .logs
        .insert(LogLine::new(c1.as_str(), 0, "started", at(4)))
        .unwrap();
    assert_eq!(repos.logs.find_by_case(&c1, false).unwrap().len(), 1);
}

// ============================================================================
// Module 4: Reopen
// ============================================================================

#[test]
fn test_reopen_on_disk_store() {
    let dir = TempDir::new().unwrap();
    {
        let repos = Repos::open(dir.path()).unwrap();
        assert!(repos.started_empty());
        repos.suites.insert(Suite::new("persisted", at(1))).unwrap();
        repos.close();
    }
    let repos = Repos::open(dir.path()).unwrap();
    assert!(!repos.started_empty());
    let all = repos.suites.find_all(false).unwrap();
    assert_eq!(names(&all), vec!["persisted"]);
    assert_eq!(repos.suites.aggregate().unwrap().total_count, 1);
}
