//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]

use std::sync::Arc;
pub use suitestore::*;
use tempfile::TempDir;

// ============================================================================
// TestStore - repositories plus the directory that backs them
// ============================================================================

/// Test store wrapper; keeps the temp dir alive for persistent stores.
pub struct TestStore {
    pub repos: Repos,
    pub dir: Option<TempDir>,
}

impl TestStore {
    /// In-memory store with sequential ids.
    pub fn ephemeral() -> Self {
        let repos = Repos::with_builder(
            Database::builder().id_generator(Arc::new(SequentialIds::new())),
        )
        .expect("ephemeral store");
        TestStore { repos, dir: None }
    }

    /// On-disk store with sequential ids persisted in its config.
    pub fn persistent() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let repos = Repos::with_builder(
            Database::builder()
                .path(dir.path())
                .id_strategy(IdStrategy::Sequential),
        )
        .expect("persistent store");
        TestStore {
            repos,
            dir: Some(dir),
        }
    }

    /// Close and reopen a persistent store from its directory.
    pub fn reopen(self) -> Self {
        let TestStore { repos, dir } = self;
        let dir = dir.expect("only persistent stores can be reopened");
        repos.close();
        drop(repos);
        let repos = Repos::open(dir.path()).expect("reopen store");
        TestStore {
            repos,
            dir: Some(dir),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn at(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

/// Insert one suite with `cases` cases and `lines` log lines per case.
pub fn seed_suite(repos: &Repos, name: &str, started: i64, cases: usize, lines: usize) -> String {
    let suite_id = repos
        .suites
        .insert(Suite::new(name, at(started)).with_planned_cases(cases as i64))
        .expect("insert suite");
    for n in 0..cases {
        let case_id = repos
            .cases
            .insert(Case::new(suite_id.as_str(), format!("{}-case{}", name, n), at(started + n as i64)).with_idx(n as i64))
            .expect("insert case");
        let batch = (0..lines).map(|seq| {
            LogLine::new(case_id.as_str(), seq as i64, format!("line {}", seq), at(started + seq as i64))
        });
        repos.logs.insert_batch(batch).expect("insert logs");
    }
    suite_id
}
