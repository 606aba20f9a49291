//! Storage Mode Tests
//!
//! Tests behavior across:
//! - Ephemeral (no disk) vs Persistent (disk-backed)
//! - Reopen: documents, indexes, aggregates and id sequence survive

use crate::common::*;

fn exercise(repos: &Repos) {
    let s1 = seed_suite(repos, "alpha", 100, 2, 3);
    let s2 = seed_suite(repos, "beta", 200, 1, 0);
    repos.suites.finish(&s1, SuiteResult::Failed, at(150)).unwrap();
    repos.suites.delete(&s2, at(300)).unwrap();

    let page = repos.suites.page(None, 10, false).unwrap();
    assert_eq!(page.suites.len(), 1);
    assert_eq!(page.suites[0].entity.id, s1);
    assert_eq!(page.finished_count, 1);

    let page = repos.suites.page(None, 10, true).unwrap();
    assert_eq!(page.suites[0].entity.id, s2);
    assert_eq!(page.agg.total_count, 1);

    assert_eq!(repos.cases.find_by_suite(&s1, false).unwrap().len(), 2);
    assert_eq!(repos.logs.aggregate().unwrap().total_count, 6);
}

#[test]
fn test_ephemeral_store() {
    let store = TestStore::ephemeral();
    assert!(store.repos.started_empty());
    assert!(store.repos.database().data_dir().is_none());
    exercise(&store.repos);
}

#[test]
fn test_persistent_store() {
    let store = TestStore::persistent();
    assert!(store.repos.started_empty());
    exercise(&store.repos);
}

#[test]
fn test_persistent_store_survives_reopen() {
    let store = TestStore::persistent();
    exercise(&store.repos);
    let before_suites = store.repos.suites.find_all(true).unwrap();
    let before_agg = store.repos.cases.aggregate().unwrap();

    let store = store.reopen();
    assert!(!store.repos.started_empty());
    assert_eq!(store.repos.suites.find_all(true).unwrap(), before_suites);
    assert_eq!(store.repos.cases.aggregate().unwrap(), before_agg);
    assert_eq!(
        store.repos.suites.page(None, 10, false).unwrap().suites.len(),
        1
    );

    // The sequential generator resumes after the largest stored id
    let largest = before_suites
        .iter()
        .map(|s| s.entity.id.parse::<u64>().unwrap())
        .chain(
            store
                .repos
                .logs
                .find_all(true)
                .unwrap()
                .iter()
                .map(|l| l.entity.id.parse::<u64>().unwrap()),
        )
        .max()
        .unwrap();
    let next = store.repos.suites.insert(Suite::new("gamma", at(400))).unwrap();
    assert!(next.parse::<u64>().unwrap() > largest);
}

#[test]
fn test_config_file_written_on_open() {
    let store = TestStore::persistent();
    let dir = store.dir.as_ref().unwrap().path();
    let cfg = StoreConfig::from_file(&dir.join("suitestore.toml")).unwrap();
    assert_eq!(cfg.id_generator, IdStrategy::Sequential);
    assert_eq!(store.repos.database().config(), &cfg);
}

#[test]
fn test_open_same_directory_twice_shares_instance() {
    let store = TestStore::persistent();
    let dir = store.dir.as_ref().unwrap().path();
    let other = Repos::open(dir).unwrap();
    let id = store.repos.suites.insert(Suite::new("shared", at(1))).unwrap();
    assert_eq!(other.suites.find(&id).unwrap().name, "shared");
}
