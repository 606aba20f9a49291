//! End-to-end workflow
//!
//! A client reports a suite run: the suite starts, cases run and log,
//! attachments are uploaded, the suite finishes. A watcher follows the change
//! stream and the UI pages through the results.

use crate::common::*;

#[test]
fn test_suite_run_reported_end_to_end() {
    let store = TestStore::ephemeral();
    let repos = &store.repos;
    let stream = repos.changes();

    let suite_id = repos
        .suites
        .insert(Suite::new("nightly", at(1_000)).with_tags(["ci", "linux"]).with_planned_cases(3))
        .unwrap();
    repos.suites.save_status(&suite_id, SuiteStatus::Running).unwrap();

    let mut case_ids = Vec::new();
    for (idx, outcome) in [CaseStatus::Passed, CaseStatus::Failed, CaseStatus::Skipped]
        .into_iter()
        .enumerate()
    {
        let case_id = repos
            .cases
            .insert(
                Case::new(suite_id.as_str(), format!("case-{}", idx), at(1_000 + idx as i64))
                    .with_idx(idx as i64)
                    .with_arg("browser", "firefox"),
            )
            .unwrap();
        repos.cases.start(&case_id, at(1_100)).unwrap();
        repos
            .logs
            .insert(
                LogLine::new(case_id.as_str(), 0, "assertion failed", at(1_150))
                    .with_level(if outcome == CaseStatus::Failed { LogLevel::Error } else { LogLevel::Info }),
            )
            .unwrap();
        repos.cases.finish(&case_id, outcome, at(1_200)).unwrap();
        case_ids.push(case_id);
    }

    repos
        .attach_to_case(Attachment::new(
            AttachmentOwner::Case(case_ids[1].clone()),
            "failure.png",
            "image/png",
            512,
            at(1_210),
        ))
        .unwrap();
    repos
        .attachments
        .insert(Attachment::new(
            AttachmentOwner::Suite(suite_id.clone()),
            "report.html",
            "text/html",
            4_096,
            at(1_300),
        ))
        .unwrap();
    repos
        .suites
        .finish(&suite_id, SuiteResult::Failed, at(1_400))
        .unwrap();

    // UI view
    let page = repos.suites.page(None, 10, false).unwrap();
    assert_eq!(page.suites.len(), 1);
    assert_eq!(page.suites[0].status, SuiteStatus::Finished);
    assert_eq!(page.suites[0].result, SuiteResult::Failed);
    assert_eq!(page.suites[0].entity.version, 2);
    assert_eq!(page.running_count, 0);
    assert_eq!(page.finished_count, 1);

    let cases = repos.cases.find_by_suite(&suite_id, false).unwrap();
    assert_eq!(cases.len(), 3);
    assert!(cases.iter().all(|c| c.status.is_finished()));
    let case_agg = repos.cases.aggregate().unwrap();
    assert_eq!(case_agg.finished_count, 3);
    assert_eq!(case_agg.running_count, 0);

    assert_eq!(repos.logs.aggregate().unwrap().error_count, 1);
    assert_eq!(repos.cases.find(&case_ids[1]).unwrap().attachments.len(), 1);
    assert_eq!(
        repos
            .attachments
            .find_by_owner(&AttachmentOwner::Suite(suite_id.clone()), false)
            .unwrap()[0]
            .filename,
        "report.html"
    );
    assert_eq!(repos.attachments.aggregate().unwrap().total_size, 4_608);

    // Watcher view: one event per committed mutation, in order
    let events = stream.drain();
    // suite insert + status, 3 x (case insert, start, log, finish),
    // attachment + case link, suite attachment, suite finish
    assert_eq!(events.len(), 2 + 3 * 4 + 2 + 1 + 1);
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    let last: Suite = events.last().unwrap().decode().unwrap();
    assert_eq!(last.status, SuiteStatus::Finished);

    // Cleanup
    assert_eq!(repos.logs.delete_all(at(2_000)).unwrap(), 3);
    assert_eq!(repos.logs.aggregate().unwrap().total_count, 0);
    assert_eq!(repos.logs.find_all(true).unwrap().len(), 3);
}
