use std::sync::Mutex;

use anyhow::{Result, bail};
use faction_watch::feed::{CycleOutcome, run_cycle};
use faction_watch::lists::ListSource;
use faction_watch::state::{FieldValue, MemberStatus, PlayerRecord, StatusInfo};
use faction_watch::torn_api::{FactionMembers, FetchStrategy, StatusSource, fetch_statuses};

struct FakeSource {
    members: Vec<MemberStatus>,
    batch_fails: bool,
    failing_ids: Vec<u64>,
    calls: Mutex<Vec<u64>>,
}

impl FakeSource {
    fn new(members: Vec<MemberStatus>) -> Self {
        Self {
            members,
            batch_fails: false,
            failing_ids: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StatusSource for FakeSource {
    fn faction_members(&self, api_key: &str) -> Result<FactionMembers> {
        if self.batch_fails || api_key.is_empty() {
            bail!("faction members request failed");
        }
        Ok(FactionMembers::from(self.members.clone()))
    }

    fn player_status(&self, player_id: u64, _api_key: &str) -> Result<MemberStatus> {
        self.calls.lock().unwrap().push(player_id);
        if self.failing_ids.contains(&player_id) {
            bail!("http 502 Bad Gateway");
        }
        match self.members.iter().find(|m| m.id == player_id) {
            Some(member) => Ok(member.clone()),
            None => bail!("api error 6: Incorrect ID"),
        }
    }
}

fn member(id: u64, status: StatusInfo) -> MemberStatus {
    MemberStatus {
        id,
        name: None,
        level: None,
        status,
    }
}

fn record(id: u64, bsp: f64) -> PlayerRecord {
    let mut record = PlayerRecord::new(id, format!("P{id}"));
    record.bsp_total = FieldValue::number(bsp);
    record
}

fn lists() -> ListSource {
    ListSource::from_lists(vec![
        (
            "main".to_string(),
            vec![record(1, 10.0), record(2, 30.0), record(3, 20.0)],
        ),
        ("empty".to_string(), Vec::new()),
    ])
}

#[test]
fn batched_cycle_merges_and_ranks() {
    let source = FakeSource::new(vec![
        member(1, StatusInfo::Okay),
        member(2, StatusInfo::Hospital { until: 10 }),
        member(99, StatusInfo::Okay),
    ]);
    let report =
        run_cycle(&lists(), "main", "key", &source, FetchStrategy::Batched, None).expect("cycle");
    let CycleOutcome::Rows(rows) = report.outcome else {
        panic!("expected rows");
    };
    let summary: Vec<(u64, StatusInfo)> =
        rows.iter().map(|r| (r.record.id, r.status.clone())).collect();
    assert_eq!(
        summary,
        vec![
            (2, StatusInfo::Hospital { until: 10 }),
            (3, StatusInfo::Unknown),
            (1, StatusInfo::Okay),
        ]
    );
    assert!(source.calls.lock().unwrap().is_empty());
}

#[test]
fn batched_failure_aborts_cycle() {
    let mut source = FakeSource::new(vec![member(1, StatusInfo::Okay)]);
    source.batch_fails = true;
    let err = run_cycle(&lists(), "main", "key", &source, FetchStrategy::Batched, None)
        .expect_err("batched failure should abort");
    assert!(format!("{err:#}").contains("faction members request failed"));
}

#[test]
fn per_player_failure_degrades_only_that_row() {
    let mut source = FakeSource::new(vec![
        member(1, StatusInfo::Okay),
        member(2, StatusInfo::Okay),
        member(3, StatusInfo::Okay),
    ]);
    source.failing_ids = vec![3];
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(2)
        .build()
        .expect("pool");

    let report = run_cycle(
        &lists(),
        "main",
        "key",
        &source,
        FetchStrategy::PerPlayer,
        Some(&pool),
    )
    .expect("per-player cycle should complete");

    assert_eq!(report.statuses.failures.len(), 1);
    assert_eq!(report.statuses.failures[0].0, 3);
    let CycleOutcome::Rows(rows) = report.outcome else {
        panic!("expected rows");
    };
    let ids: Vec<u64> = rows.iter().map(|r| r.record.id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
    assert_eq!(rows[1].status, StatusInfo::Unknown);
    assert!(!rows[1].matched);
    assert_eq!(rows[0].status, StatusInfo::Okay);

    let mut calls = source.calls.lock().unwrap().clone();
    calls.sort_unstable();
    assert_eq!(calls, vec![1, 2, 3]);
}

#[test]
fn per_player_fetches_each_id_once() {
    let source = FakeSource::new(vec![member(5, StatusInfo::Okay)]);
    let fetched = fetch_statuses(&source, FetchStrategy::PerPlayer, &[5, 5, 6], "key", None)
        .expect("per-player fetch never fails as a whole");
    assert_eq!(fetched.members.len(), 1);
    assert_eq!(fetched.failures.len(), 1);
    assert_eq!(fetched.failures[0].0, 6);
    assert_eq!(source.calls.lock().unwrap().len(), 2);
}

#[test]
fn empty_or_missing_list_is_no_data() {
    let source = FakeSource::new(Vec::new());
    for list in ["empty", "does-not-exist"] {
        let report = run_cycle(&lists(), list, "key", &source, FetchStrategy::Batched, None)
            .expect("no data is not an error");
        assert!(matches!(report.outcome, CycleOutcome::NoData));
    }
}

#[test]
fn strategy_names_parse() {
    assert_eq!(FetchStrategy::parse("Batched"), Some(FetchStrategy::Batched));
    assert_eq!(FetchStrategy::parse("per-player"), Some(FetchStrategy::PerPlayer));
    assert_eq!(FetchStrategy::parse("sometimes"), None);
}

struct GappyBatch;

impl StatusSource for GappyBatch {
    fn faction_members(&self, _api_key: &str) -> Result<FactionMembers> {
        Ok(FactionMembers {
            members: vec![member(1, StatusInfo::Okay)],
            skipped: 2,
        })
    }

    fn player_status(&self, player_id: u64, _api_key: &str) -> Result<MemberStatus> {
        bail!("no profile for {player_id}")
    }
}

#[test]
fn batched_cycle_keeps_rows_when_members_are_skipped() {
    let report = run_cycle(&lists(), "main", "key", &GappyBatch, FetchStrategy::Batched, None)
        .expect("cycle");
    assert_eq!(report.statuses.skipped, 2);
    let CycleOutcome::Rows(rows) = report.outcome else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 3);
    assert_eq!(rows.iter().filter(|row| row.matched).count(), 1);
}
