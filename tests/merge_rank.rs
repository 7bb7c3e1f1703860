use faction_watch::rank::{merge_and_rank, merge_rows, rank_rows};
use faction_watch::state::{FieldValue, MemberStatus, PlayerRecord, StatusInfo};

fn record(id: u64, name: &str, bsp: FieldValue, ff: FieldValue) -> PlayerRecord {
    let mut record = PlayerRecord::new(id, name);
    record.lvl = Some(10);
    record.bsp_total = bsp;
    record.ff_bse = ff;
    record
}

fn member(id: u64, status: StatusInfo) -> MemberStatus {
    MemberStatus {
        id,
        name: Some(format!("Remote{id}")),
        level: Some(50),
        status,
    }
}

#[test]
fn string_ids_join_numeric_statuses() {
    let records: Vec<PlayerRecord> =
        serde_json::from_str(r#"[{"id": "4821", "name": "Local", "lvl": 3}]"#).expect("records");
    let rows = merge_rows(&records, &[member(4821, StatusInfo::Okay)]);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].matched);
    assert_eq!(rows[0].status, StatusInfo::Okay);
    assert_eq!(rows[0].name, "Remote4821");
    assert_eq!(rows[0].level, Some(50));
}

#[test]
fn unmatched_records_keep_local_fields() {
    let records = vec![record(1, "Local", FieldValue::default(), FieldValue::default())];
    let rows = merge_rows(&records, &[member(2, StatusInfo::Okay)]);
    assert!(!rows[0].matched);
    assert_eq!(rows[0].status, StatusInfo::Unknown);
    assert_eq!(rows[0].name, "Local");
    assert_eq!(rows[0].level, Some(10));
}

#[test]
fn fetched_member_without_name_keeps_local_name() {
    let records = vec![record(1, "Local", FieldValue::default(), FieldValue::default())];
    let fetched = MemberStatus {
        id: 1,
        name: None,
        level: None,
        status: StatusInfo::Okay,
    };
    let rows = merge_rows(&records, &[fetched]);
    assert_eq!(rows[0].name, "Local");
    assert_eq!(rows[0].level, Some(10));
}

#[test]
fn orders_by_primary_then_secondary_descending() {
    let records = vec![
        record(1, "low", FieldValue::number(100.0), FieldValue::number(9e9)),
        record(2, "tie-b", FieldValue::number(500.0), FieldValue::number(10.0)),
        record(3, "top", FieldValue::text("900"), FieldValue::default()),
        record(4, "tie-a", FieldValue::number(500.0), FieldValue::text("20")),
    ];
    let rows = merge_and_rank(&records, &[]);
    let ids: Vec<u64> = rows.iter().map(|r| r.record.id).collect();
    assert_eq!(ids, vec![3, 4, 2, 1]);
}

#[test]
fn non_numeric_stats_sort_as_zero() {
    let records = vec![
        record(1, "junk", FieldValue::text("n/a"), FieldValue::default()),
        record(2, "small", FieldValue::number(1.0), FieldValue::default()),
        record(3, "negative", FieldValue::number(-5.0), FieldValue::default()),
    ];
    let rows = merge_and_rank(&records, &[]);
    let ids: Vec<u64> = rows.iter().map(|r| r.record.id).collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[test]
fn exact_ties_keep_list_order() {
    let mut rows = merge_rows(
        &[
            record(10, "a", FieldValue::number(7.0), FieldValue::number(1.0)),
            record(11, "b", FieldValue::text("7"), FieldValue::text("1")),
            record(12, "c", FieldValue::number(7.0), FieldValue::number(1.0)),
            record(13, "d", FieldValue::default(), FieldValue::default()),
            record(14, "e", FieldValue::text("zero"), FieldValue::default()),
        ],
        &[],
    );
    rank_rows(&mut rows);
    let ids: Vec<u64> = rows.iter().map(|r| r.record.id).collect();
    assert_eq!(ids, vec![10, 11, 12, 13, 14]);
}

#[test]
fn display_values_survive_merge() {
    let records = vec![record(1, "x", FieldValue::text("n/a"), FieldValue::default())];
    let rows = merge_and_rank(&records, &[member(1, StatusInfo::Okay)]);
    assert_eq!(rows[0].record.bsp_total.display().as_deref(), Some("n/a"));
    assert!(rows[0].record.ff_bse.is_absent());
}
