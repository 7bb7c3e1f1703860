use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use faction_watch::countdown::RowStatus;
use faction_watch::format::{abbreviate, group_thousands};
use faction_watch::rank::merge_and_rank;
use faction_watch::state::{FieldValue, LiveRow, MemberStatus, PlayerRecord, StatusInfo};
use faction_watch::torn_api::parse_faction_members_json;
use faction_watch::view::build_view;

fn sample_records(count: u64) -> Vec<PlayerRecord> {
    (0..count)
        .map(|id| {
            let mut record = PlayerRecord::new(id, format!("Player{id}"));
            record.lvl = Some((id % 100) as u32);
            record.bsp_total = FieldValue::number(((id * 7919) % 1_000_000_007) as f64);
            record.ff_bse = if id % 3 == 0 {
                FieldValue::text(((id * 31) % 50_000).to_string())
            } else {
                FieldValue::default()
            };
            record
        })
        .collect()
}

fn sample_members(count: u64) -> Vec<MemberStatus> {
    (0..count)
        .filter(|id| id % 4 != 0)
        .map(|id| MemberStatus {
            id,
            name: None,
            level: Some(50),
            status: if id % 2 == 0 {
                StatusInfo::Hospital { until: 1_000 + id as i64 }
            } else {
                StatusInfo::Okay
            },
        })
        .collect()
}

fn members_json(count: u64) -> String {
    let items: Vec<String> = (0..count)
        .map(|id| {
            format!(
                r#"{{"id":{id},"name":"P{id}","level":10,"status":{{"description":"Okay","state":"Okay","until":null}}}}"#
            )
        })
        .collect();
    format!(r#"{{"members":[{}]}}"#, items.join(","))
}

fn bench_merge_and_rank(c: &mut Criterion) {
    let records = sample_records(500);
    let members = sample_members(500);
    c.bench_function("merge_and_rank_500", |b| {
        b.iter(|| {
            let rows = merge_and_rank(black_box(&records), black_box(&members));
            black_box(rows.len());
        })
    });
}

fn bench_build_view(c: &mut Criterion) {
    let rows: Vec<LiveRow> = merge_and_rank(&sample_records(500), &sample_members(500))
        .into_iter()
        .map(|row| {
            let status = RowStatus::from_status(&row.status, 1_000);
            LiveRow { row, status }
        })
        .collect();
    c.bench_function("build_view_500", |b| {
        b.iter(|| {
            let views = build_view(black_box(&rows));
            black_box(views.len());
        })
    });
}

fn bench_members_parse(c: &mut Criterion) {
    let raw = members_json(100);
    c.bench_function("faction_members_parse_100", |b| {
        b.iter(|| {
            let members = parse_faction_members_json(black_box(&raw)).unwrap();
            black_box(members.members.len());
        })
    });
}

fn bench_number_format(c: &mut Criterion) {
    c.bench_function("format_stats", |b| {
        b.iter(|| {
            for value in [0.0, 999.0, 1_000.0, 5_000_000.0, 2.5e9, 3.2e12] {
                black_box(group_thousands(black_box(value)));
                black_box(abbreviate(black_box(value)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_merge_and_rank,
    bench_build_view,
    bench_members_parse,
    bench_number_format
);
criterion_main!(benches);
