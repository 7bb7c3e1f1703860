use std::cmp::Ordering;
use std::collections::HashMap;

use crate::state::{MemberStatus, PlayerRecord, StatusInfo};

/// A list record joined with its freshly fetched status.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub record: PlayerRecord,
    pub name: String,
    pub level: Option<u32>,
    pub status: StatusInfo,
    /// False when no fetched status matched the record.
    pub matched: bool,
}

impl MergedRow {
    pub fn primary_stat(&self) -> f64 {
        self.record.bsp_total.numeric()
    }

    pub fn secondary_stat(&self) -> f64 {
        self.record.ff_bse.numeric()
    }
}

/// Join records with fetched statuses on numeric id. Records with no match
/// keep their local name and level and get `StatusInfo::Unknown`. Order of
/// `records` is preserved.
pub fn merge_rows(records: &[PlayerRecord], members: &[MemberStatus]) -> Vec<MergedRow> {
    let mut by_id: HashMap<u64, &MemberStatus> = HashMap::with_capacity(members.len());
    for member in members {
        by_id.entry(member.id).or_insert(member);
    }

    records
        .iter()
        .map(|record| match by_id.get(&record.id) {
            Some(member) => MergedRow {
                record: record.clone(),
                name: member
                    .name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| record.name.clone()),
                level: member.level.or(record.lvl),
                status: member.status.clone(),
                matched: true,
            },
            None => MergedRow {
                record: record.clone(),
                name: record.name.clone(),
                level: record.lvl,
                status: StatusInfo::Unknown,
                matched: false,
            },
        })
        .collect()
}

/// Descending by primary stat, ties by descending secondary stat. The sort
/// is stable so exact ties keep list order.
pub fn rank_rows(rows: &mut [MergedRow]) {
    rows.sort_by(compare_rows);
}

pub fn compare_rows(a: &MergedRow, b: &MergedRow) -> Ordering {
    b.primary_stat()
        .partial_cmp(&a.primary_stat())
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.secondary_stat()
                .partial_cmp(&a.secondary_stat())
                .unwrap_or(Ordering::Equal)
        })
}

pub fn merge_and_rank(records: &[PlayerRecord], members: &[MemberStatus]) -> Vec<MergedRow> {
    let mut rows = merge_rows(records, members);
    rank_rows(&mut rows);
    rows
}
