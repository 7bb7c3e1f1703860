use crate::countdown::{OKAY_LABEL, RowStatus};
use crate::format::{field_text, stat_text};
use crate::state::LiveRow;

pub const ATTACK_URL_BASE: &str = "https://www.torn.com/loader2.php?sid=getInAttack&user2ID=";
pub const PROFILE_URL_BASE: &str = "https://www.torn.com/profiles.php?XID=";

pub const TABLE_HEADERS: [&str; 8] = [
    "Player",
    "Level",
    "BSP Total",
    "BSP Date",
    "FF Total",
    "FF Updated",
    "Status",
    "Attack",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackLink {
    pub url: String,
    pub enabled: bool,
}

/// The attack control for a row. Only an `Okay` status enables it.
pub fn attack_link(player_id: u64, status_text: &str) -> AttackLink {
    AttackLink {
        url: format!("{ATTACK_URL_BASE}{player_id}"),
        enabled: status_text == OKAY_LABEL,
    }
}

pub fn profile_url(player_id: u64) -> String {
    format!("{PROFILE_URL_BASE}{player_id}")
}

/// Everything either layout needs for one row, already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: u64,
    pub name: String,
    pub level: String,
    pub primary: String,
    pub primary_date: String,
    pub secondary: String,
    pub secondary_date: String,
    pub status: String,
    pub hospitalized: bool,
    pub attack: AttackLink,
    pub profile_url: String,
    /// Every row after the first draws a separator above itself.
    pub bordered: bool,
}

impl RowView {
    pub fn player_label(&self) -> String {
        format!("{} [{}]", self.name, self.id)
    }

    pub fn attack_label(&self) -> &'static str {
        if self.attack.enabled { "Attack" } else { "-" }
    }
}

pub fn build_view(rows: &[LiveRow]) -> Vec<RowView> {
    rows.iter()
        .enumerate()
        .map(|(index, live)| {
            let record = &live.row.record;
            let status = live.status.text();
            RowView {
                id: record.id,
                name: live.row.name.clone(),
                level: live
                    .row
                    .level
                    .map(|lvl| lvl.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                primary: stat_text(&record.bsp_total),
                primary_date: field_text(&record.bsp_prediction_date),
                secondary: stat_text(&record.ff_bse),
                secondary_date: field_text(&record.ff_updated),
                attack: attack_link(record.id, &status),
                status,
                hospitalized: matches!(live.status, RowStatus::Hospitalized { .. }),
                profile_url: profile_url(record.id),
                bordered: index > 0,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportClass {
    Narrow,
    Wide,
}

pub trait ViewportClassifier {
    fn classify(&self, width: u16) -> ViewportClass;
}

/// Narrow at or below `max_narrow_cols` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub max_narrow_cols: u16,
}

impl ViewportClassifier for Breakpoint {
    fn classify(&self, width: u16) -> ViewportClass {
        if width <= self.max_narrow_cols {
            ViewportClass::Narrow
        } else {
            ViewportClass::Wide
        }
    }
}

pub fn card_lines(view: &RowView) -> Vec<String> {
    vec![
        view.player_label(),
        format!("Level: {}", view.level),
        format!("BSP Total: {}", view.primary),
        format!("FF Total: {}", view.secondary),
        format!("Status: {}", view.status),
        if view.attack.enabled {
            format!("Attack: {}", view.attack.url)
        } else {
            "Attack: unavailable".to_string()
        },
    ]
}

pub fn table_cells(view: &RowView) -> [String; 8] {
    [
        view.player_label(),
        view.level.clone(),
        view.primary.clone(),
        view.primary_date.clone(),
        view.secondary.clone(),
        view.secondary_date.clone(),
        view.status.clone(),
        view.attack_label().to_string(),
    ]
}
