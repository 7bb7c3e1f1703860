use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::countdown::{RowStatus, Ticker};
use crate::rank::MergedRow;
use crate::throttle::FetchThrottle;

/// One entry of a named list in the list document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerRecord {
    #[serde(deserialize_with = "deserialize_player_id")]
    pub id: u64,
    #[serde(default, deserialize_with = "deserialize_name")]
    pub name: String,
    #[serde(default, alias = "level", deserialize_with = "deserialize_level")]
    pub lvl: Option<u32>,
    #[serde(default, rename = "BSP_total")]
    pub bsp_total: FieldValue,
    #[serde(default, rename = "BSP_prediction_date")]
    pub bsp_prediction_date: FieldValue,
    #[serde(default, rename = "ff_bse")]
    pub ff_bse: FieldValue,
    #[serde(default, rename = "ff_updated")]
    pub ff_updated: FieldValue,
}

impl PlayerRecord {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            lvl: None,
            bsp_total: FieldValue::default(),
            bsp_prediction_date: FieldValue::default(),
            ff_bse: FieldValue::default(),
            ff_updated: FieldValue::default(),
        }
    }
}

/// A loosely typed field from the list document. The raw value is kept so
/// display can show exactly what was stored (or that nothing was).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FieldValue(pub Option<Value>);

impl FieldValue {
    pub fn number(value: f64) -> Self {
        Self(serde_json::Number::from_f64(value).map(Value::Number))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self(Some(Value::String(value.into())))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.0, None | Some(Value::Null))
    }

    /// Numeric reading used for ordering. Anything absent, non-numeric or
    /// non-finite reads as 0.
    pub fn numeric(&self) -> f64 {
        self.parsed().unwrap_or(0.0)
    }

    /// Numeric reading when the stored value actually is a number (or a
    /// string holding one).
    pub fn parsed(&self) -> Option<f64> {
        let parsed = match self.0.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|v| v.is_finite())
    }

    /// Display text of the raw value, `None` when absent.
    pub fn display(&self) -> Option<String> {
        match self.0.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Player state as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusInfo {
    Okay,
    Hospital { until: i64 },
    Abroad { description: String },
    Traveling { description: String },
    Other { label: String },
    Unknown,
}

impl StatusInfo {
    pub fn from_parts(state: &str, description: Option<&str>, until: Option<i64>) -> Self {
        let description = description.unwrap_or("").trim().to_string();
        match state.trim() {
            "Okay" => StatusInfo::Okay,
            "Hospital" => StatusInfo::Hospital {
                until: until.unwrap_or(0),
            },
            "Abroad" => StatusInfo::Abroad { description },
            "Traveling" => StatusInfo::Traveling { description },
            "" => StatusInfo::Unknown,
            other => StatusInfo::Other {
                label: other.to_string(),
            },
        }
    }
}

/// A freshly fetched player: status plus whatever profile fields came along.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberStatus {
    pub id: u64,
    pub name: Option<String>,
    pub level: Option<u32>,
    pub status: StatusInfo,
}

/// A merged row as it lives on screen. `status` is the canonical countdown
/// state; display text is always derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRow {
    pub row: MergedRow,
    pub status: RowStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    NoData,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    LoadLists,
    FetchList {
        cycle: u64,
        list: String,
        api_key: String,
    },
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetListNames(Vec<String>),
    SetRows {
        cycle: u64,
        list: String,
        rows: Vec<MergedRow>,
        now_unix: i64,
    },
    NoData {
        cycle: u64,
        list: String,
    },
    FetchFailed {
        cycle: u64,
        message: String,
    },
    Log(String),
}

/// Why a fetch request did not go out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchGate {
    Start(ProviderCommand),
    MissingKey,
    NoList,
    Throttled { remaining_secs: u64 },
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub api_key: String,
    pub stats_filter: Option<String>,
    pub preferred_list: Option<String>,
    pub list_names: Vec<String>,
    pub list_selected: usize,
    pub shown_list: Option<String>,
    pub rows: Vec<LiveRow>,
    pub selected: usize,
    pub phase: Phase,
    pub cycle: u64,
    pub fetched_at: Option<String>,
    pub throttle: FetchThrottle,
    pub hospital_ticker: Option<Ticker>,
    pub key_input: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            api_key: String::new(),
            stats_filter: None,
            preferred_list: None,
            list_names: Vec::new(),
            list_selected: 0,
            shown_list: None,
            rows: Vec::with_capacity(64),
            selected: 0,
            phase: Phase::Idle,
            cycle: 0,
            fetched_at: None,
            throttle: FetchThrottle::default(),
            hospital_ticker: None,
            key_input: None,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
        }
    }

    pub fn selected_list(&self) -> Option<&str> {
        self.list_names
            .get(self.list_selected)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn cycle_list_next(&mut self) {
        if self.list_names.is_empty() {
            return;
        }
        self.list_selected = (self.list_selected + 1) % self.list_names.len();
    }

    pub fn cycle_list_prev(&mut self) {
        if self.list_names.is_empty() {
            return;
        }
        if self.list_selected == 0 {
            self.list_selected = self.list_names.len() - 1;
        } else {
            self.list_selected -= 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % self.rows.len();
    }

    pub fn select_prev(&mut self) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }
        if self.selected == 0 {
            self.selected = self.rows.len() - 1;
        } else {
            self.selected -= 1;
        }
    }

    pub fn selected_row(&self) -> Option<&LiveRow> {
        self.rows.get(self.selected)
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Gate a fetch request. On success the cycle counter advances, the
    /// throttle restarts, the hospital ticker is stopped and the screen
    /// switches to the loading state.
    pub fn begin_fetch(&mut self, now: Instant) -> FetchGate {
        let api_key = self.api_key.trim().to_string();
        if api_key.is_empty() {
            return FetchGate::MissingKey;
        }
        let Some(list) = self.selected_list().map(str::to_string) else {
            return FetchGate::NoList;
        };
        if let Some(remaining_secs) = self.throttle.remaining_secs(now) {
            return FetchGate::Throttled { remaining_secs };
        }

        self.cycle += 1;
        self.throttle.start(now);
        self.hospital_ticker = None;
        self.phase = Phase::Loading;
        FetchGate::Start(ProviderCommand::FetchList {
            cycle: self.cycle,
            list,
            api_key,
        })
    }

    /// Advance the local hospital countdown by every whole second elapsed
    /// since the last call. Returns the ids of rows that became available.
    pub fn tick(&mut self, now: Instant) -> Vec<u64> {
        let Some(ticker) = self.hospital_ticker.as_mut() else {
            return Vec::new();
        };
        let due = ticker.due_ticks(now);
        let mut released = Vec::new();
        for _ in 0..due {
            for live in &mut self.rows {
                if live.status.tick() {
                    released.push(live.row.record.id);
                }
            }
        }
        released
    }

    fn clear_rows(&mut self) {
        self.rows.clear();
        self.selected = 0;
        self.hospital_ticker = None;
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetListNames(names) => {
            let current = state.selected_list().map(str::to_string);
            state.list_names = names;
            let wanted = current.or_else(|| state.preferred_list.clone());
            state.list_selected = wanted
                .and_then(|name| state.list_names.iter().position(|n| *n == name))
                .unwrap_or(0);
            state.push_log(format!("[INFO] {} lists available", state.list_names.len()));
        }
        Delta::SetRows {
            cycle,
            list,
            rows,
            now_unix,
        } => {
            if cycle != state.cycle {
                return;
            }
            state.rows = rows
                .into_iter()
                .map(|row| {
                    let status = RowStatus::from_status(&row.status, now_unix);
                    LiveRow { row, status }
                })
                .collect();
            state.selected = 0;
            state.phase = Phase::Loaded;
            state.fetched_at = Some(chrono::Local::now().format("%H:%M:%S").to_string());
            state.push_log(format!("[INFO] {list}: {} players", state.rows.len()));
            state.shown_list = Some(list);
            // Replaces any ticker left from an earlier cycle.
            state.hospital_ticker = Some(Ticker::new(Instant::now()));
        }
        Delta::NoData { cycle, list } => {
            if cycle != state.cycle {
                return;
            }
            state.clear_rows();
            state.phase = Phase::NoData;
            state.push_log(format!("[INFO] {list}: no players in list"));
            state.shown_list = Some(list);
        }
        Delta::FetchFailed { cycle, message } => {
            if cycle != state.cycle {
                return;
            }
            state.clear_rows();
            state.push_log(format!("[WARN] Fetch failed: {message}"));
            state.phase = Phase::Failed(message);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

fn deserialize_player_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    player_id_from_value(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid player id: {raw}")))
}

fn deserialize_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(level_from_value))
}

/// Ids show up as numbers or numeric strings depending on who wrote the
/// document; both normalise to the same integer.
pub fn player_id_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

pub fn level_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}
