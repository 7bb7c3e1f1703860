use std::time::{Duration, Instant};

use crate::state::StatusInfo;

pub const OKAY_LABEL: &str = "Okay";
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Per-row display state. The hospital countdown is kept as a number and
/// only ever rendered into text, never read back from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    Hospitalized { remaining_secs: i64 },
    Okay,
    Label(String),
}

impl RowStatus {
    pub fn from_status(status: &StatusInfo, now_unix: i64) -> Self {
        match status {
            StatusInfo::Okay => RowStatus::Okay,
            StatusInfo::Hospital { until } => RowStatus::Hospitalized {
                remaining_secs: (until - now_unix).max(0),
            },
            StatusInfo::Abroad { description } => label_or(description, "Abroad"),
            StatusInfo::Traveling { description } => label_or(description, "Traveling"),
            StatusInfo::Other { label } => label_or(label, UNKNOWN_LABEL),
            StatusInfo::Unknown => RowStatus::Label(UNKNOWN_LABEL.to_string()),
        }
    }

    pub fn text(&self) -> String {
        match self {
            RowStatus::Hospitalized { remaining_secs } => hospital_text(*remaining_secs),
            RowStatus::Okay => OKAY_LABEL.to_string(),
            RowStatus::Label(label) => label.clone(),
        }
    }

    pub fn is_okay(&self) -> bool {
        matches!(self, RowStatus::Okay)
    }

    /// One second of local countdown. Returns true when this tick released
    /// the row from hospital. Anything other than a hospital countdown is
    /// left alone.
    pub fn tick(&mut self) -> bool {
        let RowStatus::Hospitalized { remaining_secs } = self else {
            return false;
        };
        let next = *remaining_secs - 1;
        if next <= 0 {
            *self = RowStatus::Okay;
            true
        } else {
            *remaining_secs = next;
            false
        }
    }
}

fn label_or(text: &str, fallback: &str) -> RowStatus {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        RowStatus::Label(fallback.to_string())
    } else if trimmed == OKAY_LABEL {
        RowStatus::Okay
    } else {
        RowStatus::Label(trimmed.to_string())
    }
}

pub fn hospital_text(remaining_secs: i64) -> String {
    let secs = remaining_secs.max(0);
    format!("Hospitalized ({}m {}s)", secs / 60, secs % 60)
}

/// A 1 Hz ticker driven by the UI loop. Each call to `due_ticks` reports
/// how many whole seconds passed since the last reported tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    last: Instant,
}

impl Ticker {
    const PERIOD: Duration = Duration::from_secs(1);

    pub fn new(now: Instant) -> Self {
        Self { last: now }
    }

    pub fn due_ticks(&mut self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.last);
        let due = u32::try_from(elapsed.as_secs() / Self::PERIOD.as_secs()).unwrap_or(u32::MAX);
        if due > 0 {
            self.last += Self::PERIOD * due;
        }
        due
    }
}
