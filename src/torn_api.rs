use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde_json::Value;

use crate::http_client::{get_text, http_client};
use crate::state::{MemberStatus, StatusInfo, level_from_value, player_id_from_value};

pub const DEFAULT_API_BASE: &str = "https://api.torn.com";
pub const DEFAULT_FACTION_ID: u64 = 33097;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// One faction-members call covering everyone.
    Batched,
    /// One profile call per listed player.
    PerPlayer,
}

impl FetchStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "batched" | "batch" | "faction" => Some(FetchStrategy::Batched),
            "per-player" | "per_player" | "player" | "user" => Some(FetchStrategy::PerPlayer),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FetchStrategy::Batched => "BATCHED",
            FetchStrategy::PerPlayer => "PER-PLAYER",
        }
    }
}

pub trait StatusSource: Sync {
    fn faction_members(&self, api_key: &str) -> Result<FactionMembers>;
    fn player_status(&self, player_id: u64, api_key: &str) -> Result<MemberStatus>;
}

/// Network-backed status source.
#[derive(Debug, Clone)]
pub struct TornApi {
    pub base_url: String,
    pub faction_id: u64,
}

impl Default for TornApi {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            faction_id: DEFAULT_FACTION_ID,
        }
    }
}

impl TornApi {
    pub fn faction_members_url(&self, api_key: &str) -> String {
        format!(
            "{}/v2/faction/{}/members?striptags=true&key={api_key}",
            self.base_url.trim_end_matches('/'),
            self.faction_id
        )
    }

    pub fn player_url(&self, player_id: u64, api_key: &str) -> String {
        format!(
            "{}/user/{player_id}?selections=basic&key={api_key}",
            self.base_url.trim_end_matches('/')
        )
    }
}

impl StatusSource for TornApi {
    fn faction_members(&self, api_key: &str) -> Result<FactionMembers> {
        let client = http_client()?;
        let body = get_text(client, &self.faction_members_url(api_key))
            .context("faction members request failed")?;
        parse_faction_members_json(&body)
    }

    fn player_status(&self, player_id: u64, api_key: &str) -> Result<MemberStatus> {
        let client = http_client()?;
        let body = get_text(client, &self.player_url(player_id, api_key))
            .with_context(|| format!("player {player_id} request failed"))?;
        parse_player_json(&body, player_id)
    }
}

/// A batched members payload. Entries without a usable id are counted in
/// `skipped` and never matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactionMembers {
    pub members: Vec<MemberStatus>,
    pub skipped: usize,
}

impl From<Vec<MemberStatus>> for FactionMembers {
    fn from(members: Vec<MemberStatus>) -> Self {
        Self {
            members,
            skipped: 0,
        }
    }
}

/// Statuses gathered for one cycle. Per-player failures land in
/// `failures` and leave the rest intact.
#[derive(Debug, Clone, Default)]
pub struct FetchedStatuses {
    pub members: Vec<MemberStatus>,
    pub failures: Vec<(u64, String)>,
    pub skipped: usize,
}

pub fn fetch_statuses(
    source: &dyn StatusSource,
    strategy: FetchStrategy,
    player_ids: &[u64],
    api_key: &str,
    pool: Option<&rayon::ThreadPool>,
) -> Result<FetchedStatuses> {
    match strategy {
        FetchStrategy::Batched => {
            let batch = source.faction_members(api_key)?;
            Ok(FetchedStatuses {
                members: batch.members,
                failures: Vec::new(),
                skipped: batch.skipped,
            })
        }
        FetchStrategy::PerPlayer => {
            let mut seen = HashSet::with_capacity(player_ids.len());
            let ids: Vec<u64> = player_ids
                .iter()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect();

            let run = || {
                ids.par_iter()
                    .map(|id| (*id, source.player_status(*id, api_key)))
                    .collect::<Vec<_>>()
            };
            let results = match pool {
                Some(pool) => pool.install(run),
                None => run(),
            };

            let mut fetched = FetchedStatuses::default();
            for (id, result) in results {
                match result {
                    Ok(member) => fetched.members.push(member),
                    Err(err) => fetched.failures.push((id, format!("{err:#}"))),
                }
            }
            Ok(fetched)
        }
    }
}

/// Parse a faction members payload. Accepts the v2 array form and the v1
/// object form keyed by player id. Entries without a usable id are skipped.
pub fn parse_faction_members_json(raw: &str) -> Result<FactionMembers> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid faction members json")?;
    check_api_error(&root)?;

    let parsed: Vec<Option<MemberStatus>> = match root.get("members") {
        Some(Value::Array(items)) => items.iter().map(|item| parse_member(item, None)).collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, item)| parse_member(item, key.trim().parse::<u64>().ok()))
            .collect(),
        Some(Value::Null) | None => bail!("faction members payload has no members"),
        Some(_) => bail!("faction members payload has malformed members"),
    };

    let total = parsed.len();
    let members: Vec<MemberStatus> = parsed.into_iter().flatten().collect();
    Ok(FactionMembers {
        skipped: total - members.len(),
        members,
    })
}

/// Parse a single player profile payload (`user?selections=basic`, or the
/// v2 shape nesting everything under `profile`).
pub fn parse_player_json(raw: &str, requested_id: u64) -> Result<MemberStatus> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid player json")?;
    check_api_error(&root)?;
    let profile = root.get("profile").unwrap_or(&root);
    if !profile.is_object() {
        bail!("player payload is not an object");
    }
    let member = parse_member(profile, Some(requested_id)).context("player without id")?;
    if member.id != requested_id {
        bail!("asked for player {requested_id}, got {}", member.id);
    }
    Ok(member)
}

fn parse_member(item: &Value, fallback_id: Option<u64>) -> Option<MemberStatus> {
    if !item.is_object() {
        return None;
    }
    let id = ["id", "player_id"]
        .iter()
        .find_map(|key| item.get(*key).and_then(player_id_from_value))
        .or(fallback_id)?;

    let status = match item.get("status") {
        Some(status) if status.is_object() => {
            let state = status.get("state").and_then(Value::as_str).unwrap_or("");
            let description = status.get("description").and_then(Value::as_str);
            let until = status.get("until").and_then(Value::as_i64);
            StatusInfo::from_parts(state, description, until)
        }
        _ => StatusInfo::Unknown,
    };

    Some(MemberStatus {
        id,
        name: item
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        level: item.get("level").and_then(level_from_value),
        status,
    })
}

fn check_api_error(root: &Value) -> Result<()> {
    if !root.is_object() {
        bail!("unexpected payload shape");
    }
    if let Some(err) = root.get("error") {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or(-1);
        let message = err
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        bail!("api error {code}: {message}");
    }
    Ok(())
}
