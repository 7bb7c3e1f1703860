use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::http_client::{get_text, http_client};
use crate::state::PlayerRecord;

/// Named player lists from the list document, in document order.
/// Records that cannot be read are dropped with a warning; the rest of
/// their list and every other list still load.
#[derive(Debug, Clone, Default)]
pub struct ListSource {
    names: Vec<String>,
    lists: HashMap<String, Vec<PlayerRecord>>,
    warnings: Vec<String>,
}

impl ListSource {
    /// Read the document from a local path or an `http(s)://` URL.
    pub fn load(location: &str) -> Result<Self> {
        let location = location.trim();
        let raw = if is_url(location) {
            let client = http_client()?;
            get_text(client, location).with_context(|| format!("fetch list source {location}"))?
        } else {
            fs::read_to_string(location).with_context(|| format!("read list source {location}"))?
        };
        Self::parse(&raw).with_context(|| format!("parse list source {location}"))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let root: Map<String, Value> =
            serde_json::from_str(raw.trim()).context("list document must be a json object")?;

        let mut names = Vec::with_capacity(root.len());
        let mut lists = HashMap::with_capacity(root.len());
        let mut warnings = Vec::new();
        for (name, value) in root {
            let records = match value {
                Value::Null => Vec::new(),
                Value::Array(items) => parse_records(&name, items, &mut warnings),
                _ => {
                    warnings.push(format!("list {name} is not an array"));
                    Vec::new()
                }
            };
            names.push(name.clone());
            lists.insert(name, records);
        }
        Ok(Self {
            names,
            lists,
            warnings,
        })
    }

    pub fn from_lists(entries: Vec<(String, Vec<PlayerRecord>)>) -> Self {
        let mut source = Self::default();
        for (name, records) in entries {
            if source.lists.insert(name.clone(), records).is_none() {
                source.names.push(name);
            }
        }
        source
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn records(&self, name: &str) -> Option<&[PlayerRecord]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

fn parse_records(list: &str, items: Vec<Value>, warnings: &mut Vec<String>) -> Vec<PlayerRecord> {
    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<PlayerRecord>(item) {
            Ok(record) => records.push(record),
            Err(err) => warnings.push(format!("list {list}: skipped record {idx}: {err}")),
        }
    }
    records
}

fn is_url(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
