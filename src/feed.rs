use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::lists::ListSource;
use crate::rank::{MergedRow, merge_and_rank};
use crate::state::{Delta, ProviderCommand};
use crate::torn_api::{FetchStrategy, FetchedStatuses, StatusSource, TornApi, fetch_statuses};

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub lists_source: String,
    pub strategy: FetchStrategy,
    pub fetch_parallelism: usize,
    pub verbose: bool,
}

impl From<&AppConfig> for FeedConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            lists_source: cfg.lists_source.clone(),
            strategy: cfg.strategy,
            fetch_parallelism: cfg.fetch_parallelism,
            verbose: cfg.verbose,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Rows(Vec<MergedRow>),
    NoData,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub statuses: FetchedStatuses,
}

pub fn spawn_provider(
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    cfg: FeedConfig,
    api: TornApi,
) {
    thread::spawn(move || {
        let pool = build_fetch_pool(cfg.fetch_parallelism);
        let mut lists: Option<ListSource> = None;

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::LoadLists => match ListSource::load(&cfg.lists_source) {
                    Ok(source) => {
                        send_list_warnings(&tx, &source);
                        let _ = tx.send(Delta::SetListNames(source.names().to_vec()));
                        lists = Some(source);
                    }
                    Err(err) => {
                        let _ = tx.send(Delta::Log(format!("[WARN] List load error: {err:#}")));
                    }
                },
                ProviderCommand::FetchList {
                    cycle,
                    list,
                    api_key,
                } => {
                    if lists.is_none() {
                        match ListSource::load(&cfg.lists_source) {
                            Ok(source) => {
                                send_list_warnings(&tx, &source);
                                lists = Some(source);
                            }
                            Err(err) => {
                                let _ = tx.send(Delta::FetchFailed {
                                    cycle,
                                    message: format!("{err:#}"),
                                });
                                continue;
                            }
                        }
                    }
                    let Some(source) = lists.as_ref() else {
                        continue;
                    };

                    let report =
                        run_cycle(source, &list, &api_key, &api, cfg.strategy, pool.as_ref());
                    send_report(&tx, cycle, list, report, cfg.verbose);
                }
            }
        }
    });
}

/// One fetch cycle: pick the list, fetch statuses, merge and rank.
/// Per-player failures are carried in the report; anything else is an
/// error for the whole cycle.
pub fn run_cycle(
    lists: &ListSource,
    list: &str,
    api_key: &str,
    source: &dyn StatusSource,
    strategy: FetchStrategy,
    pool: Option<&rayon::ThreadPool>,
) -> Result<CycleReport> {
    let records = lists.records(list).unwrap_or_default();
    if records.is_empty() {
        return Ok(CycleReport {
            outcome: CycleOutcome::NoData,
            statuses: FetchedStatuses::default(),
        });
    }

    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    let statuses = fetch_statuses(source, strategy, &ids, api_key, pool)
        .with_context(|| format!("status fetch for {list}"))?;
    let rows = merge_and_rank(records, &statuses.members);
    Ok(CycleReport {
        outcome: CycleOutcome::Rows(rows),
        statuses,
    })
}

fn send_list_warnings(tx: &Sender<Delta>, source: &ListSource) {
    for warning in source.warnings() {
        let _ = tx.send(Delta::Log(format!("[WARN] {warning}")));
    }
}

fn send_report(
    tx: &Sender<Delta>,
    cycle: u64,
    list: String,
    report: Result<CycleReport>,
    verbose: bool,
) {
    let report = match report {
        Ok(report) => report,
        Err(err) => {
            let _ = tx.send(Delta::FetchFailed {
                cycle,
                message: format!("{err:#}"),
            });
            return;
        }
    };

    if report.statuses.skipped > 0 {
        let _ = tx.send(Delta::Log(format!(
            "[WARN] Skipped {} faction members without an id",
            report.statuses.skipped
        )));
    }
    for (id, err) in &report.statuses.failures {
        let _ = tx.send(Delta::Log(format!("[WARN] Player {id} status failed: {err}")));
    }
    if verbose {
        for member in &report.statuses.members {
            let _ = tx.send(Delta::Log(format!(
                "[DEBUG] Fetched {}: {:?}",
                member.id, member.status
            )));
        }
    }

    match report.outcome {
        CycleOutcome::NoData => {
            let _ = tx.send(Delta::NoData { cycle, list });
        }
        CycleOutcome::Rows(rows) => {
            if verbose {
                for row in rows.iter().filter(|row| !row.matched) {
                    let _ = tx.send(Delta::Log(format!(
                        "[DEBUG] No status for {} [{}]",
                        row.name, row.record.id
                    )));
                }
            }
            let _ = tx.send(Delta::SetRows {
                cycle,
                list,
                rows,
                now_unix: chrono::Utc::now().timestamp(),
            });
        }
    }
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}
