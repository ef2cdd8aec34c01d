use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, unbounded};
use log::{debug, info, warn};

use crate::config::SearchDefinition;
use crate::constants::DEFAULT_UNIT_TIMEOUT_SECS;
use crate::engine::fields::{truncate_rows, Row, RowSet, RowShape};
use crate::engine::matcher::{scan, Flow};
use crate::engine::watchdog::{CancelToken, Watchdog};
use crate::error::UnitError;
use crate::models::{SearchResult, SearchResults, System};

/// How units are scheduled
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Worker threads; 1 runs on the calling thread, 0 uses every CPU
    pub workers: usize,
    /// Wall-clock budget per (definition, system) unit
    pub unit_timeout: Option<Duration>,
    pub cancel: CancelToken,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            unit_timeout: Some(Duration::from_secs(DEFAULT_UNIT_TIMEOUT_SECS)),
            cancel: CancelToken::new(),
        }
    }
}

impl ExecutionOptions {
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }
}

/// A unit that produced no rows because it failed
#[derive(Debug, Clone)]
pub struct UnitFailure {
    pub definition: String,
    pub system: String,
    pub error: UnitError,
}

/// Everything the engine produced for a run
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// One entry per definition, in definition order
    pub results: Vec<SearchResults>,
    pub failures: Vec<UnitFailure>,
    /// Units that ran to completion or failed
    pub units_run: usize,
    pub units_planned: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ExecutionReport {
    pub fn total_rows(&self) -> usize {
        self.results.iter().map(SearchResults::len).sum()
    }
}

/// Rows of a finished unit after post-processing
#[derive(Debug)]
struct UnitRows {
    rows: Vec<Row>,
    /// Distinct rows seen before truncation
    found: usize,
    truncated: bool,
    elapsed: Duration,
}

/// Message from a worker back to the coordinator
#[derive(Debug)]
struct UnitOutcome {
    definition: usize,
    system: usize,
    result: Result<UnitRows, UnitError>,
}

/// Run one definition over every eligible system
pub fn execute(
    definition: &SearchDefinition,
    systems: &[Arc<System>],
    options: &ExecutionOptions,
) -> SearchResults {
    let mut report = execute_all(std::slice::from_ref(definition), systems, options);
    report.results.pop().unwrap_or_else(|| SearchResults::new(&definition.name))
}

/// Run every definition over every eligible system.
///
/// Results come back in definition order, and within a definition in system
/// discovery order, whatever order the units finished in.
pub fn execute_all(
    definitions: &[SearchDefinition],
    systems: &[Arc<System>],
    options: &ExecutionOptions,
) -> ExecutionReport {
    let start = Instant::now();
    let shapes: Vec<RowShape> = definitions.iter().map(RowShape::for_definition).collect();

    let plan: Vec<Vec<usize>> = definitions
        .iter()
        .map(|definition| {
            (0..systems.len())
                .filter(|&s| definition.applies_to(&systems[s]))
                .collect()
        })
        .collect();
    let jobs: Vec<(usize, usize)> = plan
        .iter()
        .enumerate()
        .flat_map(|(d, eligible)| eligible.iter().map(move |&s| (d, s)))
        .collect();

    let workers = options.effective_workers().min(jobs.len().max(1));
    info!(
        "Executing {} unit(s) for {} definition(s) over {} system(s) with {} worker(s)",
        jobs.len(),
        definitions.len(),
        systems.len(),
        workers
    );

    let mut coordinator = Coordinator::new(jobs.len());
    let run_job = |(d, s): (usize, usize)| UnitOutcome {
        definition: d,
        system: s,
        result: run_guarded(&definitions[d], &shapes[d], &systems[s], options),
    };

    if workers <= 1 {
        for job in jobs.iter().copied() {
            if options.cancel.is_cancelled() {
                break;
            }
            coordinator.record(run_job(job), definitions, systems);
        }
    } else {
        let (job_tx, job_rx) = bounded::<(usize, usize)>(workers * 2);
        let (outcome_tx, outcome_rx) = unbounded::<UnitOutcome>();

        let scope_result = crossbeam::scope(|scope| {
            for i in 0..workers {
                let job_rx = job_rx.clone();
                let outcome_tx = outcome_tx.clone();
                let run_job = &run_job;
                scope
                    .builder()
                    .name(format!("search-worker-{}", i))
                    .spawn(move |_| {
                        for job in job_rx.iter() {
                            // Pending jobs are dropped once the run is cancelled
                            if options.cancel.is_cancelled() {
                                continue;
                            }
                            if outcome_tx.send(run_job(job)).is_err() {
                                break;
                            }
                        }
                    })
                    .map(|_| ())
                    .unwrap_or_else(|e| warn!("Failed to spawn search worker {}: {}", i, e));
            }
            drop(outcome_tx);
            drop(job_rx);

            let feeder_jobs = &jobs;
            scope.spawn(move |_| {
                for job in feeder_jobs.iter().copied() {
                    if options.cancel.is_cancelled() || job_tx.send(job).is_err() {
                        break;
                    }
                }
            });

            for outcome in outcome_rx.iter() {
                coordinator.record(outcome, definitions, systems);
            }
        });

        if let Err(e) = scope_result {
            warn!("Search worker pool terminated abnormally: {:?}", e);
        }
    }

    let mut report = coordinator.finish(definitions, systems, &plan);
    report.cancelled |= options.cancel.is_cancelled();
    report.elapsed = start.elapsed();

    if report.cancelled {
        warn!(
            "Execution cancelled after {}/{} unit(s)",
            report.units_run, report.units_planned
        );
    } else {
        info!(
            "Executed {} unit(s) in {:.2?}: {} row(s), {} failure(s)",
            report.units_run,
            report.elapsed,
            report.total_rows(),
            report.failures.len()
        );
    }
    report
}

/// Run a unit under its watchdog, turning a panic into a unit failure
fn run_guarded(
    definition: &SearchDefinition,
    shape: &RowShape,
    system: &System,
    options: &ExecutionOptions,
) -> Result<UnitRows, UnitError> {
    let mut watchdog = Watchdog::new(options.unit_timeout, options.cancel.clone());
    watchdog.check_now()?;

    panic::catch_unwind(AssertUnwindSafe(|| run_unit(definition, shape, system, &mut watchdog)))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(UnitError::Panicked { message })
        })
}

/// Extraction, merge, unique and truncation for one (definition, system)
fn run_unit(
    definition: &SearchDefinition,
    shape: &RowShape,
    system: &System,
    watchdog: &mut Watchdog,
) -> Result<UnitRows, UnitError> {
    let limit = definition.result_limit();
    // One row past the limit proves truncation
    let stop_after = match (definition.flags.full_scan, limit) {
        (false, Some(limit)) => Some(limit.saturating_add(1)),
        _ => None,
    };

    let mut set = RowSet::new(definition.flags.unique);
    scan(definition, &system.content, watchdog, |extracted| {
        set.push(shape.shape(&extracted));
        match stop_after {
            Some(n) if set.len() >= n => Flow::Stop,
            _ => Flow::Continue,
        }
    })?;

    let found = set.len();
    let mut rows = set.into_rows();
    let truncated = truncate_rows(&mut rows, limit);

    Ok(UnitRows {
        rows,
        found,
        truncated,
        elapsed: watchdog.elapsed(),
    })
}

/// Sole owner of the accumulators and of progress output
struct Coordinator {
    planned: usize,
    completed: usize,
    last_decile: usize,
    units: HashMap<(usize, usize), UnitRows>,
    attempted: HashSet<(usize, usize)>,
    failures: Vec<UnitFailure>,
    cancelled: bool,
}

impl Coordinator {
    fn new(planned: usize) -> Self {
        Self {
            planned,
            completed: 0,
            last_decile: 0,
            units: HashMap::new(),
            attempted: HashSet::new(),
            failures: Vec::new(),
            cancelled: false,
        }
    }

    fn record(&mut self, outcome: UnitOutcome, definitions: &[SearchDefinition], systems: &[Arc<System>]) {
        let key = (outcome.definition, outcome.system);
        self.completed += 1;

        match outcome.result {
            Ok(rows) => {
                debug!(
                    "{} on {}: {} row(s){} in {:.2?}",
                    definitions[outcome.definition].name,
                    systems[outcome.system].system_name,
                    rows.rows.len(),
                    if rows.truncated { " (truncated)" } else { "" },
                    rows.elapsed
                );
                self.attempted.insert(key);
                self.units.insert(key, rows);
            }
            Err(error) => {
                let definition = &definitions[outcome.definition].name;
                let system = &systems[outcome.system].system_name;
                if error == UnitError::Cancelled {
                    self.cancelled = true;
                    debug!("{} on {} abandoned: {}", definition, system, error);
                } else {
                    self.attempted.insert(key);
                    warn!("{} on {} failed: {}", definition, system, error);
                }
                self.failures.push(UnitFailure {
                    definition: definition.clone(),
                    system: system.clone(),
                    error,
                });
            }
        }

        if self.planned > 0 {
            let decile = self.completed * 10 / self.planned;
            if decile > self.last_decile {
                self.last_decile = decile;
                info!(
                    "Progress: {}/{} units ({}%)",
                    self.completed,
                    self.planned,
                    decile * 10
                );
            }
        }
    }

    fn finish(
        mut self,
        definitions: &[SearchDefinition],
        systems: &[Arc<System>],
        plan: &[Vec<usize>],
    ) -> ExecutionReport {
        let mut results = Vec::with_capacity(definitions.len());

        for (d, definition) in definitions.iter().enumerate() {
            let mut collected = SearchResults::new(&definition.name);
            for &s in &plan[d] {
                if !self.attempted.contains(&(d, s)) {
                    continue;
                }
                let system = &systems[s];
                collected.evaluated_systems.push(system.discovery_index);

                let Some(unit) = self.units.remove(&(d, s)) else { continue };
                collected.match_counts.insert(system.discovery_index, unit.found);
                if unit.truncated {
                    collected.truncated = true;
                    collected.truncated_systems.push(system.system_name.clone());
                }
                collected.results.extend(unit.rows.into_iter().map(|fields| SearchResult {
                    definition: definition.name.clone(),
                    system: Arc::clone(system),
                    fields,
                }));
            }
            results.push(collected);
        }

        ExecutionReport {
            results,
            failures: self.failures,
            units_run: self.attempted.len(),
            units_planned: self.planned,
            cancelled: self.cancelled,
            elapsed: Duration::ZERO,
        }
    }
}
