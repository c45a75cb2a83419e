//! The allocation engine — the façade a presentation layer drives.
//!
//! One engine instance runs one level: it owns the pool and the registry,
//! applies player commands under validation, rebuilds the wait graph after
//! every mutation, and classifies the result. Hosts that want several
//! levels at once create several engines; nothing here is ambient or
//! static.

use serde::{Deserialize, Serialize};

use crate::detector::{self, SystemClassification, Verdict};
use crate::level::{validate_config, ConfigError, LevelConfig};
use crate::process::{AllocateOutcome, Process, ProcessId, ProcessRegistry, ProcessStatus};
use crate::resources::{PoolSnapshot, ResourceKind, ResourcePool, ResourceVec};
use crate::wait_graph::WaitGraph;

/// Rejection of a submitted command.
///
/// Every variant is an expected gameplay outcome returned to the caller;
/// none of them aborts the level or mutates any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    /// The level has already been won or lost.
    LevelOver,
    /// No such process — a stale id from the calling layer.
    UnknownProcess(ProcessId),
    /// The grant would push the process past its declared demand.
    OverAllocation { process: ProcessId, kind: ResourceKind },
    /// The pool has fewer free units than requested.
    InsufficientResource {
        kind: ResourceKind,
        requested: u32,
        available: u32,
    },
}

/// Why a level was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    /// The detector found a wait cycle.
    Deadlock,
    /// The move budget ran out with processes still pending.
    OutOfMoves,
}

/// Level lifecycle state. `Won` and `Lost` are terminal; only `reset`
/// leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Running,
    Won,
    Lost { reason: LossReason },
}

/// Entry in the engine's event log, in the order things happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Allocated {
        process: ProcessId,
        kind: ResourceKind,
        units: u32,
    },
    ProcessFinished {
        process: ProcessId,
    },
    DeadlockDetected {
        cycle: Vec<ProcessId>,
    },
    LevelWon,
    LevelLost {
        reason: LossReason,
    },
}

/// Per-process line in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessReport {
    pub id: ProcessId,
    pub name: String,
    pub status: ProcessStatus,
    pub demand: ResourceVec,
    pub held: ResourceVec,
}

/// Snapshot returned after every command and by `current_state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    pub engine_state: EngineState,
    pub classification: SystemClassification,
    /// All processes, ascending id.
    pub processes: Vec<ProcessReport>,
    pub pool: PoolSnapshot,
    /// Members of the detected wait cycle, present only after a deadlock.
    pub cycle: Option<Vec<ProcessId>>,
    pub moves_used: u32,
    pub move_limit: Option<u32>,
}

/// The allocation engine.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    config: LevelConfig,
    pool: ResourcePool,
    registry: ProcessRegistry,
    state: EngineState,
    classification: SystemClassification,
    cycle: Option<Vec<ProcessId>>,
    moves_used: u32,
    events: Vec<GameEvent>,
}

impl AllocationEngine {
    /// Create an engine running `config`.
    ///
    /// Refuses a config that fails validation, returning every problem
    /// found.
    pub fn new(config: LevelConfig) -> Result<Self, Vec<ConfigError>> {
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(errors);
        }
        let mut engine = Self {
            pool: ResourcePool::new(config.resources),
            registry: ProcessRegistry::default(),
            state: EngineState::Running,
            classification: SystemClassification::Safe,
            cycle: None,
            moves_used: 0,
            events: Vec::new(),
            config,
        };
        engine.load_config();
        Ok(engine)
    }

    /// Replace the running level with a fresh one built from `config`.
    pub fn start_level(&mut self, config: LevelConfig) -> Result<(), Vec<ConfigError>> {
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(errors);
        }
        self.config = config;
        self.load_config();
        Ok(())
    }

    /// Return to `Running` with the same level config reapplied.
    pub fn reset(&mut self) {
        self.load_config();
    }

    fn load_config(&mut self) {
        self.pool = ResourcePool::new(self.config.resources);
        self.registry = ProcessRegistry::from_processes(
            self.config
                .processes
                .iter()
                .map(|spec| Process::new(spec.id, spec.name.clone(), spec.demand)),
        );
        self.state = EngineState::Running;
        self.classification = SystemClassification::Safe;
        self.cycle = None;
        self.moves_used = 0;
        self.events.clear();
        log::debug!("level \"{}\" started", self.config.name);
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Events so far, oldest first. Cleared by `reset`.
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Apply a player allocation: grant `units` of `kind` to process `id`.
    ///
    /// Validation order: level liveness, then registry legality, then pool
    /// capacity. A rejected command changes nothing. On success the wait
    /// graph is rebuilt and the level re-classified before the report is
    /// returned.
    pub fn submit_allocation(
        &mut self,
        id: ProcessId,
        kind: ResourceKind,
        units: u32,
    ) -> Result<AllocationReport, AllocationError> {
        if self.state != EngineState::Running {
            return Err(AllocationError::LevelOver);
        }

        // Registry legality first, without mutating, so a rejected grant
        // never moves units.
        match self.registry.get(id) {
            Ok(process) => process.check_grant(kind, units)?,
            Err(err) => {
                log::warn!("allocation for unknown process {id}");
                return Err(err);
            }
        }

        let available = self.pool.available(kind);
        if !self.pool.try_reserve(kind, units) {
            return Err(AllocationError::InsufficientResource {
                kind,
                requested: units,
                available,
            });
        }

        let outcome = self.registry.allocate(id, kind, units)?;
        self.moves_used += 1;
        log::debug!("granted {units} {} to {id}", kind.name());
        self.events.push(GameEvent::Allocated {
            process: id,
            kind,
            units,
        });

        if outcome == AllocateOutcome::Satisfied {
            let released = self.registry.finish(id);
            for (kind, units) in released.nonzero() {
                self.pool.release(kind, units);
            }
            log::debug!("process {id} finished");
            self.events.push(GameEvent::ProcessFinished { process: id });
        }

        self.reevaluate();
        debug_assert!(self.conservation_holds(), "resource conservation violated");
        Ok(self.report())
    }

    /// Read-only snapshot for rendering; mutates nothing.
    pub fn current_state(&self) -> AllocationReport {
        self.report()
    }

    /// Rebuild the wait graph, run the detector, and settle the level
    /// state.
    fn reevaluate(&mut self) {
        let graph = WaitGraph::rebuild(&self.pool, &self.registry);
        let verdict = detector::evaluate(&graph);
        self.classification = detector::classify(&graph, &verdict);

        match verdict {
            Verdict::Deadlocked { cycle } => {
                self.registry.mark_stuck(&cycle);
                log::info!("deadlock: cycle of {} processes", cycle.len());
                self.events.push(GameEvent::DeadlockDetected {
                    cycle: cycle.clone(),
                });
                self.cycle = Some(cycle);
                self.state = EngineState::Lost {
                    reason: LossReason::Deadlock,
                };
                self.events.push(GameEvent::LevelLost {
                    reason: LossReason::Deadlock,
                });
            }
            Verdict::Safe => {
                if self.registry.all_complete() {
                    self.state = EngineState::Won;
                    log::info!("level won in {} moves", self.moves_used);
                    self.events.push(GameEvent::LevelWon);
                } else if self
                    .config
                    .move_limit
                    .is_some_and(|limit| self.moves_used >= limit)
                {
                    self.state = EngineState::Lost {
                        reason: LossReason::OutOfMoves,
                    };
                    log::info!("move budget exhausted");
                    self.events.push(GameEvent::LevelLost {
                        reason: LossReason::OutOfMoves,
                    });
                }
            }
        }
    }

    fn report(&self) -> AllocationReport {
        AllocationReport {
            engine_state: self.state,
            classification: self.classification,
            processes: self
                .registry
                .processes()
                .map(|p| ProcessReport {
                    id: p.id,
                    name: p.name.clone(),
                    status: p.status,
                    demand: p.demand,
                    held: p.held,
                })
                .collect(),
            pool: self.pool.snapshot(),
            cycle: self.cycle.clone(),
            moves_used: self.moves_used,
            move_limit: self.config.move_limit,
        }
    }

    /// `available[k] + Σ held[k] == total[k]` for every kind.
    fn conservation_holds(&self) -> bool {
        let held = self.registry.total_held();
        ResourceKind::ALL
            .iter()
            .all(|&k| self.pool.available(k) + held.get(k) == self.pool.total(k))
    }
}
