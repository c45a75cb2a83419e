//! Processes and the registry that owns them.
//!
//! A process carries a fixed demand vector and a growing holding; the
//! registry is the only writer of either. Iteration is always in ascending
//! id order so every artifact derived from the registry is deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::AllocationError;
use crate::resources::{ResourceKind, ResourceVec};

/// Unique process identifier within a level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Lifecycle tag for a process.
///
/// Plain data; nothing dispatches on it beyond gating which operations
/// are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    /// Still short of its demand for at least one kind.
    Pending,
    /// Demand fully met; holding released, no way back.
    Complete,
    /// Member of a detected wait cycle.
    Stuck,
}

/// One competing process in a level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    /// Display label, e.g. "Compiler".
    pub name: String,
    /// Full requirement before the process can finish. Fixed at creation.
    pub demand: ResourceVec,
    /// Currently allocated units; `held[k] <= demand[k]` for every kind.
    pub held: ResourceVec,
    pub status: ProcessStatus,
}

impl Process {
    pub fn new(id: ProcessId, name: String, demand: ResourceVec) -> Self {
        Self {
            id,
            name,
            demand,
            held: ResourceVec::ZERO,
            status: ProcessStatus::Pending,
        }
    }

    /// Units still needed per kind.
    pub fn outstanding(&self) -> ResourceVec {
        self.demand.saturating_sub(&self.held)
    }

    /// Whether the full demand is met.
    pub fn is_satisfied(&self) -> bool {
        self.held == self.demand
    }

    /// Check that `units` more of `kind` can legally be granted.
    pub fn check_grant(&self, kind: ResourceKind, units: u32) -> Result<(), AllocationError> {
        let fits = self
            .held
            .get(kind)
            .checked_add(units)
            .is_some_and(|held| held <= self.demand.get(kind));
        if self.status != ProcessStatus::Pending || !fits {
            return Err(AllocationError::OverAllocation {
                process: self.id,
                kind,
            });
        }
        Ok(())
    }
}

/// Result of a successful grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocateOutcome {
    /// Demand not yet met; the process stays pending.
    StillPending,
    /// This grant met the full demand; the caller must release the holding.
    Satisfied,
}

/// Owns every process of the running level, keyed by id.
///
/// Completed processes stay in the registry (the presentation layer still
/// shows them); they just stop counting as active holders or waiters.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    processes: BTreeMap<ProcessId, Process>,
}

impl ProcessRegistry {
    pub fn from_processes(processes: impl IntoIterator<Item = Process>) -> Self {
        Self {
            processes: processes.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    /// Look up a process, failing with `UnknownProcess` when absent.
    pub fn get(&self, id: ProcessId) -> Result<&Process, AllocationError> {
        self.processes
            .get(&id)
            .ok_or(AllocationError::UnknownProcess(id))
    }

    /// Grant `units` of `kind` to process `id`.
    ///
    /// The process must still be pending and the grant must fit inside its
    /// remaining demand; violations leave the registry untouched.
    pub fn allocate(
        &mut self,
        id: ProcessId,
        kind: ResourceKind,
        units: u32,
    ) -> Result<AllocateOutcome, AllocationError> {
        self.get(id)?.check_grant(kind, units)?;
        let process = self
            .processes
            .get_mut(&id)
            .expect("process vanished between check and grant");
        process.held.add(kind, units);
        if process.is_satisfied() {
            Ok(AllocateOutcome::Satisfied)
        } else {
            Ok(AllocateOutcome::StillPending)
        }
    }

    /// Outstanding units still needed by `id`, per kind.
    pub fn pending_requests(&self, id: ProcessId) -> Result<ResourceVec, AllocationError> {
        Ok(self.get(id)?.outstanding())
    }

    /// Transition a satisfied process to `Complete` and drain its holding.
    ///
    /// Panics when the process is missing or its demand is not met; the
    /// engine drives completion right after the satisfying grant.
    pub fn finish(&mut self, id: ProcessId) -> ResourceVec {
        let process = self
            .processes
            .get_mut(&id)
            .expect("finishing an unknown process");
        assert!(
            process.is_satisfied(),
            "finishing {} before its demand is met",
            process.id,
        );
        process.status = ProcessStatus::Complete;
        std::mem::take(&mut process.held)
    }

    /// Mark the given processes as members of a wait cycle.
    pub fn mark_stuck(&mut self, ids: &[ProcessId]) {
        for id in ids {
            if let Some(process) = self.processes.get_mut(id) {
                if process.status == ProcessStatus::Pending {
                    process.status = ProcessStatus::Stuck;
                }
            }
        }
    }

    /// Whether every process has completed.
    pub fn all_complete(&self) -> bool {
        self.processes
            .values()
            .all(|p| p.status == ProcessStatus::Complete)
    }

    /// All processes, ascending id.
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// Pending processes only, ascending id.
    pub fn pending(&self) -> impl Iterator<Item = &Process> {
        self.processes
            .values()
            .filter(|p| p.status == ProcessStatus::Pending)
    }

    /// Sum of held units across all processes, per kind.
    pub fn total_held(&self) -> ResourceVec {
        let mut held = ResourceVec::ZERO;
        for process in self.processes.values() {
            for (kind, units) in process.held.nonzero() {
                held.add(kind, units);
            }
        }
        held
    }
}
