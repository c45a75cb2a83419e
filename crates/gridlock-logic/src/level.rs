//! Level definitions — declarative configs, validation, and seeded
//! generation.
//!
//! A `LevelConfig` is plain data: pool totals, the process roster, and an
//! optional move budget. Hosts can hand-author configs (the simtest
//! harness feeds them from JSON) or ask `generate_level` for one. All
//! generator choice is hash-mixing on an explicit seed, so the same
//! (difficulty, seed) pair always yields the same level.

use serde::{Deserialize, Serialize};

use crate::process::ProcessId;
use crate::resources::{ResourceKind, ResourceVec};

/// One process slot in a level definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub id: ProcessId,
    pub name: String,
    pub demand: ResourceVec,
}

/// Declarative description of a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    /// Pool totals per kind.
    pub resources: ResourceVec,
    pub processes: Vec<ProcessSpec>,
    /// Successful allocations allowed before the level is lost.
    /// `None` means unlimited.
    pub move_limit: Option<u32>,
}

/// Level validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Level name empty.
    EmptyLevelName,
    /// No processes defined.
    NoProcesses,
    /// Two processes share an id.
    DuplicateProcessId(ProcessId),
    /// A process demands nothing and would be born complete.
    ZeroDemand(ProcessId),
    /// Demand for a kind exceeds the pool total; the process could never
    /// finish.
    DemandExceedsTotal { process: ProcessId, kind: ResourceKind },
    /// Move budget below the minimum number of grants a perfect player
    /// needs.
    MoveLimitTooSmall { limit: u32, needed: u32 },
}

/// Minimum number of successful grants needed to win: one per nonzero
/// (process, kind) demand entry, assuming each grant hands over the full
/// amount.
pub fn minimum_moves(config: &LevelConfig) -> u32 {
    config
        .processes
        .iter()
        .map(|p| p.demand.nonzero_kinds())
        .sum()
}

/// Validate a level config, returning all errors found.
pub fn validate_config(config: &LevelConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push(ConfigError::EmptyLevelName);
    }
    if config.processes.is_empty() {
        errors.push(ConfigError::NoProcesses);
    }

    let mut seen = std::collections::BTreeSet::new();
    for spec in &config.processes {
        if !seen.insert(spec.id) {
            errors.push(ConfigError::DuplicateProcessId(spec.id));
        }
        if spec.demand.is_zero() {
            errors.push(ConfigError::ZeroDemand(spec.id));
        }
        for (kind, units) in spec.demand.nonzero() {
            if units > config.resources.get(kind) {
                errors.push(ConfigError::DemandExceedsTotal {
                    process: spec.id,
                    kind,
                });
            }
        }
    }

    if let Some(limit) = config.move_limit {
        let needed = minimum_moves(config);
        if limit < needed {
            errors.push(ConfigError::MoveLimitTooSmall { limit, needed });
        }
    }

    errors
}

// ============================================================================
// GENERATION
// ============================================================================

/// Pool totals at the easiest difficulty (CPU, Memory, Disk, Printer).
const BASE_TOTALS: [u32; ResourceKind::COUNT] = [4, 4, 3, 2];

/// Largest process roster a generated level will carry.
const MAX_PROCESSES: u32 = 6;

struct ProcessTemplate {
    name: &'static str,
    demand: [u32; ResourceKind::COUNT],
}

/// Demand profiles of familiar desktop workloads.
const TEMPLATES: [ProcessTemplate; 8] = [
    ProcessTemplate {
        name: "Text Editor",
        demand: [1, 2, 0, 0],
    },
    ProcessTemplate {
        name: "Compiler",
        demand: [2, 1, 1, 0],
    },
    ProcessTemplate {
        name: "Backup",
        demand: [0, 1, 2, 0],
    },
    ProcessTemplate {
        name: "Print Job",
        demand: [0, 1, 0, 1],
    },
    ProcessTemplate {
        name: "Antivirus",
        demand: [1, 1, 1, 0],
    },
    ProcessTemplate {
        name: "Browser",
        demand: [2, 3, 0, 0],
    },
    ProcessTemplate {
        name: "Streaming",
        demand: [2, 2, 1, 0],
    },
    ProcessTemplate {
        name: "Database",
        demand: [1, 2, 2, 0],
    },
];

/// Deterministic mix of seed and salt, uniform-ish over u64.
fn mix(seed: u64, salt: u64) -> u64 {
    let mut h = seed
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(salt.wrapping_mul(0x2545_F491_4F6C_DD1D));
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h
}

/// Generate a level for `difficulty` (1-based), deterministic on
/// (difficulty, seed). The output always passes [`validate_config`].
pub fn generate_level(difficulty: u32, seed: u64) -> LevelConfig {
    let seed = mix(seed, difficulty as u64);

    // Pools tighten as difficulty rises, never below two units.
    let multiplier = (1.2 - difficulty as f32 * 0.1).max(0.7);
    let mut resources = ResourceVec::ZERO;
    for kind in ResourceKind::ALL {
        let base = BASE_TOTALS[kind.index()] as f32;
        resources.set(kind, ((base * multiplier) as u32).max(2));
    }

    // Draw distinct templates by partial shuffle of the index set.
    let count = (2 + difficulty).min(MAX_PROCESSES) as usize;
    let mut order: Vec<usize> = (0..TEMPLATES.len()).collect();
    for slot in 0..count {
        let pick = slot + (mix(seed, slot as u64) as usize) % (order.len() - slot);
        order.swap(slot, pick);
    }

    let mut processes = Vec::with_capacity(count);
    for (slot, &template_idx) in order[..count].iter().enumerate() {
        let template = &TEMPLATES[template_idx];
        let mut demand = ResourceVec::ZERO;
        for kind in ResourceKind::ALL {
            let base = template.demand[kind.index()];
            if base == 0 {
                continue;
            }
            // Above difficulty 2, demanded kinds jitter by one unit either
            // way, floored at one and capped at the pool total.
            let units = if difficulty > 2 {
                let jitter = (mix(seed, (slot * ResourceKind::COUNT + kind.index()) as u64 + 101) % 3) as i64 - 1;
                (base as i64 + jitter).max(1) as u32
            } else {
                base
            };
            demand.set(kind, units.min(resources.get(kind)));
        }
        processes.push(ProcessSpec {
            id: ProcessId(slot as u32 + 1),
            name: template.name.to_string(),
            demand,
        });
    }

    let mut config = LevelConfig {
        name: format!("Level {difficulty}"),
        resources,
        processes,
        move_limit: None,
    };
    // Budget: perfect play plus headroom that shrinks with difficulty.
    let headroom = 10u32.saturating_sub(difficulty).max(2);
    config.move_limit = Some(minimum_moves(&config) + headroom);
    config
}
