//! Integration scenarios for the full allocation engine.
//!
//! Exercises: LevelConfig → AllocationEngine → WaitGraph → detector,
//! all through the public API. No UI, no I/O.

use gridlock_logic::detector::SystemClassification;
use gridlock_logic::engine::{
    AllocationEngine, AllocationError, EngineState, GameEvent, LossReason,
};
use gridlock_logic::level::{generate_level, validate_config, LevelConfig, ProcessSpec};
use gridlock_logic::process::{ProcessId, ProcessStatus};
use gridlock_logic::resources::{ResourceKind, ResourceVec};

// ── Helpers ────────────────────────────────────────────────────────────

fn spec(id: u32, name: &str, demand: [u32; ResourceKind::COUNT]) -> ProcessSpec {
    ProcessSpec {
        id: ProcessId(id),
        name: name.into(),
        demand: ResourceVec::from(demand),
    }
}

/// The classic two-kind standoff: one CPU, one printer, two processes
/// that each need both.
fn standoff() -> LevelConfig {
    LevelConfig {
        name: "standoff".into(),
        resources: ResourceVec::from([1, 0, 0, 1]),
        processes: vec![
            spec(1, "Compiler", [1, 0, 0, 1]),
            spec(2, "Print Job", [1, 0, 0, 1]),
        ],
        move_limit: None,
    }
}

fn conservation_holds(engine: &AllocationEngine) -> bool {
    let report = engine.current_state();
    ResourceKind::ALL.iter().all(|&k| {
        let held: u32 = report.processes.iter().map(|p| p.held.get(k)).sum();
        report.pool.available.get(k) + held == report.pool.total.get(k)
    })
}

// ── Win and loss paths ─────────────────────────────────────────────────

#[test]
fn two_process_cpu_level_is_won() {
    let config = LevelConfig {
        name: "cpu only".into(),
        resources: ResourceVec::from([2, 0, 0, 0]),
        processes: vec![spec(1, "a", [1, 0, 0, 0]), spec(2, "b", [1, 0, 0, 0])],
        move_limit: None,
    };
    let mut engine = AllocationEngine::new(config).unwrap();

    let report = engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    assert_eq!(report.processes[0].status, ProcessStatus::Complete);
    assert_eq!(report.pool.available.get(ResourceKind::Cpu), 2);

    let report = engine
        .submit_allocation(ProcessId(2), ResourceKind::Cpu, 1)
        .unwrap();
    assert_eq!(report.engine_state, EngineState::Won);
}

#[test]
fn crossed_grants_deadlock_and_lock_the_level() {
    let mut engine = AllocationEngine::new(standoff()).unwrap();
    engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    let report = engine
        .submit_allocation(ProcessId(2), ResourceKind::Printer, 1)
        .unwrap();

    assert_eq!(
        report.engine_state,
        EngineState::Lost {
            reason: LossReason::Deadlock
        }
    );
    let cycle = report.cycle.expect("deadlock report carries the cycle");
    assert!(cycle.contains(&ProcessId(1)));
    assert!(cycle.contains(&ProcessId(2)));
    assert!(report
        .processes
        .iter()
        .all(|p| p.status == ProcessStatus::Stuck));

    // Terminal: nothing is accepted and nothing changes.
    assert_eq!(
        engine.submit_allocation(ProcessId(1), ResourceKind::Printer, 1),
        Err(AllocationError::LevelOver)
    );
    assert!(conservation_holds(&engine));
}

#[test]
fn sequencing_around_the_standoff_wins() {
    // Same level as the deadlock test; finishing P1 first avoids the
    // crossed holdings entirely.
    let mut engine = AllocationEngine::new(standoff()).unwrap();
    engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    engine
        .submit_allocation(ProcessId(1), ResourceKind::Printer, 1)
        .unwrap();
    engine
        .submit_allocation(ProcessId(2), ResourceKind::Cpu, 1)
        .unwrap();
    let report = engine
        .submit_allocation(ProcessId(2), ResourceKind::Printer, 1)
        .unwrap();
    assert_eq!(report.engine_state, EngineState::Won);
}

#[test]
fn move_budget_exhaustion_loses() {
    let config = LevelConfig {
        name: "stingy".into(),
        resources: ResourceVec::from([2, 1, 0, 0]),
        processes: vec![spec(1, "a", [2, 0, 0, 0]), spec(2, "b", [0, 1, 0, 0])],
        move_limit: Some(2),
    };
    let mut engine = AllocationEngine::new(config).unwrap();
    engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    let report = engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    assert_eq!(
        report.engine_state,
        EngineState::Lost {
            reason: LossReason::OutOfMoves
        }
    );
}

#[test]
fn rejected_commands_do_not_consume_moves() {
    let config = LevelConfig {
        name: "tight".into(),
        resources: ResourceVec::from([1, 0, 0, 0]),
        processes: vec![spec(1, "a", [1, 0, 0, 0])],
        move_limit: Some(1),
    };
    let mut engine = AllocationEngine::new(config).unwrap();
    assert!(engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 2)
        .is_err());
    assert!(engine
        .submit_allocation(ProcessId(7), ResourceKind::Cpu, 1)
        .is_err());
    assert_eq!(engine.current_state().moves_used, 0);

    let report = engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    assert_eq!(report.engine_state, EngineState::Won);
}

// ── Classification and recovery ────────────────────────────────────────

#[test]
fn wait_chain_is_blocked_not_lost() {
    let config = LevelConfig {
        name: "chain".into(),
        resources: ResourceVec::from([1, 0, 1, 0]),
        processes: vec![spec(1, "a", [1, 0, 0, 0]), spec(2, "b", [1, 0, 1, 0])],
        move_limit: None,
    };
    let mut engine = AllocationEngine::new(config).unwrap();
    let report = engine
        .submit_allocation(ProcessId(2), ResourceKind::Cpu, 1)
        .unwrap();
    assert_eq!(report.engine_state, EngineState::Running);
    assert_eq!(report.classification, SystemClassification::Blocked);

    engine
        .submit_allocation(ProcessId(2), ResourceKind::Disk, 1)
        .unwrap();
    let report = engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    assert_eq!(report.engine_state, EngineState::Won);
}

#[test]
fn insufficient_resource_is_recoverable() {
    let mut engine = AllocationEngine::new(standoff()).unwrap();
    engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    // CPU is exhausted right now; the same request succeeds after P1
    // completes and releases.
    assert!(matches!(
        engine.submit_allocation(ProcessId(2), ResourceKind::Cpu, 1),
        Err(AllocationError::InsufficientResource { .. })
    ));
    engine
        .submit_allocation(ProcessId(1), ResourceKind::Printer, 1)
        .unwrap();
    assert!(engine
        .submit_allocation(ProcessId(2), ResourceKind::Cpu, 1)
        .is_ok());
}

// ── Reports, events, reset ─────────────────────────────────────────────

#[test]
fn conservation_holds_across_a_full_game() {
    let mut engine = AllocationEngine::new(standoff()).unwrap();
    assert!(conservation_holds(&engine));
    engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    assert!(conservation_holds(&engine));
    engine
        .submit_allocation(ProcessId(1), ResourceKind::Printer, 1)
        .unwrap();
    assert!(conservation_holds(&engine));
    engine
        .submit_allocation(ProcessId(2), ResourceKind::Cpu, 1)
        .unwrap();
    engine
        .submit_allocation(ProcessId(2), ResourceKind::Printer, 1)
        .unwrap();
    assert!(conservation_holds(&engine));
}

#[test]
fn events_record_the_run_and_reset_clears() {
    let mut engine = AllocationEngine::new(standoff()).unwrap();
    engine
        .submit_allocation(ProcessId(1), ResourceKind::Cpu, 1)
        .unwrap();
    engine
        .submit_allocation(ProcessId(2), ResourceKind::Printer, 1)
        .unwrap();

    let events = engine.events();
    assert!(matches!(events[0], GameEvent::Allocated { .. }));
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::DeadlockDetected { .. })));
    assert!(matches!(
        events.last(),
        Some(GameEvent::LevelLost {
            reason: LossReason::Deadlock
        })
    ));

    engine.reset();
    assert!(engine.events().is_empty());
    let report = engine.current_state();
    assert_eq!(report.engine_state, EngineState::Running);
    assert_eq!(report.classification, SystemClassification::Safe);
    assert!(report.processes.iter().all(|p| p.held.is_zero()));
}

// ── Generated levels through the engine ────────────────────────────────

#[test]
fn generated_levels_start_cleanly() {
    for difficulty in 1..=6 {
        for seed in 0..10 {
            let config = generate_level(difficulty, seed);
            assert!(validate_config(&config).is_empty());
            let engine = AllocationEngine::new(config).unwrap();
            let report = engine.current_state();
            assert_eq!(report.engine_state, EngineState::Running);
            assert_eq!(report.classification, SystemClassification::Safe);
            assert!(conservation_holds(&engine));
        }
    }
}

#[test]
fn generated_level_is_playable_to_the_end() {
    // Greedy full-grant play: hand each process everything it needs, one
    // kind at a time, in id order. Completions release as we go, so this
    // always wins on a freshly generated level.
    let config = generate_level(2, 13);
    let ids: Vec<ProcessId> = config.processes.iter().map(|p| p.id).collect();
    let mut engine = AllocationEngine::new(config).unwrap();

    for id in ids {
        let outstanding = engine
            .current_state()
            .processes
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.demand)
            .unwrap();
        for (kind, units) in outstanding.nonzero() {
            engine.submit_allocation(id, kind, units).unwrap();
        }
    }
    assert_eq!(engine.current_state().engine_state, EngineState::Won);
}
