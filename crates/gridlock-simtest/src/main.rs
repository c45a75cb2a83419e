//! Gridlock Headless Simulation Harness
//!
//! Drives the allocation engine end-to-end the way a presentation layer
//! would, without any UI. Validates the bundled level manifest, plays
//! scripted games to their terminal states, and sweeps the level
//! generator.
//!
//! Usage:
//!   cargo run -p gridlock-simtest
//!   cargo run -p gridlock-simtest -- --verbose

use gridlock_logic::detector::SystemClassification;
use gridlock_logic::engine::{AllocationEngine, EngineState, GameEvent, LossReason};
use gridlock_logic::level::{generate_level, validate_config, LevelConfig};
use gridlock_logic::process::ProcessId;
use gridlock_logic::resources::ResourceKind;

// ── Level manifest (hand-authored levels the game ships with) ──────────
const LEVELS_JSON: &str = include_str!("../../../data/levels.json");

// ── Test harness ───────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(results: &mut Vec<TestResult>, name: &str, passed: bool, detail: String) {
    results.push(TestResult {
        name: name.to_string(),
        passed,
        detail,
    });
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Gridlock Simulation Harness ===\n");

    let mut results = Vec::new();

    let levels = match serde_json::from_str::<Vec<LevelConfig>>(LEVELS_JSON) {
        Ok(levels) => levels,
        Err(err) => {
            eprintln!("FATAL: level manifest does not parse: {err}");
            std::process::exit(1);
        }
    };

    results.extend(validate_manifest(&levels, verbose));
    results.extend(play_warmup(&levels));
    results.extend(play_crossfire(&levels));
    results.extend(sweep_generator(verbose));

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    println!();
    for result in &results {
        if !result.passed {
            println!("FAIL  {} — {}", result.name, result.detail);
        } else if verbose {
            println!("ok    {} — {}", result.name, result.detail);
        }
    }
    println!("\n{passed} passed, {failed} failed");

    if failed > 0 {
        std::process::exit(1);
    }
}

fn find_level<'a>(levels: &'a [LevelConfig], name: &str) -> Option<&'a LevelConfig> {
    levels.iter().find(|l| l.name == name)
}

// ── Manifest validation ────────────────────────────────────────────────

fn validate_manifest(levels: &[LevelConfig], verbose: bool) -> Vec<TestResult> {
    let mut results = Vec::new();
    check(
        &mut results,
        "manifest: has levels",
        !levels.is_empty(),
        format!("{} levels", levels.len()),
    );
    for level in levels {
        let errors = validate_config(level);
        if verbose && !errors.is_empty() {
            println!("  {}: {:?}", level.name, errors);
        }
        check(
            &mut results,
            &format!("manifest: \"{}\" is valid", level.name),
            errors.is_empty(),
            format!("{} processes, {} errors", level.processes.len(), errors.len()),
        );
    }
    results
}

// ── Scripted games ─────────────────────────────────────────────────────

/// Warmup is two CPU-only processes; serving them in order wins.
fn play_warmup(levels: &[LevelConfig]) -> Vec<TestResult> {
    let mut results = Vec::new();
    let Some(level) = find_level(levels, "Warmup") else {
        check(&mut results, "warmup: level present", false, String::new());
        return results;
    };

    let mut engine = match AllocationEngine::new(level.clone()) {
        Ok(engine) => engine,
        Err(errors) => {
            check(
                &mut results,
                "warmup: engine accepts level",
                false,
                format!("{errors:?}"),
            );
            return results;
        }
    };

    let first = engine.submit_allocation(ProcessId(1), ResourceKind::Cpu, 1);
    check(
        &mut results,
        "warmup: first grant completes P1",
        first.is_ok(),
        format!("{:?}", first.as_ref().map(|r| r.engine_state)),
    );
    let second = engine.submit_allocation(ProcessId(2), ResourceKind::Cpu, 1);
    let won = matches!(
        second.as_ref().map(|r| r.engine_state),
        Ok(EngineState::Won)
    );
    check(
        &mut results,
        "warmup: level is won",
        won,
        format!("{:?}", second.map(|r| r.engine_state)),
    );
    check(
        &mut results,
        "warmup: event log ends with LevelWon",
        matches!(engine.events().last(), Some(GameEvent::LevelWon)),
        format!("{} events", engine.events().len()),
    );
    results
}

/// Crossfire deadlocks when the player crosses the two holdings.
fn play_crossfire(levels: &[LevelConfig]) -> Vec<TestResult> {
    let mut results = Vec::new();
    let Some(level) = find_level(levels, "Crossfire") else {
        check(&mut results, "crossfire: level present", false, String::new());
        return results;
    };

    let mut engine = match AllocationEngine::new(level.clone()) {
        Ok(engine) => engine,
        Err(errors) => {
            check(
                &mut results,
                "crossfire: engine accepts level",
                false,
                format!("{errors:?}"),
            );
            return results;
        }
    };

    let _ = engine.submit_allocation(ProcessId(1), ResourceKind::Cpu, 1);
    let report = engine.submit_allocation(ProcessId(2), ResourceKind::Disk, 1);

    let (lost, cycle_len, classification) = match &report {
        Ok(report) => (
            report.engine_state
                == EngineState::Lost {
                    reason: LossReason::Deadlock,
                },
            report.cycle.as_ref().map(|c| c.len()).unwrap_or(0),
            Some(report.classification),
        ),
        Err(_) => (false, 0, None),
    };
    check(
        &mut results,
        "crossfire: crossed grants deadlock",
        lost,
        format!("{classification:?}"),
    );
    check(
        &mut results,
        "crossfire: cycle names both processes",
        cycle_len == 2,
        format!("cycle length {cycle_len}"),
    );
    check(
        &mut results,
        "crossfire: terminal state locks commands",
        engine
            .submit_allocation(ProcessId(1), ResourceKind::Disk, 1)
            .is_err(),
        String::new(),
    );

    // The same level is winnable with the right sequencing.
    engine.reset();
    for (id, kind) in [
        (1, ResourceKind::Cpu),
        (1, ResourceKind::Disk),
        (2, ResourceKind::Cpu),
        (2, ResourceKind::Disk),
    ] {
        let _ = engine.submit_allocation(ProcessId(id), kind, 1);
    }
    check(
        &mut results,
        "crossfire: winnable after reset with good sequencing",
        engine.state() == EngineState::Won,
        format!("{:?}", engine.state()),
    );
    results
}

// ── Generator sweep ────────────────────────────────────────────────────

fn sweep_generator(verbose: bool) -> Vec<TestResult> {
    let mut results = Vec::new();
    let mut invalid = 0u32;
    let mut total = 0u32;
    for difficulty in 1..=8 {
        for seed in 0..25 {
            total += 1;
            let config = generate_level(difficulty, seed);
            let errors = validate_config(&config);
            if !errors.is_empty() {
                invalid += 1;
                if verbose {
                    println!("  difficulty {difficulty} seed {seed}: {errors:?}");
                }
            }
        }
    }
    check(
        &mut results,
        "generator: all generated levels valid",
        invalid == 0,
        format!("{invalid}/{total} invalid"),
    );

    check(
        &mut results,
        "generator: deterministic",
        generate_level(4, 99) == generate_level(4, 99),
        String::new(),
    );

    // A fresh generated level starts Running and Safe.
    let config = generate_level(3, 5);
    match AllocationEngine::new(config) {
        Ok(engine) => {
            let report = engine.current_state();
            check(
                &mut results,
                "generator: fresh level starts clean",
                report.engine_state == EngineState::Running
                    && report.classification == SystemClassification::Safe,
                format!("{:?}/{:?}", report.engine_state, report.classification),
            );
        }
        Err(errors) => check(
            &mut results,
            "generator: fresh level starts clean",
            false,
            format!("{errors:?}"),
        ),
    }
    results
}
