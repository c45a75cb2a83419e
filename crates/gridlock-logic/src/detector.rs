//! Cycle detection over the wait-for graph.
//!
//! Depth-first traversal with three-color marking, visiting roots and
//! successors in ascending process id. Identical graphs therefore always
//! report the identical first cycle, which keeps test fixtures and replays
//! stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::process::ProcessId;
use crate::wait_graph::WaitGraph;

/// Outcome of a detector pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No cycle; any waiting resolves once some holder completes.
    Safe,
    /// Circular wait; the member processes can never proceed.
    Deadlocked {
        /// Cycle members in traversal order, starting at the closing
        /// process.
        cycle: Vec<ProcessId>,
    },
}

/// Overall system classification carried in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemClassification {
    /// No process is blocked on an exhausted kind.
    Safe,
    /// Some processes wait, but every chain terminates; recoverable by
    /// completions or re-sequencing.
    Blocked,
    /// A wait cycle exists.
    Deadlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Detect a wait cycle in `graph`.
pub fn evaluate(graph: &WaitGraph) -> Verdict {
    let nodes = graph.nodes();
    let mut adj: BTreeMap<ProcessId, Vec<ProcessId>> = BTreeMap::new();
    for edge in graph.edges() {
        adj.entry(edge.waiting).or_default().push(edge.held_by);
    }

    let mut marks: BTreeMap<ProcessId, Mark> =
        nodes.iter().map(|&n| (n, Mark::Unvisited)).collect();

    for &root in &nodes {
        if marks[&root] != Mark::Unvisited {
            continue;
        }
        marks.insert(root, Mark::InProgress);
        // Explicit stack of (node, next successor index).
        let mut stack: Vec<(ProcessId, usize)> = vec![(root, 0)];
        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            frame.1 += 1;
            let succs = adj.get(&node).map(|v| v.as_slice()).unwrap_or(&[]);
            if cursor >= succs.len() {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            }
            let next = succs[cursor];
            match marks[&next] {
                Mark::Unvisited => {
                    marks.insert(next, Mark::InProgress);
                    stack.push((next, 0));
                }
                Mark::InProgress => {
                    let start = stack
                        .iter()
                        .position(|&(n, _)| n == next)
                        .expect("in-progress node must be on the DFS stack");
                    let cycle = stack[start..].iter().map(|&(n, _)| n).collect();
                    return Verdict::Deadlocked { cycle };
                }
                Mark::Done => {}
            }
        }
    }

    Verdict::Safe
}

/// Classify overall state from the graph and its verdict.
pub fn classify(graph: &WaitGraph, verdict: &Verdict) -> SystemClassification {
    match verdict {
        Verdict::Deadlocked { .. } => SystemClassification::Deadlocked,
        Verdict::Safe if graph.is_empty() => SystemClassification::Safe,
        Verdict::Safe => SystemClassification::Blocked,
    }
}
