// src/tasks/cycles.rs

//! Cycle diagnostics.
//!
//! The scheduler never needs this: a cycle simply leaves its members
//! unready and the schedule ends in a deadlock. It is used to explain that
//! outcome up front (`--dry-run`, startup warnings).

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::tasks::TaskSet;
use crate::types::TaskName;

impl TaskSet {
    /// Every group of tasks that depend on each other in a cycle, including
    /// single tasks that depend on themselves.
    ///
    /// Members of each cycle are sorted, and cycles are ordered by their
    /// first member. Dependencies on names outside the set are ignored.
    pub fn find_cycles(&self) -> Vec<Vec<TaskName>> {
        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.names() {
            graph.add_node(name);
        }
        for (name, task) in self.iter() {
            for dep in &task.deps {
                if self.contains(dep) {
                    graph.add_edge(dep.as_str(), name, ());
                }
            }
        }

        let mut cycles: Vec<Vec<TaskName>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut members: Vec<TaskName> = scc.into_iter().map(str::to_string).collect();
                members.sort();
                members
            })
            .collect();

        cycles.sort();
        cycles
    }
}
