// src/diagnostics/dot.rs

use std::collections::HashMap;
use std::fmt::Write as _;

use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;

use crate::diagnostics::GraphSnapshot;

impl GraphSnapshot {
    /// Render live groups and their dependency edges as Graphviz DOT.
    ///
    /// Edges point from a dependency to the group waiting for it.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraph<String, &str> = DiGraph::new();
        let mut nodes = HashMap::new();

        for group in &self.groups {
            let mut label = format!("group {}\n{} ({:?})", group.id, group.priority, group.state);
            for task in &group.tasks {
                let _ = write!(
                    label,
                    "\n{} [{}/{}]",
                    task.name, task.completed, task.multiplicity
                );
            }
            nodes.insert(group.id, graph.add_node(label));
        }

        for (dependency, dependent) in self.edges() {
            if let (Some(from), Some(to)) = (nodes.get(&dependency), nodes.get(&dependent)) {
                graph.add_edge(*from, *to, "");
            }
        }

        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}
