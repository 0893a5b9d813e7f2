// src/workload/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;
use crate::errors::{FrametasksError, Result};

/// Jobs of a validated config in dependency order.
#[derive(Debug, Clone)]
pub struct JobGraph {
    /// Every job appears after all jobs listed in its `after`.
    order: Vec<String>,
    deps: HashMap<String, Vec<String>>,
}

impl JobGraph {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in cfg.job.keys() {
            graph.add_node(name.as_str());
        }
        for (name, job) in cfg.job.iter() {
            for dep in job.after.iter() {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| {
                FrametasksError::DagCycle(format!(
                    "cycle detected in job DAG involving job '{}'",
                    cycle.node_id()
                ))
            })?
            .into_iter()
            .map(str::to_string)
            .collect();

        let deps = cfg
            .job
            .iter()
            .map(|(name, job)| (name.clone(), job.after.clone()))
            .collect();

        Ok(Self { order, deps })
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.deps.get(name).map(|d| d.as_slice()).unwrap_or(&[])
    }

    /// Jobs without dependencies, in dependency order.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|name| self.dependencies_of(name).is_empty())
            .map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_and_validate;

    #[test]
    fn orders_dependencies_first() {
        let cfg = parse_and_validate(
            r#"
[job.present]
after = ["render", "ui"]

[job.render]
after = ["animate"]

[job.animate]

[job.ui]
"#,
        )
        .unwrap();

        let graph = JobGraph::from_config(&cfg).unwrap();
        let pos = |name: &str| graph.order().iter().position(|n| n == name).unwrap();

        assert_eq!(graph.len(), 4);
        assert!(pos("animate") < pos("render"));
        assert!(pos("render") < pos("present"));
        assert!(pos("ui") < pos("present"));

        let mut roots: Vec<&str> = graph.roots().collect();
        roots.sort();
        assert_eq!(roots, vec!["animate", "ui"]);
        assert!(graph.dependencies_of("unknown").is_empty());
    }
}
