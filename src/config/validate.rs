// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{FrametasksError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::FrametasksError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.job))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_scheduler_section(cfg)?;
    validate_jobs(cfg)?;
    validate_job_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn validate_scheduler_section(cfg: &RawConfigFile) -> Result<()> {
    let s = &cfg.scheduler;

    if s.max_workers_per_pool == 0 {
        return Err(FrametasksError::ConfigError(
            "[scheduler].max_workers_per_pool must be >= 1 (got 0)".to_string(),
        ));
    }

    for (key, value) in [("short_workers", s.short_workers), ("long_workers", s.long_workers)] {
        if value == 0 || value > s.max_workers_per_pool {
            return Err(FrametasksError::ConfigError(format!(
                "[scheduler].{key} must be between 1 and max_workers_per_pool ({}) (got {value})",
                s.max_workers_per_pool
            )));
        }
    }

    if s.max_outstanding_groups == 0 {
        return Err(FrametasksError::ConfigError(
            "[scheduler].max_outstanding_groups must be >= 1 (got 0)".to_string(),
        ));
    }

    if !(s.target_frame_time_ms.is_finite() && s.target_frame_time_ms > 0.0) {
        return Err(FrametasksError::ConfigError(format!(
            "[scheduler].target_frame_time_ms must be a positive number (got {})",
            s.target_frame_time_ms
        )));
    }

    Ok(())
}

fn validate_jobs(cfg: &RawConfigFile) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        if job.multiplicity == 0 {
            return Err(FrametasksError::ConfigError(format!(
                "job '{}' must have multiplicity >= 1 (got 0)",
                name
            )));
        }
    }
    Ok(())
}

fn validate_job_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        for dep in job.after.iter() {
            if dep == name {
                return Err(FrametasksError::ConfigError(format!(
                    "job '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.job.contains_key(dep) {
                return Err(FrametasksError::ConfigError(format!(
                    "job '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> job, so `[job.B] after = ["A"]` adds A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.job.keys() {
        graph.add_node(name.as_str());
    }

    for (name, job) in cfg.job.iter() {
        for dep in job.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(FrametasksError::DagCycle(format!(
                "cycle detected in job DAG involving job '{}'",
                node
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{JobConfig, SchedulerSection};
    use std::collections::BTreeMap;

    fn raw(jobs: &[(&str, &[&str])]) -> RawConfigFile {
        let mut job = BTreeMap::new();
        for (name, after) in jobs {
            job.insert(
                name.to_string(),
                JobConfig {
                    after: after.iter().map(|s| s.to_string()).collect(),
                    ..JobConfig::default()
                },
            );
        }
        RawConfigFile {
            scheduler: SchedulerSection {
                short_workers: 2,
                long_workers: 1,
                ..SchedulerSection::default()
            },
            job,
        }
    }

    #[test]
    fn accepts_a_chain() {
        let cfg = ConfigFile::try_from(raw(&[("a", &[]), ("b", &["a"]), ("c", &["a", "b"])]));
        assert!(cfg.is_ok());
    }

    #[test]
    fn rejects_self_dependency() {
        let err = ConfigFile::try_from(raw(&[("a", &["a"])])).unwrap_err();
        assert!(matches!(err, FrametasksError::ConfigError(msg) if msg.contains("itself")));
    }

    #[test]
    fn rejects_zero_workers() {
        let mut cfg = raw(&[]);
        cfg.scheduler.long_workers = 0;
        let err = ConfigFile::try_from(cfg).unwrap_err();
        assert!(matches!(err, FrametasksError::ConfigError(msg) if msg.contains("long_workers")));
    }

    #[test]
    fn rejects_workers_above_pool_cap() {
        let mut cfg = raw(&[]);
        cfg.scheduler.max_workers_per_pool = 2;
        cfg.scheduler.short_workers = 3;
        assert!(ConfigFile::try_from(cfg).is_err());
    }

    #[test]
    fn rejects_non_positive_frame_time() {
        let mut cfg = raw(&[]);
        cfg.scheduler.target_frame_time_ms = 0.0;
        assert!(ConfigFile::try_from(cfg).is_err());
    }

    #[test]
    fn reports_cycles() {
        let err = ConfigFile::try_from(raw(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"])])).unwrap_err();
        assert!(matches!(err, FrametasksError::DagCycle(msg) if msg.contains("cycle detected")));
    }
}
