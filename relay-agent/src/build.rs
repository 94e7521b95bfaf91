//! Running build abstraction
//!
//! The agent side runs inside a build it does not own. Everything it needs
//! from that build, including the user-visible build log, comes through the
//! traits below.

use relay_core::domain::log::{LogEntry, LogLevel};
use relay_core::domain::problem::BuildProblem;
use relay_core::params::Params;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// How the build finished, as reported by the build engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildFinishedStatus {
    Finished,
    Failed,
    Interrupted,
}

/// User-visible log of a running build
///
/// Separate from `tracing`: entries written here are shown to whoever looks
/// at the build, not to whoever operates the agent.
pub trait BuildLog: Send + Sync {
    fn message(&self, message: &str);

    fn warning(&self, message: &str);

    fn error(&self, message: &str);

    /// Records a build problem; problems with equal identity coalesce
    fn problem(&self, problem: BuildProblem);
}

/// A build currently running on this agent
pub trait AgentBuild: Send + Sync {
    fn build_id(&self) -> u64;

    /// Configuration parameters shared by every step of the build
    fn shared_config_parameters(&self) -> &Params;

    fn checkout_dir(&self) -> &Path;

    /// Scratch directory of the build, used to resolve default artifact folders
    fn temp_dir(&self) -> &Path;

    /// Whether the server already considers the build failed
    fn is_failing_on_server(&self) -> bool;

    fn build_log(&self) -> &dyn BuildLog;
}

/// In-memory build log
///
/// Uses Arc<Mutex<...>> so clones share one log across tasks.
#[derive(Clone, Default)]
pub struct InMemoryBuildLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    problems: Arc<Mutex<Vec<BuildProblem>>>,
}

impl InMemoryBuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock_entries().clone()
    }

    /// Returns all entries and clears the log
    pub fn drain(&self) -> Vec<LogEntry> {
        self.lock_entries().drain(..).collect()
    }

    /// Recorded problems, one per identity, in first-seen order
    pub fn problems(&self) -> Vec<BuildProblem> {
        self.problems
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn add(&self, level: LogLevel, message: &str) {
        self.lock_entries().push(LogEntry::new(level, message));
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BuildLog for InMemoryBuildLog {
    fn message(&self, message: &str) {
        self.add(LogLevel::Message, message);
    }

    fn warning(&self, message: &str) {
        self.add(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.add(LogLevel::Error, message);
    }

    fn problem(&self, problem: BuildProblem) {
        let mut problems = self.problems.lock().unwrap_or_else(|e| e.into_inner());
        if !problems.iter().any(|p| p.identity == problem.identity) {
            problems.push(problem);
        }
    }
}

/// Plain build description for hosts that track build state themselves
#[derive(Clone)]
pub struct RunningBuild {
    pub build_id: u64,
    pub params: Params,
    pub checkout_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub failing_on_server: bool,
    pub log: InMemoryBuildLog,
}

impl RunningBuild {
    pub fn new(build_id: u64, params: Params, checkout_dir: PathBuf, temp_dir: PathBuf) -> Self {
        Self {
            build_id,
            params,
            checkout_dir,
            temp_dir,
            failing_on_server: false,
            log: InMemoryBuildLog::new(),
        }
    }
}

impl AgentBuild for RunningBuild {
    fn build_id(&self) -> u64 {
        self.build_id
    }

    fn shared_config_parameters(&self) -> &Params {
        &self.params
    }

    fn checkout_dir(&self) -> &Path {
        &self.checkout_dir
    }

    fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    fn is_failing_on_server(&self) -> bool {
        self.failing_on_server
    }

    fn build_log(&self) -> &dyn BuildLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(identity: &str) -> BuildProblem {
        BuildProblem {
            identity: identity.to_string(),
            kind: "TRANSPORT_ERROR".to_string(),
            description: "Access denied".to_string(),
        }
    }

    #[test]
    fn test_log_levels_and_drain() {
        let log = InMemoryBuildLog::new();
        log.message("one");
        log.warning("two");
        log.error("three");

        let levels: Vec<_> = log.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Message, LogLevel::Warning, LogLevel::Error]);

        assert_eq!(log.drain().len(), 3);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_problems_coalesce_by_identity() {
        let log = InMemoryBuildLog::new();
        log.problem(problem("a"));
        log.problem(problem("a"));
        log.problem(problem("b"));

        assert_eq!(log.problems().len(), 2);
    }

    #[test]
    fn test_clones_share_entries() {
        let log = InMemoryBuildLog::new();
        let other = log.clone();
        other.message("shared");
        assert_eq!(log.entries()[0].message, "shared");
    }
}
