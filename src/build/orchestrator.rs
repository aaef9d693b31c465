/// Build orchestrator
///
/// Drives the steps strictly in order. For each step: resolve references,
/// ask the cache store, then either skip or execute. A successful execution
/// re-resolves references (the step may have changed them) and records them.
/// The first failing step aborts the build.
use std::io::{self, Write};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{Resolver, Step, StepExecutor};
use crate::cli_utils;
use crate::error::BuildError;
use crate::storage::CacheStore;

/// How a step reached success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Cached,
    Executed,
}

/// Summary of a build where every step succeeded
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub outcomes: Vec<StepOutcome>,
    pub duration: Duration,
}

impl BuildReport {
    pub fn cached_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| **o == StepOutcome::Cached)
            .count()
    }

    pub fn executed_count(&self) -> usize {
        self.outcomes.len() - self.cached_count()
    }
}

pub struct Orchestrator<'a, S: CacheStore> {
    store: &'a S,
    resolver: Resolver,
    executor: StepExecutor,
    use_cache: bool,
    ansi: bool,
}

impl<'a, S: CacheStore> Orchestrator<'a, S> {
    pub fn new(store: &'a S, resolver: Resolver, executor: StepExecutor, ansi: bool) -> Self {
        Self {
            store,
            resolver,
            executor,
            use_cache: true,
            ansi,
        }
    }

    /// Execute every step even when the store reports a hit. Results are
    /// still recorded.
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Run the build to completion or to the first failing step
    pub async fn run(&self, steps: &[Step]) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let total = steps.len();
        let mut outcomes = Vec::with_capacity(total);

        for step in steps {
            announce(|out| {
                cli_utils::step_heading(out, step.index + 1, total, &step.definition, self.ansi)
            });

            let outcome = self.run_step(step).await?;
            outcomes.push(outcome);
        }

        let report = BuildReport {
            outcomes,
            duration: start.elapsed(),
        };

        info!(
            operation = "build",
            status = "success",
            cached = report.cached_count(),
            executed = report.executed_count(),
            "build completed"
        );

        Ok(report)
    }

    async fn run_step(&self, step: &Step) -> Result<StepOutcome, BuildError> {
        let objects = self.resolver.resolve(&step.definition)?;

        if self.use_cache
            && self
                .store
                .is_cached(step, &objects)
                .map_err(BuildError::cache_io)?
        {
            announce(|out| cli_utils::using_cache(out, self.ansi));
            return Ok(StepOutcome::Cached);
        }

        announce(|out| cli_utils::running(out, self.ansi));

        let result = self.executor.run(&step.definition).await?;

        if !result.success() {
            debug!(
                operation = "run",
                step = step.index,
                status = "error",
                exit_code = ?result.exit_code,
                "step failed, aborting build"
            );
            return Err(BuildError::StepExecution {
                step: step.index + 1,
                exit_code: result.exit_code,
            });
        }

        let objects = self.resolver.resolve(&step.definition)?;
        self.store
            .save(step, &objects)
            .map_err(BuildError::cache_io)?;

        Ok(StepOutcome::Executed)
    }
}

fn announce(f: impl FnOnce(&mut io::StdoutLock<'static>) -> io::Result<()>) {
    let mut out = io::stdout().lock();
    let _ = f(&mut out).and_then(|_| out.flush());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RocksCacheStore;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn orchestrator<'a>(
        root: &Path,
        store: &'a RocksCacheStore,
    ) -> Orchestrator<'a, RocksCacheStore> {
        Orchestrator::new(
            store,
            Resolver::new(root, "src"),
            StepExecutor::new("sh", root, false),
            false,
        )
    }

    fn steps(definitions: &[&str]) -> Vec<Step> {
        Step::sequence(definitions.iter().map(|d| d.to_string()).collect())
    }

    #[tokio::test]
    async fn test_cold_then_warm_cache() {
        let root = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        fs::write(root.path().join("a.txt"), "a").unwrap();
        let store = RocksCacheStore::open(state.path()).unwrap();

        let build = steps(&["cat a.txt >> runs.log"]);

        let report = orchestrator(root.path(), &store).run(&build).await.unwrap();
        assert_eq!(report.outcomes, vec![StepOutcome::Executed]);

        let report = orchestrator(root.path(), &store).run(&build).await.unwrap();
        assert_eq!(report.outcomes, vec![StepOutcome::Cached]);

        assert_eq!(
            fs::read_to_string(root.path().join("runs.log")).unwrap(),
            "a"
        );
    }

    #[tokio::test]
    async fn test_only_changed_step_reruns() {
        let root = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        fs::write(root.path().join("a.txt"), "a").unwrap();
        fs::write(root.path().join("b.txt"), "b").unwrap();
        let store = RocksCacheStore::open(state.path()).unwrap();

        let build = steps(&["cat a.txt > /dev/null", "cat b.txt > /dev/null"]);
        orchestrator(root.path(), &store).run(&build).await.unwrap();

        fs::write(root.path().join("b.txt"), "b2").unwrap();

        let report = orchestrator(root.path(), &store).run(&build).await.unwrap();
        assert_eq!(
            report.outcomes,
            vec![StepOutcome::Cached, StepOutcome::Executed]
        );
    }

    #[tokio::test]
    async fn test_step_without_references_always_runs() {
        let root = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let store = RocksCacheStore::open(state.path()).unwrap();

        let build = steps(&["echo hello"]);
        for _ in 0..2 {
            let report = orchestrator(root.path(), &store).run(&build).await.unwrap();
            assert_eq!(report.outcomes, vec![StepOutcome::Executed]);
        }
    }

    #[tokio::test]
    async fn test_reordered_step_misses() {
        let root = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        fs::write(root.path().join("a.txt"), "a").unwrap();
        fs::write(root.path().join("b.txt"), "b").unwrap();
        let store = RocksCacheStore::open(state.path()).unwrap();

        orchestrator(root.path(), &store)
            .run(&steps(&["cat a.txt", "cat b.txt"]))
            .await
            .unwrap();

        let report = orchestrator(root.path(), &store)
            .run(&steps(&["cat b.txt", "cat a.txt"]))
            .await
            .unwrap();
        assert_eq!(
            report.outcomes,
            vec![StepOutcome::Executed, StepOutcome::Executed]
        );
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_steps() {
        let root = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let store = RocksCacheStore::open(state.path()).unwrap();

        let build = steps(&["exit 3", "touch second.txt"]);
        let err = orchestrator(root.path(), &store)
            .run(&build)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BuildError::StepExecution {
                step: 1,
                exit_code: Some(3)
            }
        ));
        assert_eq!(err.exit_code(), 3);
        assert!(!root.path().join("second.txt").exists());
        assert_eq!(store.stats().unwrap().step_records, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unhashable_reference_aborts_before_execution() {
        let root = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        std::os::unix::fs::symlink("loop", root.path().join("loop")).unwrap();
        let store = RocksCacheStore::open(state.path()).unwrap();

        let build = steps(&["touch first.txt loop", "touch second.txt"]);
        let err = orchestrator(root.path(), &store)
            .run(&build)
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::FileHash { ref path, .. } if path == "loop"));
        assert_eq!(err.exit_code(), 1);
        assert!(!root.path().join("first.txt").exists());
        assert!(!root.path().join("second.txt").exists());
        assert_eq!(store.stats().unwrap().step_records, 0);
    }

    #[tokio::test]
    async fn test_records_post_execution_state() {
        let root = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        fs::write(root.path().join("out.txt"), "before").unwrap();
        let store = RocksCacheStore::open(state.path()).unwrap();

        // The step rewrites the file it mentions
        let build = steps(&["echo after > out.txt"]);
        orchestrator(root.path(), &store).run(&build).await.unwrap();

        let report = orchestrator(root.path(), &store).run(&build).await.unwrap();
        assert_eq!(report.outcomes, vec![StepOutcome::Cached]);
    }

    #[tokio::test]
    async fn test_without_cache_executes_and_records() {
        let root = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        fs::write(root.path().join("a.txt"), "a").unwrap();
        let store = RocksCacheStore::open(state.path()).unwrap();

        let build = steps(&["cat a.txt"]);
        orchestrator(root.path(), &store).run(&build).await.unwrap();

        let report = orchestrator(root.path(), &store)
            .without_cache()
            .run(&build)
            .await
            .unwrap();
        assert_eq!(report.outcomes, vec![StepOutcome::Executed]);

        let report = orchestrator(root.path(), &store).run(&build).await.unwrap();
        assert_eq!(report.outcomes, vec![StepOutcome::Cached]);
    }
}
