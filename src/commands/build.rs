/// `snb build` command implementation
///
/// Runs the ShakeAndBakeFile in the build root against its layer cache.
use anyhow::Result;
use std::io;

use crate::build::{parser, Orchestrator, Resolver, Step, StepExecutor};
use crate::cli::BuildArgs;
use crate::cli_utils::{build_completed, build_failed, use_ansi};
use crate::error::BuildError;
use crate::merger::MergedBuildConfig;
use crate::storage::RocksCacheStore;

pub async fn run(args: &BuildArgs) -> Result<()> {
    let config = MergedBuildConfig::load(&args.common)?;

    // A missing spec must not leave a state directory behind
    let steps = Step::sequence(parser::load(&config.build_root, &config.spec_file)?);

    let store = RocksCacheStore::open(&config.state_dir).map_err(BuildError::cache_io)?;

    let ansi = use_ansi(&io::stdout());
    let resolver = Resolver::new(&config.build_root, &config.source_root);
    let executor = StepExecutor::new(&config.shell, &config.build_root, ansi);

    let mut orchestrator = Orchestrator::new(&store, resolver, executor, ansi);
    if args.no_cache {
        orchestrator = orchestrator.without_cache();
    }

    match orchestrator.run(&steps).await {
        Ok(report) => {
            let _ = build_completed(&mut io::stdout(), report.duration.as_secs_f64(), ansi);
            Ok(())
        }
        Err(err) => {
            let exit_code = match &err {
                BuildError::StepExecution { exit_code, .. } => *exit_code,
                _ => None,
            };
            let _ = build_failed(&mut io::stdout(), exit_code, ansi);
            Err(err.into())
        }
    }
}
