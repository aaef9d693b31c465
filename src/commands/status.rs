/// `snb status` command implementation
///
/// Reports, per step, whether the next build would be served from cache.
/// Each step is judged against the current tree; changes an earlier step
/// would make when it runs are not predicted.
use anyhow::Result;
use std::io::{self, Write};

use crate::build::{parser, Resolver, Step};
use crate::cli::StatusArgs;
use crate::cli_utils::{paint, snb_prefix, step_heading, use_ansi, using_cache, Style, LOG_PREFIX};
use crate::error::BuildError;
use crate::merger::MergedBuildConfig;
use crate::storage::{rocks::DB_NAME, CacheStore, RocksCacheStore};

pub async fn run(args: &StatusArgs) -> Result<()> {
    let config = MergedBuildConfig::load(&args.common)?;
    let steps = Step::sequence(parser::load(&config.build_root, &config.spec_file)?);

    // Don't create a store just to look at it
    let store = if config.state_dir.join(DB_NAME).exists() {
        Some(RocksCacheStore::open(&config.state_dir).map_err(BuildError::cache_io)?)
    } else {
        None
    };

    let resolver = Resolver::new(&config.build_root, &config.source_root);
    let ansi = use_ansi(&io::stdout());
    let mut out = io::stdout().lock();
    let total = steps.len();
    let mut cached = 0;

    for step in &steps {
        let objects = resolver.resolve(&step.definition)?;
        let hit = match &store {
            Some(store) => store
                .is_cached(step, &objects)
                .map_err(BuildError::cache_io)?,
            None => false,
        };

        step_heading(&mut out, step.index + 1, total, &step.definition, ansi)?;
        if hit {
            cached += 1;
            using_cache(&mut out, ansi)?;
        } else {
            writeln!(out, "{}", paint(&format!("{}Would run", LOG_PREFIX), Style::Plain, ansi))?;
        }

        if args.verbose {
            if objects.is_empty() {
                writeln!(out, "      (no referenced paths)")?;
            }
            for object in &objects {
                writeln!(out, "      {} {}", object.sha, object.path)?;
            }
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "{} {} of {} steps cached",
        snb_prefix(ansi),
        cached,
        total
    )?;

    Ok(())
}
