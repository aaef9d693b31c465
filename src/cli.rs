use clap::{Args, Parser, Subcommand};

/// snb - ShakeAndBake build runner
///
/// Runs the RUN steps of a ShakeAndBakeFile in order, skipping every step
/// whose definition, position and referenced files are unchanged since its
/// last successful run.
#[derive(Parser, Debug)]
#[command(name = "snb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Layer-cached build runner for shell steps", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Build options when no subcommand is given (`snb [DIR]`)
    #[command(flatten)]
    pub build: BuildArgs,
}

impl Cli {
    /// The command to run, defaulting to a build
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Build(self.build))
    }
}

/// Common configuration arguments shared across commands
#[derive(Args, Debug, Clone, Default)]
pub struct CommonConfigArgs {
    /// Build root containing the ShakeAndBakeFile (defaults to the current directory)
    pub dir: Option<String>,

    /// Config file path (defaults to snb.toml in the build root)
    #[arg(short = 'c', long, env = "SNB_CONFIG")]
    pub config: Option<String>,

    /// Specification file name, relative to the build root
    #[arg(long, env = "SNB_CONFIG_SPEC_FILE")]
    pub config_spec_file: Option<String>,

    /// Shell used to run steps
    #[arg(long, env = "SNB_CONFIG_SHELL")]
    pub config_shell: Option<String>,

    /// Secondary root searched for referenced paths
    #[arg(long, env = "SNB_CONFIG_SOURCE_ROOT")]
    pub config_source_root: Option<String>,

    /// State directory holding the cache database
    #[arg(long, env = "SNB_CONFIG_CACHE_DIR")]
    pub config_cache_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the build (default)
    Build(BuildArgs),

    /// Show which steps would be served from cache, without running anything
    Status(StatusArgs),

    /// Manage the build cache
    Cache(CacheArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Execute every step without checking the cache (results are still recorded)
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Also list each step's referenced paths and hashes
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics
    Stats {
        #[command(flatten)]
        common: CommonConfigArgs,
    },

    /// Delete the cache state directory, resetting every step
    Clean {
        #[command(flatten)]
        common: CommonConfigArgs,
    },
}
