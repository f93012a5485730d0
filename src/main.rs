use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use nodeflow::cli::{self, OutputMode, RunOptions};
use nodeflow::config::{NodeflowConfig, expand_path};
use nodeflow::engine::FailurePolicy;
use nodeflow::generator::EchoGenerator;
use nodeflow::logging;
use nodeflow::processor::ProcessorRegistry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "nodeflow")]
#[command(about = "Run workflow graphs of input, AI model, processing and output nodes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory holding .nodeflow/config.toml (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Continue,
    SkipDownstream,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Continue => FailurePolicy::Continue,
            PolicyArg::SkipDownstream => FailurePolicy::SkipDownstream,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow definition
    Run {
        /// Definition file (.json or .toml)
        file: PathBuf,

        /// Input text for input nodes without content
        #[arg(long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Read the input payload from a file (JSON or plain text)
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// What happens to dependents of a failed node
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Generator for aiModel nodes (overrides defaults.generator)
        #[arg(long)]
        generator: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputMode::Console)]
        format: OutputMode,
    },

    /// Check a definition without running it
    Validate {
        /// Definition file (.json or .toml)
        file: PathBuf,
    },

    /// Print the execution order of a definition
    Order {
        /// Definition file (.json or .toml)
        file: PathBuf,
    },

    /// List configured generators and check availability
    Generators,

    /// List registered node types
    Processors,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let log_file = args.log_file.as_deref().map(expand_path);
    let log_guard = logging::init_logging(args.debug, args.quiet, log_file.as_deref())?;

    let project_dir = args.dir.as_deref().map(expand_path);
    let config = NodeflowConfig::load(project_dir.as_deref())?;

    let quiet_mode = if args.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Console
    };

    let exit_code = match args.command {
        Commands::Run {
            file,
            input,
            input_file,
            policy,
            generator,
            format,
        } => {
            let mode = if args.quiet { OutputMode::Quiet } else { format };
            let handler = cli::create_handler(mode);
            let options = RunOptions {
                input: cli::parse_input(input, input_file.as_deref())?,
                policy: policy.map(FailurePolicy::from),
                generator,
            };
            cli::run_workflow(&file, options, &config, &*handler).await?
        }

        Commands::Validate { file } => {
            let handler = cli::create_handler(quiet_mode);
            cli::validate_workflow(&file, &*handler)?
        }

        Commands::Order { file } => {
            let handler = cli::create_handler(quiet_mode);
            cli::show_order(&file, &*handler)?
        }

        Commands::Generators => {
            let handler = cli::create_handler(quiet_mode);
            cli::list_generators(&config, &*handler).await
        }

        Commands::Processors => {
            let handler = cli::create_handler(quiet_mode);
            let registry = ProcessorRegistry::with_builtins(Arc::new(EchoGenerator::default()));
            cli::list_processors(&registry, &*handler);
            0
        }
    };

    if exit_code != 0 {
        // exit skips destructors; flush the log file first
        drop(log_guard);
        std::process::exit(exit_code);
    }
    Ok(())
}
