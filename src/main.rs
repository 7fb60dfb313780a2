use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unitforge::cli::commands::generate::Target;
use unitforge::cli::{CommandContext, Overrides};

#[derive(Parser)]
#[command(name = "unitforge")]
#[command(
    version,
    about = "Generate and repair JUnit tests with a language model"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project config file (default: .unitforge/config.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
struct GenerateArgs {
    #[arg(long, help = "Worker count for classes and methods")]
    threads: Option<usize>,
    #[arg(long, help = "Maximum LLM repair rounds per test")]
    max_rounds: Option<u32>,
    #[arg(long, help = "Leave dependency classes out of prompts")]
    no_deps: bool,
    #[arg(long, help = "Run jobs one at a time")]
    sequential: bool,
}

impl From<&GenerateArgs> for Overrides {
    fn from(args: &GenerateArgs) -> Self {
        Self {
            threads: args.threads,
            max_rounds: args.max_rounds,
            no_deps: args.no_deps,
            sequential: args.sequential,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate tests for every eligible class
    Project {
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Generate tests for every testable method of one class
    Class {
        #[arg(help = "Simple or fully-qualified class name")]
        name: String,
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Generate tests for one method (all overloads when given a name)
    Method {
        #[arg(help = "Simple or fully-qualified class name")]
        class: String,
        #[arg(help = "Method name or numeric method id")]
        method: String,
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31munitforge encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli.config.as_deref();
    let (target, args) = match cli.command {
        Commands::Project { args } => (Target::Project, args),
        Commands::Class { name, args } => (Target::Class(name), args),
        Commands::Method {
            class,
            method,
            args,
        } => (
            Target::Method {
                class,
                selector: method,
            },
            args,
        ),
        Commands::Config { action } => {
            match action {
                ConfigAction::Show { global, format } => {
                    unitforge::cli::commands::config::show(config_path, global, &format)?;
                }
                ConfigAction::Path => unitforge::cli::commands::config::path()?,
                ConfigAction::Init { global, force } => {
                    unitforge::cli::commands::config::init(global, force)?;
                }
            }
            return Ok(ExitCode::SUCCESS);
        }
    };

    let ctx = CommandContext::load(config_path, &Overrides::from(&args))?;
    let rt = Runtime::new()?;
    let summary = rt.block_on(unitforge::cli::commands::generate::run(&ctx, target))?;

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
