//! devstation - development workstation infrastructure
//!
//! This is the main entry point for the devstation CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use devstation::config::{Config, LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let cli = Cli::parse_args();

    // Config is read before logging starts so it can pick the format
    let config = Config::load(cli.config.as_deref());

    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(cli.verbosity(), &logging);

    if cli.verbosity() >= 2 {
        eprintln!("devstation v{}", VERSION);
    }

    let config = config.unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {:#}", e);
        Config::default()
    });

    let mut ctx = CommandContext::new(&cli, config);

    let exit_code = match run(&cli, &mut ctx) {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            exit_code_for(&e)
        }
    };

    ctx.output.flush();
    std::process::exit(exit_code);
}

/// Execute the appropriate command
fn run(cli: &Cli, ctx: &mut CommandContext) -> Result<i32> {
    match &cli.command {
        Commands::Synth(args) => args.execute(ctx),
        Commands::List(args) => args.execute(ctx),
        Commands::Validate(args) => args.execute(ctx),
        Commands::Diff(args) => args.execute(ctx),
        Commands::Context(args) => args.execute(ctx),
        Commands::Completions(args) => Ok(args.execute()),
    }
}

/// Library errors carry their own exit codes
fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<devstation::Error>()
        .map_or(1, devstation::Error::exit_code)
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8, logging: &LoggingConfig) {
    let filter = match verbosity {
        0 => logging.log_level.as_deref().unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so that templates printed on stdout stay clean
    match logging.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init(),
    }
}
