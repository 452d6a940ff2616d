mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    let wait = cli.global.wait;

    // An interrupt abandons the run as-is; the next run reconciles whatever
    // was left half-applied.
    let result = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nOperation cancelled by user.");
            Ok(())
        }
    };

    if wait {
        commands::util::wait_for_enter();
    }

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(global: &GlobalOpts) {
    let filter = if global.quiet {
        "warn"
    } else {
        match (global.verbose, global.debug) {
            (0, false) => "info",
            (0 | 1, _) => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a modem connection
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "c4000", &mut std::io::stdout());
            Ok(())
        }

        // Everything else logs in to the modem first
        Command::Device(args) => commands::devices::handle(args, &cli.global).await,
        Command::Url(args) => commands::urls::handle(args, &cli.global).await,
    }
}
