//! splinesynth CLI - render, validate and inspect spline synthesis batches

mod cli_args;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli_args::{Cli, Commands};
use splinesynth_cli::commands;

/// Environment variable holding the log filter, e.g. `SPLINESYNTH_LOG=debug`.
const LOG_ENV: &str = "SPLINESYNTH_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            batch,
            out,
            precision,
            strict,
            report,
            json,
        } => commands::render::run(
            &batch,
            out.as_deref(),
            precision.as_deref(),
            strict,
            report.as_deref(),
            json,
        ),
        Commands::Validate { batch, json } => commands::validate::run(&batch, json),
        Commands::Limits { query, json } => commands::limits::run(query, json),
        Commands::Template {
            out,
            f0,
            partials,
            duration,
            brightness,
            sample_rate,
        } => commands::template::run(
            out.as_deref(),
            &commands::template::TemplateParams {
                f0,
                partials,
                duration,
                brightness,
                sample_rate,
            },
        ),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
