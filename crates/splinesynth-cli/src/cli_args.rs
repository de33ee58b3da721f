//! CLI argument definitions for the splinesynth command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use clap::{Parser, Subcommand};

/// splinesynth - batched spline-driven additive synthesis
#[derive(Parser)]
#[command(name = "splinesynth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Render a batch file to a WAV file and a fault report
    Render {
        /// Path to the batch file (JSON)
        #[arg(short, long)]
        batch: String,

        /// Output WAV path (mixdown of every instance)
        #[arg(short, long)]
        out: Option<String>,

        /// Numeric precision (reduced/f32 or full/f64)
        #[arg(short, long, value_parser = ["reduced", "f32", "full", "f64"])]
        precision: Option<String>,

        /// Refuse to render batches that fail validation
        #[arg(long)]
        strict: bool,

        /// Write the JSON report to this path
        #[arg(long)]
        report: Option<String>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Validate a batch file against the compiled-in limits
    Validate {
        /// Path to the batch file (JSON)
        #[arg(short, long)]
        batch: String,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print the compiled-in size limits
    Limits {
        /// Query one limit by index (0 knots, 1 order, 2 coeffs, 3 partials, 4 instances)
        #[arg(short, long, allow_hyphen_values = true)]
        query: Option<i32>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Write a harmonic batch file built from the bowed-string spectrum
    Template {
        /// Output path (default: stdout)
        #[arg(short, long)]
        out: Option<String>,

        /// Fundamental frequencies in Hz; notes are placed one after another
        #[arg(long, num_args = 1.., default_values_t = vec![220.0])]
        f0: Vec<f64>,

        /// Partials per note
        #[arg(long, default_value_t = 8)]
        partials: usize,

        /// Note duration in seconds
        #[arg(long, default_value_t = 1.0)]
        duration: f64,

        /// Brightness (-1 sul tasto, 0 ordinario, 1 sul ponticello)
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        brightness: f64,

        /// Sample rate in Hz
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
    },
}
