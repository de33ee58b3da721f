//! Validate command implementation
//!
//! Checks a batch file against the compiled-in limits without rendering it.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use splinesynth_spec::{validate_batch, ValidationError};
use std::path::Path;
use std::process::ExitCode;

use super::input::load_batch;

/// One validation error in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct JsonValidationError {
    /// Stable error code (`V0xx`).
    pub code: String,
    /// Kernel fault the error would cause at launch.
    pub fault: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&ValidationError> for JsonValidationError {
    fn from(e: &ValidationError) -> Self {
        Self {
            code: e.code().to_string(),
            fault: e.fault().name().to_string(),
            message: e.to_string(),
        }
    }
}

/// JSON output of the validate command.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateOutput {
    /// Whether the batch is valid.
    pub ok: bool,
    /// Batch file path.
    pub batch: String,
    /// Instance count.
    pub instances: usize,
    /// Errors found.
    pub errors: Vec<JsonValidationError>,
}

/// Run the validate command
///
/// # Arguments
/// * `batch_path` - Path to the batch file
/// * `json_output` - Whether to output machine-readable JSON diagnostics
///
/// # Returns
/// Exit code: 0 if valid, 1 if invalid
pub fn run(batch_path: &str, json_output: bool) -> Result<ExitCode> {
    let batch = load_batch(Path::new(batch_path))?;
    let errors = validate_batch(&batch).err().unwrap_or_default();

    if json_output {
        let output = ValidateOutput {
            ok: errors.is_empty(),
            batch: batch_path.to_string(),
            instances: batch.instances.len(),
            errors: errors.iter().map(JsonValidationError::from).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} {}", "Validating:".cyan().bold(), batch_path);
        println!(
            "{} {} instance(s), {} sample(s)",
            "Batch:".dimmed(),
            batch.instances.len(),
            batch.total_samples()
        );
        for e in &errors {
            println!("  {} [{}] {}", "x".red(), e.code(), e);
        }
        if errors.is_empty() {
            println!("\n{} Batch is valid", "SUCCESS".green().bold());
        } else {
            println!(
                "\n{} Batch has {} error(s)",
                "FAILED".red().bold(),
                errors.len()
            );
        }
    }

    Ok(if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
