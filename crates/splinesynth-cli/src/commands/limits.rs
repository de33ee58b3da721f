//! Limits command implementation
//!
//! Prints the compiled-in size limits, or answers one size-limit query.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use splinesynth_spec::{max_size, LimitQuery, SizeLimits};
use std::process::ExitCode;

/// JSON output for a single query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    /// Queried index.
    pub query: i32,
    /// Limit name, if the index is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    /// Limit value, `-1` for an unknown index.
    pub value: i32,
}

/// Run the limits command
///
/// # Arguments
/// * `query` - Optional limit index; without it every limit is printed
/// * `json_output` - Whether to output machine-readable JSON
///
/// # Returns
/// Exit code: 0, or 1 if the query index is unknown
pub fn run(query: Option<i32>, json_output: bool) -> Result<ExitCode> {
    let Some(index) = query else {
        let limits = SizeLimits::compiled();
        if json_output {
            println!("{}", serde_json::to_string_pretty(&limits)?);
        } else {
            println!("{}", "Compiled-in limits:".cyan().bold());
            for q in LimitQuery::ALL {
                println!("  {:<12} {}", q.as_str(), q.value());
            }
        }
        return Ok(ExitCode::SUCCESS);
    };

    let value = max_size(index);
    let name = LimitQuery::from_index(index).map(LimitQuery::as_str);
    if json_output {
        let output = QueryOutput {
            query: index,
            name,
            value,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match name {
            Some(name) => println!("{} = {}", name, value),
            None => println!("{} unknown limit index {}", "!".yellow(), index),
        }
    }

    Ok(if value < 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
