//! Batch file loading shared by the commands.

use anyhow::{Context, Result};
use splinesynth_spec::BatchSpec;
use std::fs;
use std::path::Path;

/// Reads and parses a batch file.
pub(crate) fn load_batch(path: &Path) -> Result<BatchSpec> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
    BatchSpec::from_json(&text)
        .with_context(|| format!("Failed to parse batch file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_batch_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_batch(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
    }

    #[test]
    fn test_load_batch_missing_file() {
        let err = load_batch(Path::new("/nonexistent/batch.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
